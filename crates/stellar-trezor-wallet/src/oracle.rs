use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// The most recent ledger effect of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEffect {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Tells whether an account exists on the ledger.
pub trait AccountOracle: Sync {
    /// Return the last effect of `public_key`, or `None` if there is no such
    /// account.
    fn last_effect(
        &self,
        public_key: &str,
    ) -> impl std::future::Future<Output = Result<Option<AccountEffect>>> + Send;
}

#[cfg(feature = "horizon")]
pub use horizon::HorizonOracle;

#[cfg(feature = "horizon")]
mod horizon {
    use std::sync::Arc;

    use reqwest::{Client, StatusCode};
    use serde::Deserialize;

    use super::{AccountEffect, AccountOracle};
    use crate::errors::{Error, Result};

    pub const DEFAULT_HORIZON_URL: &str = "https://horizon.stellar.org";

    #[derive(Debug, Deserialize)]
    struct EffectsPage {
        #[serde(rename = "_embedded")]
        embedded: EffectsRecords,
    }
    #[derive(Debug, Deserialize)]
    struct EffectsRecords {
        records: Vec<AccountEffect>,
    }

    #[derive(Debug, Clone)]
    pub struct HorizonOracle {
        client: Client,
        horizon_url: Arc<str>,
    }

    impl Default for HorizonOracle {
        fn default() -> Self {
            Self::new(DEFAULT_HORIZON_URL.to_owned())
        }
    }

    impl HorizonOracle {
        pub fn new(horizon_url: String) -> Self {
            Self {
                client: Client::new(),
                horizon_url: horizon_url.trim_end_matches('/').into(),
            }
        }

        fn effects_endpoint(&self, public_key: &str) -> String {
            format!(
                "{}/accounts/{public_key}/effects?order=desc&limit=1",
                self.horizon_url
            )
        }
    }

    impl AccountOracle for HorizonOracle {
        async fn last_effect(&self, public_key: &str) -> Result<Option<AccountEffect>> {
            let api_endpoint = self.effects_endpoint(public_key);
            log::debug!("Initiating GET {api_endpoint}");
            let res = self.client.get(&api_endpoint).send().await?;
            let status_code = res.status();
            if status_code == StatusCode::NOT_FOUND {
                log::debug!("{public_key} does not exist");
                return Ok(None);
            }
            if status_code.is_client_error() || status_code.is_server_error() {
                return Err(Error::Oracle(format!(
                    "{} {}",
                    status_code.as_u16(),
                    status_code.canonical_reason().unwrap_or("UNKNOWN")
                )));
            }
            let page: EffectsPage = res.json().await?;
            Ok(page.embedded.records.into_iter().next())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn endpoint() {
            let oracle = HorizonOracle::new("https://horizon-testnet.stellar.org/".to_owned());
            assert_eq!(
                oracle.effects_endpoint("GABC"),
                "https://horizon-testnet.stellar.org/accounts/GABC/effects?order=desc&limit=1"
            );
        }

        #[test]
        fn parse_effects_page() {
            let page: EffectsPage = serde_json::from_str(
                r#"{
                    "_links": {},
                    "_embedded": {
                        "records": [{
                            "id": "0000000012884905986-0000000001",
                            "paging_token": "12884905986-1",
                            "account": "GABC",
                            "type": "account_credited",
                            "type_i": 2,
                            "created_at": "2019-01-01T00:00:00Z"
                        }]
                    }
                }"#,
            )
            .unwrap();
            assert_eq!(page.embedded.records[0].kind, "account_credited");
            assert_eq!(
                page.embedded.records[0].created_at.as_deref(),
                Some("2019-01-01T00:00:00Z")
            );
        }
    }
}
