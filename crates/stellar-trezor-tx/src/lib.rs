//! Conversion of Stellar transactions, given as transitional descriptors, into
//! the transaction model of the Trezor Stellar signing protocol.
//!
//! The conversion fails closed: an operation or field the device cannot
//! express aborts it with [errors::Error::UnsupportedFeature].
//!
//! ```ignore
//! let tdesc = TransitionalDescriptor::from_json(json)?;
//! let device_tx = DeviceTransaction::try_from((&tdesc, &Capabilities::current()))?;
//! ```

pub mod capabilities;
pub mod descriptor;
pub mod device;
pub mod errors;
pub mod normalizer;
pub mod rules;
pub mod strkey;
pub mod transformer;

pub use capabilities::{Capabilities, Profile};
pub use descriptor::{OpField, OperationDescriptor, OperationKind, TransitionalDescriptor, TxField};
pub use device::{DeviceOperation, DeviceOperationType, DeviceTransaction, TimeBounds};
pub use rules::{FieldRules, SemanticType};

use errors::{Error, Result};

/// Run the whole pipeline: field rules, then normalization.
pub fn to_device_transaction(
    descriptor: &TransitionalDescriptor,
    capabilities: &Capabilities,
) -> Result<DeviceTransaction> {
    let transformed = transformer::transform(descriptor, &FieldRules::new(capabilities))?;
    let device_tx = normalizer::normalize(transformed, capabilities)?;
    log::debug!("Trezor TX {device_tx}");
    Ok(device_tx)
}

impl TryFrom<(&TransitionalDescriptor, &Capabilities)> for DeviceTransaction {
    type Error = Error;

    fn try_from(value: (&TransitionalDescriptor, &Capabilities)) -> Result<Self> {
        let (descriptor, capabilities) = value;
        to_device_transaction(descriptor, capabilities)
    }
}

impl TryFrom<&TransitionalDescriptor> for DeviceTransaction {
    type Error = Error;

    fn try_from(value: &TransitionalDescriptor) -> Result<Self> {
        to_device_transaction(value, &Capabilities::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ACCOUNT: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";

    fn descriptor() -> TransitionalDescriptor {
        TransitionalDescriptor::from_json(&format!(
            r#"{{
                "network": "test",
                "source": "{ACCOUNT}",
                "sequence": "103420918407103489",
                "maxTime": "2019-01-01",
                "memo": {{ "type": "text", "value": "Invoice 42" }},
                "operations": [
                    {{
                        "type": "createAccount",
                        "destination": "{ACCOUNT}",
                        "startingBalance": "2.5"
                    }},
                    {{
                        "type": "payment",
                        "destination": "{ACCOUNT}",
                        "asset": {{ "code": "XLM" }},
                        "amount": "0.1"
                    }},
                    {{
                        "type": "manageSellOffer",
                        "selling": {{ "code": "XLM" }},
                        "buying": {{ "code": "EURT", "issuer": "{ACCOUNT}" }},
                        "amount": "10",
                        "price": "2",
                        "offerId": "0"
                    }},
                    {{
                        "type": "manageData",
                        "name": "config",
                        "value": {{ "type": "text", "value": "on" }}
                    }}
                ]
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn full_transaction() {
        let device_tx = DeviceTransaction::try_from(&descriptor()).unwrap();
        assert_eq!(
            device_tx.to_json(),
            json!({
                "source": ACCOUNT,
                "fee": 400,
                "sequence": 103420918407103489i64,
                "timebounds": { "minTime": 0, "maxTime": 1546300800 },
                "memo": { "type": 1, "text": "Invoice 42" },
                "operations": [
                    {
                        "type": "createAccount",
                        "destination": ACCOUNT,
                        "startingBalance": "25000000"
                    },
                    {
                        "type": "payment",
                        "destination": ACCOUNT,
                        "asset": null,
                        "amount": "1000000"
                    },
                    {
                        "type": "manageOffer",
                        "selling": null,
                        "buying": { "code": "EURT", "issuer": ACCOUNT, "type": 1 },
                        "amount": "100000000",
                        "price": { "n": 2, "d": 1 },
                        "offerId": "0"
                    },
                    { "type": "manageData", "name": "config", "value": "6f6e" }
                ]
            })
        );
        assert_eq!(device_tx.network.as_deref(), Some("test"));
    }

    #[test]
    fn deterministic_output() {
        let tdesc = descriptor();
        let first = DeviceTransaction::try_from(&tdesc).unwrap().to_string();
        let second = DeviceTransaction::try_from(&tdesc).unwrap().to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn manage_buy_offer_anywhere_is_refused() {
        let buy_offer = OperationDescriptor::new(OperationKind::ManageBuyOffer)
            .with(OpField::BuyAmount, json!("1"))
            .with(OpField::Price, json!("1"));
        for position in 0..=descriptor().operations.len() {
            let mut tdesc = descriptor();
            tdesc.operations.insert(position, buy_offer.clone());
            assert!(
                DeviceTransaction::try_from(&tdesc).is_err_and(|e| match e {
                    Error::UnsupportedFeature(feature) => feature == "operation manageBuyOffer",
                    _ => unreachable!("Only UnsupportedFeature errors can be raised"),
                })
            );
        }
    }

    #[test]
    fn allow_trust_scenario() {
        let tdesc = TransitionalDescriptor::default().with_operation(
            OperationDescriptor::new(OperationKind::AllowTrust)
                .with(OpField::Trustor, json!(ACCOUNT))
                .with(OpField::AssetCode, json!("USD"))
                .with(OpField::Authorize, json!(true)),
        );
        let device_tx = DeviceTransaction::try_from(&tdesc).unwrap();
        assert_eq!(device_tx.fee, 100);
        assert_eq!(
            device_tx.to_json()["operations"][0],
            json!({
                "type": "allowTrust",
                "trustor": ACCOUNT,
                "assetCode": "USD",
                "assetType": 1,
                "authorize": 1
            })
        );
    }

    #[test]
    fn set_options_signer_scenario() {
        let raw: [u8; 32] = core::array::from_fn(|i| (i * 7) as u8);
        let signer_account = stellar_strkey::ed25519::PublicKey(raw).to_string();
        let tdesc = TransitionalDescriptor::default().with_operation(
            OperationDescriptor::new(OperationKind::SetOptions).with(
                OpField::Signer,
                json!({ "type": "key", "value": signer_account, "weight": 5 }),
            ),
        );
        let device_tx = DeviceTransaction::try_from((&tdesc, &Capabilities::current())).unwrap();
        assert_eq!(
            device_tx.operations[0].fields["signer"],
            json!({ "type": 0, "key": hex::encode(raw), "weight": 5 })
        );
    }

    #[test]
    fn binary_memo_with_nul_is_refused() {
        let memo = json!({ "type": "base64", "value": "AGFiYw==" });
        let tdesc = descriptor().with(TxField::Memo, memo);
        assert!(DeviceTransaction::try_from(&tdesc)
            .is_err_and(|e| matches!(e, Error::UnsupportedFeature(f) if f == "binary memo text")));
    }
}
