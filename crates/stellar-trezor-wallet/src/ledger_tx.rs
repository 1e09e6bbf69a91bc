use serde::{Deserialize, Serialize};
use stellar_trezor_tx::{TransitionalDescriptor, TxField};

use crate::errors::{Error, Result};

pub const PUBLIC_NETWORK_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";
pub const TEST_NETWORK_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Resolve the `network` of a descriptor: `public`, `test`, or a passphrase.
pub fn network_passphrase(network: &str) -> &str {
    match network {
        "public" => PUBLIC_NETWORK_PASSPHRASE,
        "test" => TEST_NETWORK_PASSPHRASE,
        passphrase => passphrase,
    }
}

/// A signature and the hint identifying the key that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: Vec<u8>,
}

/// What the signing flow needs from a ledger SDK transaction object.
pub trait LedgerTransaction {
    /// The transitional descriptor of the transaction.
    fn descriptor(&self) -> Result<TransitionalDescriptor>;
    fn network_passphrase(&self) -> &str;
    fn add_signature(&mut self, signature: DecoratedSignature);
}

/// A transaction already available as a descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribedTransaction {
    pub descriptor: TransitionalDescriptor,
    pub network_passphrase: String,
    #[serde(default)]
    pub signatures: Vec<DecoratedSignature>,
}

impl DescribedTransaction {
    /// Take the network passphrase from the `network` field of `descriptor`.
    pub fn new(descriptor: TransitionalDescriptor) -> Result<Self> {
        let network = descriptor
            .fields
            .get(&TxField::Network)
            .and_then(|network| network.as_str())
            .ok_or_else(|| Error::generic("The transaction descriptor has no network"))?;
        let network_passphrase = network_passphrase(network).to_owned();
        Ok(Self {
            descriptor,
            network_passphrase,
            signatures: Vec::new(),
        })
    }
}

impl LedgerTransaction for DescribedTransaction {
    fn descriptor(&self) -> Result<TransitionalDescriptor> {
        Ok(self.descriptor.clone())
    }
    fn network_passphrase(&self) -> &str {
        &self.network_passphrase
    }
    fn add_signature(&mut self, signature: DecoratedSignature) {
        self.signatures.push(signature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn passphrase_from_network() {
        let tdesc = TransitionalDescriptor::default().with(TxField::Network, json!("public"));
        assert_eq!(
            DescribedTransaction::new(tdesc).unwrap().network_passphrase,
            PUBLIC_NETWORK_PASSPHRASE
        );
        let tdesc =
            TransitionalDescriptor::default().with(TxField::Network, json!("My Private Network"));
        assert_eq!(
            DescribedTransaction::new(tdesc).unwrap().network_passphrase,
            "My Private Network"
        );
        assert!(DescribedTransaction::new(TransitionalDescriptor::default()).is_err());
    }
}
