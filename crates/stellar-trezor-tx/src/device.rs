//! The device-model transaction, shaped like the parameters of the Trezor
//! `stellarSignTransaction` call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AssetType {
    Alphanum4 = 1,
    Alphanum12 = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MemoType {
    None = 0,
    Text = 1,
    Id = 2,
    Hash = 3,
    Return = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignerType {
    Account = 0,
    PreAuth = 1,
    Hash = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOperationType {
    CreateAccount,
    Payment,
    PathPayment,
    ManageOffer,
    CreatePassiveOffer,
    SetOptions,
    ChangeTrust,
    AllowTrust,
    AccountMerge,
    Inflation,
    ManageData,
    BumpSequence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceOperation {
    #[serde(rename = "type")]
    pub kind: DeviceOperationType,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBounds {
    pub min_time: u64,
    pub max_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Total fee, in stroops
    pub fee: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timebounds: Option<TimeBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<Value>,
    pub operations: Vec<DeviceOperation>,
    /// The `network` of the descriptor. The device receives the network
    /// passphrase beside the transaction, never inside it.
    #[serde(skip)]
    pub network: Option<String>,
}

impl DeviceTransaction {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).expect("known structure")
    }
}

impl core::fmt::Display for DeviceTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).expect("known structure")
        )
    }
}
