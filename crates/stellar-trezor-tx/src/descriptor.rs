//! The transitional descriptor: a normalized, encoding-independent view of a
//! Stellar transaction, as produced by the ledger SDK collaborator.
//!
//! Field names and operation types are closed enums, so a descriptor carrying
//! an unknown field or operation fails to deserialize instead of slipping
//! through untransformed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{errors::Result, rules::SemanticType};

macro_rules! field_names {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $str:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        $vis enum $name {
            $(
                #[serde(rename = $str)]
                $variant,
            )*
        }
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)*
                }
            }
        }
        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

field_names! {
    /// Top-level transaction fields
    pub enum TxField {
        Source => "source",
        Fee => "fee",
        Sequence => "sequence",
        MinTime => "minTime",
        MaxTime => "maxTime",
        Memo => "memo",
        Network => "network",
    }
}

impl TxField {
    pub fn semantic_type(&self) -> Option<SemanticType> {
        match self {
            TxField::Fee => Some(SemanticType::Amount),
            TxField::Sequence => Some(SemanticType::Sequence),
            TxField::MinTime | TxField::MaxTime => Some(SemanticType::Date),
            TxField::Memo => Some(SemanticType::Memo),
            TxField::Source | TxField::Network => None,
        }
    }
}

field_names! {
    /// Every field an operation descriptor may carry
    pub enum OpField {
        Source => "source",
        Destination => "destination",
        StartingBalance => "startingBalance",
        Asset => "asset",
        Amount => "amount",
        SendAsset => "sendAsset",
        SendMax => "sendMax",
        SendAmount => "sendAmount",
        DestAsset => "destAsset",
        DestAmount => "destAmount",
        DestMin => "destMin",
        Path => "path",
        Selling => "selling",
        Buying => "buying",
        Price => "price",
        OfferId => "offerId",
        BuyAmount => "buyAmount",
        InflationDest => "inflationDest",
        ClearFlags => "clearFlags",
        SetFlags => "setFlags",
        MasterWeight => "masterWeight",
        LowThreshold => "lowThreshold",
        MedThreshold => "medThreshold",
        HighThreshold => "highThreshold",
        HomeDomain => "homeDomain",
        Signer => "signer",
        Limit => "limit",
        Trustor => "trustor",
        AssetCode => "assetCode",
        Authorize => "authorize",
        Name => "name",
        Value => "value",
        BumpTo => "bumpTo",
    }
}

impl OpField {
    pub fn semantic_type(&self) -> Option<SemanticType> {
        match self {
            OpField::StartingBalance
            | OpField::Amount
            | OpField::SendMax
            | OpField::SendAmount
            | OpField::DestAmount
            | OpField::DestMin
            | OpField::BuyAmount
            | OpField::Limit => Some(SemanticType::Amount),
            OpField::Asset
            | OpField::SendAsset
            | OpField::DestAsset
            | OpField::Selling
            | OpField::Buying => Some(SemanticType::Asset),
            OpField::Path => Some(SemanticType::AssetList),
            OpField::Price => Some(SemanticType::Price),
            OpField::Signer => Some(SemanticType::Signer),
            OpField::Value => Some(SemanticType::Buffer),
            OpField::BumpTo => Some(SemanticType::Sequence),
            // addresses, ids, flags, weights, thresholds, strings and booleans
            OpField::Source
            | OpField::Destination
            | OpField::OfferId
            | OpField::InflationDest
            | OpField::ClearFlags
            | OpField::SetFlags
            | OpField::MasterWeight
            | OpField::LowThreshold
            | OpField::MedThreshold
            | OpField::HighThreshold
            | OpField::HomeDomain
            | OpField::Trustor
            | OpField::AssetCode
            | OpField::Authorize
            | OpField::Name => None,
        }
    }
}

field_names! {
    /// The ledger operation kinds a descriptor can describe, including the
    /// legacy names of the offer and path-payment operations
    pub enum OperationKind {
        CreateAccount => "createAccount",
        Payment => "payment",
        PathPayment => "pathPayment",
        PathPaymentStrictReceive => "pathPaymentStrictReceive",
        PathPaymentStrictSend => "pathPaymentStrictSend",
        ManageOffer => "manageOffer",
        ManageSellOffer => "manageSellOffer",
        ManageBuyOffer => "manageBuyOffer",
        CreatePassiveOffer => "createPassiveOffer",
        CreatePassiveSellOffer => "createPassiveSellOffer",
        SetOptions => "setOptions",
        ChangeTrust => "changeTrust",
        AllowTrust => "allowTrust",
        AccountMerge => "accountMerge",
        Inflation => "inflation",
        ManageData => "manageData",
        BumpSequence => "bumpSequence",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    #[serde(flatten)]
    pub fields: BTreeMap<OpField, Value>,
}

impl OperationDescriptor {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }
    pub fn with(mut self, field: OpField, value: Value) -> Self {
        self.fields.insert(field, value);
        self
    }
}

/// A transaction as a set of typed top-level fields plus the ordered list of
/// its operations. The order of `operations` is the execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionalDescriptor {
    #[serde(flatten)]
    pub fields: BTreeMap<TxField, Value>,
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
}

impl TransitionalDescriptor {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
    pub fn with(mut self, field: TxField, value: Value) -> Self {
        self.fields.insert(field, value);
        self
    }
    pub fn with_operation(mut self, operation: OperationDescriptor) -> Self {
        self.operations.push(operation);
        self
    }
}
