use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{descriptor::OperationKind, errors::Error};

/// Build the error aborting a transformation because the device cannot
/// represent `feature`.
pub fn reject(feature: impl Into<String>) -> Error {
    let feature = feature.into();
    log::debug!("Refusing unsupported feature: {feature}");
    Error::UnsupportedFeature(feature)
}

/// Known firmware capability snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// The first published firmware support: no trust lines, no inflation,
    /// no data entries, no binary memos and no signer changes
    Beta,
    #[default]
    Current,
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beta" => Ok(Profile::Beta),
            "current" => Ok(Profile::Current),
            _ => Err(Error::invalid_field(
                "profile",
                format!("unknown profile \"{s}\" (expected beta or current)"),
            )),
        }
    }
}
impl core::fmt::Display for Profile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Profile::Beta => f.write_str("beta"),
            Profile::Current => f.write_str("current"),
        }
    }
}

/// What the target device protocol is able to express.
///
/// The set drifted across firmware versions, so it is data rather than code.
/// Whatever the table says, operations without any device equivalent (see
/// [Capabilities::has_device_equivalent]) are always refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub unsupported_operations: BTreeSet<OperationKind>,
    #[serde(default = "default_true")]
    pub binary_memo: bool,
    #[serde(default = "default_true")]
    pub set_signer: bool,
}

fn default_true() -> bool {
    true
}

impl Capabilities {
    pub fn beta() -> Self {
        Self {
            unsupported_operations: BTreeSet::from([
                OperationKind::ChangeTrust,
                OperationKind::Inflation,
                OperationKind::ManageData,
                OperationKind::ManageBuyOffer,
                OperationKind::PathPaymentStrictSend,
            ]),
            binary_memo: false,
            set_signer: false,
        }
    }

    pub fn current() -> Self {
        Self {
            unsupported_operations: BTreeSet::from([
                OperationKind::ManageBuyOffer,
                OperationKind::PathPaymentStrictSend,
            ]),
            binary_memo: true,
            set_signer: true,
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Beta => Self::beta(),
            Profile::Current => Self::current(),
        }
    }

    pub fn has_device_equivalent(kind: OperationKind) -> bool {
        !matches!(
            kind,
            OperationKind::ManageBuyOffer | OperationKind::PathPaymentStrictSend
        )
    }

    pub fn supports_operation(&self, kind: OperationKind) -> bool {
        Self::has_device_equivalent(kind) && !self.unsupported_operations.contains(&kind)
    }

    /// Return the [Error::UnsupportedFeature] for `kind`, if any.
    pub fn check_operation(&self, kind: OperationKind) -> Result<(), Error> {
        if self.supports_operation(kind) {
            Ok(())
        } else {
            Err(reject(format!("operation {kind}")))
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::current()
    }
}

impl From<Profile> for Capabilities {
    fn from(value: Profile) -> Self {
        Self::for_profile(value)
    }
}
