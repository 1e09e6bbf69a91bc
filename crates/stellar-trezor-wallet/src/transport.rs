//! The boundary with the device bridge. Device discovery, session handling and
//! message framing all live behind [Transport].

use serde::{Deserialize, Serialize};
use stellar_trezor_tx::DeviceTransaction;

use crate::errors::{Error, Result};

/// Answer of the device bridge: the `{success, payload}` pair of a Trezor
/// Connect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResponse<T> {
    Success(T),
    Failure { error: String },
}

impl<T> TransportResponse<T> {
    pub fn into_result(self) -> Result<T> {
        match self {
            TransportResponse::Success(payload) => Ok(payload),
            TransportResponse::Failure { error } => {
                log::error!("Trezor: {error}");
                Err(Error::DeviceRejected(error))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPayload {
    /// The `G...` account id
    pub address: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayload {
    /// Hex-encoded raw signature
    pub signature: String,
    /// Hex-encoded public key of the signing account
    #[serde(default)]
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    pub path: String,
    pub network_passphrase: String,
    pub transaction: DeviceTransaction,
}

/// Connection events raised by the device bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceEvent {
    DeviceConnect,
    DeviceDisconnect,
}

pub trait Transport: Send + Sync {
    /// Register the application with the bridge manifest.
    fn manifest(&self, app_url: &str, email: &str);
    /// Ask the device for the account id at `path`.
    fn get_address(
        &self,
        path: &str,
        show_on_device: bool,
    ) -> impl std::future::Future<Output = TransportResponse<AddressPayload>> + Send;
    /// Ask the user to review and sign `request` on the device.
    fn sign_transaction(
        &self,
        request: &SignRequest,
    ) -> impl std::future::Future<Output = TransportResponse<SignaturePayload>> + Send;
    /// Close the bridge UI, abandoning whatever it was waiting for.
    fn cancel(&self) -> Result<()>;
}
