use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No Trezor connected.")]
    NotConnected,
    #[error("Account number starts at 1 (got {0}).")]
    InvalidAccountNumber(i64),
    #[error("The account derivation index {0} is too big (max 2^31-1)")]
    AccountDerivationIndexOutOfBound(u32),
    #[error("{0} is not a valid derivation path")]
    InvalidDerivationPath(String),
    #[error("The Trezor connection was closed while waiting for the device.")]
    ConnectionClosed,
    #[error("The Trezor device refused the request: {0}")]
    DeviceRejected(String),
    #[error("The Trezor device returned an invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("The Trezor device returned an invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Transaction error: {source}")]
    Transaction {
        #[from]
        source: stellar_trezor_tx::errors::Error,
    },
    #[error("Account oracle error: {0}")]
    Oracle(String),
    #[cfg(feature = "horizon")]
    #[error("Horizon request error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },
    #[error("Generic error: {0}")]
    Generic(String),
}
impl Error {
    pub fn generic(e: impl core::fmt::Display) -> Self {
        Self::Generic(e.to_string())
    }

    /// `true` if the transaction uses something the device cannot sign
    pub fn is_unsupported_feature(&self) -> bool {
        matches!(
            self,
            Error::Transaction {
                source: stellar_trezor_tx::errors::Error::UnsupportedFeature(_)
            }
        )
    }
}
