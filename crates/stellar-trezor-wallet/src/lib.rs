//! Sign Stellar transactions with a Trezor device.
//!
//! ```ignore
//! let session = TrezorSession::new(transport);
//! session.register("example.org", "dev@example.org");
//! let public_key = session.connect(None).await?;
//! session.sign(&mut transaction).await?;
//! ```

pub mod errors;
pub mod ledger_tx;
pub mod oracle;
pub mod path;
pub mod session;
pub mod transport;

pub use stellar_trezor_tx;

pub use ledger_tx::{DecoratedSignature, DescribedTransaction, LedgerTransaction};
#[cfg(feature = "horizon")]
pub use oracle::HorizonOracle;
pub use oracle::{AccountEffect, AccountOracle};
pub use path::Account;
pub use session::{ScannedAccount, SessionEvent, TrezorSession};
pub use transport::{DeviceEvent, Transport, TransportResponse};
