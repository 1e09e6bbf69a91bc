use stellar_strkey::ed25519::PublicKey;

use crate::errors::{Error, Result};

/// Decode a `G...` account id into its raw ed25519 public key.
pub fn raw_public_key(account_id: &str) -> Result<[u8; 32]> {
    PublicKey::from_string(account_id)
        .map(|pk| pk.0)
        .map_err(|_| Error::invalid_field("account", format!("{account_id} is not an account id")))
}

/// The signature hint of an account: the last 4 bytes of its public key.
pub fn signature_hint(account_id: &str) -> Result<[u8; 4]> {
    let raw = raw_public_key(account_id)?;
    let mut hint = [0u8; 4];
    hint.copy_from_slice(&raw[28..]);
    Ok(hint)
}
