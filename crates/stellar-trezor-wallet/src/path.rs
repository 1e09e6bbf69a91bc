use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// BIP-44 prefix of every Stellar account
pub const BIP_PATH: &str = "m/44'/148'";
/// Largest index of a hardened derivation step
pub const MAX_DERIVATION_INDEX: u32 = 0x7FFF_FFFF;

fn re_derivation_path() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^m(?:/[0-9]{1,10}['h]?)*$").unwrap())
}

fn valid_derivation_path(path: &str) -> bool {
    re_derivation_path().is_match(path)
        && path
            .split('/')
            .skip(1)
            .map(|step| step.trim_end_matches(&['\'', 'h'][..]).parse::<u32>())
            .all(|index| index.is_ok_and(|index| index <= MAX_DERIVATION_INDEX))
}

/// The account to use on the device: either an account number, starting at 1
/// like the Trezor interface lists them, or an explicit derivation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Account {
    Number(u32),
    Path(String),
}

impl Default for Account {
    fn default() -> Self {
        Account::Number(1)
    }
}

impl Account {
    /// Account 1 is `m/44'/148'/0'`.
    pub fn derivation_path(&self) -> Result<String> {
        match self {
            Account::Number(0) => Err(Error::InvalidAccountNumber(0)),
            Account::Number(n) => {
                let index = n - 1;
                if index > MAX_DERIVATION_INDEX {
                    return Err(Error::AccountDerivationIndexOutOfBound(index));
                }
                Ok(format!("{BIP_PATH}/{index}'"))
            }
            Account::Path(path) => {
                if valid_derivation_path(path) {
                    Ok(path.clone())
                } else {
                    Err(Error::InvalidDerivationPath(path.clone()))
                }
            }
        }
    }
}

impl FromStr for Account {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.parse::<i64>() {
            Ok(n) if n < 1 => Err(Error::InvalidAccountNumber(n)),
            Ok(n) => u32::try_from(n)
                .map(Account::Number)
                .map_err(|_| Error::InvalidDerivationPath(s.to_owned())),
            Err(_) => Ok(Account::Path(s.to_owned())),
        }
    }
}

impl From<u32> for Account {
    fn from(value: u32) -> Self {
        Account::Number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_numbers() {
        assert_eq!(Account::default().derivation_path().unwrap(), "m/44'/148'/0'");
        assert_eq!(Account::Number(3).derivation_path().unwrap(), "m/44'/148'/2'");
        assert!(Account::Number(0)
            .derivation_path()
            .is_err_and(|e| matches!(e, Error::InvalidAccountNumber(0))));
    }

    #[test]
    fn account_number_bound() {
        assert_eq!(
            Account::Number(MAX_DERIVATION_INDEX + 1).derivation_path().unwrap(),
            "m/44'/148'/2147483647'"
        );
        for n in [MAX_DERIVATION_INDEX + 2, u32::MAX] {
            assert!(Account::Number(n)
                .derivation_path()
                .is_err_and(|e| match e {
                    Error::AccountDerivationIndexOutOfBound(index) => index == n - 1,
                    _ => unreachable!("Only AccountDerivationIndexOutOfBound errors can be raised"),
                }));
        }
    }

    #[test]
    fn explicit_path_index_bound() {
        assert!(Account::Path("m/44'/148'/2147483647'".to_owned())
            .derivation_path()
            .is_ok());
        for path in ["m/44'/148'/2147483648'", "m/44'/148'/4294967296'", "m/44'/99999999999"] {
            assert!(Account::Path(path.to_owned())
                .derivation_path()
                .is_err_and(|e| matches!(e, Error::InvalidDerivationPath(p) if p == path)));
        }
    }

    #[test]
    fn explicit_paths() {
        assert_eq!(
            Account::Path("m/44'/148'/7'".to_owned()).derivation_path().unwrap(),
            "m/44'/148'/7'"
        );
        assert!(Account::Path("44'/148'".to_owned()).derivation_path().is_err());
        assert!(Account::Path("m/44'/abc".to_owned()).derivation_path().is_err());
    }

    #[test]
    fn from_str() {
        assert_eq!("2".parse::<Account>().unwrap(), Account::Number(2));
        assert_eq!(
            "m/44'/148'/1'".parse::<Account>().unwrap(),
            Account::Path("m/44'/148'/1'".to_owned())
        );
        assert!("0"
            .parse::<Account>()
            .is_err_and(|e| matches!(e, Error::InvalidAccountNumber(0))));
        assert!("-3"
            .parse::<Account>()
            .is_err_and(|e| matches!(e, Error::InvalidAccountNumber(-3))));
    }
}
