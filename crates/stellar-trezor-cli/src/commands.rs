use std::path::PathBuf;

use serde::Serialize;
use stellar_trezor_wallet::{
    errors::{Error, Result},
    ledger_tx::network_passphrase,
    oracle::AccountOracle,
    stellar_trezor_tx::{Capabilities, DeviceTransaction, Profile, TransitionalDescriptor, TxField},
    Account, HorizonOracle,
};

use crate::display::Displayable;

#[derive(Clone, Debug, clap::Args)]
pub struct CliGlobalArgs {
    /// Set the device capability profile used to decide what can be signed.
    #[arg(
        short, long,
        env = "STELLAR_TREZOR_CAPABILITIES",
        default_value_t = Profile::Current,
        global = true
    )]
    pub capabilities: Profile,
    /// Set the URL of the Horizon server used to look up accounts.
    #[arg(
        long,
        value_hint = clap::ValueHint::Url,
        env = "HORIZON_URL",
        default_value = "https://horizon.stellar.org",
        global = true
    )]
    pub horizon_url: String,
}

/// Top level cli sub-commands.
#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Convert a transaction descriptor (JSON) into the transaction sent to the Trezor device.
    /// {n}Fails with an explicit message if the device cannot sign it.
    Transform {
        /// The JSON file containing the transaction descriptor, "-" for stdin
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Display the derivation path of an account number (starting at 1) or validate a path
    Path {
        /// The account number or derivation path
        account: Account,
    },
    /// Display the capability table of the selected profile
    Capabilities,
    /// Display the last ledger effect of an account, or null if the account does not exist
    Activity {
        /// The account id (G...)
        account_id: String,
    },
}

#[derive(Clone, Debug, clap::Parser)]
/// Stellar Trezor CLI
///
/// stellar-trezor shows how Stellar transactions are presented to a Trezor device for signing.
#[command(
    author = option_env!("CARGO_PKG_AUTHORS").unwrap_or(""),
    version = option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
    about,
    long_about = None
)]
pub struct CliParser {
    #[clap(next_help_heading = Some("Global options"))]
    #[command(flatten)]
    pub gargs: CliGlobalArgs,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignPreview {
    #[serde(skip_serializing_if = "Option::is_none")]
    network_passphrase: Option<String>,
    transaction: DeviceTransaction,
}

fn read_descriptor(file: &PathBuf) -> Result<TransitionalDescriptor> {
    let json = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).map_err(Error::generic)?
    } else {
        std::fs::read_to_string(file)
            .map_err(|e| Error::generic(format!("Cannot read {}: {e}", file.as_path().display())))?
    };
    Ok(TransitionalDescriptor::from_json(&json)?)
}

impl CliParser {
    pub fn execute(self) -> Result<Box<dyn Displayable>> {
        let capabilities = Capabilities::for_profile(self.gargs.capabilities);
        match self.cmd {
            Command::Transform { file } => {
                let descriptor = read_descriptor(&file)?;
                let transaction = DeviceTransaction::try_from((&descriptor, &capabilities))?;
                let network_passphrase = descriptor
                    .fields
                    .get(&TxField::Network)
                    .and_then(|network| network.as_str())
                    .map(|network| network_passphrase(network).to_owned());
                Ok(Box::new(SignPreview {
                    network_passphrase,
                    transaction,
                }))
            }
            Command::Path { account } => Ok(Box::new(account.derivation_path()?)),
            Command::Capabilities => Ok(Box::new(capabilities)),
            Command::Activity { account_id } => {
                let oracle = HorizonOracle::new(self.gargs.horizon_url);
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(Error::generic)?;
                let last_effect = runtime.block_on(oracle.last_effect(&account_id))?;
                Ok(Box::new(last_effect))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_commands() {
        let cli = CliParser::try_parse_from(["stellar-trezor", "path", "3"]).unwrap();
        assert!(matches!(cli.cmd, Command::Path { account: Account::Number(3) }));
        assert_eq!(cli.gargs.capabilities, Profile::Current);

        let cli = CliParser::try_parse_from([
            "stellar-trezor",
            "--capabilities",
            "beta",
            "transform",
            "tx.json",
        ])
        .unwrap();
        assert_eq!(cli.gargs.capabilities, Profile::Beta);
        assert!(matches!(cli.cmd, Command::Transform { .. }));

        assert!(CliParser::try_parse_from(["stellar-trezor", "path", "0"]).is_err());
    }

    #[test]
    fn path_command() {
        let cli = CliParser::try_parse_from(["stellar-trezor", "path", "2"]).unwrap();
        assert!(cli.execute().is_ok());
        let cli = CliParser::try_parse_from(["stellar-trezor", "path", "m/44'/148'/x"]).unwrap();
        assert!(cli.execute().is_err_and(|e| match e {
            Error::InvalidDerivationPath(path) => path == "m/44'/148'/x",
            _ => unreachable!("Only InvalidDerivationPath errors can be raised"),
        }));
        let cli = CliParser::try_parse_from(["stellar-trezor", "path", "2147483650"]).unwrap();
        assert!(cli.execute().is_err_and(|e| match e {
            Error::AccountDerivationIndexOutOfBound(index) => index == 2147483649,
            _ => unreachable!("Only AccountDerivationIndexOutOfBound errors can be raised"),
        }));
    }

    #[test]
    fn transform_missing_file() {
        let cli =
            CliParser::try_parse_from(["stellar-trezor", "transform", "/nonexistent/tx.json"])
                .unwrap();
        assert!(cli.execute().is_err_and(|e| match e {
            Error::Generic(msg) => msg.starts_with("Cannot read /nonexistent/tx.json"),
            _ => unreachable!("Only Generic errors can be raised"),
        }));
    }
}
