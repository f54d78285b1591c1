use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Parser, Subcommand};
use letspay_deploy::NetworkKey;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "letspay")]
#[command(
    author,
    version,
    about = "Deploy, upgrade and fund the LetsPay contracts on Hedera"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "LETSPAY_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a TOML settings file. Defaults to `Letspay.toml` when present.
    #[arg(short, long, env = "LETSPAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// The network to use (testnet or mainnet). Overrides HEDERA_NETWORK.
    #[arg(short, long)]
    pub network: Option<NetworkKey>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Estimate costs and deploy the implementation and its proxy.
    Deploy,

    /// Deploy a new implementation and upgrade the proxy to it.
    Upgrade {
        /// The proxy to upgrade. Defaults to `proxy_address` from the settings.
        #[arg(long)]
        proxy: Option<Address>,

        /// The contract to deploy as the new implementation.
        #[arg(long)]
        contract: Option<String>,
    },

    /// Send HBAR to the proxy through `fundContract()`.
    Fund {
        /// The proxy to fund. Defaults to `proxy_address` from the settings.
        #[arg(long)]
        proxy: Option<Address>,

        /// The amount offered when the prompt is left empty. Defaults to `fund_amount`.
        #[arg(long)]
        default_amount: Option<String>,
    },

    /// Print the native balance of the proxy.
    Balance {
        /// The proxy to inspect. Defaults to `proxy_address` from the settings.
        #[arg(long)]
        proxy: Option<Address>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fund_defaults() {
        let cli = Cli::try_parse_from(["letspay", "--network", "Mainnet", "fund"]).unwrap();
        assert_eq!(cli.network, Some(NetworkKey::Mainnet));
        match cli.command {
            Command::Fund {
                proxy,
                default_amount,
            } => {
                assert_eq!(proxy, None);
                assert_eq!(default_amount, None);
            }
            _ => panic!("expected fund"),
        }
    }

    #[test]
    fn test_parse_upgrade_proxy() {
        let cli = Cli::try_parse_from([
            "letspay",
            "upgrade",
            "--proxy",
            "0xea700d3e8b8A076a390FBB8155B4834d1e3d6895",
            "--contract",
            "LetsPayHBAR_V2_UUPS",
        ])
        .unwrap();
        match cli.command {
            Command::Upgrade { proxy, contract } => {
                assert!(proxy.is_some());
                assert_eq!(contract.as_deref(), Some("LetsPayHBAR_V2_UUPS"));
            }
            _ => panic!("expected upgrade"),
        }
    }
}
