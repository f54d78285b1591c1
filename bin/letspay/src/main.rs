//! letspay deploys, upgrades and funds the LetsPay contracts on Hedera.

mod cli;

use std::process::ExitCode;

use alloy_core::primitives::U256;
use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use letspay_deploy::{
    DeployError, DeployOutcome, DeploymentExecutor, Environment, FundOutcome, InteractiveGate,
    NetworkConfig, RpcChainClient, StdinPrompter, ToolSettings, UpgradeOrchestrator,
    check_proxy_balance, fund_proxy,
    network::{self, NETWORK_VAR},
    units::format_native,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn signing_client(network: &NetworkConfig) -> Result<RpcChainClient> {
    let endpoint = &network.endpoint;
    Ok(RpcChainClient::new(endpoint.rpc_url.clone(), endpoint.chain_id)?
        .with_signer(network.signing_key.signer().clone()))
}

async fn run(cli: Cli) -> Result<()> {
    let settings = ToolSettings::load(cli.config.as_deref())?;

    let mut env = Environment::from_process();
    if let Some(network) = cli.network {
        env = env.with(NETWORK_VAR, network.to_string());
    }

    match cli.command {
        Command::Deploy => {
            let network = network::resolve(&env)?;
            let client = signing_client(&network)?;
            let executor =
                DeploymentExecutor::new(network, client, settings.artifacts(), settings.runner())
                    .with_contracts(settings.deploy_contracts());

            let mut gate = InteractiveGate::new(StdinPrompter);
            match executor.run(&mut gate).await? {
                DeployOutcome::Deployed(summary) => {
                    tracing::info!(
                        operator = %summary.operator,
                        spent = %format_native(summary.spent),
                        "Deployment complete"
                    );
                }
                DeployOutcome::Cancelled { stage } => {
                    tracing::info!(%stage, "Deployment cancelled, nothing was sent");
                }
            }
        }
        Command::Upgrade { proxy, contract } => {
            let network = network::resolve(&env)?;
            let proxy = proxy.or(settings.proxy_address).ok_or_else(|| {
                DeployError::Configuration(
                    "LETSPAY_PROXY_ADDRESS must be set to the proxy to upgrade".to_string(),
                )
            })?;
            let client = signing_client(&network)?;

            let report = UpgradeOrchestrator::new(client, settings.artifacts(), proxy)
                .with_endpoint(network.endpoint)
                .with_implementation(contract.unwrap_or(settings.upgrade_contract))
                .with_expected_credit(U256::from(settings.expected_credit))
                .run()
                .await?;

            tracing::info!(
                proxy = %report.state.proxy,
                previous = %report.state.current_implementation,
                implementation = %report.state.new_implementation,
                verified = report.sanity.is_passed(),
                "Upgrade complete"
            );
        }
        Command::Fund {
            proxy,
            default_amount,
        } => {
            let network = network::resolve(&env)?;
            let client = signing_client(&network)?;

            let mut gate = InteractiveGate::new(StdinPrompter);
            let proxy = proxy.or(settings.proxy_address);
            let default_amount = default_amount.unwrap_or(settings.fund_amount);
            let outcome = fund_proxy(&client, proxy, &default_amount, &mut gate).await?;
            if let FundOutcome::Cancelled = outcome {
                tracing::info!("Nothing was sent");
            }
        }
        Command::Balance { proxy } => {
            let endpoint = network::resolve_endpoint(&env)?;
            tracing::info!(network = %endpoint.name, "Checking proxy balance");
            let client = RpcChainClient::new(endpoint.rpc_url, endpoint.chain_id)?;
            check_proxy_balance(&client, proxy.or(settings.proxy_address)).await?;
        }
    }

    Ok(())
}
