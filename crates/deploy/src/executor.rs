//! Fresh deployment flow: checks, estimates, confirms, then hands off to the runner.

use alloy_core::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use strum::{Display, EnumCount};

use crate::{
    DeployError,
    artifacts::ArtifactProvider,
    chain::ChainClient,
    contracts::ILetsPay,
    estimate::{CostEstimator, DeploymentPlan, Sufficiency},
    gate::{InteractiveGate, Prompter},
    network::NetworkConfig,
    predict::predict_create_address,
    report::{addresses_table, plan_table},
    runner::{DeployedAddresses, DeploymentRunner},
    units::format_native,
};

/// Steps of the deploy flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount)]
#[strum(serialize_all = "kebab-case")]
pub enum DeployStage {
    ResolveNetwork,
    LoadArtifacts,
    CheckOperatorBalance,
    ConfirmProceed,
    EstimateCosts,
    ReportSufficiency,
    ConfirmDeploy,
    DelegateDeployment,
}

impl DeployStage {
    /// `[n/total]` marker shown in progress logs.
    pub fn marker(self) -> String {
        format!("[{}/{}]", self as usize + 1, Self::COUNT)
    }
}

/// When an operator balance was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum BalancePoint {
    BeforeEstimation,
    BeforeExecution,
    AfterExecution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub point: BalancePoint,
    pub balance: U256,
}

/// Contract names looked up through the artifact provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployContracts {
    pub implementation: String,
    pub proxy: String,
}

impl Default for DeployContracts {
    fn default() -> Self {
        Self {
            implementation: "LetsPayHBAR_V1_UUPS".to_string(),
            proxy: "ERC1967Proxy".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeploySummary {
    pub operator: Address,
    pub plan: DeploymentPlan,
    pub sufficiency: Sufficiency,
    pub snapshots: Vec<BalanceSnapshot>,
    pub deployed: DeployedAddresses,
    /// Balance difference across the delegated deployment.
    pub spent: U256,
}

#[derive(Debug, Clone)]
pub enum DeployOutcome {
    Deployed(Box<DeploySummary>),
    /// The operator declined at a confirmation step. Nothing was sent.
    Cancelled { stage: DeployStage },
}

pub struct DeploymentExecutor<C, A, R> {
    network: NetworkConfig,
    client: C,
    artifacts: A,
    runner: R,
    contracts: DeployContracts,
}

impl<C, A, R> DeploymentExecutor<C, A, R>
where
    C: ChainClient,
    A: ArtifactProvider,
    R: DeploymentRunner,
{
    pub fn new(network: NetworkConfig, client: C, artifacts: A, runner: R) -> Self {
        Self {
            network,
            client,
            artifacts,
            runner,
            contracts: DeployContracts::default(),
        }
    }

    pub fn with_contracts(mut self, contracts: DeployContracts) -> Self {
        self.contracts = contracts;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    async fn balance(&self, point: BalancePoint) -> Result<BalanceSnapshot, DeployError> {
        let balance = self
            .client
            .get_balance(self.network.operator())
            .await
            .map_err(DeployError::Chain)?;
        tracing::debug!(%point, balance = %format_native(balance), "Sampled operator balance");
        Ok(BalanceSnapshot { point, balance })
    }

    /// Run the flow to completion or cancellation.
    pub async fn run<P: Prompter>(
        &self,
        gate: &mut InteractiveGate<P>,
    ) -> Result<DeployOutcome, DeployError> {
        let operator = self.network.operator();
        let endpoint = &self.network.endpoint;
        let mut snapshots = Vec::with_capacity(3);

        let stage = DeployStage::ResolveNetwork;
        tracing::info!(
            step = %stage.marker(),
            network = %endpoint.name,
            rpc = %endpoint.rpc_url,
            operator = %operator,
            "Resolved network"
        );
        let chain_id = self.client.chain_id().await.map_err(DeployError::Chain)?;
        if chain_id != endpoint.chain_id {
            return Err(DeployError::Configuration(format!(
                "RPC endpoint reports chain id {chain_id}, expected {} for {}",
                endpoint.chain_id, endpoint.name
            )));
        }

        let stage = DeployStage::LoadArtifacts;
        tracing::info!(
            step = %stage.marker(),
            implementation = %self.contracts.implementation,
            proxy = %self.contracts.proxy,
            "Loading artifacts"
        );
        let implementation = self.artifacts.load(&self.contracts.implementation).await?;
        let proxy = self.artifacts.load(&self.contracts.proxy).await?;
        if implementation.abi.function("initialize").is_none() {
            return Err(DeployError::artifact(
                &self.contracts.implementation,
                "abi has no initialize function",
            ));
        }

        let stage = DeployStage::CheckOperatorBalance;
        let before = self.balance(BalancePoint::BeforeEstimation).await?;
        snapshots.push(before);
        tracing::info!(
            step = %stage.marker(),
            operator = %operator,
            balance = %format_native(before.balance),
            "Operator balance"
        );

        let stage = DeployStage::ConfirmProceed;
        let question = format!("{} Continue with deployment preparation?", stage.marker());
        if !gate.confirm(&question)? {
            tracing::info!("Aborting before deployment preparation");
            return Ok(DeployOutcome::Cancelled { stage });
        }

        let stage = DeployStage::EstimateCosts;
        tracing::info!(
            step = %stage.marker(),
            "Estimating required balance for deployment transactions"
        );
        let nonce = self
            .client
            .get_transaction_count(operator)
            .await
            .map_err(DeployError::Chain)?;
        let predicted = predict_create_address(operator, nonce);
        let init_data: Bytes = ILetsPay::initializeCall { owner: operator }.abi_encode().into();
        tracing::debug!(nonce, predicted = %predicted, "Predicted implementation address");

        let plan = CostEstimator::new(&self.client)
            .estimate(
                operator,
                predicted,
                init_data,
                &implementation.bytecode,
                &proxy.bytecode,
            )
            .await?;

        let stage = DeployStage::ReportSufficiency;
        let current = self.balance(BalancePoint::BeforeExecution).await?;
        snapshots.push(current);
        tracing::info!(
            step = %stage.marker(),
            "Cost breakdown\n{}",
            plan_table(&plan, current.balance)
        );

        let sufficiency = plan.sufficiency(current.balance);
        match sufficiency {
            Sufficiency::Met { .. } => {
                tracing::info!("Operator balance meets the required threshold");
            }
            Sufficiency::Short { deficit } => {
                tracing::warn!(
                    deficit = %format_native(deficit),
                    "Operator balance is short; top up before deploying"
                );
            }
        }

        let stage = DeployStage::ConfirmDeploy;
        let question = format!("{} Proceed with the deployment now?", stage.marker());
        if !gate.confirm(&question)? {
            tracing::info!("Deployment cancelled by operator");
            return Ok(DeployOutcome::Cancelled { stage });
        }

        let stage = DeployStage::DelegateDeployment;
        tracing::info!(
            step = %stage.marker(),
            runner_network = %self.network.runner_network,
            "Delegating deployment"
        );
        let deployed = self
            .runner
            .run_deployment(&self.network)
            .await
            .map_err(DeployError::Runner)?;

        let after = self.balance(BalancePoint::AfterExecution).await?;
        snapshots.push(after);
        let spent = current.balance.saturating_sub(after.balance);
        tracing::info!(
            spent = %format_native(spent),
            balance = %format_native(after.balance),
            "Deployment finished"
        );
        if !deployed.is_empty() {
            tracing::info!("Deployed contracts\n{}", addresses_table(&deployed));
        }

        Ok(DeployOutcome::Deployed(Box::new(DeploySummary {
            operator,
            plan,
            sufficiency,
            snapshots,
            deployed,
            spent,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_markers() {
        assert_eq!(DeployStage::ResolveNetwork.marker(), "[1/8]");
        assert_eq!(DeployStage::DelegateDeployment.marker(), "[8/8]");
        assert_eq!(DeployStage::ConfirmDeploy.to_string(), "confirm-deploy");
    }
}
