//! Proxy upgrade protocol.
//!
//! The new implementation is deployed first. The upgrade is only submitted once the
//! proxy owner is confirmed to be the deployer, and the implementation slot is read back
//! afterwards to prove the switch happened.

use alloy_core::{
    primitives::{Address, B256, U256},
    sol_types::SolCall,
};
use anyhow::Context;
use strum::{Display, EnumCount};

use crate::{
    DeployError,
    artifacts::ArtifactProvider,
    chain::{CallRequest, ChainClient, TransactionReceipt, slot_to_address},
    contracts::{DEFAULT_EXPECTED_CREDIT, ILetsPay, IMPLEMENTATION_SLOT},
    network::NetworkEndpoint,
};

/// Default contract the proxy is upgraded to.
pub const DEFAULT_UPGRADE_CONTRACT: &str = "LetsPayHBAR_V2_UUPS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumCount)]
#[strum(serialize_all = "kebab-case")]
pub enum UpgradeStage {
    DeployNewImplementation,
    ReadCurrentImplementationSlot,
    ReadOwner,
    AuthorizeCheck,
    SubmitUpgrade,
    AwaitConfirmation,
    ReadNewImplementationSlot,
    SanityCheckConstant,
}

impl UpgradeStage {
    pub fn marker(self) -> String {
        format!("[{}/{}]", self as usize + 1, Self::COUNT)
    }
}

/// Everything observed about the proxy during an upgrade. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUpgradeState {
    pub proxy: Address,
    pub current_implementation: Address,
    pub owner: Address,
    pub new_implementation: Address,
    pub post_upgrade_implementation: Address,
}

/// Result of reading `CREDIT()` through the upgraded proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanityCheck {
    Passed,
    Mismatch { expected: U256, actual: U256 },
    /// The call failed or returned undecodable data.
    Unavailable(String),
}

impl SanityCheck {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

#[derive(Debug, Clone)]
pub struct UpgradeReport {
    pub state: ProxyUpgradeState,
    pub deployment: TransactionReceipt,
    pub upgrade: TransactionReceipt,
    pub sanity: SanityCheck,
}

pub struct UpgradeOrchestrator<C, A> {
    client: C,
    artifacts: A,
    proxy: Address,
    implementation: String,
    expected_credit: U256,
    endpoint: Option<NetworkEndpoint>,
}

impl<C, A> UpgradeOrchestrator<C, A>
where
    C: ChainClient,
    A: ArtifactProvider,
{
    pub fn new(client: C, artifacts: A, proxy: Address) -> Self {
        Self {
            client,
            artifacts,
            proxy,
            implementation: DEFAULT_UPGRADE_CONTRACT.to_string(),
            expected_credit: U256::from(DEFAULT_EXPECTED_CREDIT),
            endpoint: None,
        }
    }

    /// Refuse to run against an RPC endpoint serving a different chain.
    pub fn with_endpoint(mut self, endpoint: NetworkEndpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_implementation(mut self, contract: impl Into<String>) -> Self {
        self.implementation = contract.into();
        self
    }

    pub fn with_expected_credit(mut self, expected: U256) -> Self {
        self.expected_credit = expected;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn read_implementation_slot(&self) -> Result<Address, DeployError> {
        let word: B256 = self
            .client
            .get_storage_at(self.proxy, IMPLEMENTATION_SLOT)
            .await
            .context("Failed to read the implementation slot")
            .map_err(DeployError::Chain)?;
        Ok(slot_to_address(word))
    }

    /// Submit a transaction and wait for it to be mined successfully.
    async fn transact(
        &self,
        request: CallRequest,
        what: &str,
    ) -> Result<TransactionReceipt, DeployError> {
        let hash = self
            .client
            .send_transaction(request)
            .await
            .with_context(|| format!("Failed to submit {what}"))
            .map_err(DeployError::Chain)?;
        tracing::info!(tx = %hash, "Submitted {what}");

        let receipt = self
            .client
            .wait_for_receipt(hash)
            .await
            .with_context(|| format!("Failed to confirm {what}"))
            .map_err(DeployError::Chain)?;
        if !receipt.status {
            return Err(DeployError::chain_msg(format!("{what} {hash} reverted")));
        }
        Ok(receipt)
    }

    pub async fn run(&self) -> Result<UpgradeReport, DeployError> {
        let deployer = self.client.sender().ok_or_else(|| {
            DeployError::Configuration("upgrading requires a signing key".to_string())
        })?;
        tracing::info!(proxy = %self.proxy, deployer = %deployer, "Upgrading proxy");

        if let Some(endpoint) = &self.endpoint {
            let chain_id = self.client.chain_id().await.map_err(DeployError::Chain)?;
            if chain_id != endpoint.chain_id {
                return Err(DeployError::Configuration(format!(
                    "RPC endpoint reports chain id {chain_id}, expected {} for {}",
                    endpoint.chain_id, endpoint.name
                )));
            }
        }

        let stage = UpgradeStage::DeployNewImplementation;
        tracing::info!(
            step = %stage.marker(),
            contract = %self.implementation,
            "Deploying new implementation"
        );
        let artifact = self.artifacts.load(&self.implementation).await?;
        let deployment = self
            .transact(
                CallRequest::deploy(deployer, artifact.bytecode),
                "implementation deployment",
            )
            .await?;
        let new_implementation = deployment.contract_address.ok_or_else(|| {
            DeployError::chain_msg("deployment receipt carries no contract address")
        })?;
        tracing::info!(address = %new_implementation, "New implementation deployed");

        let stage = UpgradeStage::ReadCurrentImplementationSlot;
        let current_implementation = self.read_implementation_slot().await?;
        tracing::info!(
            step = %stage.marker(),
            implementation = %current_implementation,
            "Current implementation"
        );

        let stage = UpgradeStage::ReadOwner;
        let data = self
            .client
            .call(&CallRequest::call(
                deployer,
                self.proxy,
                ILetsPay::ownerCall {}.abi_encode(),
            ))
            .await
            .context("Failed to call owner()")
            .map_err(DeployError::Chain)?;
        let owner = ILetsPay::ownerCall::abi_decode_returns(&data)
            .context("Failed to decode owner()")
            .map_err(DeployError::Chain)?;
        tracing::info!(step = %stage.marker(), owner = %owner, "Proxy owner");

        let stage = UpgradeStage::AuthorizeCheck;
        if owner != deployer {
            tracing::error!(
                step = %stage.marker(),
                owner = %owner,
                deployer = %deployer,
                "Deployer is not the owner"
            );
            return Err(DeployError::Authorization { owner, deployer });
        }

        let stage = UpgradeStage::SubmitUpgrade;
        tracing::info!(
            step = %stage.marker(),
            new_implementation = %new_implementation,
            "Submitting upgrade"
        );
        let call = ILetsPay::upgradeToCall {
            newImplementation: new_implementation,
        };
        let upgrade = self
            .transact(CallRequest::call(deployer, self.proxy, call.abi_encode()), "upgrade")
            .await?;
        tracing::info!(
            step = %UpgradeStage::AwaitConfirmation.marker(),
            tx = %upgrade.transaction_hash,
            block = ?upgrade.block_number,
            "Upgrade confirmed"
        );

        let stage = UpgradeStage::ReadNewImplementationSlot;
        let post_upgrade_implementation = self.read_implementation_slot().await?;
        tracing::info!(
            step = %stage.marker(),
            implementation = %post_upgrade_implementation,
            "Implementation after upgrade"
        );
        if post_upgrade_implementation != new_implementation {
            return Err(DeployError::chain_msg(format!(
                "implementation slot holds {post_upgrade_implementation} after upgrade, \
                 expected {new_implementation}"
            )));
        }

        let stage = UpgradeStage::SanityCheckConstant;
        let sanity = self.sanity_check(deployer).await;
        match &sanity {
            SanityCheck::Passed => {
                tracing::info!(step = %stage.marker(), "Upgrade verified");
            }
            SanityCheck::Mismatch { expected, actual } => {
                tracing::warn!(
                    step = %stage.marker(),
                    %expected,
                    %actual,
                    "CREDIT does not match the expected value"
                );
            }
            SanityCheck::Unavailable(reason) => {
                tracing::warn!(step = %stage.marker(), reason = %reason, "Could not read CREDIT");
            }
        }

        Ok(UpgradeReport {
            state: ProxyUpgradeState {
                proxy: self.proxy,
                current_implementation,
                owner,
                new_implementation,
                post_upgrade_implementation,
            },
            deployment,
            upgrade,
            sanity,
        })
    }

    async fn sanity_check(&self, from: Address) -> SanityCheck {
        let request = CallRequest::call(from, self.proxy, ILetsPay::CREDITCall {}.abi_encode());
        let actual = match self.client.call(&request).await {
            Ok(data) => match ILetsPay::CREDITCall::abi_decode_returns(&data) {
                Ok(value) => value,
                Err(e) => return SanityCheck::Unavailable(e.to_string()),
            },
            Err(e) => return SanityCheck::Unavailable(format!("{e:#}")),
        };

        if actual == self.expected_credit {
            SanityCheck::Passed
        } else {
            SanityCheck::Mismatch {
                expected: self.expected_credit,
                actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_markers() {
        assert_eq!(UpgradeStage::DeployNewImplementation.marker(), "[1/8]");
        assert_eq!(UpgradeStage::SanityCheckConstant.marker(), "[8/8]");
    }

    #[test]
    fn test_sanity_check_passed() {
        assert!(SanityCheck::Passed.is_passed());
        assert!(!SanityCheck::Unavailable("boom".into()).is_passed());
    }
}
