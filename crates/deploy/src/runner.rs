//! Delegation of the actual deployment to an external runner.

use std::{
    collections::BTreeMap,
    future::Future,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use anyhow::Context;
use serde::Deserialize;

use crate::network::NetworkConfig;

/// Contract addresses recorded by the runner, keyed `<module>#<contract>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct DeployedAddresses(pub BTreeMap<String, Address>);

impl DeployedAddresses {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Address of `contract`, matching either the full key or its part after `#`.
    pub fn get(&self, contract: &str) -> Option<Address> {
        self.0.get(contract).copied().or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.rsplit('#').next() == Some(contract))
                .map(|(_, addr)| *addr)
        })
    }
}

/// Deploys the implementation and its proxy on the given network.
///
/// The runner is opaque: it either succeeds and reports what it deployed, or fails.
pub trait DeploymentRunner: Send + Sync {
    fn run_deployment(
        &self,
        network: &NetworkConfig,
    ) -> impl Future<Output = anyhow::Result<DeployedAddresses>> + Send;
}

/// Default program used to invoke Hardhat.
pub fn default_runner_program() -> &'static str {
    if cfg!(windows) { "npx.cmd" } else { "npx" }
}

/// Runs `<program> hardhat ignition deploy --network <net> <module>` and reads the
/// addresses Ignition recorded for the chain.
#[derive(Debug, Clone)]
pub struct HardhatIgnitionRunner {
    pub program: String,
    pub module: PathBuf,
    pub deployments_dir: PathBuf,
    pub working_dir: Option<PathBuf>,
}

impl HardhatIgnitionRunner {
    pub fn new(
        program: impl Into<String>,
        module: impl Into<PathBuf>,
        deployments_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            module: module.into(),
            deployments_dir: deployments_dir.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn args(&self, runner_network: &str) -> Vec<String> {
        vec![
            "hardhat".to_string(),
            "ignition".to_string(),
            "deploy".to_string(),
            "--network".to_string(),
            runner_network.to_string(),
            self.module.display().to_string(),
        ]
    }

    /// `<deployments_dir>/chain-<id>/deployed_addresses.json`, relative to the working dir.
    pub fn addresses_file(&self, chain_id: u64) -> PathBuf {
        let relative = self
            .deployments_dir
            .join(format!("chain-{chain_id}"))
            .join("deployed_addresses.json");
        match &self.working_dir {
            Some(dir) => dir.join(relative),
            None => relative,
        }
    }
}

/// Read an Ignition `deployed_addresses.json`. A missing file yields no addresses.
pub async fn read_deployed_addresses(path: &Path) -> anyhow::Result<DeployedAddresses> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tracing::debug!(path = %path.display(), "No deployed addresses recorded");
        return Ok(DeployedAddresses::default());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

impl DeploymentRunner for HardhatIgnitionRunner {
    async fn run_deployment(&self, network: &NetworkConfig) -> anyhow::Result<DeployedAddresses> {
        let args = self.args(network.runner_network);
        tracing::info!(program = %self.program, args = %args.join(" "), "Running deployment");

        let mut command = tokio::process::Command::new(&self.program);
        command.args(&args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let status = command
            .status()
            .await
            .with_context(|| format!("Failed to start {}", self.program))?;

        if !status.success() {
            anyhow::bail!("{} {} exited with {}", self.program, args.join(" "), status);
        }

        read_deployed_addresses(&self.addresses_file(network.endpoint.chain_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_args() {
        let runner = HardhatIgnitionRunner::new(
            "npx",
            "ignition/modules/LetsPayHBAR.ts",
            "ignition/deployments",
        );
        assert_eq!(
            runner.args("hederaTestnet").join(" "),
            "hardhat ignition deploy --network hederaTestnet ignition/modules/LetsPayHBAR.ts"
        );
        assert_eq!(
            runner.addresses_file(296),
            PathBuf::from("ignition/deployments/chain-296/deployed_addresses.json")
        );
    }

    #[test]
    fn test_addresses_file_follows_working_dir() {
        let runner = HardhatIgnitionRunner::new("npx", "module.ts", "ignition/deployments")
            .with_working_dir("/srv/letspay");
        assert_eq!(
            runner.addresses_file(295),
            PathBuf::from("/srv/letspay/ignition/deployments/chain-295/deployed_addresses.json")
        );
    }

    #[tokio::test]
    async fn test_read_deployed_addresses() {
        let dir = TempDir::new("ignition").unwrap();
        let path = dir.path().join("deployed_addresses.json");

        assert!(read_deployed_addresses(&path).await.unwrap().is_empty());

        std::fs::write(
            &path,
            r#"{"LetsPayHBARModule#LetsPayHBAR_V1_UUPS":"0x5FbDB2315678afecb367f032d93F642f64180aa3","LetsPayHBARModule#ERC1967Proxy":"0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"}"#,
        )
        .unwrap();
        let addresses = read_deployed_addresses(&path).await.unwrap();
        assert_eq!(addresses.iter().count(), 2);
        assert_eq!(
            addresses.get("ERC1967Proxy"),
            Some("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".parse().unwrap())
        );
        assert_eq!(addresses.get("Missing"), None);
    }
}
