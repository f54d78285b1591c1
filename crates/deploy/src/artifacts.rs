//! Hardhat compilation artifacts.
//!
//! Layout: `<root>/contracts/<Source>.sol/<Contract>.json`, where each file carries at
//! least an `abi` array and a hex `bytecode` string.

use std::{
    future::Future,
    path::PathBuf,
};

use alloy_core::{json_abi::JsonAbi, primitives::Bytes};
use serde::Deserialize;

use crate::DeployError;

/// ABI and deployment bytecode of one contract.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

/// Source of compiled contracts.
pub trait ArtifactProvider: Send + Sync {
    /// Load the artifact for `contract`. Failures are never retried.
    fn load(&self, contract: &str) -> impl Future<Output = Result<Artifact, DeployError>> + Send;
}

#[derive(Deserialize)]
struct RawArtifact {
    abi: Option<JsonAbi>,
    bytecode: Option<String>,
}

/// Reads artifacts from a Hardhat `artifacts/` directory.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find `<Contract>.json`, preferring the `<Contract>.sol` source directory.
    async fn locate(&self, contract: &str) -> Result<PathBuf, DeployError> {
        let contracts_dir = self.root.join("contracts");
        let file_name = format!("{contract}.json");

        let direct = contracts_dir.join(format!("{contract}.sol")).join(&file_name);
        if tokio::fs::try_exists(&direct).await.unwrap_or(false) {
            return Ok(direct);
        }

        let mut entries = tokio::fs::read_dir(&contracts_dir).await.map_err(|e| {
            DeployError::artifact(
                contract,
                format!("cannot read {}: {e}", contracts_dir.display()),
            )
        })?;

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            DeployError::artifact(
                contract,
                format!("cannot list {}: {e}", contracts_dir.display()),
            )
        })? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sol") {
                candidates.push(path.join(&file_name));
            }
        }
        // Directory iteration order is platform dependent.
        candidates.sort();

        for candidate in candidates {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Ok(candidate);
            }
        }

        Err(DeployError::artifact(
            contract,
            format!("no {file_name} under {}", contracts_dir.display()),
        ))
    }
}

impl ArtifactProvider for HardhatArtifacts {
    async fn load(&self, contract: &str) -> Result<Artifact, DeployError> {
        let path = self.locate(contract).await?;
        tracing::debug!(contract, path = %path.display(), "Loading artifact");

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            DeployError::artifact(contract, format!("cannot read {}: {e}", path.display()))
        })?;

        parse_artifact(contract, &content)
    }
}

/// Parse the JSON body of an artifact file.
pub fn parse_artifact(contract: &str, content: &str) -> Result<Artifact, DeployError> {
    let raw: RawArtifact = serde_json::from_str(content)
        .map_err(|e| DeployError::artifact(contract, format!("malformed artifact: {e}")))?;

    let abi = raw
        .abi
        .ok_or_else(|| DeployError::artifact(contract, "missing abi"))?;

    let hex = raw
        .bytecode
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty() && *b != "0x")
        .ok_or_else(|| DeployError::artifact(contract, "missing bytecode"))?;

    let bytecode = hex
        .parse::<Bytes>()
        .map_err(|e| DeployError::artifact(contract, format!("bytecode is not hex: {e}")))?;

    Ok(Artifact { abi, bytecode })
}
