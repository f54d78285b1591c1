//! Network resolution from an environment-style key/value snapshot.
//!
//! Exactly one network is active per run. Each required value is looked up under its
//! network-specific variable first and then under the generic variable; empty values
//! count as missing. Resolution never touches the chain.

use std::{collections::BTreeMap, ffi::OsString, fmt, str::FromStr};

use alloy_core::primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use url::Url;

use crate::DeployError;

/// Selector variable for the active network.
pub const NETWORK_VAR: &str = "HEDERA_NETWORK";

/// Generic RPC URL variable, used when the network-specific one is unset.
pub const GENERIC_RPC_VAR: &str = "HEDERA_RPC_URL";

/// Generic signing key variable, used when the network-specific one is unset.
pub const GENERIC_KEY_VAR: &str = "HEDERA_PRIVATE_KEY";

/// Supported networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NetworkKey {
    #[default]
    Testnet,
    Mainnet,
}

impl NetworkKey {
    pub fn chain_id(self) -> u64 {
        match self {
            Self::Testnet => 296,
            Self::Mainnet => 295,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Testnet => "Hedera Testnet",
            Self::Mainnet => "Hedera Mainnet",
        }
    }

    /// Network name the external deployment runner knows this network by.
    pub fn runner_network(self) -> &'static str {
        match self {
            Self::Testnet => "hederaTestnet",
            Self::Mainnet => "hederaMainnet",
        }
    }

    pub fn rpc_var(self) -> &'static str {
        match self {
            Self::Testnet => "HEDERA_RPC_URL",
            Self::Mainnet => "HEDERA_MAINNET_RPC_URL",
        }
    }

    pub fn key_var(self) -> &'static str {
        match self {
            Self::Testnet => "HEDERA_PRIVATE_KEY",
            Self::Mainnet => "HEDERA_MAINNET_PRIVATE_KEY",
        }
    }
}

/// Snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build a snapshot from raw variables, skipping any that are not valid UTF-8.
    pub fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        vars.into_iter()
            .filter_map(|(name, value)| {
                let name = name.into_string().ok()?;
                match value.into_string() {
                    Ok(value) => Some((name, value)),
                    Err(_) => {
                        tracing::debug!(%name, "Ignoring non UTF-8 environment variable");
                        None
                    }
                }
            })
            .collect()
    }

    /// Set or replace a single variable.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Look up a variable, treating blank values as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Operator signing key. The key material never shows up in `Debug` output.
#[derive(Clone)]
pub struct SigningKey(PrivateKeySigner);

impl SigningKey {
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.0
    }

    pub fn address(&self) -> Address {
        self.0.address()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningKey").field(&self.address()).finish()
    }
}

impl FromStr for SigningKey {
    type Err = DeployError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        PrivateKeySigner::from_str(raw.trim()).map(Self).map_err(|_| {
            DeployError::Configuration(
                "signing key is not a valid secp256k1 private key".to_string(),
            )
        })
    }
}

/// Network and RPC endpoint, without any signing material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub key: NetworkKey,
    pub chain_id: u64,
    pub name: &'static str,
    pub rpc_url: Url,
}

/// Fully resolved network configuration for a run that sends transactions.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub endpoint: NetworkEndpoint,
    pub signing_key: SigningKey,
    pub runner_network: &'static str,
}

impl NetworkConfig {
    pub fn operator(&self) -> Address {
        self.signing_key.address()
    }
}

/// Select the active network from [`NETWORK_VAR`], defaulting to testnet.
pub fn select_network(env: &Environment) -> Result<NetworkKey, DeployError> {
    let Some(raw) = env.get(NETWORK_VAR) else {
        return Ok(NetworkKey::default());
    };

    NetworkKey::from_str(raw).map_err(|_| {
        let supported: Vec<String> = NetworkKey::iter().map(|k| k.to_string()).collect();
        DeployError::Configuration(format!(
            "unsupported network '{raw}' (expected one of: {})",
            supported.join(", ")
        ))
    })
}

/// Resolve the network and its RPC endpoint. The signing key is not required.
pub fn resolve_endpoint(env: &Environment) -> Result<NetworkEndpoint, DeployError> {
    let key = select_network(env)?;

    let raw_url = env
        .first_of(&[key.rpc_var(), GENERIC_RPC_VAR])
        .ok_or_else(|| {
            DeployError::Configuration(format!(
                "missing RPC URL for {key}: set {} or {GENERIC_RPC_VAR}",
                key.rpc_var()
            ))
        })?;

    let rpc_url = Url::parse(raw_url).map_err(|e| {
        DeployError::Configuration(format!("RPC URL '{raw_url}' is not a valid URL: {e}"))
    })?;

    Ok(NetworkEndpoint {
        key,
        chain_id: key.chain_id(),
        name: key.display_name(),
        rpc_url,
    })
}

/// Resolve the network, RPC endpoint and signing key.
pub fn resolve(env: &Environment) -> Result<NetworkConfig, DeployError> {
    let endpoint = resolve_endpoint(env)?;
    let key = endpoint.key;

    let signing_key = env
        .first_of(&[key.key_var(), GENERIC_KEY_VAR])
        .ok_or_else(|| {
            DeployError::Configuration(format!(
                "missing signing key for {key}: set {} or {GENERIC_KEY_VAR}",
                key.key_var()
            ))
        })?
        .parse::<SigningKey>()?;

    Ok(NetworkConfig {
        endpoint,
        signing_key,
        runner_network: key.runner_network(),
    })
}
