//! Error kinds surfaced by the deployment and upgrade flows.

use alloy_core::primitives::Address;
use thiserror::Error;

/// Every fatal failure a flow can end with.
///
/// Operator cancellation is not an error; flows report it through their outcome type.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Unsupported network, missing RPC URL or key, malformed URL or key.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A compilation artifact is missing, unreadable, or lacks its ABI or bytecode.
    #[error("artifact error for {contract}: {reason}")]
    Artifact { contract: String, reason: String },

    /// One of the cost probes failed.
    #[error("gas estimation failed")]
    Estimation(#[source] anyhow::Error),

    /// Operator input that does not satisfy its format.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The deployer is not the proxy owner.
    #[error("deployer {deployer} is not the proxy owner ({owner})")]
    Authorization { owner: Address, deployer: Address },

    /// A chain read or write failed, or the chain reported an unexpected state.
    #[error("chain interaction failed")]
    Chain(#[source] anyhow::Error),

    /// The external deployment runner failed.
    #[error("deployment runner failed")]
    Runner(#[source] anyhow::Error),

    /// Reading operator input failed.
    #[error("failed to read operator input")]
    Prompt(#[source] std::io::Error),
}

impl DeployError {
    pub(crate) fn artifact(contract: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Artifact {
            contract: contract.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a message into a chain error.
    pub(crate) fn chain_msg(msg: impl std::fmt::Display) -> Self {
        Self::Chain(anyhow::anyhow!("{msg}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_message_names_both_addresses() {
        let err = DeployError::Authorization {
            owner: Address::repeat_byte(0x11),
            deployer: Address::repeat_byte(0x22),
        };
        let msg = err.to_string();
        assert!(msg.contains("0x1111111111111111111111111111111111111111"));
        assert!(msg.contains("0x2222222222222222222222222222222222222222"));
    }

    #[test]
    fn test_chain_error_keeps_source_chain() {
        let err = DeployError::Chain(anyhow::anyhow!("connection refused").context("eth_call"));
        let rendered = format!("{:#}", anyhow::Error::from(err));
        assert!(rendered.contains("chain interaction failed"));
        assert!(rendered.contains("eth_call"));
        assert!(rendered.contains("connection refused"));
    }
}
