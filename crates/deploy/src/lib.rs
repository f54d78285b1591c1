//! letspay-deploy - Deployment and upgrade orchestration for the LetsPay contracts.
//!
//! This crate resolves the target Hedera network, estimates what a fresh
//! implementation + ERC-1967 proxy deployment will cost, gates every state change behind
//! an operator confirmation, and drives the UUPS upgrade protocol.

mod error;
pub use error::DeployError;

pub mod artifacts;
pub use artifacts::{Artifact, ArtifactProvider, HardhatArtifacts};

pub mod balance;
pub use balance::check_proxy_balance;

pub mod chain;
pub use chain::{CallRequest, ChainClient, RpcChainClient, TransactionReceipt};

pub mod config;
pub use config::ToolSettings;

pub mod contracts;

pub mod estimate;
pub use estimate::{CostEstimator, DeploymentPlan, Sufficiency};

pub mod executor;
pub use executor::{DeployContracts, DeployOutcome, DeployStage, DeploymentExecutor};

pub mod fund;
pub use fund::{FundOutcome, fund_proxy};

pub mod gate;
pub use gate::{InteractiveGate, Prompter, ScriptedPrompter, StdinPrompter};

pub mod network;
pub use network::{Environment, NetworkConfig, NetworkEndpoint, NetworkKey};

pub mod predict;
pub use predict::predict_create_address;

pub mod report;

pub mod runner;
pub use runner::{DeployedAddresses, DeploymentRunner, HardhatIgnitionRunner};

pub mod units;

pub mod upgrade;
pub use upgrade::{SanityCheck, UpgradeOrchestrator, UpgradeReport};
