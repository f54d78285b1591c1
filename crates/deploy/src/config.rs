//! Tool settings: built-in defaults, then an optional TOML file, then `LETSPAY_*`
//! environment variables.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Address;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    DeployError,
    artifacts::HardhatArtifacts,
    contracts::DEFAULT_EXPECTED_CREDIT,
    executor::DeployContracts,
    fund::DEFAULT_FUND_AMOUNT,
    gate::validate_amount,
    runner::{HardhatIgnitionRunner, default_runner_program},
    upgrade::DEFAULT_UPGRADE_CONTRACT,
};

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "LETSPAY_";

/// Settings file read when no explicit path is given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "Letspay.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Hardhat `artifacts/` directory.
    pub artifacts_dir: PathBuf,
    pub implementation_contract: String,
    pub proxy_contract: String,
    /// Contract deployed by the upgrade flow.
    pub upgrade_contract: String,
    pub runner_program: String,
    /// Directory the runner is started in. Defaults to the current directory.
    pub project_dir: Option<PathBuf>,
    pub ignition_module: PathBuf,
    pub ignition_deployments_dir: PathBuf,
    /// Expected `CREDIT()` after an upgrade.
    pub expected_credit: u64,
    /// Proxy used by `upgrade`, `fund` and `balance` when none is passed on the command line.
    pub proxy_address: Option<Address>,
    /// Amount offered by the funding prompt.
    #[serde(deserialize_with = "amount_text")]
    pub fund_amount: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        let contracts = DeployContracts::default();
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
            implementation_contract: contracts.implementation,
            proxy_contract: contracts.proxy,
            upgrade_contract: DEFAULT_UPGRADE_CONTRACT.to_string(),
            runner_program: default_runner_program().to_string(),
            project_dir: None,
            ignition_module: PathBuf::from("ignition/modules/LetsPayHBAR.ts"),
            ignition_deployments_dir: PathBuf::from("ignition/deployments"),
            expected_credit: DEFAULT_EXPECTED_CREDIT,
            proxy_address: None,
            fund_amount: DEFAULT_FUND_AMOUNT.to_string(),
        }
    }
}

impl ToolSettings {
    /// Provider stack without the environment layer.
    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Toml::file(config_file))
    }

    /// Load settings. An explicitly requested file must exist.
    pub fn load(config_file: Option<&Path>) -> Result<Self, DeployError> {
        let path = match config_file {
            Some(path) if !path.exists() => {
                return Err(DeployError::Configuration(format!(
                    "settings file {} does not exist",
                    path.display()
                )));
            }
            Some(path) => path,
            None => Path::new(DEFAULT_CONFIG_FILE),
        };

        let settings = Self::from_figment(Self::figment(path).merge(Env::prefixed(ENV_PREFIX)))?;
        tracing::debug!(?settings, "Loaded tool settings");
        Ok(settings)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, DeployError> {
        let settings: Self = figment
            .extract()
            .map_err(|e| DeployError::Configuration(format!("invalid settings: {e}")))?;

        validate_amount(&settings.fund_amount).map_err(|e| {
            DeployError::Configuration(format!("invalid settings: fund_amount: {e}"))
        })?;
        Ok(settings)
    }

    pub fn artifacts(&self) -> HardhatArtifacts {
        HardhatArtifacts::new(&self.artifacts_dir)
    }

    pub fn deploy_contracts(&self) -> DeployContracts {
        DeployContracts {
            implementation: self.implementation_contract.clone(),
            proxy: self.proxy_contract.clone(),
        }
    }

    pub fn runner(&self) -> HardhatIgnitionRunner {
        let runner = HardhatIgnitionRunner::new(
            &self.runner_program,
            &self.ignition_module,
            &self.ignition_deployments_dir,
        );
        match &self.project_dir {
            Some(dir) => runner.with_working_dir(dir),
            None => runner,
        }
    }
}

/// Accept amounts written as TOML numbers or parsed as numbers from the environment.
fn amount_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct AmountVisitor;

    impl de::Visitor<'_> for AmountVisitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("an HBAR amount")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f32<E: de::Error>(self, v: f32) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let figment = ToolSettings::figment(Path::new("does-not-exist.toml"));
        let settings = ToolSettings::from_figment(figment).unwrap();
        assert_eq!(settings, ToolSettings::default());
        assert_eq!(settings.implementation_contract, "LetsPayHBAR_V1_UUPS");
        assert_eq!(settings.proxy_contract, "ERC1967Proxy");
        assert_eq!(settings.expected_credit, 20_000_000_000);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(ToolSettings::default())).merge(
            Toml::string(
                r#"
                artifacts_dir = "build/artifacts"
                upgrade_contract = "LetsPayHBAR_V3_UUPS"
                "#,
            ),
        );
        let settings = ToolSettings::from_figment(figment).unwrap();
        assert_eq!(settings.artifacts_dir, PathBuf::from("build/artifacts"));
        assert_eq!(settings.upgrade_contract, "LetsPayHBAR_V3_UUPS");
        assert_eq!(settings.proxy_contract, "ERC1967Proxy");
    }

    #[test]
    fn test_invalid_value_is_configuration_error() {
        let figment = Figment::from(Serialized::defaults(ToolSettings::default()))
            .merge(Toml::string("expected_credit = \"lots\""));
        assert!(matches!(
            ToolSettings::from_figment(figment),
            Err(DeployError::Configuration(_))
        ));
    }

    #[test]
    fn test_toml_proxy_and_fund_amount() {
        let figment = Figment::from(Serialized::defaults(ToolSettings::default())).merge(
            Toml::string(
                r#"
                proxy_address = "0xea700d3e8b8A076a390FBB8155B4834d1e3d6895"
                fund_amount = 2.5
                project_dir = "contracts-project"
                "#,
            ),
        );
        let settings = ToolSettings::from_figment(figment).unwrap();
        assert_eq!(
            settings.proxy_address,
            Some(alloy_core::primitives::address!(
                "ea700d3e8b8A076a390FBB8155B4834d1e3d6895"
            ))
        );
        assert_eq!(settings.fund_amount, "2.5");
        assert_eq!(
            settings.runner().addresses_file(296),
            PathBuf::from("contracts-project/ignition/deployments/chain-296/deployed_addresses.json")
        );
    }

    #[test]
    fn test_defaults_have_no_proxy() {
        let settings = ToolSettings::default();
        assert_eq!(settings.proxy_address, None);
        assert_eq!(settings.fund_amount, DEFAULT_FUND_AMOUNT);
    }

    #[test]
    fn test_env_overrides_fund_amount() {
        let figment = Figment::from(Serialized::defaults(ToolSettings::default()))
            .merge(Serialized::default("fund_amount", 25u64));
        let settings = ToolSettings::from_figment(figment).unwrap();
        assert_eq!(settings.fund_amount, "25");
    }

    #[test]
    fn test_invalid_fund_amount_is_configuration_error() {
        for amount in ["\"abc\"", "\"0\"", "-1"] {
            let figment = Figment::from(Serialized::defaults(ToolSettings::default()))
                .merge(Toml::string(&format!("fund_amount = {amount}")));
            assert!(
                matches!(
                    ToolSettings::from_figment(figment),
                    Err(DeployError::Configuration(_))
                ),
                "{amount} should be rejected"
            );
        }
    }

    #[test]
    fn test_malformed_proxy_address_is_configuration_error() {
        let figment = Figment::from(Serialized::defaults(ToolSettings::default()))
            .merge(Toml::string("proxy_address = \"0x1234\""));
        assert!(matches!(
            ToolSettings::from_figment(figment),
            Err(DeployError::Configuration(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_rejected() {
        assert!(matches!(
            ToolSettings::load(Some(Path::new("/nonexistent/letspay.toml"))),
            Err(DeployError::Configuration(_))
        ));
    }
}
