//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use delpho_chain::{Address, KeySource};
use delpho_core::constants::DEFAULT_WIZARD_SLIPPAGE;
use delpho_core::Network;
use delpho_sequencer::{LoopConfig, DEFAULT_STEP_TIMEOUT};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Config path used when neither `--config` nor `DELPHO_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "DELPHO_CONFIG";

/// Where the signing key is read from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KeyConfig {
    /// Hex key in an environment variable.
    Env {
        #[serde(default = "default_key_env")]
        var_name: String,
    },
    /// Hex key in a file (keep it 0600).
    File { path: PathBuf },
}

fn default_key_env() -> String {
    "DELPHO_PRIVATE_KEY".to_string()
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self::Env {
            var_name: default_key_env(),
        }
    }
}

impl From<&KeyConfig> for KeySource {
    fn from(cfg: &KeyConfig) -> Self {
        match cfg {
            KeyConfig::Env { var_name } => KeySource::EnvVar {
                var_name: var_name.clone(),
            },
            KeyConfig::File { path } => KeySource::File { path: path.clone() },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub network: Network,
    /// HyperEVM RPC endpoint. Defaults to the network's public RPC.
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Info API endpoint. Defaults to the network's public API.
    #[serde(default)]
    pub info_url: Option<String>,
    /// Loop executor contract.
    #[serde(default)]
    pub executor_address: Option<String>,
    /// Account whose state is read. Defaults to the signer's address.
    #[serde(default)]
    pub user_address: Option<String>,
    /// If set, the loaded key must derive this address.
    #[serde(default)]
    pub signer_address: Option<String>,
    #[serde(default)]
    pub key: KeyConfig,
    /// Default wizard slippage as a fraction.
    #[serde(default = "default_slippage")]
    pub slippage: Decimal,
    /// Per-step bound for loop-cycle steps, receipt wait included.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    #[serde(default)]
    pub loop_cycle: LoopConfig,
}

fn default_slippage() -> Decimal {
    DEFAULT_WIZARD_SLIPPAGE
}

fn default_step_timeout_secs() -> u64 {
    DEFAULT_STEP_TIMEOUT.as_secs()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            rpc_url: None,
            info_url: None,
            executor_address: None,
            user_address: None,
            signer_address: None,
            key: KeyConfig::default(),
            slippage: default_slippage(),
            step_timeout_secs: default_step_timeout_secs(),
            loop_cycle: LoopConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the config path: explicit path > `DELPHO_CONFIG` > default.
    pub fn resolve_path(explicit: Option<String>) -> String {
        explicit
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load from `path`, falling back to defaults when the default path is
    /// missing. An explicitly named file must exist.
    pub fn load(path: &str) -> AppResult<Self> {
        if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
            tracing::warn!(path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.slippage < Decimal::ZERO || self.slippage >= Decimal::ONE {
            return Err(AppError::Config(format!(
                "slippage must be in [0, 1), got {}",
                self.slippage
            )));
        }
        if self.step_timeout_secs == 0 {
            return Err(AppError::Config("step_timeout_secs must be positive".to_string()));
        }
        self.loop_cycle
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        for (name, value) in [
            ("executor_address", &self.executor_address),
            ("user_address", &self.user_address),
            ("signer_address", &self.signer_address),
        ] {
            if let Some(value) = value {
                parse_address(name, value)?;
            }
        }
        Ok(())
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.rpc_url())
    }

    pub fn info_url(&self) -> &str {
        self.info_url
            .as_deref()
            .unwrap_or_else(|| self.network.info_url())
    }

    pub fn executor_address(&self) -> AppResult<Address> {
        let value = self
            .executor_address
            .as_deref()
            .ok_or_else(|| AppError::Config("executor_address is not set".to_string()))?;
        parse_address("executor_address", value)
    }

    pub fn signer_address(&self) -> AppResult<Option<Address>> {
        self.signer_address
            .as_deref()
            .map(|value| parse_address("signer_address", value))
            .transpose()
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

fn parse_address(name: &str, value: &str) -> AppResult<Address> {
    value
        .parse()
        .map_err(|e| AppError::Config(format!("{name} {value:?} is not an address: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.rpc_url(), "https://rpc.hyperliquid.xyz/evm");
        assert_eq!(config.slippage, dec!(0.001));
        assert_eq!(config.step_timeout(), DEFAULT_STEP_TIMEOUT);
        assert!(config.executor_address().is_err());
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml(
            r#"
            network = "testnet"
            executor_address = "0x1111111111111111111111111111111111111111"
            user_address = "0x2222222222222222222222222222222222222222"
            slippage = "0.01"
            step_timeout_secs = 30

            [key]
            source = "file"
            path = "/etc/delpho/key"

            [loop_cycle]
            target_loop_value = 200000000
            short_leverage = "2"
            "#,
        )
        .unwrap();

        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.info_url(), "https://api.hyperliquid-testnet.xyz/info");
        assert_eq!(
            config.executor_address().unwrap(),
            "0x1111111111111111111111111111111111111111"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(config.slippage, dec!(0.01));
        assert_eq!(config.step_timeout(), Duration::from_secs(30));
        assert_eq!(
            KeySource::from(&config.key),
            KeySource::File {
                path: PathBuf::from("/etc/delpho/key")
            }
        );
        assert_eq!(config.loop_cycle.target_loop_value, 200_000_000);
        assert_eq!(config.loop_cycle.short_leverage, dec!(2));
        assert_eq!(config.loop_cycle.swap_fraction, dec!(1));
    }

    #[test]
    fn test_default_key_source() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(
            KeySource::from(&config.key),
            KeySource::EnvVar {
                var_name: "DELPHO_PRIVATE_KEY".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(AppConfig::from_toml("slippage = \"1.5\"").is_err());
        assert!(AppConfig::from_toml("executor_address = \"0x12\"").is_err());
        assert!(AppConfig::from_toml("step_timeout_secs = 0").is_err());
        assert!(AppConfig::from_toml("[loop_cycle]\nswap_fraction = \"0\"").is_err());
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        assert_eq!(
            AppConfig::resolve_path(Some("custom.toml".to_string())),
            "custom.toml"
        );
    }
}
