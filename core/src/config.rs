//! Configuration for the DeMine tasks
//!
//! Loaded once from a JSON file (optional) and passed by reference into
//! every task. Endpoints and directories can be overridden from the
//! environment.

use alloy_primitives::{address, Address};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::network::Network;

/// Tooling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `<network>/<coin>.json` state files
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// hardhat-deploy artifacts root (`<network>/<Contract>.json`)
    #[serde(default = "default_deployments_dir")]
    pub deployments_dir: PathBuf,

    /// Per-network overrides, keyed by network name
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,

    /// NFT metadata base URI per mined coin
    #[serde(default = "default_token_uri")]
    pub token_uri: BTreeMap<String, String>,

    /// NFT royalty in basis points
    #[serde(default = "default_royalty_bps")]
    pub royalty_bps: u16,

    /// Wrapped token metadata per coin (including `usd`)
    #[serde(default = "default_wrapped")]
    pub wrapped: BTreeMap<String, WrappedToken>,

    #[serde(default)]
    pub named_accounts: NamedAccounts,

    #[serde(default)]
    pub finalize: FinalizeConfig,

    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint (falls back to the network's public endpoint)
    pub rpc_url: Option<String>,

    /// Gas price in wei (falls back to the network default)
    pub gas_price: Option<u64>,

    /// Custodian receiving NFT royalties
    pub custodian: Option<Address>,

    /// Existing stablecoin to use instead of a wrapped USD clone
    pub payment_token: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedToken {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Indices into the node's `eth_accounts` list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedAccounts {
    #[serde(default)]
    pub deployer: usize,
    #[serde(default = "default_admin_index")]
    pub admin: usize,
    #[serde(default = "default_custodian_index")]
    pub custodian: usize,
    #[serde(default = "default_alchemist_index")]
    pub alchemist: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeConfig {
    /// First day ever finalized when the NFT has no watermark yet
    #[serde(default = "default_genesis")]
    pub genesis: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Per-request timeout (seconds)
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Receipt polling interval (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Give up waiting for a receipt after this long (seconds)
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            Network::Bsc.name().to_string(),
            NetworkConfig {
                custodian: Some(address!("0x427119f5080320Da94B78BB55d75fb48B708346e")),
                ..Default::default()
            },
        );

        Self {
            state_dir: default_state_dir(),
            deployments_dir: default_deployments_dir(),
            networks,
            token_uri: default_token_uri(),
            royalty_bps: default_royalty_bps(),
            wrapped: default_wrapped(),
            named_accounts: NamedAccounts::default(),
            finalize: FinalizeConfig::default(),
            rpc: RpcConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NamedAccounts {
    fn default() -> Self {
        Self {
            deployer: 0,
            admin: default_admin_index(),
            custodian: default_custodian_index(),
            alchemist: default_alchemist_index(),
        }
    }
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self { genesis: default_genesis() }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_rpc_timeout(),
            poll_interval_ms: default_poll_interval(),
            receipt_timeout_secs: default_receipt_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

impl Config {
    /// Load config from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        let config: Config = serde_json::from_str(&content)
            .context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path.as_ref(), json)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Load from `path` if it exists, defaults otherwise. Environment
    /// overrides are applied in both cases.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// `DEMINE_STATE_DIR` / `DEMINE_DEPLOYMENTS_DIR`
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("DEMINE_STATE_DIR") {
            if !v.trim().is_empty() {
                self.state_dir = PathBuf::from(v);
            }
        }
        if let Ok(v) = std::env::var("DEMINE_DEPLOYMENTS_DIR") {
            if !v.trim().is_empty() {
                self.deployments_dir = PathBuf::from(v);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.royalty_bps > 10_000 {
            anyhow::bail!("royalty_bps must be at most 10000, got {}", self.royalty_bps);
        }

        for name in self.networks.keys() {
            if name.parse::<Network>().is_err() {
                anyhow::bail!("Unknown network in config: {}", name);
            }
        }

        for (coin, token) in &self.wrapped {
            if token.decimals > 36 {
                anyhow::bail!("Wrapped {} decimals out of range: {}", coin, token.decimals);
            }
            if token.symbol.is_empty() {
                anyhow::bail!("Wrapped {} has an empty symbol", coin);
            }
        }

        if self.rpc.poll_interval_ms == 0 {
            anyhow::bail!("rpc.poll_interval_ms must be positive");
        }

        Ok(())
    }

    pub fn network(&self, network: Network) -> NetworkConfig {
        self.networks.get(network.name()).cloned().unwrap_or_default()
    }

    /// Endpoint resolution: env override, then config, then the public default.
    pub fn rpc_url(&self, network: Network) -> Result<String> {
        if let Ok(v) = std::env::var(network.rpc_env_var()) {
            if !v.trim().is_empty() {
                return Ok(v);
            }
        }
        self.network(network)
            .rpc_url
            .or_else(|| network.default_rpc_url().map(str::to_string))
            .with_context(|| {
                format!("No RPC endpoint for {} (set {})", network, network.rpc_env_var())
            })
    }

    pub fn gas_price(&self, network: Network) -> Option<u64> {
        self.network(network).gas_price.or_else(|| network.default_gas_price())
    }

    /// Coins an NFT can be cloned for.
    pub fn is_nft_coin(&self, coin: &str) -> bool {
        self.token_uri.contains_key(coin)
    }

    pub fn wrapped_token(&self, coin: &str) -> Option<&WrappedToken> {
        self.wrapped.get(coin)
    }
}

// Default value functions
fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_deployments_dir() -> PathBuf {
    PathBuf::from("deployments")
}

fn default_token_uri() -> BTreeMap<String, String> {
    ["btc", "eth", "fil"]
        .into_iter()
        .map(|coin| (coin.to_string(), format!("https://www.demine.com/nft/{}/", coin)))
        .collect()
}

fn default_royalty_bps() -> u16 {
    100
}

fn default_wrapped() -> BTreeMap<String, WrappedToken> {
    [
        ("usd", "DeMine Wrapped USD", "DPAY", 6),
        ("btc", "DeMine Wrapped BTC", "DBTC", 8),
        ("eth", "DeMine Wrapped ETH", "DETH", 18),
        ("fil", "DeMine Wrapped FIL", "DFIL", 18),
    ]
    .into_iter()
    .map(|(coin, name, symbol, decimals)| {
        (
            coin.to_string(),
            WrappedToken {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
            },
        )
    })
    .collect()
}

fn default_admin_index() -> usize {
    1
}

fn default_custodian_index() -> usize {
    2
}

fn default_alchemist_index() -> usize {
    3
}

fn default_genesis() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 2, 2).unwrap_or_default()
}

fn default_rpc_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    1_000
}

fn default_receipt_timeout() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.royalty_bps, 100);
        assert_eq!(config.named_accounts.admin, 1);
        assert_eq!(config.wrapped_token("usd").unwrap().decimals, 6);
        assert!(config.is_nft_coin("btc"));
        assert!(!config.is_nft_coin("usd"));
        assert_eq!(config.finalize.genesis, NaiveDate::from_ymd_opt(2022, 2, 2).unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bsc_custodian_default() {
        let config = Config::default();
        let custodian = config.network(Network::Bsc).custodian.unwrap();
        assert_eq!(
            custodian.to_string().to_lowercase(),
            "0x427119f5080320da94b78bb55d75fb48b708346e"
        );
        assert!(config.network(Network::BscDev).custodian.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{ "royalty_bps": 250 }"#).unwrap();
        assert_eq!(config.royalty_bps, 250);
        assert_eq!(config.state_dir, PathBuf::from("state"));
        assert_eq!(config.rpc.poll_interval_ms, 1_000);
        assert_eq!(config.token_uri.len(), 3);
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demine.json");

        let mut config = Config::default();
        config.royalty_bps = 42;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.royalty_bps, 42);
        assert_eq!(loaded.wrapped, config.wrapped);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.royalty_bps = 10_001;
        assert!(config.validate().is_err());
        config.royalty_bps = 100;

        config.networks.insert("mainnet".to_string(), NetworkConfig::default());
        assert!(config.validate().is_err());
        config.networks.remove("mainnet");

        config.rpc.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rpc_url_resolution() {
        let mut config = Config::default();
        assert_eq!(
            config.rpc_url(Network::Localhost).unwrap(),
            "http://127.0.0.1:8545"
        );

        config.networks.insert(
            "localhost".to_string(),
            NetworkConfig {
                rpc_url: Some("http://10.0.0.5:8545".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(config.rpc_url(Network::Localhost).unwrap(), "http://10.0.0.5:8545");
    }

    #[test]
    fn test_gas_price_falls_back_to_network() {
        let config = Config::default();
        assert_eq!(config.gas_price(Network::Bsc), Some(5_000_000_000));
        assert_eq!(config.gas_price(Network::Localhost), None);
    }
}
