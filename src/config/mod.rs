//! Configuration system - TOML schema, loading, and access helpers
//!
//! The configuration is the single source of truth for network endpoints,
//! venue credentials, the attestation signer and fee policy. It is loaded
//! once at startup into a global cell; all values are plain data and never
//! mutated by the core at runtime.

use crate::errors::{LendingError, LendingResult};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Per-network chain access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Human-readable network name, e.g. "mainnet" or "mumbai"
    pub name: String,
    pub network_id: u64,
    pub rpc_url: String,
    /// Address of the on-chain control-plane contract that owns the
    /// authoritative accrual function
    pub control_plane: String,
    /// Designated reserve pool used as routing fallback on this network
    pub reserve_pool: Option<String>,
    /// Native currency symbol, keys the fee policy table
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Base-unit decimals of the native currency
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_currency() -> String {
    "ETH".to_string()
}

fn default_decimals() -> u32 {
    18
}

/// Fixed stub valuation for one reserved test-collection identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticValuationEntry {
    /// Venue-specific collection id the stub applies to
    pub collection_id: String,
    /// Stub value, decimal string in whole currency units (e.g. "2.5")
    pub value: String,
    /// Stub 24h reference value, same format
    pub value_24hr: String,
}

/// Valuation venue configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub opensea_api_key: Option<String>,
    pub nftbank_api_key: Option<String>,
    /// Explicit synthetic-valuation gate for non-production networks. When
    /// false the stub table is never consulted, regardless of collection ids.
    pub synthetic: bool,
    pub synthetic_values: Vec<SyntheticValuationEntry>,
}

/// Attestation signer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Process-wide ed25519 signing key, bs58-encoded (32-byte seed or
    /// 64-byte keypair) or a `[1,2,...]` byte array string
    pub attestation_key: Option<String>,
    /// Attestation validity horizon in blocks
    pub horizon_blocks: u64,
}

/// Fee policy entry for one currency. Applied to pool versions >= 2;
/// legacy pools attach no fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub currency: String,
    /// Flat fee, decimal string in base units
    #[serde(default)]
    pub fixed: String,
    /// Percentage fee in basis points
    #[serde(default)]
    pub rate_bps: u32,
}

/// Outbound HTTP behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Hard deadline applied to every outbound call
    pub timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Marketplace purchase-instruction generator (PNPL)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

/// Loan handling defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoansConfig {
    /// Expected blocks until a submitted transaction lands; passed to the
    /// on-chain accrual function so quoted outstanding matches settlement
    pub tx_speed_blocks: u64,
}

impl Default for LoansConfig {
    fn default() -> Self {
        Self { tx_speed_blocks: 3 }
    }
}

/// Root configuration schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub networks: Vec<NetworkConfig>,
    pub valuation: ValuationConfig,
    pub signer: SignerConfig,
    pub fees: Vec<FeeConfig>,
    pub http: HttpConfig,
    pub marketplace: MarketplaceConfig,
    pub loans: LoansConfig,
}

impl Config {
    /// Parse a configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> LendingResult<Self> {
        toml::from_str::<Config>(contents)
            .map_err(|e| LendingError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn network(&self, network_id: u64) -> LendingResult<&NetworkConfig> {
        self.networks
            .iter()
            .find(|n| n.network_id == network_id)
            .ok_or(LendingError::UnsupportedNetwork(network_id))
    }

    pub fn fee_config(&self, currency: &str) -> Option<&FeeConfig> {
        self.fees.iter().find(|f| f.currency == currency)
    }
}

/// Load configuration from the default path and initialize the global CONFIG
pub fn load_config() -> LendingResult<()> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific TOML file path
pub fn load_config_from_path(path: &str) -> LendingResult<()> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| LendingError::Config(format!("Failed to read config file '{}': {}", path, e)))?;

    let config = Config::from_toml_str(&contents)?;

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| LendingError::Config("Config already initialized".to_string()))?;

    Ok(())
}

/// Get a clone of the current configuration
pub fn get_config_clone() -> Config {
    CONFIG
        .get()
        .and_then(|lock| lock.read().ok().map(|c| c.clone()))
        .unwrap_or_default()
}
