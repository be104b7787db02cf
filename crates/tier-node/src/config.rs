// crates/tier-node/src/config.rs
//
// Runtime configuration for the tier node.
// Loaded from a TOML file or populated with sensible defaults.
//
// TOML integers are 64-bit, so amounts are read as u64 here and widened when
// the module params are built.

use std::fs;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use tier_economics::{Params, Rate};

/// Runtime configuration for the node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Log level used when `RUST_LOG` is unset: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for local data storage (RocksDB).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Store backend: "memory" or "rocksdb".
    #[serde(default = "default_store")]
    pub store: String,

    /// Simulated time between blocks, in milliseconds.
    #[serde(default = "default_block_time_ms")]
    pub block_time_ms: u64,

    /// Timestamp of the genesis block (RFC 3339).
    #[serde(default = "default_chain_start")]
    pub chain_start: DateTime<Utc>,

    /// Seed for the devnet transaction generator.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Blocks to run when `--blocks` is not given.
    #[serde(default = "default_blocks")]
    pub blocks: u64,

    /// Number of devnet validators.
    #[serde(default = "default_validators")]
    pub validators: u8,

    /// Number of devnet delegators.
    #[serde(default = "default_delegators")]
    pub delegators: u8,

    /// Genesis bond-denom balance of each delegator.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: u64,

    /// Validator self-bond at genesis.
    #[serde(default = "default_validator_self_bond")]
    pub validator_self_bond: u64,

    /// Staking unbonding period, in seconds.
    #[serde(default = "default_unbonding_time_secs")]
    pub unbonding_time_secs: u64,

    /// Staking rewards accrued per block, in parts per million of bonded tokens.
    #[serde(default = "default_reward_rate_ppm")]
    pub reward_rate_ppm: u64,

    /// Genesis balance of the insurance pool.
    #[serde(default = "default_insurance_pool_funding")]
    pub insurance_pool_funding: u64,

    /// Per-block probability of a devnet slash, in percent.
    #[serde(default = "default_slash_chance_pct")]
    pub slash_chance_pct: u8,

    /// Overrides applied on top of the default module params.
    #[serde(default)]
    pub params: ParamsOverride,
}

/// Partial module params. Absent fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamsOverride {
    pub epoch_duration_secs: Option<u64>,
    pub unlocking_epochs: Option<u32>,
    pub reward_rates: Option<Vec<RateOverride>>,
    pub developer_pool_fee_pct: Option<u32>,
    pub insurance_pool_fee_pct: Option<u32>,
    pub insurance_pool_threshold: Option<u64>,
    pub process_rewards_interval: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateOverride {
    pub amount_threshold: u64,
    pub rate_pct: i64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_store() -> String {
    "memory".to_string()
}

fn default_block_time_ms() -> u64 {
    5_000
}

fn default_chain_start() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(19_723)
}

fn default_seed() -> u64 {
    42
}

fn default_blocks() -> u64 {
    500
}

fn default_validators() -> u8 {
    3
}

fn default_delegators() -> u8 {
    8
}

fn default_initial_balance() -> u64 {
    1_000_000_000
}

fn default_validator_self_bond() -> u64 {
    10_000_000
}

fn default_unbonding_time_secs() -> u64 {
    120
}

fn default_reward_rate_ppm() -> u64 {
    10
}

fn default_insurance_pool_funding() -> u64 {
    50_000_000
}

fn default_slash_chance_pct() -> u8 {
    2
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            store: default_store(),
            block_time_ms: default_block_time_ms(),
            chain_start: default_chain_start(),
            seed: default_seed(),
            blocks: default_blocks(),
            validators: default_validators(),
            delegators: default_delegators(),
            initial_balance: default_initial_balance(),
            validator_self_bond: default_validator_self_bond(),
            unbonding_time_secs: default_unbonding_time_secs(),
            reward_rate_ppm: default_reward_rate_ppm(),
            insurance_pool_funding: default_insurance_pool_funding(),
            slash_chance_pct: default_slash_chance_pct(),
            params: ParamsOverride::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: NodeConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }

    pub fn unbonding_time(&self) -> Duration {
        Duration::from_secs(self.unbonding_time_secs)
    }

    /// Default params with the `[params]` table applied.
    pub fn module_params(&self) -> Params {
        let o = &self.params;
        let mut params = Params::default();
        if let Some(secs) = o.epoch_duration_secs {
            params.epoch_duration = Duration::from_secs(secs);
        }
        if let Some(epochs) = o.unlocking_epochs {
            params.unlocking_epochs = epochs;
        }
        if let Some(rates) = &o.reward_rates {
            params.reward_rates = rates
                .iter()
                .map(|r| Rate::new(u128::from(r.amount_threshold), r.rate_pct))
                .collect();
        }
        if let Some(pct) = o.developer_pool_fee_pct {
            params.developer_pool_fee_pct = pct;
        }
        if let Some(pct) = o.insurance_pool_fee_pct {
            params.insurance_pool_fee_pct = pct;
        }
        if let Some(threshold) = o.insurance_pool_threshold {
            params.insurance_pool_threshold = u128::from(threshold);
        }
        if let Some(interval) = o.process_rewards_interval {
            params.process_rewards_interval = interval;
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = NodeConfig::from_toml("").unwrap();
        assert_eq!(config.store, "memory");
        assert_eq!(config.block_time(), Duration::from_secs(5));
        assert_eq!(config.module_params(), Params::default());
        assert_eq!(config.chain_start.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_params_table_overrides_defaults() {
        let config = NodeConfig::from_toml(
            r#"
            seed = 7
            chain_start = "2025-06-01T12:00:00Z"

            [params]
            epoch_duration_secs = 60
            process_rewards_interval = 10

            [[params.reward_rates]]
            amount_threshold = 1000
            rate_pct = 200

            [[params.reward_rates]]
            amount_threshold = 0
            rate_pct = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        let params = config.module_params();
        assert_eq!(params.epoch_duration, Duration::from_secs(60));
        assert_eq!(params.process_rewards_interval, 10);
        assert_eq!(params.reward_rates, vec![Rate::new(1000, 200), Rate::new(0, 100)]);
        assert_eq!(params.unlocking_epochs, 2);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_store_backend_is_configurable() {
        let config = NodeConfig::from_toml("store = \"rocksdb\"\ndata_dir = \"/tmp/tier\"").unwrap();
        assert_eq!(config.store, "rocksdb");
    }
}
