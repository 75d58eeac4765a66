/// Configuration management for the ENS proof service
use crate::error::{ProofError, ProofResult};
use crate::identity::{cache::DEFAULT_NAME_TTL, rpc::DEFAULT_STALL_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub rpc: RpcConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Chain id used when a request omits `chainId`
    pub default_chain_id: String,
}

/// Upstream JSON-RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Primary endpoint (`RPC_URL_1`)
    pub primary_url: Option<String>,
    /// Secondary endpoint (`RPC_URL_2`)
    pub secondary_url: Option<String>,
    /// Time an endpoint may stay silent before the next one is tried
    pub stall_timeout_ms: u64,
}

/// Name cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub name_lane_limit: usize,
    pub address_lane_limit: usize,
    pub max_batch_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                host: "0.0.0.0".to_string(),
                port: 4000,
                default_chain_id: "1".to_string(),
            },
            rpc: RpcConfig {
                primary_url: None,
                secondary_url: None,
                stall_timeout_ms: DEFAULT_STALL_TIMEOUT.as_millis() as u64,
            },
            cache: CacheConfig {
                ttl_secs: DEFAULT_NAME_TTL.as_secs(),
                sweep_interval_secs: 300,
            },
            batch: BatchConfig {
                name_lane_limit: 1,
                address_lane_limit: 2,
                max_batch_size: 50,
            },
            logging: LoggingConfig { json: false },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ProofResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> ProofResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            service: ServiceConfig {
                host: non_empty("HOST").unwrap_or(defaults.service.host),
                port: parse_var(&lookup, "PORT", defaults.service.port)?,
                default_chain_id: non_empty("DEFAULT_CHAIN_ID")
                    .unwrap_or(defaults.service.default_chain_id),
            },
            rpc: RpcConfig {
                primary_url: non_empty("RPC_URL_1"),
                secondary_url: non_empty("RPC_URL_2"),
                stall_timeout_ms: parse_var(
                    &lookup,
                    "RPC_STALL_TIMEOUT_MS",
                    defaults.rpc.stall_timeout_ms,
                )?,
            },
            cache: CacheConfig {
                ttl_secs: parse_var(&lookup, "ENS_CACHE_TTL_SECS", defaults.cache.ttl_secs)?,
                sweep_interval_secs: parse_var(
                    &lookup,
                    "ENS_CACHE_SWEEP_SECS",
                    defaults.cache.sweep_interval_secs,
                )?,
            },
            batch: BatchConfig {
                name_lane_limit: parse_var(
                    &lookup,
                    "NAME_LANE_LIMIT",
                    defaults.batch.name_lane_limit,
                )?,
                address_lane_limit: parse_var(
                    &lookup,
                    "ADDRESS_LANE_LIMIT",
                    defaults.batch.address_lane_limit,
                )?,
                max_batch_size: parse_var(
                    &lookup,
                    "MAX_BATCH_SIZE",
                    defaults.batch.max_batch_size,
                )?,
            },
            logging: LoggingConfig {
                json: non_empty("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ProofResult<()> {
        if self.batch.name_lane_limit == 0 || self.batch.address_lane_limit == 0 {
            return Err(ProofError::Config(
                "Lane limits must be at least 1".to_string(),
            ));
        }
        if self.batch.max_batch_size == 0 {
            return Err(ProofError::Config(
                "MAX_BATCH_SIZE must be at least 1".to_string(),
            ));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(ProofError::Config(
                "ENS_CACHE_SWEEP_SECS must be at least 1".to_string(),
            ));
        }
        if self.service.default_chain_id.trim().is_empty() {
            return Err(ProofError::Config(
                "DEFAULT_CHAIN_ID must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc.stall_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache.sweep_interval_secs)
    }
}

/// Parse an optional variable, falling back to `default` when unset or blank
fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> ProofResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ProofError::Config(format!("Invalid value for {}: {:?}", key, raw))),
        _ => Ok(default),
    }
}
