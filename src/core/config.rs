use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::ledger::Address;

/// Immutable service configuration, built once at startup and passed to
/// every component. Required values have no fallback: a missing ledger
/// endpoint, contract address, signing key, scaling factor, balance
/// threshold, confirmation window or signature length aborts startup
/// instead of running against a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub aggregation: AggregationConfig,
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    pub signer_key: String,
    pub min_balance_wei: u128,
    pub fetch_timeout: Duration,
    pub submit_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub confirmation_poll: Duration,
    pub read_retry_attempts: u32,
    pub read_retry_base: Duration,
}

#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Deployed signature length N
    pub signature_length: usize,
    pub scaling_factor: i64,
    pub max_concurrent_fetches: usize,
    /// 0 runs a single round and exits
    pub round_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ReportingConfig {
    pub port: u16,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let signature_length: usize = required_parsed("SIGNATURE_LENGTH")?;
        if signature_length == 0 {
            return Err(ConfigError::InvalidVar {
                name: "SIGNATURE_LENGTH",
                reason: "must be positive".to_string(),
            });
        }
        let scaling_factor: i64 = required_parsed("SCALING_FACTOR")?;
        if scaling_factor <= 0 {
            return Err(ConfigError::InvalidVar {
                name: "SCALING_FACTOR",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Config {
            ledger: LedgerConfig {
                rpc_url: required("LEDGER_RPC_URL")?,
                contract_address: Address::new(required("LEDGER_CONTRACT_ADDRESS")?),
                signer_key: required("SIGNER_PRIVATE_KEY")?,
                min_balance_wei: required_parsed("MIN_BALANCE_WEI")?,
                fetch_timeout: Duration::from_secs(optional_parsed("FETCH_TIMEOUT_SECS", 30u64)?),
                submit_timeout: Duration::from_secs(optional_parsed(
                    "SUBMIT_TIMEOUT_SECS",
                    30u64,
                )?),
                confirmation_timeout: Duration::from_secs(required_parsed::<u64>(
                    "CONFIRMATION_TIMEOUT_SECS",
                )?),
                confirmation_poll: Duration::from_millis(optional_parsed(
                    "CONFIRMATION_POLL_MS",
                    3000u64,
                )?),
                read_retry_attempts: optional_parsed("READ_RETRY_ATTEMPTS", 3u32)?,
                read_retry_base: Duration::from_millis(optional_parsed(
                    "READ_RETRY_BASE_MS",
                    500u64,
                )?),
            },
            aggregation: AggregationConfig {
                signature_length,
                scaling_factor,
                max_concurrent_fetches: optional_parsed("MAX_CONCURRENT_FETCHES", 8usize)?,
                round_interval_secs: optional_parsed("ROUND_INTERVAL_SECS", 0u64)?,
            },
            reporting: ReportingConfig {
                port: optional_parsed("REPORT_PORT", 8080u16)?,
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn required_parsed<T>(name: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse(name, required(name)?)
}

fn optional_parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => parse(name, value),
        Err(_) => Ok(default),
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        name,
        reason: e.to_string(),
    })
}
