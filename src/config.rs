use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use std::str::FromStr;
use std::time::Duration;

use crate::constant::*;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    // Network configuration
    pub rpc_url: String,
    pub chain_id: u64, // selects the deployment entry
    pub enforce_network: bool,

    // Deployment configuration, embedded config.json when unset
    pub deployment_config: Option<String>,

    // Timeouts
    pub request_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_url = lookup("RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.into());
        let chain_id = parse_or(&lookup, "CHAIN_ID", LOCAL_CHAIN_ID)?;
        let enforce_network = match lookup("ENFORCE_NETWORK") {
            Some(value) => parse_bool(&value)
                .with_context(|| format!("ENFORCE_NETWORK must be a boolean, got {value:?}"))?,
            None => true,
        };

        let deployment_config = lookup("DEPLOYMENT_CONFIG").filter(|path| !path.is_empty());

        let request_timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS)?;
        let receipt_poll_interval_ms =
            parse_or(&lookup, "RECEIPT_POLL_INTERVAL_MS", RECEIPT_POLL_INTERVAL_MS)?;
        let receipt_timeout_secs = parse_or(&lookup, "RECEIPT_TIMEOUT_SECS", RECEIPT_TIMEOUT_SECS)?;

        if request_timeout_secs == 0 || receipt_timeout_secs == 0 || receipt_poll_interval_ms == 0
        {
            anyhow::bail!("Timeouts and the receipt poll interval must be greater than zero");
        }

        Ok(Config {
            rpc_url,
            chain_id,
            enforce_network,
            deployment_config,
            request_timeout_secs,
            receipt_poll_interval_ms,
            receipt_timeout_secs,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

fn parse_or<T>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {value:?}")),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "True" | "TRUE" | "yes" => Some(true),
        "0" | "false" | "False" | "FALSE" | "no" => Some(false),
        _ => None,
    }
}
