use alloy_primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::path::Path;

/// Addresses of the local development deployment, keyed by network id.
const DEFAULT_DEPLOYMENTS: &str = include_str!("../config.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRef {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDeployment {
    pub token: ContractRef,
    pub crowdsale: ContractRef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deployments(HashMap<u64, NetworkDeployment>);

impl Deployments {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Malformed deployment configuration")
    }

    /// Load from `path`, or fall back to the embedded configuration.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let path = Path::new(path);
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                tracing::info!("Loaded deployment configuration from {}", path.display());
                Self::from_json(&json)
            }
            None => Self::from_json(DEFAULT_DEPLOYMENTS),
        }
    }

    pub fn for_chain(&self, chain_id: u64) -> Result<&NetworkDeployment> {
        self.0
            .get(&chain_id)
            .ok_or_else(|| anyhow::anyhow!("No deployment configured for network {}", chain_id))
    }
}
