use alloy_sol_types::{Revert, SolError};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::constant::*;
use crate::error::{DappError, Result};

/// Minimal JSON-RPC 2.0 client over HTTP.
pub struct RpcClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DappError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.rpc_url.clone(), config.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("rpc -> {} #{} {}", method, id, params);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response = self.http.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DappError::Rpc {
                code: status.as_u16() as i64,
                message,
            });
        }

        let body: RpcResponse = response.json().await?;
        if let Some(error) = body.error {
            tracing::debug!("rpc <- {} #{} error {:?}", method, id, error);
            return Err(classify_rpc_error(error));
        }

        let result = body.result.unwrap_or(Value::Null);
        tracing::debug!("rpc <- {} #{} {}", method, id, result);
        Ok(serde_json::from_value(result)?)
    }
}

/// Map a JSON-RPC error object onto the error taxonomy.
pub fn classify_rpc_error(error: RpcErrorObject) -> DappError {
    match error.code {
        USER_REJECTED_CODE => DappError::UserRejected(error.message),
        EXECUTION_REVERTED_CODE => DappError::reverted(revert_reason(&error)),
        _ if error.message.to_lowercase().contains("revert") => {
            DappError::reverted(revert_reason(&error))
        }
        code => DappError::Rpc {
            code,
            message: error.message,
        },
    }
}

// Nodes put the revert payload either directly in `data` or in `data.data`.
fn revert_reason(error: &RpcErrorObject) -> String {
    let payload = match &error.data {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(map)) => map.get("data").and_then(|v| v.as_str()),
        _ => None,
    };

    payload
        .and_then(|hex_str| hex::decode(hex_str.trim_start_matches("0x")).ok())
        .and_then(|bytes| Revert::abi_decode(&bytes, true).ok())
        .map(|revert| revert.reason)
        .unwrap_or_else(|| error.message.clone())
}
