use thiserror::Error;

pub type Result<T> = std::result::Result<T, DappError>;

/// Everything that can go wrong between this frontend and the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DappError {
    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Request rejected by the user: {0}")]
    UserRejected(String),

    #[error("Contract call reverted: {reason}")]
    ContractCallReverted { reason: String },

    #[error("Network unresponsive: {0}")]
    NetworkUnresponsive(String),

    #[error("Wallet is on network {actual}, expected {expected}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Sale state is not loaded yet")]
    NotReady,

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl DappError {
    pub fn reverted(reason: impl Into<String>) -> Self {
        DappError::ContractCallReverted {
            reason: reason.into(),
        }
    }

    /// Worth offering a manual retry for.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DappError::ProviderUnavailable(_)
                | DappError::NetworkUnresponsive(_)
                | DappError::Rpc { .. }
        )
    }
}

impl From<reqwest::Error> for DappError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DappError::NetworkUnresponsive(e.to_string())
        } else if e.is_connect() || e.is_request() {
            DappError::ProviderUnavailable(e.to_string())
        } else if e.is_decode() {
            DappError::Decode(e.to_string())
        } else {
            DappError::ProviderUnavailable(e.to_string())
        }
    }
}

impl From<alloy_sol_types::Error> for DappError {
    fn from(e: alloy_sol_types::Error) -> Self {
        DappError::Decode(e.to_string())
    }
}

impl From<serde_json::Error> for DappError {
    fn from(e: serde_json::Error) -> Self {
        DappError::Decode(e.to_string())
    }
}
