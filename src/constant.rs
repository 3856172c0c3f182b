pub const TOKEN_DECIMALS: u8 = 18;
pub const LOCAL_CHAIN_ID: u64 = 31337;
pub const NATIVE_SYMBOL: &str = "ETH";

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const RECEIPT_POLL_INTERVAL_MS: u64 = 500;
pub const RECEIPT_TIMEOUT_SECS: u64 = 120;

// EIP-1193 / JSON-RPC error codes
pub const USER_REJECTED_CODE: i64 = 4001;
pub const EXECUTION_REVERTED_CODE: i64 = 3;
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;
pub const METHOD_NOT_SUPPORTED_CODE: i64 = -32004;
