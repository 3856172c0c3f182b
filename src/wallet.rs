use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use std::fmt;
use std::time::Duration;

use crate::client::RpcClient;
use crate::constant::*;
use crate::error::{DappError, Result};

/// The wallet/network endpoint the frontend talks through.
///
/// Account access, reads and transaction signing are all delegated to it.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    async fn chain_id(&self) -> Result<u64>;

    /// Read-only `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Ask the wallet to sign and broadcast, returning the transaction hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts carry no status; treat them as successful.
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |status| !status.is_zero())
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block_number.map(|n| n.to::<u64>())
    }
}

/// `WalletProvider` backed by a JSON-RPC node that manages unlocked accounts.
pub struct JsonRpcWallet {
    client: RpcClient,
}

impl JsonRpcWallet {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        match self.client.request("eth_requestAccounts", json!([])).await {
            Err(e) if is_unsupported_method(&e) => {
                tracing::debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.client.request("eth_accounts", json!([])).await
            }
            other => other,
        }
    }

    async fn chain_id(&self) -> Result<u64> {
        let chain_id: U64 = self.client.request("eth_chainId", json!([])).await?;
        Ok(chain_id.to::<u64>())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.client
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        self.client
            .request("eth_sendTransaction", json!([tx]))
            .await
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        self.client
            .request("eth_getTransactionReceipt", json!([hash]))
            .await
    }
}

fn is_unsupported_method(err: &DappError) -> bool {
    matches!(
        err,
        DappError::Rpc { code, .. }
            if *code == METHOD_NOT_FOUND_CODE || *code == METHOD_NOT_SUPPORTED_CODE
    )
}

/// Poll until the transaction is mined or `timeout` elapses.
pub async fn wait_for_receipt(
    provider: &dyn WalletProvider,
    hash: B256,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<TransactionReceipt> {
    let receipt = tokio::time::timeout(timeout, async {
        loop {
            if let Some(receipt) = provider.transaction_receipt(hash).await? {
                return Ok::<_, DappError>(receipt);
            }
            tokio::time::sleep(poll_interval).await;
        }
    })
    .await
    .map_err(|_| {
        DappError::NetworkUnresponsive(format!(
            "transaction {hash} not mined within {}s",
            timeout.as_secs()
        ))
    })??;

    tracing::info!(
        "Transaction {} mined in block {:?}",
        hash,
        receipt.block_number()
    );

    Ok(receipt)
}

/// The externally-owned account exposed by the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Account(Address);

impl Account {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_checksum(None))
    }
}

/// Request the active account and check the wallet's network.
///
/// A network mismatch is an error when `enforce_network` is set, otherwise
/// it is only logged and the configured contract addresses are used anyway.
#[instrument(skip(provider))]
pub async fn connect(
    provider: &dyn WalletProvider,
    expected_chain_id: u64,
    enforce_network: bool,
) -> Result<Account> {
    let accounts = provider.request_accounts().await?;
    let account = accounts
        .first()
        .copied()
        .map(Account::new)
        .ok_or_else(|| DappError::ProviderUnavailable("wallet exposes no accounts".into()))?;

    let actual = provider.chain_id().await?;
    if actual != expected_chain_id {
        if enforce_network {
            return Err(DappError::WrongNetwork {
                expected: expected_chain_id,
                actual,
            });
        }
        tracing::warn!(
            "Wallet is on network {}, configured for {}; continuing",
            actual,
            expected_chain_id
        );
    }

    tracing::info!("Connected account {}", account);
    Ok(account)
}
