//! In-memory wallet provider that plays both the node and the two contracts.

use alloy_primitives::{address, Address, Bytes, B256, U256, U64};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::constant::LOCAL_CHAIN_ID;
use crate::contracts::{ICrowdsale, IToken};
use crate::deployment::{ContractRef, NetworkDeployment};
use crate::error::{DappError, Result};
use crate::token::units::{one_token, payment_for, quantity_for};
use crate::wallet::{Log, TransactionReceipt, TransactionRequest, WalletProvider};

pub const TOKEN_ADDRESS: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const CROWDSALE_ADDRESS: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const OWNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const BUYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

pub fn ether(n: u64) -> U256 {
    U256::from(n) * one_token()
}

struct SaleLedger {
    price: U256,
    max_tokens: U256,
    tokens_sold: U256,
    eth_raised: U256,
    balances: HashMap<Address, U256>,
    finalized: bool,
}

impl SaleLedger {
    fn execute(&mut self, tx: &TransactionRequest) -> Result<Vec<Log>> {
        if tx.to != CROWDSALE_ADDRESS {
            return Err(DappError::reverted("no contract at target"));
        }
        let value = tx.value.unwrap_or_default();

        // plain transfer: the sale's receive() buys value / price tokens
        if tx.data.is_empty() {
            let amount = quantity_for(value, self.price)?;
            if amount.is_zero() {
                return Err(DappError::reverted("value buys no tokens"));
            }
            return self.sell(tx.from, amount, value);
        }

        let selector = tx.data.get(..4).unwrap_or_default();

        if selector == ICrowdsale::buyTokensCall::SELECTOR {
            let call = ICrowdsale::buyTokensCall::abi_decode(&tx.data, true)?;
            if value != payment_for(call.amount, self.price)? {
                return Err(DappError::reverted("incorrect ETH amount"));
            }
            return self.sell(tx.from, call.amount, value);
        }

        if selector == ICrowdsale::setPriceCall::SELECTOR {
            let call = ICrowdsale::setPriceCall::abi_decode(&tx.data, true)?;
            if tx.from != OWNER {
                return Err(DappError::reverted("caller is not the owner"));
            }
            self.price = call.price;
            return Ok(vec![]);
        }

        if selector == ICrowdsale::finalizeCall::SELECTOR {
            if tx.from != OWNER {
                return Err(DappError::reverted("caller is not the owner"));
            }
            self.finalized = true;
            let event = ICrowdsale::Finalize {
                tokensSold: self.tokens_sold,
                ethRaised: self.eth_raised,
            };
            return Ok(vec![to_log(event.encode_log_data())]);
        }

        Err(DappError::reverted("unknown function"))
    }

    fn sell(&mut self, buyer: Address, amount: U256, value: U256) -> Result<Vec<Log>> {
        if self.finalized {
            return Err(DappError::reverted("sale finalized"));
        }
        if self.tokens_sold + amount > self.max_tokens {
            return Err(DappError::reverted("not enough tokens left"));
        }
        self.tokens_sold += amount;
        self.eth_raised += value;
        *self.balances.entry(buyer).or_default() += amount;

        let event = ICrowdsale::Buy { amount, buyer };
        Ok(vec![to_log(event.encode_log_data())])
    }
}

fn to_log(data: alloy_primitives::LogData) -> Log {
    Log {
        address: CROWDSALE_ADDRESS,
        topics: data.topics().to_vec(),
        data: data.data,
    }
}

struct Inner {
    ledger: SaleLedger,
    accounts: Vec<Address>,
    chain_id: u64,
    failures: HashMap<String, DappError>,
    delays: HashMap<String, VecDeque<Duration>>,
    calls: HashMap<String, usize>,
    sent: Vec<TransactionRequest>,
    receipts: HashMap<B256, TransactionReceipt>,
    block: u64,
    revert_in_receipt: bool,
}

pub struct MockWallet {
    inner: Mutex<Inner>,
}

impl MockWallet {
    pub fn new() -> Self {
        let ledger = SaleLedger {
            price: ether(1),
            max_tokens: ether(1_000_000),
            tokens_sold: U256::ZERO,
            eth_raised: U256::ZERO,
            balances: HashMap::new(),
            finalized: false,
        };
        let inner = Inner {
            ledger,
            accounts: vec![BUYER, OWNER],
            chain_id: LOCAL_CHAIN_ID,
            failures: HashMap::new(),
            delays: HashMap::new(),
            calls: HashMap::new(),
            sent: vec![],
            receipts: HashMap::new(),
            block: 0,
            revert_in_receipt: false,
        };
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn deployment() -> NetworkDeployment {
        NetworkDeployment {
            token: ContractRef {
                address: TOKEN_ADDRESS,
            },
            crowdsale: ContractRef {
                address: CROWDSALE_ADDRESS,
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn with_accounts(self, accounts: Vec<Address>) -> Self {
        self.lock().accounts = accounts;
        self
    }

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.lock().chain_id = chain_id;
        self
    }

    /// Reverting transactions get mined with status 0 instead of failing on submission.
    pub fn with_failed_receipts(self) -> Self {
        self.lock().revert_in_receipt = true;
        self
    }

    pub fn buyer(&self) -> Address {
        self.lock().accounts.first().copied().unwrap_or(BUYER)
    }

    /// Every later call of `method` fails with `error` until cleared.
    pub fn fail_method(&self, method: &str, error: DappError) {
        self.lock().failures.insert(method.to_string(), error);
    }

    pub fn clear_failure(&self, method: &str) {
        self.lock().failures.remove(method);
    }

    /// Delay the next response to `method`; responses reflect state at request time.
    pub fn delay_next(&self, method: &str, delay: Duration) {
        self.lock()
            .delays
            .entry(method.to_string())
            .or_default()
            .push_back(delay);
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock().calls.get(method).copied().unwrap_or(0)
    }

    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.lock().sent.clone()
    }

    pub fn set_price(&self, price: U256) {
        self.lock().ledger.price = price;
    }

    pub fn tokens_sold(&self) -> U256 {
        self.lock().ledger.tokens_sold
    }

    fn gate(&self, method: &str) -> Result<Option<Duration>> {
        let mut inner = self.lock();
        *inner.calls.entry(method.to_string()).or_default() += 1;
        if let Some(error) = inner.failures.get(method) {
            return Err(error.clone());
        }
        Ok(inner.delays.get_mut(method).and_then(|queue| queue.pop_front()))
    }

    async fn respond<T>(
        &self,
        method: &str,
        answer: impl FnOnce(&mut Inner) -> Result<T>,
    ) -> Result<T> {
        let delay = self.gate(method)?;
        let response = answer(&mut *self.lock());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

fn read_method(to: Address, selector: &[u8]) -> Option<&'static str> {
    if to == TOKEN_ADDRESS && selector == IToken::balanceOfCall::SELECTOR {
        return Some("balanceOf");
    }
    if to != CROWDSALE_ADDRESS {
        return None;
    }
    [
        (ICrowdsale::priceCall::SELECTOR, "price"),
        (ICrowdsale::maxTokensCall::SELECTOR, "maxTokens"),
        (ICrowdsale::tokensSoldCall::SELECTOR, "tokensSold"),
        (ICrowdsale::tokenCall::SELECTOR, "token"),
        (ICrowdsale::ownerCall::SELECTOR, "owner"),
    ]
    .into_iter()
    .find(|(candidate, _)| candidate.as_slice() == selector)
    .map(|(_, name)| name)
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        self.respond("eth_requestAccounts", |inner| Ok(inner.accounts.clone()))
            .await
    }

    async fn chain_id(&self) -> Result<u64> {
        self.respond("eth_chainId", |inner| Ok(inner.chain_id)).await
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let selector = data.get(..4).unwrap_or_default();
        let method = read_method(to, selector)
            .ok_or_else(|| DappError::reverted("function selector was not recognized"))?;

        self.respond(method, |inner| {
            let ledger = &inner.ledger;
            let encoded = match method {
                "balanceOf" => {
                    let call = IToken::balanceOfCall::abi_decode(&data, true)?;
                    let balance = ledger.balances.get(&call.account).copied();
                    balance.unwrap_or_default().abi_encode()
                }
                "price" => ledger.price.abi_encode(),
                "maxTokens" => ledger.max_tokens.abi_encode(),
                "tokensSold" => ledger.tokens_sold.abi_encode(),
                "token" => TOKEN_ADDRESS.abi_encode(),
                _ => OWNER.abi_encode(),
            };
            Ok(Bytes::from(encoded))
        })
        .await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        self.respond("eth_sendTransaction", |inner| {
            inner.sent.push(tx.clone());

            let (logs, succeeded) = match inner.ledger.execute(&tx) {
                Ok(logs) => (logs, true),
                Err(e) if !inner.revert_in_receipt => return Err(e),
                Err(_) => (vec![], false),
            };

            inner.block += 1;
            let hash = B256::from(U256::from(inner.block).to_be_bytes::<32>());
            let receipt = TransactionReceipt {
                transaction_hash: hash,
                block_number: Some(U64::from(inner.block)),
                status: Some(U64::from(succeeded as u64)),
                logs,
            };
            inner.receipts.insert(hash, receipt);
            Ok(hash)
        })
        .await
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>> {
        self.respond("eth_getTransactionReceipt", |inner| {
            Ok(inner.receipts.get(&hash).cloned())
        })
        .await
    }
}
