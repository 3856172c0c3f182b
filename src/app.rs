use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use std::sync::Arc;
use std::time::Duration;

use crate::command::{Command, HELP};
use crate::config::Config;
use crate::constant::*;
use crate::contracts::Contracts;
use crate::deployment::NetworkDeployment;
use crate::error::{self, DappError};
use crate::loader::{LoadOutcome, StateLoader};
use crate::purchase::{FinalizeReceipt, PurchaseReceipt, PurchaseSubmitter};
use crate::render::render;
use crate::state::{SaleStore, ViewState};
use crate::token::TokenAmount;
use crate::wallet::{connect, Account, TransactionReceipt, WalletProvider};

/// One frontend session: connection, bindings and the view state.
pub struct App {
    provider: Arc<dyn WalletProvider>,
    contracts: Contracts,
    store: SaleStore,
    loader: StateLoader,
    submitter: PurchaseSubmitter,
    chain_id: u64,
    enforce_network: bool,
    account: Option<Account>,
}

impl App {
    pub fn account(&self) -> Option<Account> {
        self.account
    }

    pub fn view(&self) -> ViewState {
        self.store.view()
    }

    pub fn render(&self) -> String {
        render(&self.store.view(), self.account.as_ref())
    }

    /// Connect the wallet, once per session.
    pub async fn connect(&mut self) -> error::Result<Account> {
        if let Some(account) = self.account {
            return Ok(account);
        }

        let account = connect(self.provider.as_ref(), self.chain_id, self.enforce_network).await?;
        self.account = Some(account);

        match self.contracts.check_token_binding().await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Crowdsale sells a different token than configured"),
            Err(e) => tracing::warn!("Could not verify the sale's token: {}", e),
        }
        match self.contracts.crowdsale.owner().await {
            Ok(owner) if owner == account.address() => {
                tracing::info!("Connected account owns the sale; owner commands are available")
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not read the sale owner: {}", e),
        }

        Ok(account)
    }

    /// Connect if needed and load the sale state.
    ///
    /// A failed connection is published as a failed view so `retry` can recover.
    pub async fn start(&mut self) -> error::Result<LoadOutcome> {
        if self.account.is_none() {
            let ticket = self.store.begin_load();
            if let Err(e) = self.connect().await {
                tracing::error!("Failed to connect wallet: {}", e);
                self.store.complete(ticket, Err(e.clone()));
                return Err(e);
            }
        }
        self.reload().await
    }

    pub async fn reload(&self) -> error::Result<LoadOutcome> {
        let account = self.account.ok_or(DappError::NotReady)?;
        self.loader.reload(&self.store, account).await
    }

    /// Buy at the price currently on screen, then reload.
    pub async fn buy(&self, quantity: &str) -> error::Result<PurchaseReceipt> {
        let account = self.account.ok_or(DappError::NotReady)?;
        let price = self.current_price()?;

        let receipt = self.submitter.buy(account, quantity, price).await?;
        self.reload_after("purchase").await;
        Ok(receipt)
    }

    /// Send ETH straight to the sale, then reload.
    pub async fn send_eth(&self, value: &str) -> error::Result<PurchaseReceipt> {
        let account = self.account.ok_or(DappError::NotReady)?;
        let price = self.current_price()?;

        let receipt = self.submitter.send_eth(account, value, price).await?;
        self.reload_after("transfer").await;
        Ok(receipt)
    }

    pub async fn set_price(&self, price: &str) -> error::Result<TransactionReceipt> {
        let account = self.account.ok_or(DappError::NotReady)?;
        let receipt = self.submitter.set_price(account, price).await?;
        self.reload_after("price change").await;
        Ok(receipt)
    }

    pub async fn finalize(&self) -> error::Result<FinalizeReceipt> {
        let account = self.account.ok_or(DappError::NotReady)?;
        let receipt = self.submitter.finalize(account).await?;
        self.reload_after("finalize").await;
        Ok(receipt)
    }

    fn current_price(&self) -> error::Result<TokenAmount> {
        self.store
            .view()
            .ready()
            .map(|snapshot| snapshot.price)
            .ok_or(DappError::NotReady)
    }

    // The transaction already succeeded; a failed reload only shows up in the view.
    async fn reload_after(&self, what: &str) {
        if let Err(e) = self.reload().await {
            tracing::warn!("Reload after {} failed: {}", what, e);
        }
    }

    /// Run one command and describe its outcome. `None` ends the session.
    pub async fn handle(&mut self, command: Command) -> Option<String> {
        let outcome = match command {
            Command::Buy(quantity) => match self.buy(&quantity).await {
                Ok(receipt) => format!(
                    "Bought {} tokens for {} {} (tx {})",
                    receipt.quantity, receipt.payment, NATIVE_SYMBOL, receipt.tx_hash
                ),
                Err(e) => failed("Purchase", e),
            },
            Command::SendEth(value) => match self.send_eth(&value).await {
                Ok(receipt) => format!(
                    "Sent {} {} for {} tokens (tx {})",
                    receipt.payment, NATIVE_SYMBOL, receipt.quantity, receipt.tx_hash
                ),
                Err(e) => failed("Transfer", e),
            },
            Command::Reload => match self.start().await {
                Ok(_) => "Sale state reloaded".to_string(),
                Err(e) => failed("Reload", e),
            },
            Command::SetPrice(price) => match self.set_price(&price).await {
                Ok(receipt) => format!("Price updated (tx {})", receipt.transaction_hash),
                Err(e) => failed("Price change", e),
            },
            Command::Finalize => match self.finalize().await {
                Ok(FinalizeReceipt {
                    tx_hash,
                    tokens_sold: Some(sold),
                    eth_raised: Some(raised),
                }) => format!(
                    "Sale finalized: {sold} tokens sold, {raised} {NATIVE_SYMBOL} raised (tx {tx_hash})"
                ),
                Ok(receipt) => format!("Sale finalized (tx {})", receipt.tx_hash),
                Err(e) => failed("Finalize", e),
            },
            Command::Help => HELP.to_string(),
            Command::Quit => return None,
        };
        Some(outcome)
    }

    pub async fn run_loop(&mut self) -> Result<()> {
        if let Err(e) = self.start().await {
            tracing::error!("Failed to load sale: {}", e);
        }
        println!("{}", self.render());
        println!("Type `help` for commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let command = match line.parse::<Command>() {
                        Ok(command) => command,
                        Err(e) => {
                            println!("{e}");
                            continue;
                        }
                    };
                    let Some(outcome) = self.handle(command).await else {
                        break;
                    };
                    println!("{outcome}");
                    println!("{}", self.render());
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted");
                    break;
                }
            }
        }

        Ok(())
    }
}

fn failed(what: &str, error: DappError) -> String {
    tracing::error!("{} failed: {}", what, error);
    format!("{what} failed: {error}")
}

pub struct AppBuilder {
    provider: Arc<dyn WalletProvider>,
    deployment: NetworkDeployment,
    chain_id: u64,
    enforce_network: bool,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl AppBuilder {
    pub fn new(provider: Arc<dyn WalletProvider>, deployment: NetworkDeployment) -> Self {
        Self {
            provider,
            deployment,
            chain_id: LOCAL_CHAIN_ID,
            enforce_network: true,
            poll_interval: Duration::from_millis(RECEIPT_POLL_INTERVAL_MS),
            receipt_timeout: Duration::from_secs(RECEIPT_TIMEOUT_SECS),
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.chain_id = config.chain_id;
        self.enforce_network = config.enforce_network;
        self.poll_interval = config.receipt_poll_interval();
        self.receipt_timeout = config.receipt_timeout();
        self
    }

    pub fn with_receipt_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.receipt_timeout = timeout;
        self
    }

    pub fn build(self) -> App {
        let contracts = Contracts::bind(self.provider.clone(), &self.deployment);
        let submitter = PurchaseSubmitter::new(
            self.provider.clone(),
            contracts.crowdsale.clone(),
            self.poll_interval,
            self.receipt_timeout,
        );

        App {
            provider: self.provider,
            loader: StateLoader::new(contracts.clone()),
            contracts,
            store: SaleStore::new(),
            submitter,
            chain_id: self.chain_id,
            enforce_network: self.enforce_network,
            account: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ether, MockWallet, BUYER, OWNER};

    fn app(wallet: &Arc<MockWallet>) -> App {
        AppBuilder::new(wallet.clone(), MockWallet::deployment())
            .with_receipt_polling(Duration::from_millis(10), Duration::from_secs(1))
            .build()
    }

    #[tokio::test]
    async fn test_start_connects_and_loads() {
        let wallet = Arc::new(MockWallet::new());
        let mut app = app(&wallet);
        assert!(app.view().is_loading());

        assert_eq!(app.start().await.unwrap(), LoadOutcome::Applied);
        assert_eq!(app.account().unwrap().address(), BUYER);
        assert!(!app.view().is_loading());

        let screen = app.render();
        assert!(screen.contains("Current Price: 1.0 ETH"));
        assert!(screen.contains("0.0 / 1000000.0 tokens sold"));
        assert!(screen.contains("Tokens Owned: 0.0"));
    }

    #[tokio::test]
    async fn test_buy_then_reload_shows_new_totals() {
        let wallet = Arc::new(MockWallet::new());
        let mut app = app(&wallet);
        app.start().await.unwrap();

        let receipt = app.buy("10").await.unwrap();
        assert_eq!(receipt.payment.raw(), ether(10));

        let view = app.view();
        let snapshot = view.ready().unwrap();
        assert_eq!(snapshot.tokens_sold.to_string(), "10.0");
        assert_eq!(snapshot.account_balance.to_string(), "10.0");
        assert_eq!(snapshot.generation, 2);
        assert!(app.render().contains("10.0 / 1000000.0 tokens sold"));
    }

    #[tokio::test]
    async fn test_buy_before_load_is_not_ready() {
        let wallet = Arc::new(MockWallet::new());
        let app = app(&wallet);
        assert_eq!(app.buy("1").await.unwrap_err(), DappError::NotReady);
        assert!(wallet.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_then_retry() {
        let wallet = Arc::new(MockWallet::new());
        wallet.fail_method(
            "eth_requestAccounts",
            DappError::ProviderUnavailable("no wallet".into()),
        );
        let mut app = app(&wallet);

        assert!(app.start().await.is_err());
        assert!(matches!(app.view(), ViewState::Failed { .. }));
        assert!(app.render().contains("retry"));

        wallet.clear_failure("eth_requestAccounts");
        assert_eq!(
            app.handle(Command::Reload).await.as_deref(),
            Some("Sale state reloaded")
        );
        assert!(app.view().ready().is_some());
    }

    #[tokio::test]
    async fn test_failed_read_shows_error_not_spinner() {
        let wallet = Arc::new(MockWallet::new());
        wallet.fail_method("maxTokens", DappError::NetworkUnresponsive("stalled".into()));
        let mut app = app(&wallet);

        assert!(app.start().await.is_err());
        assert!(!app.view().is_loading());
        assert!(app.render().contains("Error: Network unresponsive: stalled"));
    }

    #[tokio::test]
    async fn test_owner_flow() {
        let wallet = Arc::new(MockWallet::new().with_accounts(vec![OWNER]));
        let mut app = app(&wallet);
        app.start().await.unwrap();

        app.set_price("2").await.unwrap();
        assert_eq!(app.view().ready().unwrap().price.to_string(), "2.0");

        app.buy("5").await.unwrap();
        let receipt = app.finalize().await.unwrap();
        assert_eq!(receipt.eth_raised.unwrap().to_string(), "10.0");
    }

    #[tokio::test]
    async fn test_handle_keeps_running_on_errors() {
        let wallet = Arc::new(MockWallet::new());
        let mut app = app(&wallet);
        app.start().await.unwrap();

        // non-owner; reverted by the contract
        let outcome = app.handle(Command::Finalize).await.unwrap();
        assert!(outcome.starts_with("Finalize failed: Contract call reverted"));

        let outcome = app.handle(Command::Buy("zero".into())).await.unwrap();
        assert!(outcome.starts_with("Purchase failed: Invalid amount"));

        let outcome = app.handle(Command::Buy("1".into())).await.unwrap();
        assert!(outcome.starts_with("Bought 1.0 tokens for 1.0 ETH (tx 0x"));
        assert_eq!(wallet.tokens_sold(), ether(1));

        assert!(app.handle(Command::Quit).await.is_none());
    }

    #[tokio::test]
    async fn test_send_eth_then_reload_shows_new_totals() {
        let wallet = Arc::new(MockWallet::new());
        let mut app = app(&wallet);
        app.start().await.unwrap();

        let outcome = app.handle(Command::SendEth("10".into())).await.unwrap();
        assert!(outcome.starts_with("Sent 10.0 ETH for 10.0 tokens (tx 0x"));

        let view = app.view();
        let snapshot = view.ready().unwrap();
        assert_eq!(snapshot.tokens_sold.to_string(), "10.0");
        assert_eq!(snapshot.account_balance.to_string(), "10.0");
    }

    #[tokio::test]
    async fn test_send_eth_before_load_is_not_ready() {
        let wallet = Arc::new(MockWallet::new());
        let app = app(&wallet);
        assert_eq!(app.send_eth("1").await.unwrap_err(), DappError::NotReady);
        assert!(wallet.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_owner_outcomes() {
        let wallet = Arc::new(MockWallet::new().with_accounts(vec![OWNER]));
        let mut app = app(&wallet);
        app.start().await.unwrap();

        let outcome = app.handle(Command::SetPrice("2".into())).await.unwrap();
        assert!(outcome.starts_with("Price updated (tx 0x"));

        app.handle(Command::Buy("5".into())).await.unwrap();
        let outcome = app.handle(Command::Finalize).await.unwrap();
        assert!(outcome.starts_with("Sale finalized: 5.0 tokens sold, 10.0 ETH raised (tx 0x"));

        assert_eq!(app.handle(Command::Help).await.as_deref(), Some(HELP));
    }
}
