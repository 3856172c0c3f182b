use alloy_primitives::{Address, B256};
use tracing::instrument;

use std::sync::Arc;
use std::time::Duration;

use crate::contracts::CrowdsaleContract;
use crate::error::{DappError, Result};
use crate::token::units::{payment_for, quantity_for};
use crate::token::TokenAmount;
use crate::wallet::{wait_for_receipt, Account, TransactionReceipt, WalletProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub quantity: TokenAmount,
    /// Native currency paid, 18 decimals like the token.
    pub payment: TokenAmount,
    /// Amount and buyer as reported by the contract's `Buy` event.
    pub confirmed: Option<(TokenAmount, Address)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReceipt {
    pub tx_hash: B256,
    pub tokens_sold: Option<TokenAmount>,
    pub eth_raised: Option<TokenAmount>,
}

/// Sends value-bearing and owner transactions to the sale contract and waits for them.
pub struct PurchaseSubmitter {
    provider: Arc<dyn WalletProvider>,
    crowdsale: CrowdsaleContract,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl PurchaseSubmitter {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        crowdsale: CrowdsaleContract,
        poll_interval: Duration,
        receipt_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            crowdsale,
            poll_interval,
            receipt_timeout,
        }
    }

    /// Buy `quantity` whole-or-fractional tokens at the displayed `price`.
    ///
    /// The payment is `quantity × price`; an insufficient payment is left for
    /// the contract to reject.
    #[instrument(name = "Purchase::Buy", skip(self, price), fields(price = %price))]
    pub async fn buy(
        &self,
        account: Account,
        quantity: &str,
        price: TokenAmount,
    ) -> Result<PurchaseReceipt> {
        let quantity = TokenAmount::parse(quantity)?;
        if quantity.is_zero() {
            return Err(DappError::InvalidAmount(
                "amount must be greater than zero".into(),
            ));
        }
        let payment = TokenAmount::from_raw(payment_for(quantity.raw(), price.raw())?);
        tracing::info!("Buying {} tokens for {} ETH", quantity, payment);

        let hash = self
            .crowdsale
            .buy_tokens(account.address(), quantity, payment.raw())
            .await?;
        let receipt = self.confirm(hash).await?;

        let confirmed = self
            .crowdsale
            .buy_event(&receipt)
            .map(|event| (TokenAmount::from_raw(event.amount), event.buyer));

        Ok(PurchaseReceipt {
            tx_hash: hash,
            block_number: receipt.block_number(),
            quantity,
            payment,
            confirmed,
        })
    }

    /// Send `value` ETH straight to the sale, which buys `value / price` tokens.
    ///
    /// `price` only estimates the quantity; the `Buy` event reports what the
    /// contract actually credited.
    #[instrument(name = "Purchase::SendEth", skip(self, price), fields(price = %price))]
    pub async fn send_eth(
        &self,
        account: Account,
        value: &str,
        price: TokenAmount,
    ) -> Result<PurchaseReceipt> {
        let payment = TokenAmount::parse(value)?;
        if payment.is_zero() {
            return Err(DappError::InvalidAmount(
                "value must be greater than zero".into(),
            ));
        }
        let estimate = TokenAmount::from_raw(quantity_for(payment.raw(), price.raw())?);
        if estimate.is_zero() {
            return Err(DappError::InvalidAmount(format!(
                "{payment} ETH buys no tokens at {price} ETH each"
            )));
        }
        tracing::info!("Sending {} ETH for about {} tokens", payment, estimate);

        let hash = self
            .crowdsale
            .send_value(account.address(), payment.raw())
            .await?;
        let receipt = self.confirm(hash).await?;

        let confirmed = self
            .crowdsale
            .buy_event(&receipt)
            .map(|event| (TokenAmount::from_raw(event.amount), event.buyer));

        Ok(PurchaseReceipt {
            tx_hash: hash,
            block_number: receipt.block_number(),
            quantity: confirmed.map_or(estimate, |(amount, _)| amount),
            payment,
            confirmed,
        })
    }

    // ========== Owner Operations ==========

    #[instrument(name = "Purchase::SetPrice", skip(self))]
    pub async fn set_price(&self, account: Account, price: &str) -> Result<TransactionReceipt> {
        let price = TokenAmount::parse(price)?;
        if price.is_zero() {
            return Err(DappError::InvalidAmount("price must be greater than zero".into()));
        }
        tracing::info!("Setting price to {} ETH", price);

        let hash = self.crowdsale.set_price(account.address(), price).await?;
        self.confirm(hash).await
    }

    #[instrument(name = "Purchase::Finalize", skip(self))]
    pub async fn finalize(&self, account: Account) -> Result<FinalizeReceipt> {
        let hash = self.crowdsale.finalize(account.address()).await?;
        let receipt = self.confirm(hash).await?;

        let event = self.crowdsale.finalize_event(&receipt);
        Ok(FinalizeReceipt {
            tx_hash: hash,
            tokens_sold: event.as_ref().map(|e| TokenAmount::from_raw(e.tokensSold)),
            eth_raised: event.as_ref().map(|e| TokenAmount::from_raw(e.ethRaised)),
        })
    }

    async fn confirm(&self, hash: B256) -> Result<TransactionReceipt> {
        let receipt = wait_for_receipt(
            self.provider.as_ref(),
            hash,
            self.poll_interval,
            self.receipt_timeout,
        )
        .await?;

        if !receipt.succeeded() {
            return Err(DappError::reverted(format!("transaction {hash} reverted")));
        }
        Ok(receipt)
    }
}
