use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};

use std::sync::Arc;

use crate::deployment::NetworkDeployment;
use crate::error::Result;
use crate::token::TokenAmount;
use crate::wallet::{TransactionReceipt, TransactionRequest, WalletProvider};

sol! {
    #[derive(Debug)]
    interface IToken {
        function balanceOf(address account) external view returns (uint256);
    }
}

sol! {
    #[derive(Debug)]
    interface ICrowdsale {
        event Buy(uint256 amount, address buyer);
        event Finalize(uint256 tokensSold, uint256 ethRaised);

        function token() external view returns (address);
        function owner() external view returns (address);
        function price() external view returns (uint256);
        function maxTokens() external view returns (uint256);
        function tokensSold() external view returns (uint256);

        function buyTokens(uint256 amount) external payable;
        function setPrice(uint256 price) external;
        function finalize() external;
    }
}

async fn call_contract<C: SolCall>(
    provider: &dyn WalletProvider,
    to: Address,
    call: C,
) -> Result<C::Return> {
    let data = provider.call(to, call.abi_encode().into()).await?;
    Ok(C::abi_decode_returns(&data, true)?)
}

async fn send_contract_call<C: SolCall>(
    provider: &dyn WalletProvider,
    from: Address,
    to: Address,
    call: C,
    value: Option<U256>,
) -> Result<B256> {
    let tx = TransactionRequest {
        from,
        to,
        value,
        data: call.abi_encode().into(),
    };
    let hash = provider.send_transaction(tx).await?;
    tracing::info!("Submitted {} to {}: {}", C::SIGNATURE, to, hash);
    Ok(hash)
}

/// Fungible-token ledger binding.
#[derive(Clone)]
pub struct TokenContract {
    provider: Arc<dyn WalletProvider>,
    address: Address,
}

impl TokenContract {
    pub fn new(provider: Arc<dyn WalletProvider>, address: Address) -> Self {
        Self { provider, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn balance_of(&self, account: Address) -> Result<TokenAmount> {
        let call = IToken::balanceOfCall { account };
        let result = call_contract(self.provider.as_ref(), self.address, call).await?;
        Ok(result._0.into())
    }
}

/// Sale contract binding.
#[derive(Clone)]
pub struct CrowdsaleContract {
    provider: Arc<dyn WalletProvider>,
    address: Address,
}

impl CrowdsaleContract {
    pub fn new(provider: Arc<dyn WalletProvider>, address: Address) -> Self {
        Self { provider, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    // ========== View Functions ==========

    /// Price of one whole token, in wei.
    pub async fn price(&self) -> Result<TokenAmount> {
        let call = ICrowdsale::priceCall {};
        let result = call_contract(self.provider.as_ref(), self.address, call).await?;
        Ok(result._0.into())
    }

    pub async fn max_tokens(&self) -> Result<TokenAmount> {
        let call = ICrowdsale::maxTokensCall {};
        let result = call_contract(self.provider.as_ref(), self.address, call).await?;
        Ok(result._0.into())
    }

    pub async fn tokens_sold(&self) -> Result<TokenAmount> {
        let call = ICrowdsale::tokensSoldCall {};
        let result = call_contract(self.provider.as_ref(), self.address, call).await?;
        Ok(result._0.into())
    }

    /// Address of the token ledger this sale distributes.
    pub async fn token(&self) -> Result<Address> {
        let call = ICrowdsale::tokenCall {};
        let result = call_contract(self.provider.as_ref(), self.address, call).await?;
        Ok(result._0)
    }

    pub async fn owner(&self) -> Result<Address> {
        let call = ICrowdsale::ownerCall {};
        let result = call_contract(self.provider.as_ref(), self.address, call).await?;
        Ok(result._0)
    }

    // ========== State-Changing Functions ==========

    pub async fn buy_tokens(&self, from: Address, amount: TokenAmount, value: U256) -> Result<B256> {
        let call = ICrowdsale::buyTokensCall {
            amount: amount.raw(),
        };
        send_contract_call(self.provider.as_ref(), from, self.address, call, Some(value)).await
    }

    /// Plain transfer with no calldata; the sale's `receive()` buys `value / price` tokens.
    pub async fn send_value(&self, from: Address, value: U256) -> Result<B256> {
        let tx = TransactionRequest {
            from,
            to: self.address,
            value: Some(value),
            data: Bytes::new(),
        };
        let hash = self.provider.send_transaction(tx).await?;
        tracing::info!("Sent {} wei to {}: {}", value, self.address, hash);
        Ok(hash)
    }

    /// Owner only; the contract reverts for anyone else.
    pub async fn set_price(&self, from: Address, price: TokenAmount) -> Result<B256> {
        let call = ICrowdsale::setPriceCall { price: price.raw() };
        send_contract_call(self.provider.as_ref(), from, self.address, call, None).await
    }

    /// Owner only; the contract reverts for anyone else.
    pub async fn finalize(&self, from: Address) -> Result<B256> {
        let call = ICrowdsale::finalizeCall {};
        send_contract_call(self.provider.as_ref(), from, self.address, call, None).await
    }

    // ========== Receipt Decoding ==========

    pub fn buy_event(&self, receipt: &TransactionReceipt) -> Option<ICrowdsale::Buy> {
        self.find_event(receipt)
    }

    pub fn finalize_event(&self, receipt: &TransactionReceipt) -> Option<ICrowdsale::Finalize> {
        self.find_event(receipt)
    }

    fn find_event<E: SolEvent>(&self, receipt: &TransactionReceipt) -> Option<E> {
        receipt
            .logs
            .iter()
            .filter(|log| log.address == self.address)
            .find_map(|log| E::decode_raw_log(log.topics.iter().copied(), &log.data, true).ok())
    }
}

/// Both bindings for one network, sharing the provider.
#[derive(Clone)]
pub struct Contracts {
    pub token: TokenContract,
    pub crowdsale: CrowdsaleContract,
}

impl Contracts {
    pub fn bind(provider: Arc<dyn WalletProvider>, deployment: &NetworkDeployment) -> Self {
        Self {
            token: TokenContract::new(provider.clone(), deployment.token.address),
            crowdsale: CrowdsaleContract::new(provider, deployment.crowdsale.address),
        }
    }

    /// Warns when the sale distributes a different token than the one configured.
    pub async fn check_token_binding(&self) -> Result<bool> {
        let sale_token = self.crowdsale.token().await?;
        let matches = sale_token == self.token.address();
        if !matches {
            tracing::warn!(
                "Sale contract {} distributes token {}, configured token is {}",
                self.crowdsale.address(),
                sale_token,
                self.token.address()
            );
        }
        Ok(matches)
    }
}
