use tracing::instrument;

use crate::contracts::Contracts;
use crate::error::Result;
use crate::state::{SaleSnapshot, SaleStore};
use crate::wallet::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was started while this one was in flight.
    Stale,
}

pub struct StateLoader {
    contracts: Contracts,
}

impl StateLoader {
    pub fn new(contracts: Contracts) -> Self {
        Self { contracts }
    }

    /// Read balance, price, cap and sold count concurrently.
    pub async fn fetch(&self, account: Account, generation: u64) -> Result<SaleSnapshot> {
        let token = &self.contracts.token;
        let crowdsale = &self.contracts.crowdsale;

        let (account_balance, price, max_tokens, tokens_sold) = tokio::try_join!(
            token.balance_of(account.address()),
            crowdsale.price(),
            crowdsale.max_tokens(),
            crowdsale.tokens_sold(),
        )?;

        Ok(SaleSnapshot {
            account,
            account_balance,
            price,
            max_tokens,
            tokens_sold,
            generation,
        })
    }

    #[instrument(name = "StateLoader::reload", skip(self, store))]
    pub async fn reload(&self, store: &SaleStore, account: Account) -> Result<LoadOutcome> {
        let ticket = store.begin_load();
        tracing::debug!("Loading sale state #{}", ticket.generation());

        let result = self.fetch(account, ticket.generation()).await;
        if let Err(e) = &result {
            tracing::error!("Failed to load sale state: {}", e);
        }
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);

        if !store.complete(ticket, result) {
            return Ok(LoadOutcome::Stale);
        }
        outcome.map(|_| LoadOutcome::Applied)
    }
}
