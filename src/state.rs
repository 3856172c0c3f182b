use std::sync::{Arc, RwLock};

use crate::error::{DappError, Result};
use crate::token::TokenAmount;
use crate::wallet::Account;

/// Everything the sale view shows, as of one successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleSnapshot {
    pub account: Account,
    pub account_balance: TokenAmount,
    pub price: TokenAmount,
    pub max_tokens: TokenAmount,
    pub tokens_sold: TokenAmount,
    pub generation: u64,
}

impl SaleSnapshot {
    pub fn remaining(&self) -> TokenAmount {
        TokenAmount::from_raw(self.max_tokens.raw().saturating_sub(self.tokens_sold.raw()))
    }
}

#[derive(Debug, Clone)]
pub enum ViewState {
    /// A load is in flight; `previous` is the last good snapshot, if any.
    Loading { previous: Option<Arc<SaleSnapshot>> },
    Ready(Arc<SaleSnapshot>),
    Failed {
        error: DappError,
        previous: Option<Arc<SaleSnapshot>>,
    },
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading { .. })
    }

    /// The snapshot, only while it is current.
    pub fn ready(&self) -> Option<&Arc<SaleSnapshot>> {
        match self {
            ViewState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// The most recent snapshot, current or not.
    pub fn last_snapshot(&self) -> Option<&Arc<SaleSnapshot>> {
        match self {
            ViewState::Ready(snapshot) => Some(snapshot),
            ViewState::Loading { previous } | ViewState::Failed { previous, .. } => {
                previous.as_ref()
            }
        }
    }
}

/// Proof of having started a load; results are only accepted for the latest ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

struct StoreInner {
    latest_generation: u64,
    view: ViewState,
}

/// Single owner of the view state.
///
/// Each load is stamped with an increasing generation. A result is applied
/// only if no newer load was started in the meantime, so a slow stale
/// response can never replace a fresher one.
pub struct SaleStore {
    inner: RwLock<StoreInner>,
}

impl SaleStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                latest_generation: 0,
                view: ViewState::Loading { previous: None },
            }),
        }
    }

    pub fn begin_load(&self) -> LoadTicket {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.latest_generation += 1;
        let previous = inner.view.last_snapshot().cloned();
        inner.view = ViewState::Loading { previous };
        LoadTicket(inner.latest_generation)
    }

    /// Apply the outcome of the load behind `ticket`. Returns false if it was stale.
    pub fn complete(&self, ticket: LoadTicket, result: Result<SaleSnapshot>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if ticket.0 != inner.latest_generation {
            tracing::debug!(
                "Discarding load #{} (latest is #{})",
                ticket.0,
                inner.latest_generation
            );
            return false;
        }

        inner.view = match result {
            Ok(snapshot) => ViewState::Ready(Arc::new(snapshot)),
            Err(error) => ViewState::Failed {
                error,
                previous: inner.view.last_snapshot().cloned(),
            },
        };
        true
    }

    pub fn view(&self) -> ViewState {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .view
            .clone()
    }

    pub fn is_loading(&self) -> bool {
        self.view().is_loading()
    }
}
