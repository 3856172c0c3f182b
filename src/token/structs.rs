/// # Token Amounts
///
/// Using `U256` to represent token amounts, prices and balances.
///
/// Both the token ledger and the sale contract store quantities as `uint256` scaled by 10^18,
/// i.e. one whole token (or one ETH of price) is 1,000,000,000,000,000,000 base units.
/// A sale cap of one million tokens is already 10^24 base units, well past `u64`, so amounts
/// stay as `U256` end to end and are only turned into decimal strings for display.
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use std::fmt;

use super::units::{format_units, parse_units};
use crate::constant::TOKEN_DECIMALS;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenAmount(U256);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(U256::ZERO);

    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Parse a human decimal such as `"10"` or `"0.25"`.
    pub fn parse(text: &str) -> Result<Self> {
        parse_units(text, TOKEN_DECIMALS).map(Self)
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Share of `total` in basis points, clamped to 10_000.
    pub fn basis_points_of(&self, total: TokenAmount) -> u64 {
        if total.is_zero() {
            return 0;
        }
        let max = U256::from(10_000u64);
        let bps = (self.0.saturating_mul(max) / total.0).min(max);
        bps.to::<u64>()
    }
}

impl From<U256> for TokenAmount {
    fn from(raw: U256) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.0, TOKEN_DECIMALS))
    }
}
