use alloy_primitives::U256;

use crate::constant::TOKEN_DECIMALS;
use crate::error::{DappError, Result};

/// 10^decimals, the base-unit value of one whole token.
pub fn unit(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

pub fn one_token() -> U256 {
    unit(TOKEN_DECIMALS)
}

/// Render a base-unit integer as a decimal string.
///
/// Always keeps at least one fractional digit and trims trailing zeros,
/// so `10^18` with 18 decimals renders as `1.0` and `15 * 10^17` as `1.5`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let base = unit(decimals);
    let whole = value / base;
    let fraction = value % base;

    let mut fraction_str = format!(
        "{:0>width$}",
        fraction.to_string(),
        width = decimals as usize
    );
    while fraction_str.ends_with('0') {
        fraction_str.pop();
    }
    if fraction_str.is_empty() {
        fraction_str.push('0');
    }

    format!("{whole}.{fraction_str}")
}

/// Parse a user-entered decimal string into base units.
///
/// Rejects empty input, signs, exponents, more than one dot and more
/// fractional digits than `decimals` allows.
pub fn parse_units(text: &str, decimals: u8) -> Result<U256> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DappError::InvalidAmount("amount is empty".into()));
    }

    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(DappError::InvalidAmount(format!("'{text}' is not a number")));
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(DappError::InvalidAmount(format!("'{text}' is not a number")));
    }
    if fraction.len() > decimals as usize {
        return Err(DappError::InvalidAmount(format!(
            "'{text}' has more than {decimals} decimal places"
        )));
    }

    let overflow = || DappError::InvalidAmount(format!("'{text}' is too large"));

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).map_err(|_| overflow())?
    };
    let fraction = if fraction.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        U256::from_str_radix(&padded, 10).map_err(|_| overflow())?
    };

    whole
        .checked_mul(unit(decimals))
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Native-currency payment for `quantity` tokens at `price` per whole token.
///
/// Both inputs are 18-decimal base units, so the product is rescaled once.
/// An inexact result is rounded up: a non-zero purchase never pays zero.
pub fn payment_for(quantity: U256, price: U256) -> Result<U256> {
    let product = quantity
        .checked_mul(price)
        .ok_or_else(|| DappError::InvalidAmount("payment overflows uint256".into()))?;
    let payment = product / one_token();
    if (product % one_token()).is_zero() {
        Ok(payment)
    } else {
        Ok(payment + U256::from(1u64))
    }
}

/// Whole-or-fractional tokens `value` buys at `price`, rounded down.
pub fn quantity_for(value: U256, price: U256) -> Result<U256> {
    if price.is_zero() {
        return Err(DappError::InvalidAmount("sale price is zero".into()));
    }
    let scaled = value
        .checked_mul(one_token())
        .ok_or_else(|| DappError::InvalidAmount("value overflows uint256".into()))?;
    Ok(scaled / price)
}
