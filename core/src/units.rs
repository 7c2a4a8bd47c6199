//! Human amounts to token base units.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Parse a human cost such as `"50"` or `"12.5"`.
pub fn parse_cost(cost: &str) -> Result<Decimal> {
    let value = Decimal::from_str(cost.trim())
        .map_err(|_| Error::InvalidInput(format!("cost {:?} is not a number", cost)))?;
    if value.is_sign_negative() {
        return Err(Error::InvalidInput(format!("cost {} is negative", cost)));
    }
    Ok(value)
}

/// `amount * 10^decimals` as an exact integer. Fails if the amount has more
/// fractional digits than the token can represent.
pub fn to_base_units(amount: Decimal, decimals: u8) -> Result<U256> {
    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > u32::from(decimals) {
        return Err(Error::InvalidInput(format!(
            "{} has more than {} decimal places",
            amount, decimals
        )));
    }

    let mantissa = u128::try_from(normalized.mantissa())
        .map_err(|_| Error::InvalidInput(format!("{} is negative", amount)))?;
    let exponent = U256::from(u32::from(decimals) - scale);
    U256::from(10u8)
        .checked_pow(exponent)
        .and_then(|factor| U256::from(mantissa).checked_mul(factor))
        .ok_or_else(|| Error::InvalidInput(format!("{} overflows uint256", amount)))
}
