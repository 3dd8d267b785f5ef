//! Decimal type utilities for precise financial calculations

use rust_decimal::{Decimal, RoundingStrategy};
pub use rust_decimal_macros::dec;

/// Price type with high precision
pub type Price = Decimal;

/// Amount type with high precision (typically Price * Shares)
pub type Amount = Decimal;

/// Whole number of shares
pub type Shares = u64;

/// Precision helpers for common operations
pub mod precision {
    use super::*;

    /// Money precision (2 decimal places, like the cash and price columns)
    pub const MONEY_PRECISION: u32 = 2;

    /// Round an amount or price to money precision
    pub fn round_money(value: Decimal) -> Decimal {
        value.round_dp_with_strategy(MONEY_PRECISION, RoundingStrategy::MidpointAwayFromZero)
    }
}
