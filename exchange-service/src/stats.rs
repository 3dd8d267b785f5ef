//! Derived account statistics: net worth and volatility coefficient

use common::decimal::{precision, Amount, Price, Shares};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use statrs::statistics::Statistics;

/// Market value of a position, saturating at `Decimal::MAX`
pub fn position_value(shares: Shares, price: Price) -> Amount {
    Decimal::from(shares).saturating_mul(price)
}

/// Cash plus the market value of every position
pub fn net_worth<I>(cash: Amount, positions: I) -> Amount
where
    I: IntoIterator<Item = (Shares, Price)>,
{
    let total = positions
        .into_iter()
        .map(|(shares, price)| position_value(shares, price))
        .fold(cash, Decimal::saturating_add);
    precision::round_money(total)
}

/// Population standard deviation over mean of the net-worth history.
///
/// Returns zero for fewer than two snapshots or a non-positive mean.
pub fn coefficient_of_variation(history: &[Amount]) -> Decimal {
    if history.len() < 2 {
        return Decimal::ZERO;
    }

    let values: Vec<f64> = history.iter().filter_map(|v| v.to_f64()).collect();
    let mean = values.iter().mean();
    if !mean.is_finite() || mean <= 0.0 {
        return Decimal::ZERO;
    }

    let std_dev = values.iter().population_std_dev();
    Decimal::from_f64(std_dev / mean)
        .map(precision::round_money)
        .unwrap_or(Decimal::ZERO)
}
