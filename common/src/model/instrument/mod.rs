//! Instrument (listed company) models and re-pricing

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{dec, precision, Amount, Price, Shares};
use crate::error::{Error, Result};
use crate::model::ledger::Side;
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Maximum length of an instrument code
pub const MAX_CODE_LEN: usize = 10;

/// Highest listing price. Any price times [`MAX_SHARES`] stays inside a
/// `NUMERIC(20, 2)` column.
pub const MAX_PRICE: Price = dec!(1000000);

/// Largest supply an instrument may be listed with
pub const MAX_SHARES: Shares = 100_000_000_000;

/// Price update applied after every trade.
///
/// The new price keeps `retention` of the old price and adds (buy) or
/// removes (sell) a contribution proportional to the traded share of supply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    /// Share of the old price carried into the new one
    pub retention: Decimal,
    /// Floor below which a price never falls
    pub min_price: Price,
}

impl Default for PricingRule {
    fn default() -> Self {
        Self {
            retention: dec!(0.5),
            min_price: dec!(0.01),
        }
    }
}

impl PricingRule {
    /// Compute the price that follows a trade of `quantity` shares at `price`.
    ///
    /// The result is clamped to `[min_price, MAX_PRICE]`.
    pub fn next_price(&self, price: Price, side: Side, quantity: Shares, shares_outstanding: Shares) -> Price {
        let weight = Decimal::from(quantity) / Decimal::from(shares_outstanding.max(1));
        let raw = price
            .checked_mul(weight)
            .zip(price.checked_mul(self.retention))
            .and_then(|(contribution, base)| match side {
                Side::Buy => base.checked_add(contribution),
                Side::Sell => base.checked_sub(contribution),
            })
            .unwrap_or(MAX_PRICE);
        precision::round_money(raw.min(MAX_PRICE)).max(self.min_price)
    }
}

/// Tradable company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Instrument {
    /// Unique ticker code (e.g. "ACME")
    pub code: String,
    /// Unique company name
    pub name: String,
    /// Current market price
    pub price: Price,
    /// Total shares issued
    pub shares_outstanding: Shares,
    /// Shares not currently held by any account
    pub shares_remaining: Shares,
    /// Percent price change caused by the last trade
    pub change: Decimal,
    /// Listing timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Instrument {
    /// List a new instrument with its whole supply unsold
    pub fn list(code: &str, name: &str, price: Price, shares_outstanding: Shares) -> Result<Self> {
        let code = normalize_code(code)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::ValidationError("Instrument name cannot be empty".to_string()));
        }
        if price <= Decimal::ZERO || price > MAX_PRICE {
            return Err(Error::ValidationError(format!(
                "Price must be positive and at most {}, got {}",
                MAX_PRICE, price
            )));
        }
        if shares_outstanding == 0 || shares_outstanding > MAX_SHARES {
            return Err(Error::ValidationError(format!(
                "Shares outstanding must be between 1 and {}, got {}",
                MAX_SHARES, shares_outstanding
            )));
        }

        let now = Utc::now();
        Ok(Self {
            code,
            name: name.to_string(),
            price: precision::round_money(price),
            shares_outstanding,
            shares_remaining: shares_outstanding,
            change: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        })
    }

    /// Market capitalisation at the current price
    pub fn market_cap(&self) -> Amount {
        self.price * Decimal::from(self.shares_outstanding)
    }

    /// Take shares out of the unsold pool
    pub fn issue_shares(&mut self, quantity: Shares) -> Result<()> {
        if quantity > self.shares_remaining {
            return Err(Error::InsufficientSupply(format!(
                "{} does not have that many shares left: {} remaining",
                self.code, self.shares_remaining
            )));
        }

        self.shares_remaining -= quantity;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Return shares to the unsold pool
    pub fn return_shares(&mut self, quantity: Shares) -> Result<()> {
        let remaining = self.shares_remaining.checked_add(quantity)
            .filter(|r| *r <= self.shares_outstanding)
            .ok_or_else(|| Error::ValidationError(format!(
                "{} cannot take back {} shares: only {} are in circulation",
                self.code, quantity, self.shares_outstanding - self.shares_remaining
            )))?;

        self.shares_remaining = remaining;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Apply the pricing rule after a trade and record the percent change
    pub fn reprice(&mut self, side: Side, quantity: Shares, rule: &PricingRule) {
        let old = self.price;
        let new = rule.next_price(old, side, quantity, self.shares_outstanding);
        self.change = if old.is_zero() {
            Decimal::ZERO
        } else {
            precision::round_money((new - old) / old * dec!(100))
        };
        self.price = new;
        self.updated_at = Utc::now();
    }
}

/// Validate and upper-case an instrument code
pub fn normalize_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.is_empty() || code.len() > MAX_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::ValidationError(format!(
            "Instrument code must be 1 to {} letters or digits, got '{}'",
            MAX_CODE_LEN, code
        )));
    }
    Ok(code.to_ascii_uppercase())
}
