//! Trade coordinator: validates a trade and applies it to a locked scope
//!
//! The repository loads every row a trade touches into a [`TradeScope`],
//! runs [`execute`] against it and persists the scope only when it succeeds,
//! so a rejected trade leaves no trace.

use chrono::{DateTime, Duration, Utc};
use common::decimal::{precision, Amount, Price, Shares};
use common::error::{Error, Result};
use common::model::{Account, Holding, Instrument, LedgerEntry, PricingRule, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::stats;

/// A position of the trading account in another instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument code
    pub code: String,
    /// Shares owned
    pub shares: Shares,
    /// Current instrument price
    pub price: Price,
}

/// Every row a single trade reads or writes
#[derive(Debug, Clone)]
pub struct TradeScope {
    /// Trading account
    pub account: Account,
    /// Traded instrument
    pub instrument: Instrument,
    /// Account's holding in the traded instrument, empty if never traded
    pub holding: Holding,
    /// Account's non-empty holdings in every other instrument
    pub other_positions: Vec<Position>,
    /// Net worth snapshots of previous trades, oldest first
    pub net_worth_history: Vec<Amount>,
    /// Timestamp of the account's latest ledger entry
    pub last_entry_at: Option<DateTime<Utc>>,
}

impl TradeScope {
    /// Net worth at the scope's current prices
    pub fn net_worth(&self) -> Amount {
        let traded = std::iter::once((self.holding.shares, self.instrument.price));
        let others = self.other_positions.iter().map(|p| (p.shares, p.price));
        stats::net_worth(self.account.cash, traded.chain(others))
    }
}

/// Parse a quantity typed into the trade form
pub fn parse_quantity(raw: &str) -> Result<Shares> {
    match raw.trim().parse::<Shares>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(Error::InvalidQuantity(format!(
            "The quantity must be a positive integer, got '{}'",
            raw.trim()
        ))),
    }
}

/// Validate and apply one trade at the instrument's current price
pub fn execute(
    scope: &mut TradeScope,
    side: Side,
    quantity: Shares,
    rule: &PricingRule,
    now: DateTime<Utc>,
) -> Result<LedgerEntry> {
    if quantity == 0 {
        return Err(Error::InvalidQuantity("The quantity must be a positive integer".to_string()));
    }

    let price = scope.instrument.price;
    let amount = price
        .checked_mul(Decimal::from(quantity))
        .map(precision::round_money)
        .ok_or_else(|| Error::InsufficientFunds(format!(
            "Insufficient balance for this transaction: {} x {} is out of range",
            quantity, price
        )))?;

    // Validate everything before the first mutation
    match side {
        Side::Buy => {
            if amount > scope.account.cash {
                return Err(Error::InsufficientFunds(format!(
                    "Insufficient balance for this transaction: {} x {} costs {}, available {}",
                    quantity, price, amount, scope.account.cash
                )));
            }
            if quantity > scope.instrument.shares_remaining {
                return Err(Error::InsufficientSupply(format!(
                    "{} does not have that many shares left: {} remaining",
                    scope.instrument.code, scope.instrument.shares_remaining
                )));
            }
        }
        Side::Sell => {
            if quantity > scope.holding.shares {
                return Err(Error::InsufficientHoldings(format!(
                    "You own {} shares of {}, cannot sell {}",
                    scope.holding.shares, scope.instrument.code, quantity
                )));
            }
        }
    }

    match side {
        Side::Buy => {
            scope.account.debit(amount)?;
            scope.instrument.issue_shares(quantity)?;
            scope.holding.add(quantity);
        }
        Side::Sell => {
            scope.holding.remove(quantity)?;
            scope.instrument.return_shares(quantity)?;
            scope.account.credit(amount);
        }
    }

    scope.instrument.reprice(side, quantity, rule);

    let net_worth = scope.net_worth();
    scope.net_worth_history.push(net_worth);
    scope.account.volatility = stats::coefficient_of_variation(&scope.net_worth_history);

    let created_at = next_timestamp(scope.last_entry_at, now);
    scope.last_entry_at = Some(created_at);

    Ok(LedgerEntry {
        id: Uuid::new_v4(),
        account_id: scope.account.id,
        code: scope.instrument.code.clone(),
        side,
        quantity,
        price,
        amount,
        net_worth,
        created_at,
    })
}

/// Keep ledger timestamps strictly increasing per account
fn next_timestamp(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match last {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    }
}
