//! Row types for the PostgreSQL tables.
//!
//! NUMERIC columns are selected as text (`cash::text AS cash`) and parsed
//! into `Decimal`, so the rows carry `String` fields.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Account, Holding, Instrument, LedgerEntry, Side};

fn decimal(column: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| Error::DecimalError(format!("{}: {}", column, e)))
}

fn count(column: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::Internal(format!("Negative {} in database: {}", column, value)))
}

/// Database model for the accounts table
#[derive(Debug, Clone, FromRow)]
pub struct DbAccount {
    pub id: Uuid,
    pub username: String,
    pub cash: String,
    pub loan: String,
    pub loan_count: i32,
    pub loans_issued: i32,
    pub volatility: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAccount> for Account {
    type Error = Error;

    fn try_from(row: DbAccount) -> Result<Self> {
        Ok(Account {
            id: row.id,
            username: row.username,
            cash: decimal("cash", &row.cash)?,
            loan: decimal("loan", &row.loan)?,
            loan_count: count("loan_count", row.loan_count.into())? as u32,
            loans_issued: count("loans_issued", row.loans_issued.into())? as u32,
            volatility: decimal("volatility", &row.volatility)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database model for the instruments table
#[derive(Debug, Clone, FromRow)]
pub struct DbInstrument {
    pub code: String,
    pub name: String,
    pub price: String,
    pub shares_outstanding: i64,
    pub shares_remaining: i64,
    pub change: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbInstrument> for Instrument {
    type Error = Error;

    fn try_from(row: DbInstrument) -> Result<Self> {
        Ok(Instrument {
            code: row.code,
            name: row.name,
            price: decimal("price", &row.price)?,
            shares_outstanding: count("shares_outstanding", row.shares_outstanding)?,
            shares_remaining: count("shares_remaining", row.shares_remaining)?,
            change: decimal("change", &row.change)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database model for the holdings table
#[derive(Debug, Clone, FromRow)]
pub struct DbHolding {
    pub account_id: Uuid,
    pub code: String,
    pub shares: i64,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbHolding> for Holding {
    type Error = Error;

    fn try_from(row: DbHolding) -> Result<Self> {
        Ok(Holding {
            account_id: row.account_id,
            code: row.code,
            shares: count("shares", row.shares)?,
            updated_at: row.updated_at,
        })
    }
}

/// Database model for the ledger_entries table
#[derive(Debug, Clone, FromRow)]
pub struct DbLedgerEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub code: String,
    pub side: String,
    pub quantity: i64,
    pub price: String,
    pub amount: String,
    pub net_worth: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbLedgerEntry> for LedgerEntry {
    type Error = Error;

    fn try_from(row: DbLedgerEntry) -> Result<Self> {
        Ok(LedgerEntry {
            id: row.id,
            account_id: row.account_id,
            code: row.code,
            side: row.side.parse::<Side>()?,
            quantity: count("quantity", row.quantity)?,
            price: decimal("price", &row.price)?,
            amount: decimal("amount", &row.amount)?,
            net_worth: decimal("net_worth", &row.net_worth)?,
            created_at: row.created_at,
        })
    }
}
