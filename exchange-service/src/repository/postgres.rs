//! PostgreSQL repository
//!
//! Trades lock the account row and then the instrument row with
//! `SELECT ... FOR UPDATE` inside one transaction. Sweeps lock accounts only,
//! so the fixed lock order cannot deadlock against trades.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::db::models::{DbAccount, DbHolding, DbInstrument, DbLedgerEntry};
use common::db::DbPool;
use common::error::{Error, Result};
use common::model::{Account, Holding, Instrument, LedgerEntry};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, Transaction};
use std::str::FromStr;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{AccountSweep, AccountWork, ExchangeRepository, MarketSnapshot, TradeWork};
use crate::config::ExchangeConfig;
use crate::trade::{Position, TradeScope};

const ACCOUNT_COLUMNS: &str = "id, username, cash::text AS cash, loan::text AS loan, loan_count, \
     loans_issued, volatility::text AS volatility, created_at, updated_at";

const INSTRUMENT_COLUMNS: &str = "code, name, price::text AS price, shares_outstanding, \
     shares_remaining, change::text AS change, created_at, updated_at";

const LEDGER_COLUMNS: &str = "id, account_id, code, side, quantity, price::text AS price, \
     amount::text AS amount, net_worth::text AS net_worth, created_at";

/// PostgreSQL repository for exchange data
pub struct PostgresExchangeRepository {
    /// Database connection pool
    pool: DbPool,
}

impl PostgresExchangeRepository {
    /// Wrap an existing pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured database URL and pool size
    pub async fn with_config(config: &ExchangeConfig) -> Result<Self> {
        let url = config.database_url.as_deref()
            .ok_or_else(|| Error::ConfigurationError("DATABASE_URL must be set".to_string()))?;

        info!("Connecting to PostgreSQL database with pool size: {}", config.db_pool_size);
        let pool = common::db::connect(url, config.db_pool_size).await?;
        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// The underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn map_unique(err: sqlx::Error, what: String) -> Error {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => Error::AlreadyExists(what),
        _ => Error::Database(err),
    }
}

/// Convert a share count for a BIGINT column
fn bigint(column: &str, value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::ValidationError(format!("{} is too large to store: {}", column, value)))
}

/// Convert a loan counter for an INTEGER column
fn integer(column: &str, value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::ValidationError(format!("{} is too large to store: {}", column, value)))
}

async fn lock_account(conn: &mut PgConnection, id: Uuid) -> Result<Account> {
    let row: Option<DbAccount> = sqlx::query_as(&format!(
        "SELECT {} FROM accounts WHERE id = $1 FOR UPDATE",
        ACCOUNT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", id)))?
        .try_into()
}

async fn save_account(conn: &mut PgConnection, account: &Account) -> Result<()> {
    sqlx::query(
        "UPDATE accounts SET cash = $2::numeric, loan = $3::numeric, loan_count = $4, \
         loans_issued = $5, volatility = $6::numeric, updated_at = $7 WHERE id = $1",
    )
    .bind(account.id)
    .bind(account.cash.to_string())
    .bind(account.loan.to_string())
    .bind(integer("loan_count", account.loan_count)?)
    .bind(integer("loans_issued", account.loans_issued)?)
    .bind(account.volatility.to_string())
    .bind(account.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn finish<T>(tx: Transaction<'static, Postgres>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!("Failed to roll back transaction: {}", rollback_err);
            }
            Err(e)
        }
    }
}

#[async_trait]
impl ExchangeRepository for PostgresExchangeRepository {
    async fn insert_account(&self, account: Account) -> Result<Account> {
        debug!("Creating account {} in database", account.username);

        sqlx::query(
            "INSERT INTO accounts (id, username, cash, loan, loan_count, loans_issued, volatility, created_at, updated_at) \
             VALUES ($1, $2, $3::numeric, $4::numeric, $5, $6, $7::numeric, $8, $9)",
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(account.cash.to_string())
        .bind(account.loan.to_string())
        .bind(integer("loan_count", account.loan_count)?)
        .bind(integer("loans_issued", account.loans_issued)?)
        .bind(account.volatility.to_string())
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, format!("Username '{}' is taken", account.username)))?;

        Ok(account)
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        debug!("Getting account from database: {}", id);

        let row: Option<DbAccount> = sqlx::query_as(&format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Account::try_from).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows: Vec<DbAccount> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts ORDER BY created_at, id",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    async fn insert_instrument(&self, instrument: Instrument) -> Result<Instrument> {
        debug!("Listing instrument {} in database", instrument.code);

        sqlx::query(
            "INSERT INTO instruments (code, name, price, shares_outstanding, shares_remaining, change, created_at, updated_at) \
             VALUES ($1, $2, $3::numeric, $4, $5, $6::numeric, $7, $8)",
        )
        .bind(&instrument.code)
        .bind(&instrument.name)
        .bind(instrument.price.to_string())
        .bind(bigint("shares_outstanding", instrument.shares_outstanding)?)
        .bind(bigint("shares_remaining", instrument.shares_remaining)?)
        .bind(instrument.change.to_string())
        .bind(instrument.created_at)
        .bind(instrument.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, format!("Instrument '{}' or '{}' already listed", instrument.code, instrument.name)))?;

        Ok(instrument)
    }

    async fn get_instrument(&self, code: &str) -> Result<Option<Instrument>> {
        let row: Option<DbInstrument> = sqlx::query_as(&format!(
            "SELECT {} FROM instruments WHERE code = $1",
            INSTRUMENT_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Instrument::try_from).transpose()
    }

    async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        let rows: Vec<DbInstrument> = sqlx::query_as(&format!(
            "SELECT {} FROM instruments ORDER BY code",
            INSTRUMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Instrument::try_from).collect()
    }

    async fn get_holding(&self, account_id: Uuid, code: &str) -> Result<Option<Holding>> {
        let row: Option<DbHolding> = sqlx::query_as(
            "SELECT account_id, code, shares, updated_at FROM holdings WHERE account_id = $1 AND code = $2",
        )
        .bind(account_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Holding::try_from).transpose()
    }

    async fn get_holdings(&self, account_id: Uuid) -> Result<Vec<Holding>> {
        let rows: Vec<DbHolding> = sqlx::query_as(
            "SELECT account_id, code, shares, updated_at FROM holdings WHERE account_id = $1 ORDER BY code",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Holding::try_from).collect()
    }

    async fn snapshot(&self) -> Result<MarketSnapshot> {
        let mut tx = self.pool.begin().await?;

        let result: Result<MarketSnapshot> = async {
            // Every read below sees the same committed state
            sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                .execute(&mut *tx)
                .await?;

            let accounts: Vec<DbAccount> = sqlx::query_as(&format!(
                "SELECT {} FROM accounts ORDER BY created_at, id",
                ACCOUNT_COLUMNS
            ))
            .fetch_all(&mut *tx)
            .await?;

            let instruments: Vec<DbInstrument> = sqlx::query_as(&format!(
                "SELECT {} FROM instruments ORDER BY code",
                INSTRUMENT_COLUMNS
            ))
            .fetch_all(&mut *tx)
            .await?;

            let holdings: Vec<DbHolding> = sqlx::query_as("SELECT account_id, code, shares, updated_at FROM holdings")
                .fetch_all(&mut *tx)
                .await?;

            Ok::<_, Error>(MarketSnapshot {
                accounts: accounts.into_iter().map(Account::try_from).collect::<Result<_>>()?,
                instruments: instruments.into_iter().map(Instrument::try_from).collect::<Result<_>>()?,
                holdings: holdings.into_iter().map(Holding::try_from).collect::<Result<_>>()?,
            })
        }
        .await;

        finish(tx, result).await
    }

    async fn get_ledger(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<DbLedgerEntry> = sqlx::query_as(&format!(
            "SELECT {} FROM ledger_entries WHERE account_id = $1 ORDER BY created_at DESC",
            LEDGER_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn with_trade_scope(&self, account_id: Uuid, code: &str, work: TradeWork) -> Result<LedgerEntry> {
        let mut tx = self.pool.begin().await?;

        let result: Result<LedgerEntry> = async {
            let account = lock_account(&mut tx, account_id).await?;

            let instrument: DbInstrument = sqlx::query_as(&format!(
                "SELECT {} FROM instruments WHERE code = $1 FOR UPDATE",
                INSTRUMENT_COLUMNS
            ))
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::InstrumentNotFound(format!("No instrument with code {}", code)))?;
            let instrument = Instrument::try_from(instrument)?;

            let holding: Option<DbHolding> = sqlx::query_as(
                "SELECT account_id, code, shares, updated_at FROM holdings \
                 WHERE account_id = $1 AND code = $2 FOR UPDATE",
            )
            .bind(account_id)
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?;
            let holding = match holding {
                Some(row) => Holding::try_from(row)?,
                None => Holding::new(account_id, code.to_string()),
            };

            let positions: Vec<(String, i64, String)> = sqlx::query_as(
                "SELECT h.code, h.shares, i.price::text FROM holdings h \
                 JOIN instruments i ON i.code = h.code \
                 WHERE h.account_id = $1 AND h.code <> $2 AND h.shares > 0",
            )
            .bind(account_id)
            .bind(code)
            .fetch_all(&mut *tx)
            .await?;
            let other_positions = positions
                .into_iter()
                .map(|(code, shares, price)| -> Result<Position> {
                    Ok(Position {
                        code,
                        shares: shares.max(0) as u64,
                        price: Decimal::from_str(&price)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let history: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
                "SELECT net_worth::text, created_at FROM ledger_entries \
                 WHERE account_id = $1 ORDER BY created_at",
            )
            .bind(account_id)
            .fetch_all(&mut *tx)
            .await?;
            let last_entry_at = history.last().map(|(_, at)| *at);
            let net_worth_history = history
                .iter()
                .map(|(worth, _)| Decimal::from_str(worth).map_err(Error::from))
                .collect::<Result<Vec<_>>>()?;

            let mut scope = TradeScope {
                account,
                instrument,
                holding,
                other_positions,
                net_worth_history,
                last_entry_at,
            };

            let entry = work(&mut scope)?;

            save_account(&mut tx, &scope.account).await?;

            sqlx::query(
                "UPDATE instruments SET price = $2::numeric, shares_remaining = $3, change = $4::numeric, \
                 updated_at = $5 WHERE code = $1",
            )
            .bind(&scope.instrument.code)
            .bind(scope.instrument.price.to_string())
            .bind(bigint("shares_remaining", scope.instrument.shares_remaining)?)
            .bind(scope.instrument.change.to_string())
            .bind(scope.instrument.updated_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO holdings (account_id, code, shares, updated_at) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (account_id, code) DO UPDATE SET shares = $3, updated_at = $4",
            )
            .bind(account_id)
            .bind(code)
            .bind(bigint("shares", scope.holding.shares)?)
            .bind(scope.holding.updated_at)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO ledger_entries (id, account_id, code, side, quantity, price, amount, net_worth, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6::numeric, $7::numeric, $8::numeric, $9)",
            )
            .bind(entry.id)
            .bind(entry.account_id)
            .bind(&entry.code)
            .bind(entry.side.as_str())
            .bind(bigint("quantity", entry.quantity)?)
            .bind(entry.price.to_string())
            .bind(entry.amount.to_string())
            .bind(entry.net_worth.to_string())
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;

            Ok::<_, Error>(entry)
        }
        .await;

        finish(tx, result).await
    }

    async fn with_account(&self, account_id: Uuid, work: AccountWork) -> Result<Account> {
        let mut tx = self.pool.begin().await?;

        let result: Result<Account> = async {
            let mut account = lock_account(&mut tx, account_id).await?;
            work(&mut account)?;
            save_account(&mut tx, &account).await?;
            Ok::<_, Error>(account)
        }
        .await;

        finish(tx, result).await
    }

    async fn sweep_accounts(&self, work: AccountSweep) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let result: Result<usize> = async {
            let rows: Vec<DbAccount> = sqlx::query_as(&format!(
                "SELECT {} FROM accounts ORDER BY id FOR UPDATE",
                ACCOUNT_COLUMNS
            ))
            .fetch_all(&mut *tx)
            .await?;

            let count = rows.len();
            for row in rows {
                let mut account = Account::try_from(row)?;
                work(&mut account);
                save_account(&mut tx, &account).await?;
            }
            Ok::<_, Error>(count)
        }
        .await;

        finish(tx, result).await
    }
}
