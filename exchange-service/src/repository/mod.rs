//! Repository for exchange data

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use common::error::Result;
use common::model::{Account, Holding, Instrument, LedgerEntry};
use uuid::Uuid;

use crate::trade::TradeScope;

pub use memory::InMemoryExchangeRepository;
pub use postgres::PostgresExchangeRepository;

/// Work applied to a locked trade scope; the scope is persisted only on `Ok`
pub type TradeWork = Box<dyn FnOnce(&mut TradeScope) -> Result<LedgerEntry> + Send>;

/// Work applied to one locked account; the account is persisted only on `Ok`
pub type AccountWork = Box<dyn FnOnce(&mut Account) -> Result<()> + Send>;

/// Change applied to every account in one pass
pub type AccountSweep = Arc<dyn Fn(&mut Account) + Send + Sync>;

/// Accounts, instruments and holdings read at one point in time
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    /// Accounts in creation order
    pub accounts: Vec<Account>,
    /// Instruments sorted by code
    pub instruments: Vec<Instrument>,
    /// Every holding of every account
    pub holdings: Vec<Holding>,
}

/// Exchange repository trait defining the interface for data storage
#[async_trait]
pub trait ExchangeRepository: Send + Sync {
    /// Store a new account; fails if the username is taken
    async fn insert_account(&self, account: Account) -> Result<Account>;

    /// Get an account by ID
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>>;

    /// All accounts in creation order
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Store a new instrument; fails if the code or name is taken
    async fn insert_instrument(&self, instrument: Instrument) -> Result<Instrument>;

    /// Get an instrument by code
    async fn get_instrument(&self, code: &str) -> Result<Option<Instrument>>;

    /// All instruments sorted by code
    async fn list_instruments(&self) -> Result<Vec<Instrument>>;

    /// Holding of an account in one instrument, if it ever traded it
    async fn get_holding(&self, account_id: Uuid, code: &str) -> Result<Option<Holding>>;

    /// All holdings of an account
    async fn get_holdings(&self, account_id: Uuid) -> Result<Vec<Holding>>;

    /// Accounts, instruments and holdings as of a single moment, unaffected by concurrent trades
    async fn snapshot(&self) -> Result<MarketSnapshot>;

    /// Ledger entries of an account, newest first
    async fn get_ledger(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>>;

    /// Lock the account and instrument, run `work` and persist the result atomically
    async fn with_trade_scope(&self, account_id: Uuid, code: &str, work: TradeWork) -> Result<LedgerEntry>;

    /// Lock one account, run `work` and persist the result atomically
    async fn with_account(&self, account_id: Uuid, work: AccountWork) -> Result<Account>;

    /// Apply `work` to every account atomically; returns the number of accounts
    async fn sweep_accounts(&self, work: AccountSweep) -> Result<usize>;
}
