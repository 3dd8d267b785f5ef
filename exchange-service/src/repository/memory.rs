//! In-memory repository backed by a single lock over the whole store

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use common::error::{Error, Result};
use common::model::{Account, Holding, Instrument, LedgerEntry};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{AccountSweep, AccountWork, ExchangeRepository, MarketSnapshot, TradeWork};
use crate::trade::{Position, TradeScope};

#[derive(Default)]
struct Store {
    accounts: HashMap<Uuid, Account>,
    /// Account IDs in creation order
    account_order: Vec<Uuid>,
    instruments: BTreeMap<String, Instrument>,
    holdings: HashMap<(Uuid, String), Holding>,
    /// Ledger entries per account, oldest first
    ledger: HashMap<Uuid, Vec<LedgerEntry>>,
}

impl Store {
    fn accounts_in_order(&self) -> Vec<Account> {
        self.account_order
            .iter()
            .filter_map(|id| self.accounts.get(id).cloned())
            .collect()
    }
}

/// In-memory repository for exchange data.
///
/// Every write takes the store's write lock for its whole read-modify-write
/// sequence, which makes each trade atomic and serialised.
#[derive(Default)]
pub struct InMemoryExchangeRepository {
    store: RwLock<Store>,
}

impl InMemoryExchangeRepository {
    /// Create a new in-memory exchange repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExchangeRepository for InMemoryExchangeRepository {
    async fn insert_account(&self, account: Account) -> Result<Account> {
        let mut store = self.store.write().await;
        if store.accounts.values().any(|a| a.username == account.username) {
            return Err(Error::AlreadyExists(format!("Username '{}' is taken", account.username)));
        }

        store.account_order.push(account.id);
        store.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.store.read().await.accounts.get(&id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.store.read().await.accounts_in_order())
    }

    async fn insert_instrument(&self, instrument: Instrument) -> Result<Instrument> {
        let mut store = self.store.write().await;
        if store.instruments.contains_key(&instrument.code) {
            return Err(Error::AlreadyExists(format!("Instrument code '{}' is taken", instrument.code)));
        }
        if store.instruments.values().any(|i| i.name == instrument.name) {
            return Err(Error::AlreadyExists(format!("Instrument name '{}' is taken", instrument.name)));
        }

        store.instruments.insert(instrument.code.clone(), instrument.clone());
        Ok(instrument)
    }

    async fn get_instrument(&self, code: &str) -> Result<Option<Instrument>> {
        Ok(self.store.read().await.instruments.get(code).cloned())
    }

    async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        Ok(self.store.read().await.instruments.values().cloned().collect())
    }

    async fn get_holding(&self, account_id: Uuid, code: &str) -> Result<Option<Holding>> {
        let store = self.store.read().await;
        Ok(store.holdings.get(&(account_id, code.to_string())).cloned())
    }

    async fn get_holdings(&self, account_id: Uuid) -> Result<Vec<Holding>> {
        let store = self.store.read().await;
        let mut holdings: Vec<Holding> = store
            .holdings
            .values()
            .filter(|h| h.account_id == account_id)
            .cloned()
            .collect();
        holdings.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(holdings)
    }

    async fn snapshot(&self) -> Result<MarketSnapshot> {
        let store = self.store.read().await;
        Ok(MarketSnapshot {
            accounts: store.accounts_in_order(),
            instruments: store.instruments.values().cloned().collect(),
            holdings: store.holdings.values().cloned().collect(),
        })
    }

    async fn get_ledger(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let store = self.store.read().await;
        Ok(store
            .ledger
            .get(&account_id)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn with_trade_scope(&self, account_id: Uuid, code: &str, work: TradeWork) -> Result<LedgerEntry> {
        let mut store = self.store.write().await;
        debug!("Loading trade scope for account {} on {}", account_id, code);

        let account = store.accounts.get(&account_id).cloned()
            .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", account_id)))?;
        let instrument = store.instruments.get(code).cloned()
            .ok_or_else(|| Error::InstrumentNotFound(format!("No instrument with code {}", code)))?;
        let holding = store.holdings.get(&(account_id, code.to_string())).cloned()
            .unwrap_or_else(|| Holding::new(account_id, code.to_string()));

        let other_positions = store
            .holdings
            .values()
            .filter(|h| h.account_id == account_id && h.code != code && h.shares > 0)
            .filter_map(|h| {
                store.instruments.get(&h.code).map(|i| Position {
                    code: h.code.clone(),
                    shares: h.shares,
                    price: i.price,
                })
            })
            .collect();

        let history = store.ledger.get(&account_id);
        let mut scope = TradeScope {
            account,
            instrument,
            holding,
            other_positions,
            net_worth_history: history.map(|e| e.iter().map(|e| e.net_worth).collect()).unwrap_or_default(),
            last_entry_at: history.and_then(|e| e.last()).map(|e| e.created_at),
        };

        // Nothing is written unless the work succeeds
        let entry = work(&mut scope)?;

        store.accounts.insert(account_id, scope.account);
        store.instruments.insert(scope.instrument.code.clone(), scope.instrument);
        store.holdings.insert((account_id, code.to_string()), scope.holding);
        store.ledger.entry(account_id).or_default().push(entry.clone());
        Ok(entry)
    }

    async fn with_account(&self, account_id: Uuid, work: AccountWork) -> Result<Account> {
        let mut store = self.store.write().await;
        let mut account = store.accounts.get(&account_id).cloned()
            .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", account_id)))?;

        work(&mut account)?;

        store.accounts.insert(account_id, account.clone());
        Ok(account)
    }

    async fn sweep_accounts(&self, work: AccountSweep) -> Result<usize> {
        let mut store = self.store.write().await;
        for account in store.accounts.values_mut() {
            work(account);
        }
        Ok(store.accounts.len())
    }
}
