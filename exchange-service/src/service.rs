//! Exchange service: registration, trading, loans and read-side queries

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::decimal::{Amount, Price, Shares};
use common::error::{Error, ErrorExt, Result};
use common::model::instrument::normalize_code;
use common::model::{Account, Holding, Instrument, LedgerEntry, Side};
use serde::{Deserialize, Serialize};
#[cfg(feature = "utoipa")]
use utoipa::ToSchema;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ExchangeConfig;
use crate::leaderboard::{self, LeaderboardEntry};
use crate::repository::{ExchangeRepository, InMemoryExchangeRepository, PostgresExchangeRepository};
use crate::{stats, trade};

/// Maximum username length
pub const MAX_USERNAME_LEN: usize = 120;

/// Repository Type
pub enum RepositoryType {
    /// In-memory repository
    InMemory,
    /// PostgreSQL repository
    Postgres(Option<String>),
}

/// One valued position in a portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct PortfolioPosition {
    /// Instrument code
    pub code: String,
    /// Instrument name
    pub name: String,
    /// Shares owned
    pub shares: Shares,
    /// Current price
    pub price: Price,
    /// shares * price
    pub value: Amount,
}

/// Account with its valued holdings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Portfolio {
    /// The account
    pub account: Account,
    /// Non-empty holdings sorted by code
    pub positions: Vec<PortfolioPosition>,
    /// Cash plus the value of every position
    pub net_worth: Amount,
}

/// Exchange service coordinating accounts, instruments and trades
pub struct ExchangeService {
    /// Repository for exchange data
    repo: Arc<dyn ExchangeRepository>,
    /// Loan, pricing and market-hours settings
    config: ExchangeConfig,
}

impl Default for ExchangeService {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeService {
    /// Create a new in-memory exchange service with default settings
    pub fn new() -> Self {
        Self::in_memory(ExchangeConfig::in_memory())
    }

    /// Create an in-memory exchange service with custom settings
    pub fn in_memory(config: ExchangeConfig) -> Self {
        Self {
            repo: Arc::new(InMemoryExchangeRepository::new()),
            config,
        }
    }

    /// Create a service over an existing repository
    pub fn with_repo(repo: Arc<dyn ExchangeRepository>, config: ExchangeConfig) -> Self {
        Self { repo, config }
    }

    /// Create a new exchange service with a specific repository type
    pub async fn with_repository(repo_type: RepositoryType, mut config: ExchangeConfig) -> Result<Self> {
        config.validate()?;
        let repo: Arc<dyn ExchangeRepository> = match repo_type {
            RepositoryType::InMemory => Arc::new(InMemoryExchangeRepository::new()),
            RepositoryType::Postgres(database_url) => {
                if database_url.is_some() {
                    config.database_url = database_url;
                }
                Arc::new(PostgresExchangeRepository::with_config(&config).await?)
            }
        };

        Ok(Self { repo, config })
    }

    /// Create a service from configuration: PostgreSQL when a database URL is set
    pub async fn with_config(config: ExchangeConfig) -> Result<Self> {
        let repo_type = match &config.database_url {
            Some(url) => RepositoryType::Postgres(Some(url.clone())),
            None => RepositoryType::InMemory,
        };
        Self::with_repository(repo_type, config).await
    }

    /// Active configuration
    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Register a new account funded by the opening loan
    pub async fn register_account(&self, username: &str) -> Result<Account> {
        let username = username.trim();
        if username.is_empty() || username.len() > MAX_USERNAME_LEN {
            return Err(Error::ValidationError(format!(
                "Username must be 1 to {} characters",
                MAX_USERNAME_LEN
            )));
        }

        info!("Registering account {}", username);
        self.repo.insert_account(Account::open(username, &self.config.loan_terms)).await
    }

    /// Get an account by ID
    pub async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        self.repo.get_account(id).await
    }

    async fn require_account(&self, id: Uuid) -> Result<Account> {
        self.repo.get_account(id).await
            .with_context(|| format!("Failed to retrieve account {}", id))?
            .ok_or_else(|| Error::AccountNotFound(format!("Account not found: {}", id)))
    }

    /// List a new instrument
    pub async fn list_instrument(&self, code: &str, name: &str, price: Price, shares_outstanding: Shares) -> Result<Instrument> {
        let instrument = Instrument::list(code, name, price, shares_outstanding)?;
        info!("Listing instrument {} ({}) at {}", instrument.code, instrument.name, instrument.price);
        self.repo.insert_instrument(instrument).await
    }

    /// Get an instrument by code (case-insensitive)
    pub async fn get_instrument(&self, code: &str) -> Result<Option<Instrument>> {
        match normalize_code(code) {
            Ok(code) => self.repo.get_instrument(&code).await,
            Err(_) => Ok(None),
        }
    }

    /// All instruments sorted by code
    pub async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        self.repo.list_instruments().await
    }

    /// Shares an account owns of an instrument, an empty holding if it never traded it
    pub async fn get_holding(&self, account_id: Uuid, code: &str) -> Result<Holding> {
        let code = normalize_code(code)
            .map_err(|_| Error::InstrumentNotFound(format!("No instrument with code {}", code)))?;
        Ok(self.repo.get_holding(account_id, &code).await?
            .unwrap_or_else(|| Holding::new(account_id, code)))
    }

    /// Buy or sell shares at the instrument's current price
    pub async fn trade(&self, account_id: Uuid, code: &str, side: Side, quantity: Shares) -> Result<LedgerEntry> {
        self.ensure_market_open(Utc::now())?;
        if quantity == 0 {
            return Err(Error::InvalidQuantity("The quantity must be a positive integer".to_string()));
        }
        let code = normalize_code(code)
            .map_err(|_| Error::InstrumentNotFound(format!("No instrument with code {}", code)))?;

        debug!("Trade request: account {} {} {} {}", account_id, side, quantity, code);

        let rule = self.config.pricing;
        let result = self.repo
            .with_trade_scope(account_id, &code, Box::new(move |scope: &mut trade::TradeScope| {
                trade::execute(scope, side, quantity, &rule, Utc::now())
            }))
            .await;

        match &result {
            Ok(entry) => info!(
                "Trade complete: account {} {} {} {} at {} (net worth {})",
                account_id, entry.side, entry.quantity, entry.code, entry.price, entry.net_worth
            ),
            Err(e) if e.is_user_error() => warn!("Trade rejected for account {}: {}", account_id, e),
            Err(_) => {}
        }
        result
    }

    /// Trade from raw form fields (`mode`, `quantity`)
    pub async fn trade_form(&self, account_id: Uuid, code: &str, mode: &str, quantity: &str) -> Result<LedgerEntry> {
        let side = mode.parse::<Side>()?;
        let quantity = trade::parse_quantity(quantity)?;
        self.trade(account_id, code, side, quantity).await
    }

    /// Account, valued holdings and net worth
    pub async fn portfolio(&self, account_id: Uuid) -> Result<Portfolio> {
        let account = self.require_account(account_id).await?;
        let instruments: HashMap<String, Instrument> = self.repo.list_instruments().await?
            .into_iter()
            .map(|i| (i.code.clone(), i))
            .collect();

        let positions: Vec<PortfolioPosition> = self.repo.get_holdings(account_id).await?
            .into_iter()
            .filter(|h| h.shares > 0)
            .filter_map(|h| {
                instruments.get(&h.code).map(|i| PortfolioPosition {
                    code: h.code.clone(),
                    name: i.name.clone(),
                    shares: h.shares,
                    price: i.price,
                    value: stats::position_value(h.shares, i.price),
                })
            })
            .collect();

        let net_worth = stats::net_worth(account.cash, positions.iter().map(|p| (p.shares, p.price)));
        Ok(Portfolio { account, positions, net_worth })
    }

    /// Completed trades of an account, newest first
    pub async fn ledger(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>> {
        self.require_account(account_id).await?;
        self.repo.get_ledger(account_id).await
    }

    /// Take one more loan
    pub async fn issue_loan(&self, account_id: Uuid) -> Result<Account> {
        self.ensure_market_open(Utc::now())?;
        let terms = self.config.loan_terms;
        let account = self.repo
            .with_account(account_id, Box::new(move |account: &mut Account| account.issue_loan(&terms)))
            .await?;
        info!("Loan issued to account {}: loan now {}", account_id, account.loan);
        Ok(account)
    }

    /// Repay one installment
    pub async fn pay_installment(&self, account_id: Uuid) -> Result<Account> {
        self.ensure_market_open(Utc::now())?;
        let terms = self.config.loan_terms;
        let account = self.repo
            .with_account(account_id, Box::new(move |account: &mut Account| account.pay_installment(&terms)))
            .await?;
        info!("Installment paid by account {}: loan now {}", account_id, account.loan);
        Ok(account)
    }

    /// Loan request from the raw form field (`issue` or `pay`)
    pub async fn loan_form(&self, account_id: Uuid, mode: &str) -> Result<Account> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "issue" => self.issue_loan(account_id).await,
            "pay" => self.pay_installment(account_id).await,
            other => Err(Error::ValidationError(format!("Please enter a valid mode, got '{}'", other))),
        }
    }

    /// Charge interest on every outstanding loan; returns the number of accounts processed
    pub async fn accrue_interest(&self) -> Result<usize> {
        let terms = self.config.loan_terms;
        let count = self.repo
            .sweep_accounts(Arc::new(move |account: &mut Account| {
                account.accrue_interest(&terms);
            }))
            .await?;
        info!("Interest accrued on {} accounts at rate {}", count, terms.rate);
        Ok(count)
    }

    /// Repay every loan from cash as far as possible; returns the number of accounts processed
    pub async fn settle_loans(&self) -> Result<usize> {
        let count = self.repo
            .sweep_accounts(Arc::new(|account: &mut Account| {
                account.settle_loan();
            }))
            .await?;
        info!("Loans settled on {} accounts", count);
        Ok(count)
    }

    /// Every account ranked by net worth, volatility breaking ties
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let snapshot = self.repo.snapshot().await?;
        let prices: HashMap<String, Price> = snapshot.instruments
            .into_iter()
            .map(|i| (i.code, i.price))
            .collect();

        let mut positions: HashMap<Uuid, Vec<(Shares, Price)>> = HashMap::new();
        for holding in snapshot.holdings {
            if let Some(price) = prices.get(&holding.code) {
                positions.entry(holding.account_id).or_default().push((holding.shares, *price));
            }
        }

        let entries = snapshot.accounts
            .into_iter()
            .map(|account| LeaderboardEntry {
                rank: 0,
                account_id: account.id,
                net_worth: stats::net_worth(account.cash, positions.remove(&account.id).unwrap_or_default()),
                username: account.username,
                volatility: account.volatility,
            })
            .collect();

        Ok(leaderboard::rank(entries))
    }

    /// Fail with `MarketClosed` outside the configured trading window
    pub fn ensure_market_open(&self, at: DateTime<Utc>) -> Result<()> {
        match &self.config.market_hours {
            Some(hours) if !hours.is_open(at) => Err(Error::MarketClosed(format!(
                "The market will be live from {} to {}",
                hours.open.format("%Y-%m-%d %H:%M"),
                hours.close.format("%Y-%m-%d %H:%M")
            ))),
            _ => Ok(()),
        }
    }
}
