//! Configuration for the exchange service

use std::env;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::error::{Error, Result};
use common::model::{LoanTerms, PricingRule, MAX_PRICE};
use rust_decimal::Decimal;

/// Trading window outside of which trades and loan requests are refused
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketHours {
    /// First instant trading is allowed
    pub open: DateTime<Utc>,
    /// Last instant trading is allowed
    pub close: DateTime<Utc>,
}

impl MarketHours {
    /// Whether `at` falls inside the window (both ends inclusive)
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        at >= self.open && at <= self.close
    }
}

/// Configuration for the exchange service
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Database URL; the in-memory repository is used when absent
    pub database_url: Option<String>,
    /// Database connection pool size
    pub db_pool_size: u32,
    /// Loan size, limit and interest rate
    pub loan_terms: LoanTerms,
    /// Post-trade price update
    pub pricing: PricingRule,
    /// Optional trading window
    pub market_hours: Option<MarketHours>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        let loans = LoanTerms::default();
        let pricing = PricingRule::default();
        Self {
            database_url: env::var("DATABASE_URL").ok(),
            db_pool_size: env_parse("DB_POOL_SIZE").unwrap_or(5),
            loan_terms: LoanTerms {
                amount: env_parse("LOAN_AMOUNT").unwrap_or(loans.amount),
                max_issues: env_parse("MAX_LOAN_ISSUE").unwrap_or(loans.max_issues),
                rate: env_parse("RATE_OF_INTEREST").unwrap_or(loans.rate),
            },
            pricing: PricingRule {
                retention: env_parse("PRICE_RETENTION").unwrap_or(pricing.retention),
                min_price: env_parse("MIN_PRICE").unwrap_or(pricing.min_price),
            },
            market_hours: match (env_parse("MARKET_OPEN"), env_parse("MARKET_CLOSE")) {
                (Some(open), Some(close)) => Some(MarketHours { open, close }),
                _ => None,
            },
        }
    }
}

impl ExchangeConfig {
    /// Create a new configuration using environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Configuration with built-in defaults and no database, ignoring the environment
    pub fn in_memory() -> Self {
        Self {
            database_url: None,
            db_pool_size: 5,
            loan_terms: LoanTerms::default(),
            pricing: PricingRule::default(),
            market_hours: None,
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.loan_terms.amount <= Decimal::ZERO {
            return Err(Error::ConfigurationError("LOAN_AMOUNT must be positive".to_string()));
        }
        if self.loan_terms.rate < Decimal::ZERO {
            return Err(Error::ConfigurationError("RATE_OF_INTEREST cannot be negative".to_string()));
        }
        if self.pricing.retention < Decimal::ZERO {
            return Err(Error::ConfigurationError("PRICE_RETENTION cannot be negative".to_string()));
        }
        if self.pricing.min_price <= Decimal::ZERO || self.pricing.min_price > MAX_PRICE {
            return Err(Error::ConfigurationError(format!("MIN_PRICE must be positive and at most {}", MAX_PRICE)));
        }
        if let Some(hours) = &self.market_hours {
            if hours.open > hours.close {
                return Err(Error::ConfigurationError(format!(
                    "MARKET_OPEN ({}) is after MARKET_CLOSE ({})",
                    hours.open, hours.close
                )));
            }
        }
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::decimal::dec;

    #[test]
    fn in_memory_defaults_are_valid() {
        let config = ExchangeConfig::in_memory();
        assert!(config.validate().is_ok());
        assert_eq!(config.loan_terms.amount, dec!(10000));
        assert!(config.market_hours.is_none());
    }

    #[test]
    fn inverted_market_hours_are_rejected() {
        let now = Utc::now();
        let mut config = ExchangeConfig::in_memory();
        config.market_hours = Some(MarketHours { open: now, close: now - Duration::hours(1) });
        assert!(matches!(config.validate(), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn market_hours_are_inclusive() {
        let open = Utc::now();
        let close = open + Duration::hours(2);
        let hours = MarketHours { open, close };
        assert!(hours.is_open(open));
        assert!(hours.is_open(close));
        assert!(!hours.is_open(close + Duration::seconds(1)));
    }
}
