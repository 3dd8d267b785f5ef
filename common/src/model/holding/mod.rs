//! Holding models: how many shares of an instrument an account owns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Shares;
use crate::error::{Error, Result};
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Shares of one instrument owned by one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Holding {
    /// Owning account
    pub account_id: Uuid,
    /// Instrument code
    pub code: String,
    /// Shares owned
    pub shares: Shares,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// Create an empty holding
    pub fn new(account_id: Uuid, code: String) -> Self {
        Self {
            account_id,
            code,
            shares: 0,
            updated_at: Utc::now(),
        }
    }

    /// Add bought shares
    pub fn add(&mut self, quantity: Shares) {
        self.shares += quantity;
        self.updated_at = Utc::now();
    }

    /// Remove sold shares
    pub fn remove(&mut self, quantity: Shares) -> Result<()> {
        if quantity > self.shares {
            return Err(Error::InsufficientHoldings(format!(
                "You own {} shares of {}, cannot sell {}",
                self.shares, self.code, quantity
            )));
        }

        self.shares -= quantity;
        self.updated_at = Utc::now();
        Ok(())
    }
}
