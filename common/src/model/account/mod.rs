//! Account models and loan bookkeeping

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{dec, precision, Amount};
use crate::error::{Error, Result};
#[cfg(feature = "utoipa")]
use crate::utoipa::ToSchema;

/// Fixed loan conditions shared by every account
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Size of one loan, also the size of one installment
    pub amount: Amount,
    /// Lifetime number of loans an account may take (the opening grant counts)
    pub max_issues: u32,
    /// Interest rate applied per accrual run
    pub rate: Decimal,
}

impl Default for LoanTerms {
    fn default() -> Self {
        Self {
            amount: dec!(10000),
            max_issues: 2,
            rate: dec!(0.15),
        }
    }
}

/// Trading account holding a user's simulated cash and loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,
    /// Unique display name used on the leaderboard
    pub username: String,
    /// Liquid cash, never negative
    pub cash: Amount,
    /// Outstanding loan balance
    pub loan: Amount,
    /// Installments still to be repaid
    pub loan_count: u32,
    /// Loans issued over the account's lifetime
    pub loans_issued: u32,
    /// Coefficient of variation of historical net worth (leaderboard tie-breaker)
    pub volatility: Decimal,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account funded by its first loan
    pub fn open(username: impl Into<String>, terms: &LoanTerms) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            cash: terms.amount,
            loan: terms.amount,
            loan_count: 1,
            loans_issued: 1,
            volatility: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remove cash for a purchase
    pub fn debit(&mut self, amount: Amount) -> Result<()> {
        if amount > self.cash {
            return Err(Error::InsufficientFunds(format!(
                "Insufficient balance for this transaction: need {}, available {}",
                amount, self.cash
            )));
        }

        self.cash -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Add cash from a sale
    pub fn credit(&mut self, amount: Amount) {
        self.cash += amount;
        self.updated_at = Utc::now();
    }

    /// Take one more loan
    pub fn issue_loan(&mut self, terms: &LoanTerms) -> Result<()> {
        if self.loans_issued >= terms.max_issues {
            return Err(Error::LoanLimitReached(format!(
                "You can take at most {} loans",
                terms.max_issues
            )));
        }

        self.loan_count += 1;
        self.loans_issued += 1;
        self.loan += terms.amount;
        self.cash += terms.amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Repay one installment of `terms.amount`
    pub fn pay_installment(&mut self, terms: &LoanTerms) -> Result<()> {
        if self.loan_count == 0 || self.loan < terms.amount {
            return Err(Error::InstallmentRejected("No installment is outstanding".to_string()));
        }
        if self.cash < terms.amount {
            return Err(Error::InstallmentRejected(format!(
                "Minimum installment amount is {} and you should have sufficient balance",
                terms.amount
            )));
        }

        self.loan_count -= 1;
        self.loan -= terms.amount;
        self.cash -= terms.amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Charge simple interest on the outstanding loan.
    ///
    /// Interest the cash balance cannot cover is added to the loan, so cash
    /// never goes negative. Returns the interest charged.
    pub fn accrue_interest(&mut self, terms: &LoanTerms) -> Amount {
        let interest = precision::round_money(self.loan * terms.rate);
        if interest <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let paid = interest.min(self.cash);
        self.cash -= paid;
        self.loan += interest - paid;
        self.updated_at = Utc::now();
        interest
    }

    /// Repay the whole loan from cash, as far as cash allows.
    ///
    /// Returns the amount repaid. Counters reset only once nothing is owed.
    pub fn settle_loan(&mut self) -> Amount {
        let paid = self.loan.min(self.cash);
        self.cash -= paid;
        self.loan -= paid;
        if self.loan.is_zero() {
            self.loan_count = 0;
            self.loans_issued = 0;
        }
        self.updated_at = Utc::now();
        paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> LoanTerms {
        LoanTerms::default()
    }

    #[test]
    fn opening_grant_is_the_first_loan() {
        let account = Account::open("alice", &terms());
        assert_eq!(account.cash, dec!(10000));
        assert_eq!(account.loan, dec!(10000));
        assert_eq!(account.loan_count, 1);
        assert_eq!(account.loans_issued, 1);
    }

    #[test]
    fn loan_issue_respects_lifetime_limit() {
        let mut account = Account::open("bob", &terms());
        account.issue_loan(&terms()).unwrap();
        assert_eq!(account.cash, dec!(20000));
        assert_eq!(account.loan, dec!(20000));
        assert_eq!(account.loan_count, 2);

        // Repaying does not restore issue rights
        account.pay_installment(&terms()).unwrap();
        assert!(matches!(account.issue_loan(&terms()), Err(Error::LoanLimitReached(_))));
    }

    #[test]
    fn installment_requires_cash_and_debt() {
        let mut account = Account::open("carol", &terms());
        account.cash = dec!(9999.99);
        assert!(matches!(account.pay_installment(&terms()), Err(Error::InstallmentRejected(_))));

        account.cash = dec!(10000);
        account.pay_installment(&terms()).unwrap();
        assert_eq!(account.cash, Decimal::ZERO);
        assert_eq!(account.loan, Decimal::ZERO);
        assert_eq!(account.loan_count, 0);

        account.cash = dec!(50000);
        assert!(matches!(account.pay_installment(&terms()), Err(Error::InstallmentRejected(_))));
    }

    #[test]
    fn interest_is_capitalised_when_cash_runs_out() {
        let mut account = Account::open("dave", &terms());
        assert_eq!(account.accrue_interest(&terms()), dec!(1500));
        assert_eq!(account.cash, dec!(8500));
        assert_eq!(account.loan, dec!(10000));

        account.cash = dec!(100);
        account.accrue_interest(&terms());
        assert_eq!(account.cash, Decimal::ZERO);
        assert_eq!(account.loan, dec!(11400));
    }

    #[test]
    fn settle_pays_what_cash_covers() {
        let mut account = Account::open("erin", &terms());
        account.cash = dec!(4000);
        assert_eq!(account.settle_loan(), dec!(4000));
        assert_eq!(account.loan, dec!(6000));
        assert_eq!(account.loan_count, 1);

        account.cash = dec!(7000);
        account.settle_loan();
        assert_eq!(account.cash, dec!(1000));
        assert!(account.loan.is_zero());
        assert_eq!(account.loans_issued, 0);
    }
}
