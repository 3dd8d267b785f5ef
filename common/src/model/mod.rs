//! Domain models for the exchange simulation

pub mod account;
pub mod instrument;
pub mod holding;
pub mod ledger;

pub use account::{Account, LoanTerms};
pub use instrument::{Instrument, PricingRule, MAX_PRICE, MAX_SHARES};
pub use holding::Holding;
pub use ledger::{LedgerEntry, Side};
