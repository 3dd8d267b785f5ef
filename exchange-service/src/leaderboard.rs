//! Leaderboard ranking

use common::decimal::Amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
#[cfg(feature = "utoipa")]
use utoipa::ToSchema;
use uuid::Uuid;

/// One ranked account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    /// Account ID
    pub account_id: Uuid,
    /// Account username
    pub username: String,
    /// Cash plus market value of holdings
    pub net_worth: Amount,
    /// Volatility coefficient, lower wins ties
    pub volatility: Decimal,
}

/// Sort by net worth descending, then volatility ascending, and assign ranks.
///
/// The sort is stable, so accounts equal on both keys keep their input order.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        b.net_worth
            .cmp(&a.net_worth)
            .then_with(|| a.volatility.cmp(&b.volatility))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::decimal::dec;

    fn entry(name: &str, net_worth: Amount, volatility: Decimal) -> LeaderboardEntry {
        LeaderboardEntry {
            rank: 0,
            account_id: Uuid::new_v4(),
            username: name.to_string(),
            net_worth,
            volatility,
        }
    }

    #[test]
    fn orders_by_net_worth_then_volatility() {
        let ranked = rank(vec![
            entry("low", dec!(100), dec!(0)),
            entry("steady", dec!(500), dec!(0.10)),
            entry("risky", dec!(500), dec!(0.90)),
            entry("top", dec!(900), dec!(2)),
        ]);
        let names: Vec<_> = ranked.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["top", "steady", "risky", "low"]);
        assert_eq!(ranked.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let ranked = rank(vec![
            entry("first", dec!(10), dec!(0.5)),
            entry("second", dec!(10), dec!(0.5)),
            entry("third", dec!(10), dec!(0.5)),
        ]);
        let names: Vec<_> = ranked.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
