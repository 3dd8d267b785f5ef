use common::decimal::dec;
use common::error::{Error, Result};
use common::model::{Account, Instrument, LedgerEntry, LoanTerms, PricingRule, Side};
use exchange_service::repository::ExchangeRepository;
use exchange_service::trade::{self, TradeScope};
use exchange_service::InMemoryExchangeRepository;
use std::sync::Arc;
use uuid::Uuid;

async fn seeded() -> (InMemoryExchangeRepository, Account) {
    let repo = InMemoryExchangeRepository::new();
    let account = repo.insert_account(Account::open("alice", &LoanTerms::default())).await.unwrap();
    repo.insert_instrument(Instrument::list("ACME", "Acme Corp", dec!(100), 1000).unwrap()).await.unwrap();
    repo.insert_instrument(Instrument::list("BOLT", "Bolt Motors", dec!(20), 500).unwrap()).await.unwrap();
    (repo, account)
}

#[tokio::test]
async fn test_duplicate_names_are_rejected() {
    let (repo, _) = seeded().await;

    let dup_user = repo.insert_account(Account::open("alice", &LoanTerms::default())).await;
    assert!(matches!(dup_user, Err(Error::AlreadyExists(_))));

    let dup_code = repo.insert_instrument(Instrument::list("acme", "Other", dec!(1), 1).unwrap()).await;
    assert!(matches!(dup_code, Err(Error::AlreadyExists(_))));

    let dup_name = repo.insert_instrument(Instrument::list("ACM2", "Acme Corp", dec!(1), 1).unwrap()).await;
    assert!(matches!(dup_name, Err(Error::AlreadyExists(_))));
}

#[tokio::test]
async fn test_instruments_are_sorted_by_code() {
    let (repo, _) = seeded().await;
    repo.insert_instrument(Instrument::list("AAA", "Triple A", dec!(5), 10).unwrap()).await.unwrap();

    let codes: Vec<String> = repo.list_instruments().await.unwrap().into_iter().map(|i| i.code).collect();
    assert_eq!(codes, vec!["AAA", "ACME", "BOLT"]);
}

#[tokio::test]
async fn test_holdings_are_created_lazily() {
    let (repo, account) = seeded().await;
    assert!(repo.get_holdings(account.id).await.unwrap().is_empty());

    let rule = PricingRule::default();
    repo.with_trade_scope(account.id, "BOLT", Box::new(move |scope: &mut TradeScope| {
        trade::execute(scope, Side::Buy, 3, &rule, chrono::Utc::now())
    }))
    .await
    .unwrap();

    let holdings = repo.get_holdings(account.id).await.unwrap();
    assert_eq!(holdings.len(), 1);
    assert_eq!(holdings[0].code, "BOLT");
    assert_eq!(holdings[0].shares, 3);
    assert!(repo.get_holding(account.id, "ACME").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_work_persists_nothing() {
    let (repo, account) = seeded().await;

    let result = repo
        .with_trade_scope(account.id, "ACME", Box::new(|scope: &mut TradeScope| -> Result<LedgerEntry> {
            scope.account.cash = dec!(0);
            scope.instrument.shares_remaining = 0;
            Err(Error::Internal("abort".to_string()))
        }))
        .await;
    assert!(result.is_err());

    let stored = repo.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(stored.cash, dec!(10000));
    let instrument = repo.get_instrument("ACME").await.unwrap().unwrap();
    assert_eq!(instrument.shares_remaining, 1000);
    assert!(repo.get_ledger(account.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_trade_scope_requires_known_rows() {
    let (repo, account) = seeded().await;
    let rule = PricingRule::default();

    let missing_account = repo
        .with_trade_scope(Uuid::new_v4(), "ACME", Box::new(move |scope: &mut TradeScope| {
            trade::execute(scope, Side::Buy, 1, &rule, chrono::Utc::now())
        }))
        .await;
    assert!(matches!(missing_account, Err(Error::AccountNotFound(_))));

    let missing_instrument = repo
        .with_trade_scope(account.id, "NOPE", Box::new(move |scope: &mut TradeScope| {
            trade::execute(scope, Side::Buy, 1, &rule, chrono::Utc::now())
        }))
        .await;
    assert!(matches!(missing_instrument, Err(Error::InstrumentNotFound(_))));
}

#[tokio::test]
async fn test_ledger_is_newest_first() {
    let (repo, account) = seeded().await;
    let rule = PricingRule::default();

    for code in ["ACME", "BOLT", "ACME"] {
        repo.with_trade_scope(account.id, code, Box::new(move |scope: &mut TradeScope| {
            trade::execute(scope, Side::Buy, 1, &rule, chrono::Utc::now())
        }))
        .await
        .unwrap();
    }

    let ledger = repo.get_ledger(account.id).await.unwrap();
    assert_eq!(ledger.len(), 3);
    assert!(ledger.windows(2).all(|w| w[0].created_at > w[1].created_at));
    assert_eq!(ledger[1].code, "BOLT");
}

#[tokio::test]
async fn test_sweep_touches_every_account() {
    let (repo, _) = seeded().await;
    repo.insert_account(Account::open("bob", &LoanTerms::default())).await.unwrap();

    let count = repo
        .sweep_accounts(Arc::new(|account: &mut Account| account.cash += dec!(1)))
        .await
        .unwrap();
    assert_eq!(count, 2);

    for account in repo.list_accounts().await.unwrap() {
        assert_eq!(account.cash, dec!(10001));
    }
}

#[tokio::test]
async fn test_with_account_rolls_back_on_error() {
    let (repo, account) = seeded().await;
    let terms = LoanTerms::default();

    repo.with_account(account.id, Box::new(move |a: &mut Account| a.issue_loan(&terms))).await.unwrap();
    let result = repo.with_account(account.id, Box::new(move |a: &mut Account| a.issue_loan(&terms))).await;
    assert!(matches!(result, Err(Error::LoanLimitReached(_))));

    let stored = repo.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(stored.loan, dec!(20000));
    assert_eq!(stored.loans_issued, 2);
}

#[tokio::test]
async fn test_snapshot_is_consistent_under_concurrent_trades() {
    let (repo, account) = seeded().await;
    let repo = Arc::new(repo);
    let rule = PricingRule::default();

    let trader = {
        let repo = repo.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                repo.with_trade_scope(account.id, "BOLT", Box::new(move |scope: &mut TradeScope| {
                    trade::execute(scope, Side::Buy, 1, &rule, chrono::Utc::now())
                }))
                .await
                .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    for _ in 0..50 {
        let snapshot = repo.snapshot().await.unwrap();
        assert_eq!(snapshot.accounts.len(), 1);
        assert_eq!(snapshot.instruments.iter().map(|i| i.code.as_str()).collect::<Vec<_>>(), ["ACME", "BOLT"]);

        // Sold shares and unsold supply always add up to the listed supply
        for instrument in &snapshot.instruments {
            let held: u64 = snapshot.holdings.iter()
                .filter(|h| h.code == instrument.code)
                .map(|h| h.shares)
                .sum();
            assert_eq!(held + instrument.shares_remaining, instrument.shares_outstanding);
        }
        tokio::task::yield_now().await;
    }

    trader.await.unwrap();
    let snapshot = repo.snapshot().await.unwrap();
    assert_eq!(snapshot.holdings.len(), 1);
    assert_eq!(snapshot.holdings[0].shares, 50);
}
