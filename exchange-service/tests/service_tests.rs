use std::sync::Arc;

use chrono::{Duration, Utc};
use common::decimal::dec;
use common::error::Error;
use common::model::{Side, MAX_PRICE, MAX_SHARES};
use exchange_service::{ExchangeConfig, ExchangeService, MarketHours};
use rust_decimal::Decimal;
use uuid::Uuid;

async fn market() -> ExchangeService {
    let service = ExchangeService::new();
    service.list_instrument("ACME", "Acme Corp", dec!(100), 1000).await.unwrap();
    service.list_instrument("BOLT", "Bolt Motors", dec!(3000), 50).await.unwrap();
    service
}

#[tokio::test]
async fn test_register_account_grants_opening_loan() {
    let service = ExchangeService::new();
    let account = service.register_account("alice").await.unwrap();

    assert!(account.id != Uuid::nil());
    assert_eq!(account.cash, dec!(10000));
    assert_eq!(account.loan, dec!(10000));
    assert_eq!(account.loan_count, 1);

    assert!(matches!(service.register_account("alice").await, Err(Error::AlreadyExists(_))));
    assert!(matches!(service.register_account("  ").await, Err(Error::ValidationError(_))));
}

#[tokio::test]
async fn test_buy_updates_every_party() {
    let service = market().await;
    let account = service.register_account("alice").await.unwrap();

    let entry = service.trade_form(account.id, "acme", "buy", "5").await.unwrap();
    assert_eq!(entry.side, Side::Buy);
    assert_eq!(entry.price, dec!(100));
    assert_eq!(entry.net_worth, dec!(9752.50));

    let account = service.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(account.cash, dec!(9500));

    let instrument = service.get_instrument("ACME").await.unwrap().unwrap();
    assert_eq!(instrument.shares_remaining, 995);
    assert_eq!(instrument.price, dec!(50.50));

    assert_eq!(service.get_holding(account.id, "ACME").await.unwrap().shares, 5);
}

#[tokio::test]
async fn test_unaffordable_buy_changes_nothing() {
    let service = market().await;
    let account = service.register_account("bob").await.unwrap();

    let result = service.trade(account.id, "BOLT", Side::Buy, 5).await;
    assert!(matches!(result, Err(Error::InsufficientFunds(_))));

    let account = service.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(account.cash, dec!(10000));
    let instrument = service.get_instrument("BOLT").await.unwrap().unwrap();
    assert_eq!(instrument.shares_remaining, 50);
    assert_eq!(instrument.price, dec!(3000));
    assert!(service.ledger(account.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_listing_and_quantity_are_rejected() {
    let service = ExchangeService::new();
    let listed = service.list_instrument("BIG", "Big Holdings", dec!(10000000000), 1_000_000).await;
    assert!(matches!(listed, Err(Error::ValidationError(_))));

    service.list_instrument("BIG", "Big Holdings", MAX_PRICE, MAX_SHARES).await.unwrap();
    let account = service.register_account("dave").await.unwrap();

    let result = service.trade_form(account.id, "BIG", "buy", "18446744073709551615").await;
    assert!(matches!(result, Err(Error::InsufficientFunds(_))));

    let account = service.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(account.cash, dec!(10000));
    let instrument = service.get_instrument("BIG").await.unwrap().unwrap();
    assert_eq!(instrument.shares_remaining, MAX_SHARES);
}

#[tokio::test]
async fn test_cannot_sell_more_than_owned() {
    let service = market().await;
    let account = service.register_account("carol").await.unwrap();
    service.trade(account.id, "ACME", Side::Buy, 5).await.unwrap();

    let result = service.trade(account.id, "ACME", Side::Sell, 10).await;
    assert!(matches!(result, Err(Error::InsufficientHoldings(_))));
    assert_eq!(service.get_holding(account.id, "ACME").await.unwrap().shares, 5);
}

#[tokio::test]
async fn test_form_input_is_validated() {
    let service = market().await;
    let account = service.register_account("dave").await.unwrap();

    for quantity in ["0", "-3", "abc", "2.5", ""] {
        let result = service.trade_form(account.id, "ACME", "buy", quantity).await;
        assert!(matches!(result, Err(Error::InvalidQuantity(_))), "quantity {:?}", quantity);
    }
    assert!(matches!(
        service.trade_form(account.id, "ACME", "hold", "1").await,
        Err(Error::ValidationError(_))
    ));
    assert!(matches!(
        service.trade(account.id, "NOPE", Side::Buy, 1).await,
        Err(Error::InstrumentNotFound(_))
    ));
    assert!(matches!(
        service.trade(Uuid::new_v4(), "ACME", Side::Buy, 1).await,
        Err(Error::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_portfolio_values_holdings() {
    let service = market().await;
    let account = service.register_account("erin").await.unwrap();
    service.trade(account.id, "ACME", Side::Buy, 10).await.unwrap();

    let portfolio = service.portfolio(account.id).await.unwrap();
    assert_eq!(portfolio.positions.len(), 1);
    let position = &portfolio.positions[0];
    // 100 * 0.5 + 100 * 10 / 1000
    assert_eq!(position.price, dec!(51));
    assert_eq!(position.value, dec!(510));
    assert_eq!(portfolio.net_worth, dec!(9510));

    service.trade(account.id, "ACME", Side::Sell, 10).await.unwrap();
    let portfolio = service.portfolio(account.id).await.unwrap();
    assert!(portfolio.positions.is_empty());
}

#[tokio::test]
async fn test_concurrent_buys_never_oversell() {
    let service = Arc::new(ExchangeService::new());
    service.list_instrument("TINY", "Tiny Supply", dec!(1), 10).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let account = service.register_account(&format!("trader{}", i)).await.unwrap();
            service.trade(account.id, "TINY", Side::Buy, 1).await
        }));
    }

    let mut filled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => filled += 1,
            Err(e) => assert!(matches!(e, Error::InsufficientSupply(_))),
        }
    }

    assert_eq!(filled, 10);
    let instrument = service.get_instrument("TINY").await.unwrap().unwrap();
    assert_eq!(instrument.shares_remaining, 0);
}

#[tokio::test]
async fn test_loans_and_interest() {
    let service = ExchangeService::new();
    let account = service.register_account("frank").await.unwrap();

    let account = service.loan_form(account.id, "issue").await.unwrap();
    assert_eq!(account.cash, dec!(20000));
    assert_eq!(account.loan_count, 2);
    assert!(matches!(service.issue_loan(account.id).await, Err(Error::LoanLimitReached(_))));

    let account = service.loan_form(account.id, "pay").await.unwrap();
    assert_eq!(account.cash, dec!(10000));
    assert_eq!(account.loan, dec!(10000));
    assert!(matches!(service.loan_form(account.id, "later").await, Err(Error::ValidationError(_))));

    assert_eq!(service.accrue_interest().await.unwrap(), 1);
    let account = service.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(account.cash, dec!(8500));

    service.settle_loans().await.unwrap();
    let account = service.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(account.cash, dec!(0));
    assert_eq!(account.loan, dec!(1500));
    assert_eq!(account.loan_count, 1);
}

#[tokio::test]
async fn test_leaderboard_orders_by_net_worth_then_volatility() {
    let service = market().await;
    let alice = service.register_account("alice").await.unwrap();
    service.register_account("bob").await.unwrap();
    service.register_account("carol").await.unwrap();

    service.trade(alice.id, "ACME", Side::Buy, 5).await.unwrap();

    let board = service.leaderboard().await.unwrap();
    let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, vec!["bob", "carol", "alice"]);
    assert_eq!(board.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(board[2].net_worth, dec!(9752.50));
}

#[tokio::test]
async fn test_volatility_tracks_net_worth_history() {
    let service = market().await;
    let account = service.register_account("gina").await.unwrap();

    service.trade(account.id, "ACME", Side::Buy, 5).await.unwrap();
    let after_one = service.get_account(account.id).await.unwrap().unwrap();
    assert_eq!(after_one.volatility, Decimal::ZERO);

    service.trade(account.id, "ACME", Side::Buy, 100).await.unwrap();
    let after_two = service.get_account(account.id).await.unwrap().unwrap();
    assert!(after_two.volatility > Decimal::ZERO);
}

#[tokio::test]
async fn test_closed_market_refuses_trades() {
    let now = Utc::now();
    let mut config = ExchangeConfig::in_memory();
    config.market_hours = Some(MarketHours {
        open: now - Duration::hours(3),
        close: now - Duration::hours(1),
    });
    let service = ExchangeService::in_memory(config);
    service.list_instrument("ACME", "Acme Corp", dec!(100), 1000).await.unwrap();
    let account = service.register_account("hank").await.unwrap();

    assert!(matches!(
        service.trade(account.id, "ACME", Side::Buy, 1).await,
        Err(Error::MarketClosed(_))
    ));
    assert!(matches!(service.issue_loan(account.id).await, Err(Error::MarketClosed(_))));
    assert!(service.ensure_market_open(now - Duration::hours(2)).is_ok());
}
