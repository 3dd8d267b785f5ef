// PostgreSQL persistence tests
//
// Run with: TEST_DATABASE_URL=postgres://... cargo test --features db_tests -- --ignored

#[cfg(feature = "db_tests")]
mod db_persistence_tests {
    use std::env;
    use std::sync::Arc;

    use common::db::{self, DbPool};
    use common::error::Error;
    use common::model::Side;
    use exchange_service::{ExchangeConfig, ExchangeService, PostgresExchangeRepository};
    use market_data::{PostgresSnapshotRepository, PriceHistoryService};
    use rust_decimal_macros::dec;
    use tokio::runtime::Runtime;
    use uuid::Uuid;

    // Helper function to run async tests against a migrated database
    fn run_db_test<F>(test: F)
    where
        F: FnOnce(DbPool) -> futures::future::BoxFuture<'static, ()> + Send + 'static,
    {
        // Skip test if TEST_DATABASE_URL is not set
        let db_url = match env::var("TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                println!("Skipping database test: TEST_DATABASE_URL not set");
                return;
            }
        };

        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let pool = match db::connect(&db_url, 10).await {
                Ok(pool) => pool,
                Err(err) => {
                    println!("Skipping database test: could not connect to database: {}", err);
                    return;
                }
            };
            db::run_migrations(&pool).await.unwrap();

            test(pool).await;
        });
    }

    fn service(pool: &DbPool) -> ExchangeService {
        ExchangeService::with_repo(
            Arc::new(PostgresExchangeRepository::new(pool.clone())),
            ExchangeConfig::in_memory(),
        )
    }

    // Unique suffix so repeated runs do not collide on usernames and codes
    fn suffix() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    }

    #[test]
    #[ignore = "Requires test database, run with RUST_TEST_THREADS=1 cargo test -- --ignored"]
    fn test_trade_is_persisted() {
        run_db_test(|pool| {
            Box::pin(async move {
                let exchange = service(&pool);
                let tag = suffix();
                let code = format!("T{}", tag);

                exchange.list_instrument(&code, &format!("Test {}", tag), dec!(100), 1000).await.unwrap();
                let account = exchange.register_account(&format!("user-{}", tag)).await.unwrap();

                let entry = exchange.trade(account.id, &code, Side::Buy, 5).await.unwrap();
                assert_eq!(entry.net_worth, dec!(9752.50));

                let stored = exchange.get_account(account.id).await.unwrap().unwrap();
                assert_eq!(stored.cash, dec!(9500));
                let instrument = exchange.get_instrument(&code).await.unwrap().unwrap();
                assert_eq!(instrument.shares_remaining, 995);
                assert_eq!(instrument.price, dec!(50.50));
                assert_eq!(exchange.get_holding(account.id, &code).await.unwrap().shares, 5);
                assert_eq!(exchange.ledger(account.id).await.unwrap().len(), 1);
            })
        });
    }

    #[test]
    #[ignore = "Requires test database, run with RUST_TEST_THREADS=1 cargo test -- --ignored"]
    fn test_rejected_trade_rolls_back() {
        run_db_test(|pool| {
            Box::pin(async move {
                let exchange = service(&pool);
                let tag = suffix();
                let code = format!("R{}", tag);

                exchange.list_instrument(&code, &format!("Rollback {}", tag), dec!(3000), 1000).await.unwrap();
                let account = exchange.register_account(&format!("poor-{}", tag)).await.unwrap();

                let result = exchange.trade(account.id, &code, Side::Buy, 5).await;
                assert!(matches!(result, Err(Error::InsufficientFunds(_))));

                let stored = exchange.get_account(account.id).await.unwrap().unwrap();
                assert_eq!(stored.cash, dec!(10000));
                let instrument = exchange.get_instrument(&code).await.unwrap().unwrap();
                assert_eq!(instrument.shares_remaining, 1000);
                assert!(exchange.ledger(account.id).await.unwrap().is_empty());

                let duplicate = exchange.register_account(&format!("poor-{}", tag)).await;
                assert!(matches!(duplicate, Err(Error::AlreadyExists(_))));
            })
        });
    }

    #[test]
    #[ignore = "Requires test database, run with RUST_TEST_THREADS=1 cargo test -- --ignored"]
    fn test_concurrent_buys_never_oversell() {
        run_db_test(|pool| {
            Box::pin(async move {
                let exchange = Arc::new(service(&pool));
                let tag = suffix();
                let code = format!("C{}", tag);
                exchange.list_instrument(&code, &format!("Scarce {}", tag), dec!(1), 5).await.unwrap();

                let mut handles = Vec::new();
                for i in 0..8 {
                    let exchange = exchange.clone();
                    let code = code.clone();
                    let username = format!("buyer{}-{}", i, tag);
                    handles.push(tokio::spawn(async move {
                        let account = exchange.register_account(&username).await.unwrap();
                        exchange.trade(account.id, &code, Side::Buy, 1).await
                    }));
                }

                let mut filled = 0;
                for handle in handles {
                    if handle.await.unwrap().is_ok() {
                        filled += 1;
                    }
                }
                assert_eq!(filled, 5);
                let instrument = exchange.get_instrument(&code).await.unwrap().unwrap();
                assert_eq!(instrument.shares_remaining, 0);
            })
        });
    }

    #[test]
    #[ignore = "Requires test database, run with RUST_TEST_THREADS=1 cargo test -- --ignored"]
    fn test_snapshots_are_persisted() {
        run_db_test(|pool| {
            Box::pin(async move {
                let exchange = service(&pool);
                let prices = PriceHistoryService::with_repository(
                    Arc::new(PostgresSnapshotRepository::new(pool.clone())),
                    10,
                    0,
                )
                .unwrap();
                let tag = suffix();
                let code = format!("S{}", tag);
                let instrument = exchange.list_instrument(&code, &format!("Snap {}", tag), dec!(12.34), 100).await.unwrap();

                prices.record_all(&[instrument.clone()], chrono::Utc::now()).await.unwrap();
                let history = prices.history(&code).await.unwrap();
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].price, dec!(12.34));

                let chart = prices.chart(&instrument, chrono::Utc::now()).await.unwrap();
                assert_eq!(chart.prices, vec![dec!(12.34)]);
            })
        });
    }
}
