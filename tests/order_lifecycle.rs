//! End-to-end order lifecycle tests against the simulated settlement backend.

use aframp_sdk::prelude::*;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

fn quote(id: &str) -> NewOrder {
    NewOrder {
        id: Some(OrderId::from(id)),
        fiat_currency: FiatCurrency::NGN,
        crypto_asset: CryptoAsset::CNgn,
        payment_method: PaymentMethod::BankTransfer,
        amount: Decimal::from(50_000),
        exchange_rate: Decimal::from(1_600),
        wallet_address: AccountId::new("GAXYZ123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ123456789ABCDEFG"),
    }
}

fn fast_engine_config() -> EngineConfig {
    EngineConfig {
        confirm_retry_delay: Duration::ZERO,
        ..EngineConfig::default()
    }
}

/// Seed an order record directly into storage with a given status and age.
fn seed(storage: &Arc<MemoryStorage>, id: &str, status: OrderStatus, age: Duration) -> OrderId {
    let mut order = Order::new(quote(id));
    order.status = status;
    order.created_at = Utc::now() - chrono::Duration::from_std(age).unwrap();
    storage
        .write(
            &format!("onramp:order:{}", id),
            &serde_json::to_string(&order).unwrap(),
        )
        .unwrap();
    order.id
}

#[tokio::test]
async fn full_progression_reaches_completed() {
    let storage = Arc::new(MemoryStorage::new());
    let store = OrderStore::new(storage.clone());
    let engine = ProgressionEngine::new(
        store.clone(),
        SettlementSim::new(SimConfig::instant()),
        fast_engine_config(),
    );

    // Old enough for every stage to be due as soon as it is reached.
    let id = seed(&storage, "ord_full", OrderStatus::Created, Duration::from_secs(121));

    assert_eq!(
        engine.tick(&id).await,
        TickOutcome::Advanced(OrderStatus::PaymentReceived)
    );
    assert_eq!(
        engine.tick(&id).await,
        TickOutcome::Advanced(OrderStatus::Transferring)
    );
    assert_eq!(
        engine.tick(&id).await,
        TickOutcome::Advanced(OrderStatus::Completed)
    );

    let order = store.get(&id).unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.transaction_hash.as_deref().unwrap().starts_with("tx_"));
    assert!(order.completed_at.is_some());
    // created -> payment_received, -> minting, -> transferring(+hash), -> completed
    assert_eq!(order.version, 4);

    // Terminal orders short-circuit forever after.
    assert_eq!(engine.tick(&id).await, TickOutcome::Terminal);
}

#[tokio::test]
async fn confirmation_that_never_lands_fails_the_order() {
    let storage = Arc::new(MemoryStorage::new());
    let store = OrderStore::new(storage.clone());
    let engine = ProgressionEngine::new(
        store.clone(),
        SettlementSim::new(SimConfig {
            confirm_rate: 0.0,
            ..SimConfig::instant()
        }),
        fast_engine_config(),
    );

    let id = seed(
        &storage,
        "ord_stuck",
        OrderStatus::Transferring,
        Duration::from_secs(121),
    );

    assert_eq!(
        engine.tick(&id).await,
        TickOutcome::Advanced(OrderStatus::Failed)
    );
    let order = store.get(&id).unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    assert_eq!(order.completed_at, None, "failed orders never get a completion time");
}

#[tokio::test]
async fn tracker_drives_order_to_terminal_and_stops() {
    let storage = Arc::new(MemoryStorage::new());
    let store = OrderStore::new(storage.clone());
    let engine = Arc::new(ProgressionEngine::new(
        store.clone(),
        SettlementSim::new(SimConfig::instant()),
        fast_engine_config(),
    ));
    let tracker = OrderTracker::new(
        engine,
        TrackerConfig {
            poll_interval: Duration::from_millis(20),
        },
    );

    let id = seed(&storage, "ord_watch", OrderStatus::Created, Duration::from_secs(121));
    let mut handle = tracker.track(id.clone());

    let mut last = None;
    while let Some(order) = handle.changed().await {
        let status = order.status;
        last = Some(order);
        if status.is_terminal() {
            break;
        }
    }
    let last = last.expect("at least one snapshot");
    assert_eq!(last.status, OrderStatus::Completed);

    // The poller tears its own timer down on terminal orders.
    for _ in 0..50 {
        if handle.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.is_finished());
}

#[tokio::test]
async fn persisted_order_roundtrips_structurally() {
    let storage = Arc::new(MemoryStorage::new());
    let store = OrderStore::new(storage);
    let created = store.create(quote("ord_roundtrip")).unwrap();
    let read = store.get(&created.id).unwrap();
    assert_eq!(created, read);
    assert_eq!(read.crypto_amount, Decimal::new(3125, 2));
    assert_eq!(read.fees.total_cost, read.amount + read.fees.total_fees);
}
