//! Order tracking — recurring engine ticks bound to an observer's lifetime.
//!
//! `OrderTracker::track` spawns a background tokio task that ticks the
//! progression engine for one order on a fixed interval (immediately on
//! bind, then every interval) and publishes order snapshots through a watch
//! channel. Consumers observe status changes without knowing that polling
//! drives them, so a push channel can replace the timer without touching
//! engine logic.
//!
//! Teardown: `stop()` cancels the recurring timer but lets an in-flight tick
//! resolve; dropping the handle aborts the task outright. Either way a
//! post-teardown store write is best-effort. When the order reaches a
//! terminal status the task exits on its own.

use super::{OrderStore, ProgressionEngine, TickOutcome};
use crate::settlement::Settlement;
use crate::shared::OrderId;
use super::Order;
use futures_util::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Polling cadence.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
        }
    }
}

/// Spawns and owns per-order polling tasks.
pub struct OrderTracker<E> {
    engine: Arc<ProgressionEngine<E>>,
    config: TrackerConfig,
}

impl<E: Settlement> OrderTracker<E> {
    pub fn new(engine: Arc<ProgressionEngine<E>>, config: TrackerConfig) -> Self {
        Self { engine, config }
    }

    /// Start tracking an order. The returned handle owns the polling task.
    pub fn track(&self, id: OrderId) -> WatchHandle {
        let (update_tx, update_rx) = watch::channel(None);
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_poll(
            self.engine.clone(),
            self.engine.store().clone(),
            id,
            self.config.poll_interval,
            update_tx,
            stop_rx,
        ));
        WatchHandle {
            updates: update_rx,
            stop: stop_tx,
            task: Some(task),
        }
    }
}

impl<E> Clone for OrderTracker<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: self.config.clone(),
        }
    }
}

async fn run_poll<E: Settlement>(
    engine: Arc<ProgressionEngine<E>>,
    store: OrderStore,
    id: OrderId,
    poll_interval: Duration,
    updates: watch::Sender<Option<Order>>,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.changed() => {
                tracing::debug!(order = %id, "tracking stopped");
                return;
            }
            // First tick fires immediately.
            _ = interval.tick() => {}
        }

        let outcome = engine.tick(&id).await;
        let snapshot = store.get(&id).ok();
        let terminal = outcome == TickOutcome::Terminal
            || snapshot
                .as_ref()
                .is_some_and(|order| order.status.is_terminal());

        updates.send_if_modified(|current| {
            if *current != snapshot {
                *current = snapshot.clone();
                true
            } else {
                false
            }
        });

        if terminal {
            tracing::debug!(order = %id, "order terminal, polling ends");
            return;
        }
    }
}

/// Handle to one order's polling task; observers subscribe through it.
pub struct WatchHandle {
    updates: watch::Receiver<Option<Order>>,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Latest observed snapshot, if the first tick has run.
    pub fn current(&self) -> Option<Order> {
        self.updates.borrow().clone()
    }

    /// Wait for the next snapshot change. `None` once the task has ended
    /// and no further updates can arrive.
    pub async fn changed(&mut self) -> Option<Order> {
        self.updates.changed().await.ok()?;
        self.updates.borrow_and_update().clone()
    }

    /// An additional independent subscription to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<Order>> {
        self.updates.clone()
    }

    /// Snapshot updates as a stream, skipping the initial empty state.
    pub fn updates(&self) -> impl Stream<Item = Order> + Send + 'static {
        let rx = self.updates.clone();
        futures_util::stream::unfold(rx, |mut rx| async move {
            loop {
                rx.changed().await.ok()?;
                let snapshot = rx.borrow_and_update().clone();
                if let Some(order) = snapshot {
                    return Some((order, rx));
                }
            }
        })
    }

    /// Whether the polling task has exited (terminal order or teardown).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Cancel the recurring timer and wait for the task to wind down.
    /// An in-flight tick is allowed to resolve first.
    pub async fn stop(mut self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{NewOrder, Order, OrderStatus};
    use crate::error::SettlementError;
    use crate::settlement::{Settlement, TxStatus};
    use crate::shared::{AccountId, CryptoAsset, FiatCurrency, PaymentMethod};
    use crate::storage::{keys, MemoryStorage, Storage};
    use chrono::Utc;
    use rust_decimal::Decimal;

    struct InstantSettlement;

    impl Settlement for InstantSettlement {
        async fn check_trustline(
            &self,
            _address: &AccountId,
            _asset: CryptoAsset,
        ) -> Result<bool, SettlementError> {
            Ok(true)
        }

        async fn mint_stablecoin(
            &self,
            _amount: Decimal,
            _asset: CryptoAsset,
        ) -> Result<String, SettlementError> {
            Ok("mint_ref".into())
        }

        async fn send_payment(
            &self,
            _destination: &AccountId,
            _amount: Decimal,
            _asset: CryptoAsset,
        ) -> Result<String, SettlementError> {
            Ok("tx_ref".into())
        }

        async fn check_transaction_status(
            &self,
            _tx_ref: &str,
        ) -> Result<TxStatus, SettlementError> {
            Ok(TxStatus::Confirmed)
        }
    }

    fn seed(status: OrderStatus, age_secs: i64) -> (OrderTracker<InstantSettlement>, OrderId) {
        let storage = Arc::new(MemoryStorage::new());
        let store = crate::domain::order::OrderStore::new(storage.clone());
        let mut order = Order::new(NewOrder {
            id: Some(OrderId::from("ord_track")),
            fiat_currency: FiatCurrency::NGN,
            crypto_asset: CryptoAsset::CNgn,
            payment_method: PaymentMethod::BankTransfer,
            amount: Decimal::from(50_000),
            exchange_rate: Decimal::from(1_600),
            wallet_address: AccountId::new(
                "GAXYZ123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ123456789ABCDEFG",
            ),
        });
        order.status = status;
        order.created_at = Utc::now() - chrono::Duration::seconds(age_secs);
        storage
            .write(&keys::order(&order.id), &serde_json::to_string(&order).unwrap())
            .unwrap();
        let engine = Arc::new(ProgressionEngine::new(
            store,
            InstantSettlement,
            crate::domain::order::EngineConfig::default(),
        ));
        let tracker = OrderTracker::new(
            engine,
            TrackerConfig {
                poll_interval: Duration::from_millis(20),
            },
        );
        (tracker, OrderId::from("ord_track"))
    }

    #[tokio::test]
    async fn test_track_emits_snapshot_after_immediate_tick() {
        let (tracker, id) = seed(OrderStatus::Created, 31);
        let mut handle = tracker.track(id);
        let order = handle.changed().await.expect("first snapshot");
        assert_eq!(order.status, OrderStatus::PaymentReceived);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_track_stops_itself_on_terminal() {
        let (tracker, id) = seed(OrderStatus::Transferring, 121);
        let mut handle = tracker.track(id);
        let order = handle.changed().await.expect("snapshot");
        assert_eq!(order.status, OrderStatus::Completed);
        // The task exits without an explicit stop.
        for _ in 0..50 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_stop_tears_down_timer() {
        let (tracker, id) = seed(OrderStatus::Created, 0);
        let handle = tracker.track(id);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_no_spurious_updates_when_nothing_changes() {
        // Too young to advance: the first tick stores a snapshot, later
        // identical snapshots are suppressed.
        let (tracker, id) = seed(OrderStatus::Created, 0);
        let mut handle = tracker.track(id);
        let first = handle.changed().await.expect("initial snapshot");
        assert_eq!(first.status, OrderStatus::Created);
        let waited =
            tokio::time::timeout(Duration::from_millis(100), handle.changed()).await;
        assert!(waited.is_err(), "identical snapshot must not re-notify");
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_subscribe_sees_same_snapshots() {
        let (tracker, id) = seed(OrderStatus::Created, 31);
        let mut handle = tracker.track(id);
        let mut extra = handle.subscribe();
        handle.changed().await.expect("snapshot");
        extra.changed().await.expect("subscriber notified");
        let seen = extra.borrow_and_update().clone().expect("subscriber snapshot");
        assert_eq!(seen.status, OrderStatus::PaymentReceived);
        handle.stop().await;
    }
}
