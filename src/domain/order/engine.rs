//! Time-driven order status progression.
//!
//! The engine inspects an order's age and current status on every tick,
//! decides whether a transition is due, performs the settlement side effects
//! for that transition, and writes the result back through the store.
//!
//! Two guards bound duplicate work under overlapping ticks:
//! - a per-order set of already-processed target statuses, checked and marked
//!   synchronously before any side effect is initiated;
//! - a per-order single-flight flag: a tick that observes unresolved async
//!   work for the same order does nothing.
//!
//! Errors never escape a tick. Failures inside a settlement subflow route
//! the order to `failed`; everything else is logged and dropped so the
//! polling loop can never crash.

use super::{Order, OrderPatch, OrderStatus, OrderStore};
use crate::error::StoreError;
use crate::settlement::{Settlement, TxStatus};
use crate::shared::OrderId;
use chrono::Utc;
use futures_timer::Delay;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timing rules for status transitions, measured from order creation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Age after which payment is considered received.
    pub payment_confirmation_delay: Duration,
    /// Age after which minting starts.
    pub minting_delay: Duration,
    /// Age after which the transfer to the user's wallet starts.
    pub transfer_delay: Duration,
    /// Maximum confirmation probes for the final transfer.
    pub confirm_attempts: u32,
    /// Fixed delay between confirmation probes.
    pub confirm_retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payment_confirmation_delay: Duration::from_secs(30),
            minting_delay: Duration::from_secs(90),
            transfer_delay: Duration::from_secs(120),
            confirm_attempts: 10,
            confirm_retry_delay: Duration::from_secs(1),
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No transition was due.
    Idle,
    /// The order moved to this status (possibly `Failed`).
    Advanced(OrderStatus),
    /// The order is already terminal; nothing to do, ever.
    Terminal,
    /// A previous tick's work for this order is still in flight.
    InFlight,
    /// No record exists for this order id.
    Missing,
}

/// The transition due for an order, if any.
enum Step {
    ConfirmPayment,
    MintAndQueueTransfer,
    TransferAndConfirm,
}

impl Step {
    /// The target status recorded in the processed set — one entry per
    /// side-effecting transition, keyed like the original pipeline stages.
    fn marker(&self) -> OrderStatus {
        match self {
            Step::ConfirmPayment => OrderStatus::PaymentReceived,
            Step::MintAndQueueTransfer => OrderStatus::Minting,
            Step::TransferAndConfirm => OrderStatus::Completed,
        }
    }
}

#[derive(Default)]
struct OrderGuard {
    processed: HashSet<OrderStatus>,
    in_flight: bool,
}

/// Time-driven state machine over persisted orders.
pub struct ProgressionEngine<E> {
    store: OrderStore,
    settlement: Arc<E>,
    config: EngineConfig,
    guards: Mutex<HashMap<OrderId, OrderGuard>>,
}

impl<E: Settlement> ProgressionEngine<E> {
    pub fn new(store: OrderStore, settlement: E, config: EngineConfig) -> Self {
        Self {
            store,
            settlement: Arc::new(settlement),
            config,
            guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one order once. Infallible by design: every failure is
    /// converted to a state transition or logged.
    pub async fn tick(&self, id: &OrderId) -> TickOutcome {
        let order = match self.store.get(id) {
            Ok(order) => order,
            Err(StoreError::NotFound(_)) => return TickOutcome::Missing,
            Err(e) => {
                tracing::warn!(order = %id, error = %e, "tick skipped: order read failed");
                return TickOutcome::Idle;
            }
        };

        if order.status.is_terminal() {
            self.clear_guard(id);
            return TickOutcome::Terminal;
        }

        let age = order.age(Utc::now());
        let step = match order.status {
            OrderStatus::Created | OrderStatus::AwaitingPayment
                if age > self.config.payment_confirmation_delay =>
            {
                Step::ConfirmPayment
            }
            OrderStatus::PaymentReceived if age > self.config.minting_delay => {
                Step::MintAndQueueTransfer
            }
            OrderStatus::Transferring if age > self.config.transfer_delay => {
                Step::TransferAndConfirm
            }
            _ => return TickOutcome::Idle,
        };

        // Guard check + mark happens synchronously, before any await point.
        if let Some(outcome) = self.try_begin(id, &step) {
            return outcome;
        }

        let outcome = match step {
            Step::ConfirmPayment => self.confirm_payment(&order),
            Step::MintAndQueueTransfer => self.mint_and_queue_transfer(order).await,
            Step::TransferAndConfirm => self.transfer_and_confirm(order).await,
        };

        self.end_flight(id);
        outcome
    }

    /// Atomically check the single-flight flag and the processed set, then
    /// mark both. Returns the short-circuit outcome when the step must not run.
    fn try_begin(&self, id: &OrderId, step: &Step) -> Option<TickOutcome> {
        let mut guards = self.lock_guards();
        let guard = guards.entry(id.clone()).or_default();
        if guard.in_flight {
            return Some(TickOutcome::InFlight);
        }
        if guard.processed.contains(&step.marker()) {
            return Some(TickOutcome::Idle);
        }
        guard.processed.insert(step.marker());
        guard.in_flight = true;
        None
    }

    fn end_flight(&self, id: &OrderId) {
        if let Some(guard) = self.lock_guards().get_mut(id) {
            guard.in_flight = false;
        }
    }

    fn clear_guard(&self, id: &OrderId) {
        self.lock_guards().remove(id);
    }

    fn lock_guards(&self) -> std::sync::MutexGuard<'_, HashMap<OrderId, OrderGuard>> {
        // Lock is only held across map operations; poisoning is unreachable.
        match self.guards.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// `created`/`awaiting_payment` → `payment_received`. Purely time-derived.
    fn confirm_payment(&self, order: &Order) -> TickOutcome {
        match self
            .store
            .update(&order.id, order.version, OrderPatch::status(OrderStatus::PaymentReceived))
        {
            Ok(_) => {
                tracing::debug!(order = %order.id, "payment received");
                TickOutcome::Advanced(OrderStatus::PaymentReceived)
            }
            Err(e) => {
                tracing::warn!(order = %order.id, error = %e, "payment confirmation write lost");
                TickOutcome::Idle
            }
        }
    }

    /// `payment_received` → `minting` → `transferring`.
    ///
    /// Mints the stablecoin and records the provisional mint reference as the
    /// order's transaction hash. The trustline probe is advisory only.
    async fn mint_and_queue_transfer(&self, order: Order) -> TickOutcome {
        let order = match self
            .store
            .update(&order.id, order.version, OrderPatch::status(OrderStatus::Minting))
        {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(order = %order.id, error = %e, "minting transition write lost");
                return TickOutcome::Idle;
            }
        };

        let mint_ref = match self
            .settlement
            .mint_stablecoin(order.crypto_amount, order.crypto_asset)
            .await
        {
            Ok(mint_ref) => mint_ref,
            Err(e) => {
                return self.fail(&order.id, &format!("mint failed: {}", e));
            }
        };

        match self
            .settlement
            .check_trustline(&order.wallet_address, order.crypto_asset)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(order = %order.id, asset = %order.crypto_asset, "destination has no trustline, continuing");
            }
            Err(e) => {
                tracing::warn!(order = %order.id, error = %e, "trustline probe failed, continuing");
            }
        }

        match self.store.update(
            &order.id,
            order.version,
            OrderPatch::status(OrderStatus::Transferring).with_transaction_hash(mint_ref),
        ) {
            Ok(_) => {
                tracing::debug!(order = %order.id, "mint complete, transfer queued");
                TickOutcome::Advanced(OrderStatus::Transferring)
            }
            Err(e) => self.fail(&order.id, &format!("transfer queue write failed: {}", e)),
        }
    }

    /// `transferring` → `completed` or `failed`.
    ///
    /// Submits the payment and polls confirmation with a bounded attempt
    /// count; exhausting attempts or any error fails the order.
    async fn transfer_and_confirm(&self, order: Order) -> TickOutcome {
        let tx_ref = match self
            .settlement
            .send_payment(&order.wallet_address, order.crypto_amount, order.crypto_asset)
            .await
        {
            Ok(tx_ref) => tx_ref,
            Err(e) => {
                return self.fail(&order.id, &format!("payment failed: {}", e));
            }
        };

        let mut status = TxStatus::Pending;
        let mut attempts = 0;
        while status == TxStatus::Pending && attempts < self.config.confirm_attempts {
            status = match self.settlement.check_transaction_status(&tx_ref).await {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(order = %order.id, error = %e, "confirmation probe failed");
                    TxStatus::Failed
                }
            };
            attempts += 1;
            if status == TxStatus::Pending && attempts < self.config.confirm_attempts {
                Delay::new(self.config.confirm_retry_delay).await;
            }
        }

        match status {
            TxStatus::Confirmed => {
                match self.store.update(
                    &order.id,
                    order.version,
                    OrderPatch::status(OrderStatus::Completed)
                        .with_transaction_hash(tx_ref)
                        .with_completed_at(super::now_ms()),
                ) {
                    Ok(_) => {
                        tracing::debug!(order = %order.id, "order completed");
                        TickOutcome::Advanced(OrderStatus::Completed)
                    }
                    Err(e) => self.fail(&order.id, &format!("completion write failed: {}", e)),
                }
            }
            TxStatus::Pending => self.fail(
                &order.id,
                &format!("confirmation timed out after {} attempts", attempts),
            ),
            TxStatus::Failed => self.fail(&order.id, "transaction failed on network"),
        }
    }

    /// Route the order to `failed`. Best-effort: a lost write is logged.
    fn fail(&self, id: &OrderId, reason: &str) -> TickOutcome {
        tracing::error!(order = %id, reason, "order failed");
        match self.store.get(id) {
            Ok(order) if !order.status.is_terminal() => {
                if let Err(e) =
                    self.store
                        .update(id, order.version, OrderPatch::status(OrderStatus::Failed))
                {
                    tracing::warn!(order = %id, error = %e, "failure write lost");
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(order = %id, error = %e, "failure write lost: order unreadable");
            }
        }
        TickOutcome::Advanced(OrderStatus::Failed)
    }
}
