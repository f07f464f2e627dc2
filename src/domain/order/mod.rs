//! Order domain — the fiat-to-stablecoin purchase lifecycle.
//!
//! An [`Order`] is a single on-ramp purchase: fiat in, stablecoin out. It is
//! persisted as a JSON record keyed by order id and mutated exclusively
//! through [`store::OrderStore::update`], driven by the progression engine.

pub mod draft;
pub mod engine;
pub mod poller;
pub mod store;

pub use draft::{DraftStore, OrderDraft};
pub use engine::{EngineConfig, ProgressionEngine, TickOutcome};
pub use poller::{OrderTracker, TrackerConfig, WatchHandle};
pub use store::OrderStore;

use crate::error::StoreError;
use crate::shared::{AccountId, CryptoAsset, FiatCurrency, OrderId, PaymentMethod};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a created order stays payable before the payment window expires.
pub const PAYMENT_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Wall-clock now, truncated to the millisecond precision of the wire
/// format so fresh records compare equal to their persisted form.
pub(crate) fn now_ms() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Flat network fee charged on every order, in fiat units.
pub const NETWORK_FEE: Decimal = Decimal::from_parts(15, 0, 0, false, 0);

// ─── OrderStatus ─────────────────────────────────────────────────────────────

/// Lifecycle stages of an order.
///
/// Statuses only ever move forward along the sequence below; `failed` is
/// reachable from any non-terminal status. `completed` and `failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    AwaitingPayment,
    PaymentReceived,
    Minting,
    Transferring,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AwaitingPayment => "awaiting_payment",
            Self::PaymentReceived => "payment_received",
            Self::Minting => "minting",
            Self::Transferring => "transferring",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` is a legal transition out of `self`.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Created, AwaitingPayment)
            | (Created, PaymentReceived)
            | (AwaitingPayment, PaymentReceived)
            | (PaymentReceived, Minting)
            | (Minting, Transferring)
            | (Transferring, Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── FeeBreakdown ────────────────────────────────────────────────────────────

/// Fees fixed at order creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    #[serde(with = "rust_decimal::serde::float")]
    pub processing_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub network_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_fees: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
}

impl FeeBreakdown {
    /// Derive the fee schedule for an amount and payment method.
    ///
    /// Bank transfers carry no processing fee; mobile money 1%, card 1.5%.
    /// The network fee is flat.
    pub fn calculate(amount: Decimal, method: PaymentMethod) -> Self {
        let processing_fee = match method {
            PaymentMethod::BankTransfer => Decimal::ZERO,
            PaymentMethod::MobileMoney => (amount * Decimal::new(1, 2)).round_dp(2),
            PaymentMethod::Card => (amount * Decimal::new(15, 3)).round_dp(2),
        };
        let total_fees = processing_fee + NETWORK_FEE;
        Self {
            processing_fee,
            network_fee: NETWORK_FEE,
            total_fees,
            total_cost: amount + total_fees,
        }
    }
}

// ─── Order ───────────────────────────────────────────────────────────────────

/// Parameters for creating a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Caller-supplied id; generated when `None`.
    pub id: Option<OrderId>,
    pub fiat_currency: FiatCurrency,
    pub crypto_asset: CryptoAsset,
    pub payment_method: PaymentMethod,
    /// Fiat amount the user pays (before fees).
    pub amount: Decimal,
    /// Fiat units per crypto unit, locked at creation.
    pub exchange_rate: Decimal,
    pub wallet_address: AccountId,
}

/// A persisted on-ramp order.
///
/// Serialized shape is wire-exact with the persistence layer: camelCase
/// keys, millisecond timestamps, numeric amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub fiat_currency: FiatCurrency,
    pub crypto_asset: CryptoAsset,
    pub payment_method: PaymentMethod,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub exchange_rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub crypto_amount: Decimal,
    pub fees: FeeBreakdown,
    pub wallet_address: AccountId,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped on every successful update.
    /// Records persisted before versioning default to 0.
    #[serde(default)]
    pub version: u64,
}

impl Order {
    /// Build a new order. The crypto amount and fees are derived once here
    /// and never recomputed.
    pub fn new(params: NewOrder) -> Self {
        let now = now_ms();
        let crypto_amount = (params.amount / params.exchange_rate).round_dp(7);
        let fees = FeeBreakdown::calculate(params.amount, params.payment_method);
        Self {
            id: params.id.unwrap_or_else(OrderId::generate),
            created_at: now,
            expires_at: now + PAYMENT_WINDOW,
            fiat_currency: params.fiat_currency,
            crypto_asset: params.crypto_asset,
            payment_method: params.payment_method,
            amount: params.amount,
            exchange_rate: params.exchange_rate,
            crypto_amount,
            fees,
            wallet_address: params.wallet_address,
            status: OrderStatus::Created,
            transaction_hash: None,
            completed_at: None,
            version: 0,
        }
    }

    /// Age of the order at `now`. Zero if the clock went backwards.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the payment window has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Apply a patch, validating the status invariants. Returns the merged
    /// order with its version bumped; does not persist.
    pub fn apply(&self, patch: OrderPatch) -> Result<Order, StoreError> {
        let mut next = self.clone();

        if let Some(status) = patch.status {
            if !self.status.can_transition(status) {
                return Err(StoreError::InvalidTransition {
                    order: self.id.clone(),
                    from: self.status,
                    to: status,
                });
            }
            if status == OrderStatus::Completed && patch.completed_at.is_none() {
                return Err(StoreError::InvalidPatch {
                    order: self.id.clone(),
                    reason: "completed status requires a completion time".into(),
                });
            }
            next.status = status;
        }

        if let Some(completed_at) = patch.completed_at {
            if next.status != OrderStatus::Completed {
                return Err(StoreError::InvalidPatch {
                    order: self.id.clone(),
                    reason: "completion time is only valid on completed orders".into(),
                });
            }
            if self.completed_at.is_some() {
                return Err(StoreError::InvalidPatch {
                    order: self.id.clone(),
                    reason: "completion time is set exactly once".into(),
                });
            }
            next.completed_at = Some(completed_at);
        }

        if let Some(hash) = patch.transaction_hash {
            // The mint hash is provisional; the transfer hash overwrites it.
            next.transaction_hash = Some(hash);
        }

        next.version = self.version + 1;
        Ok(next)
    }
}

// ─── OrderPatch ──────────────────────────────────────────────────────────────

/// Partial update applied through `OrderStore::update`.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub transaction_hash: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_transaction_hash(mut self, hash: impl Into<String>) -> Self {
        self.transaction_hash = Some(hash.into());
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order() -> Order {
        Order::new(NewOrder {
            id: Some(OrderId::from("ord_test")),
            fiat_currency: FiatCurrency::NGN,
            crypto_asset: CryptoAsset::CNgn,
            payment_method: PaymentMethod::BankTransfer,
            amount: Decimal::from(50_000),
            exchange_rate: Decimal::from(1_600),
            wallet_address: AccountId::new("GAXYZ123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ123456789ABCDEFG"),
        })
    }

    #[test]
    fn test_crypto_amount_derived_by_rate_division() {
        let order = new_order();
        assert_eq!(order.crypto_amount, Decimal::new(3125, 2)); // 50000 / 1600 = 31.25
    }

    #[test]
    fn test_bank_transfer_fees_fixture() {
        let order = new_order();
        assert_eq!(order.fees.processing_fee, Decimal::ZERO);
        assert_eq!(order.fees.network_fee, Decimal::from(15));
        assert_eq!(order.fees.total_fees, Decimal::from(15));
        assert_eq!(order.fees.total_cost, Decimal::from(50_015));
        assert_eq!(order.fees.total_cost, order.amount + order.fees.total_fees);
    }

    #[test]
    fn test_card_fee_percentage() {
        let fees = FeeBreakdown::calculate(Decimal::from(10_000), PaymentMethod::Card);
        assert_eq!(fees.processing_fee, Decimal::from(150));
        assert_eq!(fees.total_fees, Decimal::from(165));
    }

    #[test]
    fn test_status_forward_transitions() {
        use OrderStatus::*;
        assert!(Created.can_transition(AwaitingPayment));
        assert!(Created.can_transition(PaymentReceived));
        assert!(AwaitingPayment.can_transition(PaymentReceived));
        assert!(PaymentReceived.can_transition(Minting));
        assert!(Minting.can_transition(Transferring));
        assert!(Transferring.can_transition(Completed));
    }

    #[test]
    fn test_status_rejects_backward_and_skips() {
        use OrderStatus::*;
        assert!(!PaymentReceived.can_transition(Created));
        assert!(!Created.can_transition(Completed));
        assert!(!Created.can_transition(Transferring));
        assert!(!Transferring.can_transition(Minting));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal_only() {
        use OrderStatus::*;
        assert!(Created.can_transition(Failed));
        assert!(Transferring.can_transition(Failed));
        assert!(!Completed.can_transition(Failed));
        assert!(!Failed.can_transition(Failed));
    }

    #[test]
    fn test_apply_bumps_version() {
        let order = new_order();
        let next = order.apply(OrderPatch::status(OrderStatus::PaymentReceived)).unwrap();
        assert_eq!(next.status, OrderStatus::PaymentReceived);
        assert_eq!(next.version, order.version + 1);
    }

    #[test]
    fn test_apply_rejects_completed_without_timestamp() {
        let mut order = new_order();
        order.status = OrderStatus::Transferring;
        let err = order.apply(OrderPatch::status(OrderStatus::Completed)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPatch { .. }));
    }

    #[test]
    fn test_apply_completed_sets_completed_at() {
        let mut order = new_order();
        order.status = OrderStatus::Transferring;
        let now = Utc::now();
        let next = order
            .apply(
                OrderPatch::status(OrderStatus::Completed)
                    .with_transaction_hash("tx_abc")
                    .with_completed_at(now),
            )
            .unwrap();
        assert_eq!(next.status, OrderStatus::Completed);
        assert_eq!(next.completed_at, Some(now));
        assert_eq!(next.transaction_hash.as_deref(), Some("tx_abc"));
    }

    #[test]
    fn test_apply_rejects_second_completed_at() {
        let mut order = new_order();
        order.status = OrderStatus::Completed;
        order.completed_at = Some(Utc::now());
        let err = order
            .apply(OrderPatch::default().with_completed_at(Utc::now()))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPatch { .. }));
    }

    #[test]
    fn test_apply_rejects_completed_at_on_failed() {
        let order = new_order();
        let err = order
            .apply(OrderPatch::status(OrderStatus::Failed).with_completed_at(Utc::now()))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPatch { .. }));
    }

    #[test]
    fn test_transfer_hash_overwrites_mint_hash() {
        let mut order = new_order();
        order.status = OrderStatus::Minting;
        order.transaction_hash = Some("mint_provisional".into());
        let next = order
            .apply(OrderPatch::status(OrderStatus::Transferring).with_transaction_hash("tx_final"))
            .unwrap();
        assert_eq!(next.transaction_hash.as_deref(), Some("tx_final"));
    }

    #[test]
    fn test_wire_shape_camel_case_millis() {
        let order = new_order();
        let json = serde_json::to_string(&order).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["id"], "ord_test");
        assert!(value["createdAt"].is_i64() || value["createdAt"].is_u64());
        assert_eq!(value["fiatCurrency"], "NGN");
        assert_eq!(value["cryptoAsset"], "cNGN");
        assert_eq!(value["paymentMethod"], "bank_transfer");
        assert_eq!(value["cryptoAmount"], 31.25);
        assert_eq!(value["fees"]["totalCost"], 50015.0);
        assert_eq!(value["status"], "created");
        assert!(value.get("transactionHash").is_none());
        assert!(value.get("completedAt").is_none());
        assert_eq!(value["version"], 0);
    }

    #[test]
    fn test_legacy_record_without_version_defaults_zero() {
        let order = new_order();
        let mut value = serde_json::to_value(&order).unwrap();
        value.as_object_mut().unwrap().remove("version");
        let back: Order = serde_json::from_value(value).unwrap();
        assert_eq!(back.version, 0);
    }

    #[test]
    fn test_age_and_expiry() {
        let order = new_order();
        let now = order.created_at + chrono::Duration::seconds(31);
        assert_eq!(order.age(now), Duration::from_secs(31));
        assert!(!order.is_expired(now));
        assert!(order.is_expired(order.created_at + chrono::Duration::minutes(16)));
        // Clock skew: age clamps at zero.
        assert_eq!(order.age(order.created_at - chrono::Duration::seconds(5)), Duration::ZERO);
    }
}
