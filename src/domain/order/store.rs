//! Order persistence — read/create/update over the storage seam.
//!
//! Orders are stored one JSON record per id. Updates are read-merge-write
//! with optimistic versioning: callers pass the version they read, and a
//! stale version is rejected rather than silently overwritten.

use super::{NewOrder, Order, OrderPatch, OrderStatus};
use crate::error::StoreError;
use crate::shared::{AccountId, CryptoAsset, FiatCurrency, OrderId, PaymentMethod};
use crate::storage::{keys, Storage};
use chrono::Duration as ChronoDuration;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Repository for persisted orders.
#[derive(Clone)]
pub struct OrderStore {
    storage: Arc<dyn Storage>,
}

impl OrderStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Fetch an order. Missing records — and corrupt ones, which are
    /// discarded — yield `NotFound`. This is the production read path.
    pub fn get(&self, id: &OrderId) -> Result<Order, StoreError> {
        self.load(id)?.ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Fetch an order, synthesizing and persisting a demo default when none
    /// exists. Development convenience for flows without a real backend —
    /// real deployments should use [`OrderStore::get`] and handle `NotFound`.
    pub fn get_or_create(&self, id: &OrderId) -> Result<Order, StoreError> {
        if let Some(order) = self.load(id)? {
            return Ok(order);
        }
        let order = demo_order(id.clone());
        self.persist(&order)?;
        tracing::debug!(order = %id, "synthesized demo order");
        Ok(order)
    }

    /// Create and persist a new order from quote parameters.
    pub fn create(&self, params: NewOrder) -> Result<Order, StoreError> {
        let order = Order::new(params);
        self.persist(&order)?;
        tracing::debug!(order = %order.id, amount = %order.amount, "order created");
        Ok(order)
    }

    /// Merge a patch into the stored order and persist the result.
    ///
    /// `expected_version` must match the version of the record on disk;
    /// a mismatch means another writer got there first and the caller's
    /// read is stale.
    pub fn update(
        &self,
        id: &OrderId,
        expected_version: u64,
        patch: OrderPatch,
    ) -> Result<Order, StoreError> {
        let current = self.get(id)?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                order: id.clone(),
                expected: expected_version,
                actual: current.version,
            });
        }
        let next = current.apply(patch)?;
        self.persist(&next)?;
        tracing::debug!(order = %id, status = %next.status, version = next.version, "order updated");
        Ok(next)
    }

    /// Delete an order record. Explicit user reset only.
    pub fn remove(&self, id: &OrderId) -> Result<(), StoreError> {
        self.storage.remove(&keys::order(id))?;
        Ok(())
    }

    fn load(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let key = keys::order(id);
        let Some(raw) = self.storage.read(&key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Order>(&raw) {
            Ok(order) => Ok(Some(order)),
            Err(e) => {
                // Corrupt record: treat as absent rather than erroring out.
                tracing::warn!(order = %id, error = %e, "discarding unparseable order record");
                self.storage.remove(&key)?;
                Ok(None)
            }
        }
    }

    fn persist(&self, order: &Order) -> Result<(), StoreError> {
        let raw = serde_json::to_string(order)?;
        self.storage.write(&keys::order(&order.id), &raw)?;
        Ok(())
    }
}

/// The synthetic order used when a requested id has no record.
///
/// Values mirror the canonical NGN demo quote: ₦50,000 at 1600 ₦/cNGN with
/// a 13-minute payment window remaining, already awaiting payment.
fn demo_order(id: OrderId) -> Order {
    let now = super::now_ms();
    Order {
        id,
        created_at: now,
        expires_at: now + ChronoDuration::minutes(13),
        fiat_currency: FiatCurrency::NGN,
        crypto_asset: CryptoAsset::CNgn,
        payment_method: PaymentMethod::BankTransfer,
        amount: Decimal::from(50_000),
        exchange_rate: Decimal::from(1_600),
        crypto_amount: Decimal::new(3125, 2),
        fees: super::FeeBreakdown {
            processing_fee: Decimal::ZERO,
            network_fee: Decimal::from(15),
            total_fees: Decimal::from(15),
            total_cost: Decimal::from(50_015),
        },
        wallet_address: AccountId::new("GAXYZ123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ123456789ABCDEFG"),
        status: OrderStatus::AwaitingPayment,
        transaction_hash: None,
        completed_at: None,
        version: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store() -> (OrderStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (OrderStore::new(storage.clone()), storage)
    }

    fn params(id: &str) -> NewOrder {
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

    #[test]
    fn test_get_missing_is_not_found() {
        let (store, _) = store();
        let err = store.get(&OrderId::from("missing")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_create_then_get_roundtrip() {
        let (store, _) = store();
        let created = store.create(params("ord_rt")).unwrap();
        let read = store.get(&created.id).unwrap();
        assert_eq!(created, read);
    }

    #[test]
    fn test_get_or_create_synthesizes_and_persists() {
        let (store, storage) = store();
        let id = OrderId::from("ord_demo");
        let order = store.get_or_create(&id).unwrap();
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.crypto_amount, Decimal::new(3125, 2));
        assert_eq!(order.fees.total_cost, Decimal::from(50_015));
        // Persisted — second read returns the same record.
        assert_eq!(storage.len(), 1);
        assert_eq!(store.get_or_create(&id).unwrap(), order);
    }

    #[test]
    fn test_corrupt_record_treated_as_absent() {
        let (store, storage) = store();
        let id = OrderId::from("ord_bad");
        storage.write(&keys::order(&id), "{not json").unwrap();
        assert!(matches!(store.get(&id), Err(StoreError::NotFound(_))));
        // The corrupt value was discarded.
        assert_eq!(storage.read(&keys::order(&id)).unwrap(), None);
        // get_or_create resynthesizes over it.
        let order = store.get_or_create(&id).unwrap();
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
    }

    #[test]
    fn test_update_applies_patch_and_bumps_version() {
        let (store, _) = store();
        let order = store.create(params("ord_up")).unwrap();
        let updated = store
            .update(&order.id, order.version, OrderPatch::status(OrderStatus::PaymentReceived))
            .unwrap();
        assert_eq!(updated.status, OrderStatus::PaymentReceived);
        assert_eq!(updated.version, 1);
        assert_eq!(store.get(&order.id).unwrap(), updated);
    }

    #[test]
    fn test_update_rejects_stale_version() {
        let (store, _) = store();
        let order = store.create(params("ord_cas")).unwrap();
        store
            .update(&order.id, 0, OrderPatch::status(OrderStatus::PaymentReceived))
            .unwrap();
        // A second writer holding the old read loses.
        let err = store
            .update(&order.id, 0, OrderPatch::status(OrderStatus::Minting))
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 0, actual: 1, .. }));
    }

    #[test]
    fn test_update_rejects_backward_transition() {
        let (store, _) = store();
        let order = store.create(params("ord_back")).unwrap();
        let updated = store
            .update(&order.id, 0, OrderPatch::status(OrderStatus::PaymentReceived))
            .unwrap();
        let err = store
            .update(&order.id, updated.version, OrderPatch::status(OrderStatus::Created))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_remove_deletes_record() {
        let (store, storage) = store();
        let order = store.create(params("ord_rm")).unwrap();
        store.remove(&order.id).unwrap();
        assert!(storage.is_empty());
        assert!(matches!(store.get(&order.id), Err(StoreError::NotFound(_))));
    }
}
