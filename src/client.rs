//! High-level client — `OnrampClient` with nested component accessors.
//!
//! Wires the storage, settlement, engine, tracker, and wallet components
//! together so applications hold one handle. Each component remains usable
//! standalone; this module only owns construction and access.

use crate::domain::order::{
    DraftStore, EngineConfig, OrderStore, OrderTracker, ProgressionEngine, TrackerConfig,
    WatchHandle,
};
use crate::domain::wallet::{BalanceSource, Wallet, WalletProvider};
use crate::settlement::{Settlement, SettlementSim, SimConfig};
use crate::shared::OrderId;
use crate::storage::{MemoryStorage, Storage};
use std::sync::Arc;
use std::time::Duration;

/// Construction-time tuning for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub engine: EngineConfig,
    pub tracker: TrackerConfig,
    /// Cadence of the wallet balance refresh timer.
    pub refresh_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            tracker: TrackerConfig::default(),
            refresh_interval: crate::domain::wallet::session::BALANCE_REFRESH_INTERVAL,
        }
    }
}

/// The primary entry point for the AFRAMP SDK.
pub struct OnrampClient<P, B, E> {
    store: OrderStore,
    drafts: DraftStore,
    engine: Arc<ProgressionEngine<E>>,
    tracker: OrderTracker<E>,
    wallet: Wallet<P, B>,
}

impl<P, B, E> OnrampClient<P, B, E>
where
    P: WalletProvider,
    B: BalanceSource,
    E: Settlement,
{
    pub fn new(
        provider: P,
        source: B,
        settlement: E,
        storage: Arc<dyn Storage>,
        config: ClientConfig,
    ) -> Self {
        let store = OrderStore::new(storage.clone());
        let drafts = DraftStore::new(storage.clone());
        let engine = Arc::new(ProgressionEngine::new(
            store.clone(),
            settlement,
            config.engine,
        ));
        let tracker = OrderTracker::new(engine.clone(), config.tracker);
        let wallet = Wallet::with_refresh_interval(provider, source, storage, config.refresh_interval);
        Self {
            store,
            drafts,
            engine,
            tracker,
            wallet,
        }
    }

    // ── Component accessors ──────────────────────────────────────────────

    pub fn orders(&self) -> &OrderStore {
        &self.store
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn wallet(&self) -> &Wallet<P, B> {
        &self.wallet
    }

    pub fn engine(&self) -> &Arc<ProgressionEngine<E>> {
        &self.engine
    }

    /// Start tracking an order's progression. See [`OrderTracker::track`].
    pub fn track(&self, id: OrderId) -> WatchHandle {
        self.tracker.track(id)
    }
}

impl<P, B> OnrampClient<P, B, SettlementSim>
where
    P: WalletProvider,
    B: BalanceSource,
{
    /// Client backed by in-memory storage and the simulated settlement
    /// backend — the configuration the demo front end runs with.
    pub fn simulated(provider: P, source: B) -> Self {
        Self::new(
            provider,
            source,
            SettlementSim::new(SimConfig::default()),
            Arc::new(MemoryStorage::new()),
            ClientConfig::default(),
        )
    }
}

impl<P, B, E> Clone for OnrampClient<P, B, E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            drafts: self.drafts.clone(),
            engine: self.engine.clone(),
            tracker: self.tracker.clone(),
            wallet: self.wallet.clone(),
        }
    }
}
