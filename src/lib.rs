//! # AFRAMP SDK
//!
//! A Rust SDK for the AFRAMP fiat-to-stablecoin on-ramp: order lifecycle
//! tracking with a simulated settlement backend, plus Stellar wallet session
//! management.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Shared newtypes, order + wallet domain types
//! 2. **Storage** — Key-value persistence seam with an in-memory backend
//! 3. **Settlement** — Trustline/mint/payment/confirmation seam + simulator
//! 4. **Lifecycle** — Time-driven progression engine and per-order tracking
//! 5. **Wallet** — Extension provider seam, session state machine, balances
//! 6. **High-Level Client** — `OnrampClient` wiring the components together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aframp_sdk::prelude::*;
//!
//! let client = OnrampClient::simulated(provider, HorizonBalances::new(Network::Testnet));
//!
//! let order = client.orders().create(quote)?;
//! let mut watch = client.track(order.id.clone());
//! while let Some(order) = watch.changed().await {
//!     println!("{}", order.status);
//! }
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes and enums used across all domains.
pub mod shared;

/// Domain modules (vertical slices): orders and wallet sessions.
pub mod domain;

/// Unified SDK error types.
pub mod error;

/// Network URL constants and passphrases.
pub mod network;

// ── Layer 2: Storage ─────────────────────────────────────────────────────────

/// Key-value persistence seam.
pub mod storage;

// ── Layer 3: Settlement ──────────────────────────────────────────────────────

/// Settlement operations seam + simulated backend.
pub mod settlement;

// ── Layer 6: High-Level Client ───────────────────────────────────────────────

/// `OnrampClient` — the primary entry point.
pub mod client;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes + enums
    pub use crate::shared::{
        AccountId, CryptoAsset, FiatCurrency, Network, OrderId, PaymentMethod,
    };

    // Domain types — order
    pub use crate::domain::order::{
        DraftStore, EngineConfig, FeeBreakdown, NewOrder, Order, OrderDraft, OrderPatch,
        OrderStatus, OrderStore, OrderTracker, ProgressionEngine, TickOutcome, TrackerConfig,
        WatchHandle,
    };

    // Domain types — wallet
    pub use crate::domain::wallet::{
        AssetBalance, BalanceSource, ProviderStatus, RefreshScheduler, SignedTransaction, Wallet,
        WalletProvider, WalletSession, WalletState,
    };
    #[cfg(feature = "http")]
    pub use crate::domain::wallet::HorizonBalances;

    // Settlement
    pub use crate::settlement::{Settlement, SettlementSim, SimConfig, TxStatus};

    // Storage
    pub use crate::storage::{MemoryStorage, Storage};

    // Errors
    pub use crate::error::{SdkError, SettlementError, StorageError, StoreError, WalletError};

    // High-level client
    pub use crate::client::{ClientConfig, OnrampClient};
}
