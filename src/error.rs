//! Unified SDK error types.

use crate::domain::order::OrderStatus;
use crate::shared::OrderId;
use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Wallet-session errors.
///
/// Only `NotInstalled`, `AccessDenied`, and `SignRejected` ever reach a user;
/// balance fetch failures are recovered locally and never surfaced as fatal.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("wallet provider is not installed")]
    NotInstalled,

    #[error("connection rejected or failed: {0}")]
    AccessDenied(String),

    #[error("wallet not connected")]
    NotConnected,

    #[error("transaction signing rejected: {0}")]
    SignRejected(String),

    #[error("balance fetch failed: {0}")]
    Fetch(String),
}

/// Settlement-layer errors. Fatal to the order they occur in — the
/// progression engine converts them to a `failed` status, never retries.
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("mint rejected: {0}")]
    MintRejected(String),

    #[error("payment rejected: {0}")]
    PaymentRejected(String),

    #[error("settlement backend unavailable: {0}")]
    Unavailable(String),
}

/// Order persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("order not found: {0}")]
    NotFound(OrderId),

    #[error("stale write for order {order}: expected version {expected}, found {actual}")]
    VersionConflict {
        order: OrderId,
        expected: u64,
        actual: u64,
    },

    #[error("invalid status transition for order {order}: {from} -> {to}")]
    InvalidTransition {
        order: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("invalid patch for order {order}: {reason}")]
    InvalidPatch { order: OrderId, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Key-value storage backend errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
}
