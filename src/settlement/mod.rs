//! Settlement seam — the operations that deliver stablecoin on-chain.
//!
//! The progression engine drives settlement exclusively through the
//! [`Settlement`] trait, so the simulated backend can be swapped for a real
//! issuer/anchor integration without touching the engine's control flow.

pub mod simulator;

pub use simulator::{SettlementSim, SimConfig};

use crate::error::SettlementError;
use crate::shared::{AccountId, CryptoAsset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Outcome of a transaction status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Asynchronous settlement operations.
///
/// Each call is a single unit of work against the settlement backend; the
/// engine sequences them and owns all retry/timeout policy.
pub trait Settlement: Send + Sync + 'static {
    /// Whether the destination account holds a trustline for the asset.
    fn check_trustline(
        &self,
        address: &AccountId,
        asset: CryptoAsset,
    ) -> impl Future<Output = Result<bool, SettlementError>> + Send;

    /// Issue stablecoin units ahead of transfer. Returns a mint reference.
    fn mint_stablecoin(
        &self,
        amount: Decimal,
        asset: CryptoAsset,
    ) -> impl Future<Output = Result<String, SettlementError>> + Send;

    /// Submit the on-chain payment. Returns a transaction reference.
    fn send_payment(
        &self,
        destination: &AccountId,
        amount: Decimal,
        asset: CryptoAsset,
    ) -> impl Future<Output = Result<String, SettlementError>> + Send;

    /// Probe confirmation state of a previously submitted transaction.
    fn check_transaction_status(
        &self,
        tx_ref: &str,
    ) -> impl Future<Output = Result<TxStatus, SettlementError>> + Send;
}
