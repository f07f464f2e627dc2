//! Simulated settlement backend — injected latency + probabilistic outcomes.
//!
//! Stands in for the issuer/anchor while no real backend exists. Latencies
//! and success rates are configurable so tests can run deterministic and
//! instant while demos keep realistic pacing.

use super::{Settlement, TxStatus};
use crate::error::SettlementError;
use crate::shared::{AccountId, CryptoAsset};
use futures_timer::Delay;
use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

/// Tunable behavior of the simulated backend.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Latency of a trustline probe.
    pub trustline_latency: Duration,
    /// Latency of a mint operation.
    pub mint_latency: Duration,
    /// Latency of a payment submission.
    pub payment_latency: Duration,
    /// Latency of a confirmation probe.
    pub confirm_latency: Duration,
    /// Probability a trustline exists on the destination account.
    pub trustline_rate: f64,
    /// Probability a single confirmation probe reports `confirmed`.
    pub confirm_rate: f64,
    /// Probability a mint is rejected by the issuer.
    pub mint_failure_rate: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trustline_latency: Duration::from_millis(1000),
            mint_latency: Duration::from_millis(2000),
            payment_latency: Duration::from_millis(1000),
            confirm_latency: Duration::from_millis(500),
            trustline_rate: 0.8,
            confirm_rate: 0.9,
            mint_failure_rate: 0.02,
        }
    }
}

impl SimConfig {
    /// Zero latency, every operation succeeds. For tests and fast demos.
    pub fn instant() -> Self {
        Self {
            trustline_latency: Duration::ZERO,
            mint_latency: Duration::ZERO,
            payment_latency: Duration::ZERO,
            confirm_latency: Duration::ZERO,
            trustline_rate: 1.0,
            confirm_rate: 1.0,
            mint_failure_rate: 0.0,
        }
    }
}

/// The simulated settlement backend.
#[derive(Debug, Clone, Default)]
pub struct SettlementSim {
    config: SimConfig,
}

impl SettlementSim {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    fn roll(rate: f64) -> bool {
        rand::random::<f64>() < rate
    }
}

impl Settlement for SettlementSim {
    async fn check_trustline(
        &self,
        address: &AccountId,
        asset: CryptoAsset,
    ) -> Result<bool, SettlementError> {
        Delay::new(self.config.trustline_latency).await;
        let found = Self::roll(self.config.trustline_rate);
        tracing::debug!(%address, %asset, found, "trustline probe");
        Ok(found)
    }

    async fn mint_stablecoin(
        &self,
        amount: Decimal,
        asset: CryptoAsset,
    ) -> Result<String, SettlementError> {
        Delay::new(self.config.mint_latency).await;
        if Self::roll(self.config.mint_failure_rate) {
            return Err(SettlementError::MintRejected(format!(
                "issuer rejected mint of {} {}",
                amount, asset
            )));
        }
        let mint_ref = format!("mint_{}", Uuid::new_v4().simple());
        tracing::debug!(%amount, %asset, %mint_ref, "minted");
        Ok(mint_ref)
    }

    async fn send_payment(
        &self,
        destination: &AccountId,
        amount: Decimal,
        asset: CryptoAsset,
    ) -> Result<String, SettlementError> {
        Delay::new(self.config.payment_latency).await;
        let tx_ref = format!("tx_{}", Uuid::new_v4().simple());
        tracing::debug!(%destination, %amount, %asset, %tx_ref, "payment submitted");
        Ok(tx_ref)
    }

    async fn check_transaction_status(&self, tx_ref: &str) -> Result<TxStatus, SettlementError> {
        Delay::new(self.config.confirm_latency).await;
        let status = if Self::roll(self.config.confirm_rate) {
            TxStatus::Confirmed
        } else {
            TxStatus::Pending
        };
        tracing::debug!(%tx_ref, %status, "confirmation probe");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dest() -> AccountId {
        AccountId::new("GBVNNPOFVV2YNXSQXDJPBVQYY7WJLHGPMLXZLHBZ3Y6HLKXQGIYQQLNM")
    }

    #[tokio::test]
    async fn test_instant_mint_succeeds_with_prefix() {
        let sim = SettlementSim::new(SimConfig::instant());
        let mint_ref = sim
            .mint_stablecoin(Decimal::new(3125, 2), CryptoAsset::CNgn)
            .await
            .unwrap();
        assert!(mint_ref.starts_with("mint_"));
    }

    #[tokio::test]
    async fn test_mint_failure_rate_one_always_rejects() {
        let sim = SettlementSim::new(SimConfig {
            mint_failure_rate: 1.0,
            ..SimConfig::instant()
        });
        let err = sim
            .mint_stablecoin(Decimal::ONE, CryptoAsset::Usdc)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::MintRejected(_)));
    }

    #[tokio::test]
    async fn test_trustline_rate_zero_reports_missing() {
        let sim = SettlementSim::new(SimConfig {
            trustline_rate: 0.0,
            ..SimConfig::instant()
        });
        assert!(!sim.check_trustline(&dest(), CryptoAsset::CNgn).await.unwrap());
    }

    #[tokio::test]
    async fn test_confirm_rate_zero_stays_pending() {
        let sim = SettlementSim::new(SimConfig {
            confirm_rate: 0.0,
            ..SimConfig::instant()
        });
        let tx_ref = sim
            .send_payment(&dest(), Decimal::ONE, CryptoAsset::CNgn)
            .await
            .unwrap();
        assert!(tx_ref.starts_with("tx_"));
        assert_eq!(
            sim.check_transaction_status(&tx_ref).await.unwrap(),
            TxStatus::Pending
        );
    }
}
