//! Account balance source.
//!
//! The session layer fetches balances through the [`BalanceSource`] seam;
//! [`HorizonBalances`] implements it against a Horizon `/accounts/{id}`
//! endpoint. An unfunded account (404) reads as a single zero native
//! balance, not an error.

use super::AssetBalance;
use crate::error::WalletError;
use crate::shared::{AccountId, Network};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::future::Future;

/// Symbol the native asset is reported under.
pub const NATIVE_ASSET: &str = "XLM";

/// Where the wallet session reads balances from.
pub trait BalanceSource: Send + Sync + 'static {
    fn fetch_balances(
        &self,
        account: &AccountId,
    ) -> impl Future<Output = Result<Vec<AssetBalance>, WalletError>> + Send;
}

// ─── Horizon wire types ──────────────────────────────────────────────────────

/// Account resource, reduced to the balances list.
#[derive(Debug, Deserialize)]
pub(crate) struct AccountResponse {
    pub balances: Vec<HorizonBalance>,
}

/// One entry of the Horizon balances list. Native entries carry no
/// code/issuer; credit entries carry both.
#[derive(Debug, Deserialize)]
pub(crate) struct HorizonBalance {
    pub asset_type: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
    #[serde(default)]
    pub asset_code: Option<String>,
    #[serde(default)]
    pub asset_issuer: Option<String>,
}

/// The single zero balance reported for unfunded accounts.
fn zero_native() -> Vec<AssetBalance> {
    vec![AssetBalance {
        asset: NATIVE_ASSET.into(),
        balance: Decimal::ZERO,
        issuer: None,
    }]
}

pub(crate) fn map_balances(account: AccountResponse) -> Vec<AssetBalance> {
    let mut balances = Vec::with_capacity(account.balances.len());
    for entry in account.balances {
        if entry.asset_type == "native" {
            balances.push(AssetBalance {
                asset: NATIVE_ASSET.into(),
                balance: entry.balance,
                issuer: None,
            });
        } else if let Some(code) = entry.asset_code {
            balances.push(AssetBalance {
                asset: code,
                balance: entry.balance,
                issuer: entry.asset_issuer,
            });
        } else {
            tracing::warn!(asset_type = %entry.asset_type, "skipping balance entry without asset code");
        }
    }
    balances
}

// ─── Horizon client ──────────────────────────────────────────────────────────

/// Horizon-backed balance source.
#[cfg(feature = "http")]
pub struct HorizonBalances {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HorizonBalances {
    pub fn new(network: Network) -> Self {
        Self::with_base_url(network.horizon_url())
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let mut builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder.timeout(std::time::Duration::from_secs(30));
        }
        Self {
            client: builder.build().expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[cfg(feature = "http")]
impl BalanceSource for HorizonBalances {
    async fn fetch_balances(&self, account: &AccountId) -> Result<Vec<AssetBalance>, WalletError> {
        let url = format!("{}/accounts/{}", self.base_url, account);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::Fetch(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            // Account not funded yet.
            return Ok(zero_native());
        }
        if !resp.status().is_success() {
            return Err(WalletError::Fetch(format!(
                "horizon returned {}",
                resp.status().as_u16()
            )));
        }

        let account: AccountResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::Fetch(e.to_string()))?;
        Ok(map_balances(account))
    }
}
