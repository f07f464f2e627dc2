//! Wallet domain — browser-extension wallet sessions and balances.
//!
//! The session state machine lives in [`session::Wallet`]; the extension
//! itself is reached through the [`provider::WalletProvider`] seam and
//! account balances through the [`balances::BalanceSource`] seam.

pub mod balances;
pub mod provider;
pub mod refresh;
pub mod session;

pub use balances::BalanceSource;
#[cfg(feature = "http")]
pub use balances::HorizonBalances;
pub use provider::{
    AddressResult, AllowedResult, ConnectedResult, NetworkResult, ProviderStatus, SignResult,
    WalletProvider,
};
pub use refresh::RefreshScheduler;
pub use session::{SignedTransaction, Wallet};

use crate::shared::{AccountId, Network};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── WalletState ─────────────────────────────────────────────────────────────

/// Connection state of the wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl std::fmt::Display for WalletState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ─── AssetBalance ────────────────────────────────────────────────────────────

/// One balance line on the connected account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

// ─── WalletSession ───────────────────────────────────────────────────────────

/// Snapshot of the wallet session observable state.
///
/// `public_key` and `network` are present iff `state` is `Connected`.
/// `balances` is replaced wholesale on every refresh, never merged.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletSession {
    pub state: WalletState,
    pub public_key: Option<AccountId>,
    pub network: Option<Network>,
    pub installed: bool,
    pub error: Option<String>,
    pub balances: Vec<AssetBalance>,
    pub balances_loading: bool,
    pub last_balance_update: Option<DateTime<Utc>>,
}

impl Default for WalletSession {
    fn default() -> Self {
        Self {
            state: WalletState::Disconnected,
            public_key: None,
            network: None,
            installed: false,
            error: None,
            balances: Vec::new(),
            balances_loading: false,
            last_balance_update: None,
        }
    }
}

impl WalletSession {
    pub fn is_connected(&self) -> bool {
        self.state == WalletState::Connected
    }

    /// Balance of one asset; zero when the asset is not held.
    pub fn balance_of(&self, asset: &str) -> Decimal {
        self.balances
            .iter()
            .find(|b| b.asset == asset)
            .map(|b| b.balance)
            .unwrap_or(Decimal::ZERO)
    }
}

// ─── RememberedSession ───────────────────────────────────────────────────────

/// The slice of session state persisted across restarts for auto-reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RememberedSession {
    pub public_key: AccountId,
    pub network: Option<Network>,
}
