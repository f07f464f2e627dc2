//! Wallet session state machine.
//!
//! One shared session per process: connect/disconnect, silent auto-reconnect
//! from a remembered key, and periodic balance refresh. State transitions are
//! serialized through a single `RwLock`; the `Connecting` state doubles as a
//! re-entry guard so only one connect attempt is ever in flight.

use super::balances::BalanceSource;
use super::provider::{self, WalletProvider};
use super::refresh::RefreshScheduler;
use super::{RememberedSession, WalletSession, WalletState};
use crate::error::WalletError;
use crate::shared::AccountId;
use crate::storage::{keys, Storage};
use async_lock::RwLock;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Cadence of the periodic balance refresh.
pub const BALANCE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// A transaction signed by the wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    pub xdr: String,
    pub signer: Option<AccountId>,
}

/// The wallet session component.
///
/// Cheap to clone; all clones observe the same session.
pub struct Wallet<P, B> {
    provider: Arc<P>,
    source: Arc<B>,
    storage: Arc<dyn Storage>,
    session: Arc<RwLock<WalletSession>>,
    scheduler: Arc<RefreshScheduler>,
}

impl<P, B> Clone for Wallet<P, B> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            source: self.source.clone(),
            storage: self.storage.clone(),
            session: self.session.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<P: WalletProvider, B: BalanceSource> Wallet<P, B> {
    pub fn new(provider: P, source: B, storage: Arc<dyn Storage>) -> Self {
        Self::with_refresh_interval(provider, source, storage, BALANCE_REFRESH_INTERVAL)
    }

    pub fn with_refresh_interval(
        provider: P,
        source: B,
        storage: Arc<dyn Storage>,
        refresh_interval: Duration,
    ) -> Self {
        Self::with_scheduler(
            provider,
            source,
            storage,
            Arc::new(RefreshScheduler::new(refresh_interval)),
        )
    }

    /// Build around an externally owned refresh scheduler, e.g. one shared
    /// with other components that hold the timer open.
    pub fn with_scheduler(
        provider: P,
        source: B,
        storage: Arc<dyn Storage>,
        scheduler: Arc<RefreshScheduler>,
    ) -> Self {
        Self {
            provider: Arc::new(provider),
            source: Arc::new(source),
            storage,
            session: Arc::new(RwLock::new(WalletSession::default())),
            scheduler,
        }
    }

    /// Current observable session state.
    pub async fn snapshot(&self) -> WalletSession {
        self.session.read().await.clone()
    }

    /// The scheduler driving periodic refresh, for external observers that
    /// want to hold the timer open with `start`/`stop` pairs.
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Probe whether the extension is installed. Never fails; any probe
    /// failure reads as not installed.
    pub async fn check_installed(&self) -> bool {
        let probe = self.provider.is_connected().await;
        let installed = probe.error.is_none() && probe.is_connected;
        self.session.write().await.installed = installed;
        installed
    }

    /// Connect the wallet.
    ///
    /// Serialized: a call that observes another connect in flight is a no-op
    /// returning `false`. On success the session is remembered for
    /// auto-reconnect and a balance refresh is kicked off without blocking
    /// the result.
    pub async fn connect(&self) -> bool {
        let was_connected;
        {
            let mut session = self.session.write().await;
            if session.state == WalletState::Connecting {
                return false;
            }
            was_connected = session.state == WalletState::Connected;
            session.state = WalletState::Connecting;
            session.error = None;
        }

        let status = provider::provider_status(&*self.provider).await;
        if !status.installed {
            let mut session = self.session.write().await;
            session.state = WalletState::Error;
            session.error = Some(WalletError::NotInstalled.to_string());
            session.installed = false;
            return false;
        }
        self.session.write().await.installed = true;

        let Some(address) = provider::request_access(&*self.provider).await else {
            let mut session = self.session.write().await;
            session.state = WalletState::Error;
            session.error = Some("connection rejected or failed".into());
            return false;
        };

        let network = self.provider.get_network().await.ok();

        {
            let mut session = self.session.write().await;
            session.state = WalletState::Connected;
            session.public_key = Some(address.clone());
            session.network = network;
            session.error = None;
        }
        self.remember(&RememberedSession {
            public_key: address.clone(),
            network,
        });
        tracing::debug!(address = %address.short(), "wallet connected");

        if !was_connected {
            self.start_balance_refresh();
        }
        self.spawn_refresh();
        true
    }

    /// Reset the session to disconnected and forget the remembered key.
    /// Local state only; the extension keeps its own authorization.
    pub async fn disconnect(&self) {
        let was_connected;
        {
            let mut session = self.session.write().await;
            was_connected = session.state == WalletState::Connected;
            let installed = session.installed;
            *session = WalletSession {
                installed,
                ..WalletSession::default()
            };
        }
        if let Err(e) = self.storage.remove(keys::WALLET_SESSION) {
            tracing::warn!(error = %e, "failed to clear remembered wallet session");
        }
        if was_connected {
            self.stop_balance_refresh();
        }
        tracing::debug!("wallet disconnected");
    }

    /// Refresh balances from the balance source.
    ///
    /// No-op unless connected. Failures keep the last-known-good balances
    /// and only clear the loading flag — never surfaced as fatal.
    pub async fn refresh_balances(&self) {
        let key = {
            let mut session = self.session.write().await;
            if session.state != WalletState::Connected {
                return;
            }
            let Some(key) = session.public_key.clone() else {
                return;
            };
            session.balances_loading = true;
            key
        };

        match self.source.fetch_balances(&key).await {
            Ok(balances) => {
                let mut session = self.session.write().await;
                session.balances = balances;
                session.balances_loading = false;
                session.last_balance_update = Some(Utc::now());
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to refresh balances");
                self.session.write().await.balances_loading = false;
            }
        }
    }

    /// Silently restore a previous session.
    ///
    /// Acts only when a remembered key exists and no session is active.
    /// A provider still connected with the same address restores directly,
    /// skipping the authorize flow. A changed address or revoked
    /// authorization disconnects. Every failure is swallowed.
    pub async fn auto_reconnect(&self) {
        let Some(remembered) = self.remembered() else {
            return;
        };
        {
            let session = self.session.read().await;
            if matches!(session.state, WalletState::Connected | WalletState::Connecting) {
                return;
            }
        }

        let status = provider::provider_status(&*self.provider).await;
        if !status.installed {
            self.session.write().await.installed = false;
            return;
        }
        self.session.write().await.installed = true;

        if status.connected && status.address.as_ref() == Some(&remembered.public_key) {
            self.restore(remembered.public_key, status.network).await;
            return;
        }

        if status.allowed {
            // Authorization held — check the address silently.
            let current = self.provider.get_address().await.ok();
            if current.as_ref() == Some(&remembered.public_key) {
                let network = self.provider.get_network().await.ok();
                self.restore(remembered.public_key, network).await;
            } else {
                tracing::debug!("remembered wallet key changed, disconnecting");
                self.disconnect().await;
            }
        } else {
            tracing::debug!("wallet authorization revoked, disconnecting");
            self.disconnect().await;
        }
    }

    /// Sign a transaction envelope with the connected wallet.
    pub async fn sign_transaction(&self, xdr: &str) -> Result<SignedTransaction, WalletError> {
        let network = {
            let session = self.session.read().await;
            if session.state != WalletState::Connected {
                return Err(WalletError::NotConnected);
            }
            session.network.unwrap_or(crate::shared::Network::Public)
        };

        let result = self.provider.sign_transaction(xdr, network.passphrase()).await;
        if let Some(error) = result.error {
            return Err(WalletError::SignRejected(error));
        }
        let Some(xdr) = result.signed_tx_xdr else {
            return Err(WalletError::SignRejected("empty signing response".into()));
        };
        Ok(SignedTransaction {
            xdr,
            signer: result.signer_address,
        })
    }

    /// Record a user-facing error. `Some` also flips the state to `Error`;
    /// `None` clears the message without touching the state.
    pub async fn set_error(&self, error: Option<String>) {
        let mut session = self.session.write().await;
        if error.is_some() {
            session.state = WalletState::Error;
        }
        session.error = error;
    }

    pub async fn clear_error(&self) {
        self.session.write().await.error = None;
    }

    /// Hold the periodic refresh timer open (ref-counted).
    pub fn start_balance_refresh(&self) {
        let wallet = self.clone();
        self.scheduler.start(move || {
            let wallet = wallet.clone();
            async move { wallet.refresh_balances().await }
        });
    }

    /// Release one hold on the periodic refresh timer.
    pub fn stop_balance_refresh(&self) {
        self.scheduler.stop();
    }

    // ── Internals ────────────────────────────────────────────────────────

    async fn restore(&self, address: AccountId, network: Option<crate::shared::Network>) {
        {
            let mut session = self.session.write().await;
            session.state = WalletState::Connected;
            session.public_key = Some(address.clone());
            session.network = network;
        }
        tracing::debug!(address = %address.short(), "wallet session restored");
        self.start_balance_refresh();
        self.spawn_refresh();
    }

    /// Fire-and-forget balance refresh; never blocks the caller.
    fn spawn_refresh(&self) {
        let wallet = self.clone();
        tokio::spawn(async move { wallet.refresh_balances().await });
    }

    fn remembered(&self) -> Option<RememberedSession> {
        let raw = match self.storage.read(keys::WALLET_SESSION) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read remembered wallet session");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(remembered) => Some(remembered),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unparseable remembered wallet session");
                let _ = self.storage.remove(keys::WALLET_SESSION);
                None
            }
        }
    }

    fn remember(&self, remembered: &RememberedSession) {
        match serde_json::to_string(remembered) {
            Ok(raw) => {
                if let Err(e) = self.storage.write(keys::WALLET_SESSION, &raw) {
                    tracing::warn!(error = %e, "failed to remember wallet session");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize remembered wallet session"),
        }
    }
}
