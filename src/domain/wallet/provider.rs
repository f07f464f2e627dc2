//! Wallet provider seam — the browser-extension API surface.
//!
//! Extension calls do not fail through a transport error: each returns a
//! result object that may carry an `error` field. Every call site must treat
//! a present `error` as failure. The helpers at the bottom of this module
//! collapse those result objects into plain `Option`s for the session layer.

use crate::shared::{AccountId, Network};
use std::future::Future;

// ─── Result objects ──────────────────────────────────────────────────────────

/// Result of `is_connected` — an error here means the extension is absent.
#[derive(Debug, Clone, Default)]
pub struct ConnectedResult {
    pub is_connected: bool,
    pub error: Option<String>,
}

/// Result of `is_allowed` / `set_allowed`.
#[derive(Debug, Clone, Default)]
pub struct AllowedResult {
    pub is_allowed: bool,
    pub error: Option<String>,
}

/// Result of `request_access` / `get_address`.
#[derive(Debug, Clone, Default)]
pub struct AddressResult {
    pub address: Option<AccountId>,
    pub error: Option<String>,
}

/// Result of `get_network`.
#[derive(Debug, Clone, Default)]
pub struct NetworkResult {
    pub network: Option<Network>,
    pub error: Option<String>,
}

/// Result of `sign_transaction`.
#[derive(Debug, Clone, Default)]
pub struct SignResult {
    pub signed_tx_xdr: Option<String>,
    pub signer_address: Option<AccountId>,
    pub error: Option<String>,
}

impl AddressResult {
    /// The address, unless the call reported an error.
    pub fn ok(self) -> Option<AccountId> {
        if self.error.is_some() {
            return None;
        }
        self.address
    }
}

impl NetworkResult {
    pub fn ok(self) -> Option<Network> {
        if self.error.is_some() {
            return None;
        }
        self.network
    }
}

// ─── WalletProvider ──────────────────────────────────────────────────────────

/// The extension wallet API consumed by the session layer.
pub trait WalletProvider: Send + Sync + 'static {
    fn is_connected(&self) -> impl Future<Output = ConnectedResult> + Send;
    fn is_allowed(&self) -> impl Future<Output = AllowedResult> + Send;
    fn set_allowed(&self) -> impl Future<Output = AllowedResult> + Send;
    fn request_access(&self) -> impl Future<Output = AddressResult> + Send;
    fn get_address(&self) -> impl Future<Output = AddressResult> + Send;
    fn get_network(&self) -> impl Future<Output = NetworkResult> + Send;
    fn sign_transaction(
        &self,
        xdr: &str,
        network_passphrase: &str,
    ) -> impl Future<Output = SignResult> + Send;
}

// ─── Status aggregation ──────────────────────────────────────────────────────

/// Aggregated provider state, gathered in one sweep.
#[derive(Debug, Clone, Default)]
pub struct ProviderStatus {
    pub installed: bool,
    pub connected: bool,
    pub allowed: bool,
    pub address: Option<AccountId>,
    pub network: Option<Network>,
}

/// Probe the provider for its full status. Never fails: an unresponsive
/// extension reads as not installed.
pub async fn provider_status<P: WalletProvider>(provider: &P) -> ProviderStatus {
    let probe = provider.is_connected().await;
    if probe.error.is_some() || !probe.is_connected {
        return ProviderStatus::default();
    }

    let (allowed, address, network) = tokio::join!(
        provider.is_allowed(),
        provider.get_address(),
        provider.get_network(),
    );

    let address = address.ok();
    ProviderStatus {
        installed: true,
        connected: address.is_some(),
        allowed: allowed.error.is_none() && allowed.is_allowed,
        address,
        network: network.ok(),
    }
}

/// Run the authorization flow: `set_allowed`, then `request_access`.
/// Returns the granted address, or `None` on rejection or any error.
pub async fn request_access<P: WalletProvider>(provider: &P) -> Option<AccountId> {
    let allowed = provider.set_allowed().await;
    if allowed.error.is_some() || !allowed.is_allowed {
        return None;
    }
    let access = provider.request_access().await;
    if let Some(error) = &access.error {
        tracing::warn!(%error, "wallet access request failed");
        return None;
    }
    access.address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_result_error_wins() {
        let result = AddressResult {
            address: Some(AccountId::new("GKEY")),
            error: Some("denied".into()),
        };
        assert_eq!(result.ok(), None);
    }

    #[test]
    fn test_network_result_ok() {
        let result = NetworkResult {
            network: Some(Network::Public),
            error: None,
        };
        assert_eq!(result.ok(), Some(Network::Public));
    }
}
