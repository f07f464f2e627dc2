//! Saved on-ramp form draft.
//!
//! The entry form persists its fields so an interrupted session can resume.
//! Drafts expire after a fixed window and are discarded on the next read;
//! unparseable drafts are discarded the same way.

use crate::error::StoreError;
use crate::shared::{CryptoAsset, FiatCurrency, PaymentMethod};
use crate::storage::{keys, Storage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How long a saved draft stays valid.
pub const DRAFT_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// The form fields captured in a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// Raw user input, formatting preserved.
    pub amount_input: String,
    pub fiat_currency: FiatCurrency,
    pub crypto_asset: CryptoAsset,
    pub payment_method: PaymentMethod,
}

impl Default for OrderDraft {
    fn default() -> Self {
        Self {
            amount_input: String::new(),
            fiat_currency: FiatCurrency::NGN,
            crypto_asset: CryptoAsset::CNgn,
            payment_method: PaymentMethod::BankTransfer,
        }
    }
}

/// Persisted envelope: the draft plus when it was saved.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDraft {
    data: OrderDraft,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

/// Repository for the single saved form draft.
#[derive(Clone)]
pub struct DraftStore {
    storage: Arc<dyn Storage>,
}

impl DraftStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Persist the draft with the current timestamp.
    pub fn save(&self, draft: &OrderDraft) -> Result<(), StoreError> {
        let stored = StoredDraft {
            data: draft.clone(),
            timestamp: Utc::now(),
        };
        let raw = serde_json::to_string(&stored)?;
        self.storage.write(keys::FORM_DRAFT, &raw)?;
        Ok(())
    }

    /// Load the saved draft, if any. Expired and corrupt drafts are removed
    /// and reported as absent.
    pub fn load(&self) -> Result<Option<OrderDraft>, StoreError> {
        let Some(raw) = self.storage.read(keys::FORM_DRAFT)? else {
            return Ok(None);
        };
        let stored = match serde_json::from_str::<StoredDraft>(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unparseable form draft");
                self.storage.remove(keys::FORM_DRAFT)?;
                return Ok(None);
            }
        };
        let age = (Utc::now() - stored.timestamp).to_std().unwrap_or(Duration::ZERO);
        if age > DRAFT_EXPIRY {
            tracing::debug!("discarding expired form draft");
            self.storage.remove(keys::FORM_DRAFT)?;
            return Ok(None);
        }
        Ok(Some(stored.data))
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove(keys::FORM_DRAFT)?;
        Ok(())
    }
}
