//! Wizard session continuity.
//!
//! A multi-step form posts its whole accumulated state on every step; each
//! [`SessionStore::save`] replaces the stored payload outright. Nothing is
//! merged.
//!
//! Store failures surface as [`BookingError::StoreUnavailable`], never as a
//! missing session.

use crate::config::CoordinatorConfig;
use crate::error::{BookingError, Result};
use crate::providers::{EphemeralStore, decode, encode};
use crate::state::SessionId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Accumulated state of the booking wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    /// Brand the wizard was started under.
    pub brand: String,
    /// Last completed step (1-based).
    #[serde(default)]
    pub step: u8,
    /// Every field entered so far.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Keyed temporary storage for wizard payloads.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn EphemeralStore>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a session store with the configured TTL.
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>, config: &CoordinatorConfig) -> Self {
        Self {
            store,
            ttl: config.session_ttl,
        }
    }

    fn key(id: &SessionId) -> String {
        format!("booking_session:{id}")
    }

    /// Session lifetime applied by [`save`](Self::save).
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Replace the payload stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StoreUnavailable`] if the store cannot be reached.
    pub async fn save<T: Serialize + Sync>(&self, id: &SessionId, payload: &T) -> Result<()> {
        self.save_with_ttl(id, payload, self.ttl).await
    }

    /// Replace the payload stored under `id` with an explicit lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StoreUnavailable`] if the store cannot be reached.
    pub async fn save_with_ttl<T: Serialize + Sync>(
        &self,
        id: &SessionId,
        payload: &T,
        ttl: Duration,
    ) -> Result<()> {
        self.store.set(&Self::key(id), encode(payload)?, ttl).await?;
        tracing::info!(
            session_id = %id,
            ttl_secs = ttl.as_secs(),
            "Session saved"
        );
        Ok(())
    }

    /// Fetch the payload stored under `id`.
    ///
    /// Returns `Ok(None)` for unknown and expired sessions alike.
    ///
    /// # Errors
    ///
    /// - [`BookingError::StoreUnavailable`] if the store cannot be reached.
    /// - [`BookingError::Serialization`] if the payload does not fit `T`.
    pub async fn load<T: DeserializeOwned>(&self, id: &SessionId) -> Result<Option<T>> {
        let Some(bytes) = self.store.get(&Self::key(id)).await? else {
            tracing::debug!(session_id = %id, "Session not found");
            return Ok(None);
        };
        decode(&bytes).map(Some).map_err(BookingError::from)
    }

    /// Remove the session. Clearing an unknown session is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StoreUnavailable`] if the store cannot be reached.
    pub async fn clear(&self, id: &SessionId) -> Result<()> {
        self.store.delete(&Self::key(id)).await?;
        tracing::info!(session_id = %id, "Session cleared");
        Ok(())
    }
}
