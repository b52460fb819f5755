//! Application state for Axum handlers.
//!
//! Every coordinator component is built once from the same ephemeral store,
//! repository and clock, then cloned (cheaply, via `Arc`) into each request.

use crate::config::Config;
use booking_coordinator::admin::AdminWorkflow;
use booking_coordinator::availability::AvailabilityCache;
use booking_coordinator::clock::Clock;
use booking_coordinator::rate_limiter::RateLimiter;
use booking_coordinator::session::SessionStore;
use booking_coordinator::submission::SubmissionPipeline;
use booking_coordinator::upload_token::UploadTokenIssuer;
use booking_coordinator::validation::Validator;
use booking_coordinator::{EphemeralStore, LifecycleRepository, Result};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Immutable startup configuration
    pub config: Arc<Config>,

    /// Booking submission gatekeeper
    pub pipeline: SubmissionPipeline,

    /// Wizard drafts
    pub sessions: SessionStore,

    /// Administrator lifecycle changes and proof uploads
    pub admin: AdminWorkflow,

    /// Rate limiter, for administrative resets
    pub limiter: RateLimiter,

    /// Published time slots
    pub availability: AvailabilityCache,
}

impl AppState {
    /// Wire every component from shared infrastructure.
    ///
    /// # Errors
    ///
    /// Returns [`booking_coordinator::BookingError::InvalidConfig`] when the
    /// configured rate limit rules are invalid.
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn EphemeralStore>,
        repository: Arc<dyn LifecycleRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let settings = config.coordinator()?;

        let limiter = RateLimiter::new(store.clone(), clock.clone(), &settings);
        let sessions = SessionStore::new(store.clone(), &settings);
        let availability = AvailabilityCache::new(store.clone(), &settings);
        let tokens = UploadTokenIssuer::new(store, clock.clone(), &settings);

        let mut pipeline = SubmissionPipeline::new(
            limiter.clone(),
            Validator::new(clock.clone()),
            tokens.clone(),
            sessions.clone(),
            repository.clone(),
            clock.clone(),
        )
        .with_brands(config.brands.clone())
        .with_default_rule(settings.booking_rule)
        .with_bank_details(config.bank.clone());
        for (brand, rule) in config.brand_rules()? {
            pipeline = pipeline.with_brand_rule(&brand, rule);
        }

        let admin = AdminWorkflow::new(repository, tokens, clock);

        Ok(Self {
            config,
            pipeline,
            sessions,
            admin,
            limiter,
            availability,
        })
    }
}
