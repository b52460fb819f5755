//! # Booking Lifecycle Coordinator
//!
//! Ephemeral, time-bounded coordination state for a multi-brand booking
//! front-end, plus the status machines every durable booking must respect.
//!
//! ## Mechanisms
//!
//! - **Rate limiter**: fixed-window admission control per caller
//! - **Session store**: wizard drafts that survive across requests
//! - **Upload tokens**: single-use grants for one proof-of-payment upload
//! - **Lifecycle**: booking, payment and verification state machines
//! - **Validation**: batch field checks before anything else runs
//!
//! All ephemeral state lives behind one [`EphemeralStore`] handle
//! (in-memory or Redis) constructed at startup and injected into each
//! component.
//!
//! ## Example
//!
//! ```
//! use booking_coordinator::clock::SystemClock;
//! use booking_coordinator::config::{CoordinatorConfig, RateLimitRule};
//! use booking_coordinator::rate_limiter::RateLimiter;
//! use booking_coordinator::stores::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> booking_coordinator::Result<()> {
//! let limiter = RateLimiter::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(SystemClock),
//!     &CoordinatorConfig::default(),
//! );
//!
//! let decision = limiter.allow("booking:1.2.3.4", &RateLimitRule::new(3, 60_000)?).await?;
//! assert!(decision.allowed);
//! assert_eq!(decision.remaining, 2);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![allow(clippy::module_name_repetitions)]

pub mod admin;
pub mod availability;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod providers;
pub mod rate_limiter;
pub mod session;
pub mod state;
pub mod stores;
pub mod submission;
pub mod upload_token;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use error::{BookingError, Result, StoreError, StoreResult};
pub use providers::{EphemeralStore, LifecycleRepository};
