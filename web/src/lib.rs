//! HTTP boundary for the booking coordinator.
//!
//! Handlers stay thin: extract, call one coordinator component, map the
//! result. [`AppError`] turns every [`booking_coordinator::BookingError`]
//! into the matching status code.
//!
//! # Request Flow
//!
//! 1. Correlation ID assigned (or taken from `X-Correlation-ID`)
//! 2. Path, body, client IP and admin credentials extracted
//! 3. Coordinator component called
//! 4. Result or error mapped to a JSON response
//!
//! # Example
//!
//! ```no_run
//! use booking_coordinator::clock::SystemClock;
//! use booking_coordinator::stores::{InMemoryLifecycleRepository, MemoryStore};
//! use booking_web::{AppState, Config, build_router};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Arc::new(Config::from_env()?);
//! let state = AppState::new(
//!     config,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(InMemoryLifecycleRepository::new()),
//!     Arc::new(SystemClock),
//! )?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, build_router(state)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::AdminUser;
pub use config::Config;
pub use error::AppError;
pub use extractors::{ClientIp, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
