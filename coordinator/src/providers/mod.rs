//! Storage seams.
//!
//! This module defines traits for every external dependency the coordinator
//! touches. Mechanisms receive them as `Arc<dyn ...>` at construction, so a
//! process wires one store handle at startup and tests swap in doubles.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   ┌──────────────────────┐
//! │ RateLimiter       │   │ AdminWorkflow        │
//! │ SessionStore      │   │ SubmissionPipeline   │
//! │ UploadTokenIssuer │   │                      │
//! └────────┬──────────┘   └──────────┬───────────┘
//!          │                         │
//!          ▼                         ▼
//! ┌───────────────────┐   ┌──────────────────────┐
//! │ EphemeralStore    │   │ LifecycleRepository  │
//! │ (TTL, CAS, take)  │   │ (durable snapshots)  │
//! └───────────────────┘   └──────────────────────┘
//! ```

pub mod repository;
pub mod store;

pub use repository::{LifecycleRepository, NewBooking};
pub use store::{EphemeralStore, decode, encode};
