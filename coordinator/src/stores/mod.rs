//! Storage backends.
//!
//! - [`MemoryStore`]: single-process ephemeral store
//! - [`RedisStore`]: shared ephemeral store for multi-instance deployments
//! - [`BoundedStore`]: per-call timeout around either
//! - [`InMemoryLifecycleRepository`]: booking and payment snapshots in memory

pub mod bounded;
pub mod lifecycle_memory;
pub mod memory;
pub mod redis;

pub use bounded::BoundedStore;
pub use lifecycle_memory::InMemoryLifecycleRepository;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
