//! Cache module for the Nexus gateway.
//!
//! Two layers back the name resolver:
//! - the shared [`KeyValueStore`](nexus_core::KeyValueStore) (`RedisStore` in
//!   production, `MemoryStore` for local development), written by both the
//!   resolver's backfill and the invalidation consumer;
//! - a bounded process-local cache for employee and branch names.

pub mod local;
pub mod memory_store;
pub mod redis_store;

// Re-exports
pub use local::{LocalNameCache, LocalResolutionEntry};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
