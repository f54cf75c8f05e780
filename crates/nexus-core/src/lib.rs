//! Nexus Core - Domain types and traits
//!
//! This crate provides the foundational types shared by the Nexus invoice
//! gateway: the entities whose display names are resolved, the push events
//! that keep the name cache coherent, the invoice records being enriched and
//! the key/value store abstraction both cache writers go through.

pub mod entity;
pub mod error;
pub mod event;
pub mod invoice;
pub mod store;
pub mod viewer;

pub use entity::{EntityKind, customer_key};
pub use error::{CacheError, EventError};
pub use event::CustomerUpdated;
pub use invoice::{EnrichedInvoice, Invoice, ResolvedNames};
pub use store::KeyValueStore;
pub use viewer::{Role, Viewer};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
