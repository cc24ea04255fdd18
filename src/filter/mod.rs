//! Domain filtering.
//!
//! The query path only needs a membership test, expressed by
//! [`DomainFilter`]. [`Blocklist`] is the in-memory implementation: an
//! immutable [`BlocklistSnapshot`] published through an atomic pointer swap,
//! rebuilt from a [`ListStore`] whenever the lists change.

mod blocklist;
pub mod bundled;
mod loader;
mod store;

pub use blocklist::{Blocklist, BlocklistSnapshot};
pub use loader::{load_list_dir, parse_list};
pub use store::{Category, ListEntry, ListKind, ListStore, MemoryListStore};

/// Synchronous domain membership test consulted for every query.
///
/// Implementations must answer from memory and must not panic. A domain
/// that cannot be matched is reported as not blocked.
pub trait DomainFilter: Send + Sync {
    fn contains(&self, domain: &str) -> bool;
}
