//! Blocklist of ad/tracking domains.
//!
//! Lookups go through an `ArcSwap` so refreshes replace the whole set at
//! once and readers never take a lock.

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashSet;
use tracing::info;

use super::DomainFilter;
use super::store::ListStore;

/// An immutable set of blocked domains, stored lowercase.
#[derive(Debug, Default)]
pub struct BlocklistSnapshot {
    domains: FxHashSet<String>,
}

impl BlocklistSnapshot {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .filter_map(|d| {
                let d = d.as_ref().trim();
                if d.is_empty() {
                    return None;
                }
                Some(d.to_ascii_lowercase())
            })
            .collect();

        Self { domains }
    }

    /// Exact, ASCII case-insensitive membership.
    pub fn contains(&self, domain: &str) -> bool {
        if domain.is_empty() {
            return false;
        }
        if domain.bytes().any(|b| b.is_ascii_uppercase()) {
            return self.domains.contains(&domain.to_ascii_lowercase());
        }
        self.domains.contains(domain)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Shared blocklist handle used by every request.
pub struct Blocklist {
    current: ArcSwap<BlocklistSnapshot>,
}

impl Blocklist {
    pub fn new(snapshot: BlocklistSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    /// A blocklist that blocks nothing.
    pub fn empty() -> Self {
        Self::new(BlocklistSnapshot::default())
    }

    /// Replace the current snapshot. In-flight lookups keep the old one.
    pub fn publish(&self, snapshot: BlocklistSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Rebuild from `store` and publish the result.
    pub fn refresh(&self, store: &dyn ListStore) -> usize {
        let snapshot = store.snapshot();
        let count = snapshot.len();
        self.publish(snapshot);
        info!(domains = count, "Blocklist snapshot published");
        count
    }

    pub fn snapshot(&self) -> Arc<BlocklistSnapshot> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::empty()
    }
}

impl DomainFilter for Blocklist {
    fn contains(&self, domain: &str) -> bool {
        self.current.load().contains(domain)
    }
}
