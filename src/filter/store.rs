//! List entry storage.
//!
//! The proxy does not persist lists itself; a [`ListStore`] is the boundary
//! to whatever holds them. [`MemoryListStore`] is the in-process version.

use std::sync::RwLock;

use rustc_hash::FxHashMap;

use super::blocklist::BlocklistSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Block,
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Ads,
    Analytics,
    ErrorTracker,
    SocialTracker,
    Mixed,
    Oem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub domain: String,
    pub kind: ListKind,
    pub category: Category,
    pub active: bool,
}

impl ListEntry {
    pub fn block(domain: impl Into<String>, category: Category) -> Self {
        Self {
            domain: domain.into(),
            kind: ListKind::Block,
            category,
            active: true,
        }
    }

    pub fn allow(domain: impl Into<String>, category: Category) -> Self {
        Self {
            domain: domain.into(),
            kind: ListKind::Allow,
            category,
            active: true,
        }
    }
}

/// Storage for list entries, unique on `(domain, kind)`.
pub trait ListStore: Send + Sync {
    /// Insert or replace entries; returns how many were written.
    fn bulk_upsert(&self, entries: Vec<ListEntry>) -> usize;

    /// Active block entries minus active allow entries.
    fn snapshot(&self) -> BlocklistSnapshot;
}

type EntryKey = (String, ListKind);

#[derive(Default)]
pub struct MemoryListStore {
    entries: RwLock<FxHashMap<EntryKey, ListEntry>>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: ListKind) -> usize {
        self.entries
            .read()
            .map(|e| e.keys().filter(|(_, k)| *k == kind).count())
            .unwrap_or(0)
    }
}

impl ListStore for MemoryListStore {
    fn bulk_upsert(&self, entries: Vec<ListEntry>) -> usize {
        let Ok(mut map) = self.entries.write() else {
            return 0;
        };

        let mut written = 0;
        for mut entry in entries {
            entry.domain = entry.domain.trim().to_ascii_lowercase();
            if entry.domain.is_empty() {
                continue;
            }
            map.insert((entry.domain.clone(), entry.kind), entry);
            written += 1;
        }
        written
    }

    fn snapshot(&self) -> BlocklistSnapshot {
        let Ok(map) = self.entries.read() else {
            return BlocklistSnapshot::default();
        };

        let allowed = |domain: &str| {
            map.get(&(domain.to_string(), ListKind::Allow))
                .is_some_and(|e| e.active)
        };

        BlocklistSnapshot::new(
            map.values()
                .filter(|e| e.kind == ListKind::Block && e.active)
                .filter(|e| !allowed(&e.domain))
                .map(|e| e.domain.as_str()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_is_unique_on_domain_and_kind() {
        let store = MemoryListStore::new();

        store.bulk_upsert(vec![
            ListEntry::block("ads.example", Category::Ads),
            ListEntry::block("ADS.example", Category::Mixed),
            ListEntry::allow("ads.example", Category::Ads),
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.count(ListKind::Block), 1);
        assert_eq!(store.count(ListKind::Allow), 1);
    }

    #[test]
    fn upsert_replaces_category_and_active() {
        let store = MemoryListStore::new();
        store.bulk_upsert(vec![ListEntry::block("ads.example", Category::Ads)]);

        let mut disabled = ListEntry::block("ads.example", Category::Oem);
        disabled.active = false;
        store.bulk_upsert(vec![disabled]);

        assert_eq!(store.len(), 1);
        assert!(!store.snapshot().contains("ads.example"));
    }

    #[test]
    fn allow_entries_win_over_block_entries() {
        let store = MemoryListStore::new();
        store.bulk_upsert(vec![
            ListEntry::block("ads.example", Category::Ads),
            ListEntry::block("tracker.example", Category::Analytics),
            ListEntry::allow("ads.example", Category::Ads),
        ]);

        let snapshot = store.snapshot();

        assert!(!snapshot.contains("ads.example"));
        assert!(snapshot.contains("tracker.example"));
    }

    #[test]
    fn inactive_allow_does_not_unblock() {
        let store = MemoryListStore::new();
        let mut allow = ListEntry::allow("ads.example", Category::Ads);
        allow.active = false;
        store.bulk_upsert(vec![ListEntry::block("ads.example", Category::Ads), allow]);

        assert!(store.snapshot().contains("ads.example"));
    }

    #[test]
    fn upsert_skips_blank_domains() {
        let store = MemoryListStore::new();

        let written = store.bulk_upsert(vec![ListEntry::block("  ", Category::Ads)]);

        assert_eq!(written, 0);
        assert!(store.is_empty());
    }
}
