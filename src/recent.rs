use serde::{Deserialize, Serialize};

use crate::store::JsonStore;

const RECENT_SEARCHES_KEY: &str = "recent_searches";
pub const MAX_RECENT_SEARCHES: usize = 10;

/// Submitted search queries, most recent first, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentSearches {
    entries: Vec<String>,
}

impl RecentSearches {
    pub fn load(store: &JsonStore) -> Self {
        let mut recent: RecentSearches = store.read(RECENT_SEARCHES_KEY).unwrap_or_default();
        recent.entries.truncate(MAX_RECENT_SEARCHES);
        recent
    }

    pub fn save(&self, store: &JsonStore) {
        let result = if self.entries.is_empty() {
            store.remove(RECENT_SEARCHES_KEY).map(|_| ())
        } else {
            store.write(RECENT_SEARCHES_KEY, self)
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist recent searches");
        }
    }

    /// Move `query` to the front, dropping an exact duplicate and anything
    /// past the cap.
    pub fn record(&mut self, query: &str) {
        if query.is_empty() {
            return;
        }
        self.entries.retain(|entry| entry != query);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(MAX_RECENT_SEARCHES);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_recent_first() {
        let mut recent = RecentSearches::default();
        recent.record("rust");
        recent.record("tokio");
        assert_eq!(recent.iter().collect::<Vec<_>>(), vec!["tokio", "rust"]);
    }

    #[test]
    fn duplicate_moves_to_front() {
        let mut recent = RecentSearches::default();
        recent.record("rust");
        recent.record("tokio");
        recent.record("rust");
        assert_eq!(recent.iter().collect::<Vec<_>>(), vec!["rust", "tokio"]);
    }

    #[test]
    fn dedup_is_exact_match() {
        let mut recent = RecentSearches::default();
        recent.record("Rust");
        recent.record("rust");
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn capped_at_ten() {
        let mut recent = RecentSearches::default();
        for i in 0..15 {
            recent.record(&format!("query{}", i));
        }
        assert_eq!(recent.len(), MAX_RECENT_SEARCHES);
        assert_eq!(recent.get(0), Some("query14"));
        assert_eq!(recent.get(9), Some("query5"));
    }

    #[test]
    fn empty_query_is_ignored() {
        let mut recent = RecentSearches::default();
        recent.record("");
        assert!(recent.is_empty());
    }

    #[test]
    fn persists_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();

        let mut recent = RecentSearches::default();
        recent.record("serde");
        recent.record("clap");
        recent.save(&store);

        let loaded = RecentSearches::load(&store);
        assert_eq!(loaded, recent);

        recent.clear();
        recent.save(&store);
        assert!(RecentSearches::load(&store).is_empty());
    }
}
