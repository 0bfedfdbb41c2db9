//! Sub-path existence cache
//!
//! Grow-only set of document ids known to exist in the search index as
//! shallow non-leaf prefixes. Stage B of the index pipeline is the only
//! writer; readers may race safely because the worst case is a redundant
//! existence check.

use dashmap::DashSet;

/// Process-local set of already-indexed shallow prefix ids
#[derive(Debug, Default)]
pub struct SubPathCache {
    ids: DashSet<String>,
}

impl SubPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Union a batch of ids into the cache.
    pub fn insert_all<I>(&self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        for id in ids {
            self.ids.insert(id);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let cache = SubPathCache::new();
        assert!(cache.is_empty());
        assert!(!cache.contains("t_a"));

        cache.insert_all(vec!["t_a".to_string(), "t_a.b".to_string()]);
        assert!(cache.contains("t_a"));
        assert!(cache.contains("t_a.b"));
        assert_eq!(cache.len(), 2);

        // Duplicates are a no-op
        cache.insert_all(vec!["t_a".to_string()]);
        assert_eq!(cache.len(), 2);
    }
}
