//! In-memory index client for development and tests

use super::decompose::PathDocument;
use super::index::{IndexClient, SearchPage, SearchQuery, SEARCH_PAGE_SIZE};
use crate::{Error, Result};

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Index client backed by a process-local document map.
///
/// Search semantics mirror the remote index: the path regex is fully
/// anchored, and results page through a scroll cursor.
#[derive(Debug)]
struct ScrollState {
    /// Total hits of the originating search, echoed on every page
    total: usize,
    pending: Vec<PathDocument>,
}

#[derive(Debug, Default)]
pub struct MemoryIndexClient {
    docs: RwLock<HashMap<String, PathDocument>>,
    scrolls: RwLock<HashMap<String, ScrollState>>,
    next_scroll: AtomicU64,
}

impl MemoryIndexClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently indexed.
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Fetch one document by id.
    pub fn get(&self, id: &str) -> Option<PathDocument> {
        self.docs.read().get(id).cloned()
    }

    fn open_scroll(&self, total: usize, remainder: Vec<PathDocument>) -> Option<String> {
        if remainder.is_empty() {
            return None;
        }
        let id = format!("scroll-{}", self.next_scroll.fetch_add(1, Ordering::Relaxed));
        self.scrolls.write().insert(
            id.clone(),
            ScrollState {
                total,
                pending: remainder,
            },
        );
        Some(id)
    }
}

#[async_trait]
impl IndexClient for MemoryIndexClient {
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.docs.read().contains_key(id))
    }

    async fn multi_get(&self, ids: &[String]) -> Result<HashSet<String>> {
        let docs = self.docs.read();
        Ok(ids
            .iter()
            .filter(|id| docs.contains_key(id.as_str()))
            .cloned()
            .collect())
    }

    async fn put(&self, doc: &PathDocument) -> Result<()> {
        self.docs.write().insert(doc.id(), doc.clone());
        Ok(())
    }

    async fn bulk_upsert(&self, docs: &[PathDocument]) -> Result<()> {
        let mut map = self.docs.write();
        for doc in docs {
            map.insert(doc.id(), doc.clone());
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        let re = Regex::new(&format!("^{}$", query.regex)).map_err(|_| {
            Error::IndexQueryMalformed {
                query: query.regex.clone(),
            }
        })?;

        let mut hits: Vec<PathDocument> = self
            .docs
            .read()
            .values()
            .filter(|d| {
                d.tenant == query.tenant
                    && d.depth == query.depth
                    && (!query.leafs_only || d.leaf)
                    && re.is_match(&d.path)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.path.cmp(&b.path));

        let total = hits.len();
        let remainder = hits.split_off(total.min(SEARCH_PAGE_SIZE));
        let scroll_id = self.open_scroll(total, remainder);

        Ok(SearchPage {
            total,
            docs: hits,
            scroll_id,
        })
    }

    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage> {
        let mut scrolls = self.scrolls.write();
        let Some(state) = scrolls.get_mut(scroll_id) else {
            return Ok(SearchPage::default());
        };

        let total = state.total;
        let take = state.pending.len().min(SEARCH_PAGE_SIZE);
        let page: Vec<PathDocument> = state.pending.drain(..take).collect();
        if state.pending.is_empty() {
            scrolls.remove(scroll_id);
            return Ok(SearchPage {
                total,
                docs: page,
                scroll_id: None,
            });
        }

        Ok(SearchPage {
            total,
            docs: page,
            scroll_id: Some(scroll_id.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::decompose::expand;

    #[tokio::test]
    async fn test_put_and_exists() {
        let client = MemoryIndexClient::new();
        let docs = expand("t", "a.b");
        for doc in &docs {
            client.put(doc).await.unwrap();
        }

        assert!(client.exists("t_a").await.unwrap());
        assert!(client.exists("t_a.b").await.unwrap());
        assert!(!client.exists("t_a.b.c").await.unwrap());
    }

    #[tokio::test]
    async fn test_multi_get_partitions() {
        let client = MemoryIndexClient::new();
        client.bulk_upsert(&expand("t", "a.b")).await.unwrap();

        let ids = vec!["t_a".to_string(), "t_x".to_string(), "t_a.b".to_string()];
        let existing = client.multi_get(&ids).await.unwrap();
        assert!(existing.contains("t_a"));
        assert!(existing.contains("t_a.b"));
        assert!(!existing.contains("t_x"));
    }

    #[tokio::test]
    async fn test_search_filters_and_scrolls() {
        let client = MemoryIndexClient::new();
        let mut docs = Vec::new();
        for i in 0..250 {
            docs.extend(expand("t", &format!("web.srv{i:03}.cpu")));
        }
        client.bulk_upsert(&docs).await.unwrap();

        let query = SearchQuery {
            tenant: "t".into(),
            regex: "web\\..*\\.cpu".into(),
            depth: 3,
            leafs_only: true,
        };

        let mut page = client.search(&query).await.unwrap();
        assert_eq!(page.total, 250);
        assert_eq!(page.docs.len(), SEARCH_PAGE_SIZE);

        let mut collected = page.docs.len();
        while let Some(id) = page.scroll_id.take() {
            page = client.scroll(&id).await.unwrap();
            assert_eq!(page.total, 250, "scroll pages echo the search total");
            collected += page.docs.len();
        }
        assert_eq!(collected, 250);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_regex() {
        let client = MemoryIndexClient::new();
        let query = SearchQuery {
            tenant: "t".into(),
            regex: "(".into(),
            depth: 1,
            leafs_only: false,
        };
        let err = client.search(&query).await.unwrap_err();
        assert!(matches!(err, Error::IndexQueryMalformed { .. }));
    }
}
