//! Search index client seam
//!
//! The pipeline and query layers only ever talk to this capability trait.
//! Wire flavors live behind it: a REST client for production and an
//! in-memory client for development and tests.

use super::decompose::PathDocument;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Scroll lifetime requested for paged searches
pub const SCROLL_LIFETIME: &str = "1m";

/// Page size for scrolled searches
pub const SEARCH_PAGE_SIZE: usize = 100;

/// A depth/tenant/regex filtered search over path documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub tenant: String,
    /// Anchored-by-the-index regex over the `path` field
    pub regex: String,
    /// Required document depth, equal to the glob's segment count
    pub depth: usize,
    /// Restrict matches to leaf documents
    pub leafs_only: bool,
}

/// One page of search results
#[derive(Debug, Default, Clone)]
pub struct SearchPage {
    /// Total hits across all pages
    pub total: usize,
    pub docs: Vec<PathDocument>,
    /// Continuation token; `None` when the cursor is exhausted
    pub scroll_id: Option<String>,
}

/// Thin capability interface over the search index
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Check whether a single document id exists.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Return the subset of `ids` that exist in the index.
    async fn multi_get(&self, ids: &[String]) -> Result<HashSet<String>>;

    /// Write a single document.
    async fn put(&self, doc: &PathDocument) -> Result<()>;

    /// Write a batch of documents, overwriting by id.
    async fn bulk_upsert(&self, docs: &[PathDocument]) -> Result<()>;

    /// Open a scrolled search and return the first page.
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage>;

    /// Fetch the next page of an open scroll.
    async fn scroll(&self, scroll_id: &str) -> Result<SearchPage>;
}
