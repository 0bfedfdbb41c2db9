//! Metric path decomposition
//!
//! A dotted metric name implies a document for every ancestor prefix:
//! `a.b.c` yields `a` (depth 1), `a.b` (depth 2) and the leaf `a.b.c`
//! (depth 3). The index pipeline expands every incoming sample this way
//! before deciding which documents still need to be written.

use super::cache::SubPathCache;
use serde::{Deserialize, Serialize};

/// Depth up to which non-leaf prefixes are tracked in the sub-path cache.
///
/// Shallow prefixes are shared by millions of metrics; caching their
/// existence avoids re-checking them on every sample.
pub const STORE_TO_DEPTH: usize = 2;

/// One node of the path hierarchy as stored in the search index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathDocument {
    pub tenant: String,
    pub path: String,
    /// 1-based count of dotted segments
    pub depth: usize,
    /// True iff this is a full metric name rather than a prefix
    pub leaf: bool,
}

impl PathDocument {
    /// Index document id, unique per `(tenant, path)`.
    pub fn id(&self) -> String {
        Self::document_id(&self.tenant, &self.path)
    }

    pub fn document_id(tenant: &str, path: &str) -> String {
        format!("{tenant}_{path}")
    }
}

/// Count the dotted segments of a path or glob.
pub fn segments(path: &str) -> usize {
    path.split('.').count()
}

/// Expand `path` into documents for every prefix plus the terminal leaf.
pub fn expand(tenant: &str, path: &str) -> Vec<PathDocument> {
    expand_inner(tenant, path, None)
}

/// Expand like [`expand`], omitting shallow prefixes already known to the
/// sub-path cache. The terminal leaf is never omitted.
pub(crate) fn expand_with_cache(
    tenant: &str,
    path: &str,
    cache: &SubPathCache,
) -> Vec<PathDocument> {
    expand_inner(tenant, path, Some(cache))
}

fn expand_inner(tenant: &str, path: &str, cache: Option<&SubPathCache>) -> Vec<PathDocument> {
    let mut docs = Vec::with_capacity(segments(path));
    let mut depth = 0;

    for (idx, _) in path.match_indices('.') {
        depth += 1;
        let prefix = &path[..idx];
        if depth <= STORE_TO_DEPTH {
            if let Some(cache) = cache {
                if cache.contains(&PathDocument::document_id(tenant, prefix)) {
                    continue;
                }
            }
        }
        docs.push(PathDocument {
            tenant: tenant.to_string(),
            path: prefix.to_string(),
            depth,
            leaf: false,
        });
    }

    docs.push(PathDocument {
        tenant: tenant.to_string(),
        path: path.to_string(),
        depth: depth + 1,
        leaf: true,
    });

    docs
}
