//! Glob query execution
//!
//! Translates a glob into a depth/tenant/regex search, pages through the
//! scroll cursor, and enforces the result-size threshold before any
//! documents are streamed.

use super::decompose::{segments, PathDocument};
use super::glob::glob_to_regex;
use super::index::{IndexClient, SearchQuery};
use crate::{Error, Result};

pub(crate) fn build_query(tenant: &str, glob: &str, leafs_only: bool) -> SearchQuery {
    SearchQuery {
        tenant: tenant.to_string(),
        regex: glob_to_regex(glob),
        depth: segments(glob),
        leafs_only,
    }
}

/// Run a glob search, collecting every page.
///
/// Fails with [`Error::TooManyPaths`] before streaming anything when the
/// reported total exceeds `threshold`.
pub(crate) async fn run_query(
    client: &dyn IndexClient,
    threshold: Option<usize>,
    query: SearchQuery,
) -> Result<Vec<PathDocument>> {
    let mut page = client.search(&query).await?;

    if let Some(threshold) = threshold {
        if page.total > threshold {
            return Err(Error::TooManyPaths {
                count: page.total,
                threshold,
            });
        }
    }

    let mut docs = std::mem::take(&mut page.docs);
    let mut scroll_id = page.scroll_id;
    while let Some(id) = scroll_id {
        let mut next = client.scroll(&id).await?;
        if next.docs.is_empty() {
            break;
        }
        docs.append(&mut next.docs);
        scroll_id = next.scroll_id;
    }

    Ok(docs)
}
