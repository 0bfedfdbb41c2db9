//! Path index subsystem
//!
//! Maintains the searchable index of dotted metric names. Incoming samples
//! stream through a three-stage pipeline (expand, filter, write) that keeps
//! the index consistent without blocking the sample path; glob queries
//! resolve against the same index with depth and tenant filters.

mod cache;
mod decompose;
mod glob;
mod index;
mod memory;
mod pipeline;
mod query;
mod rest;

pub use cache::SubPathCache;
pub use decompose::{expand, segments, PathDocument, STORE_TO_DEPTH};
pub use glob::glob_to_regex;
pub use index::{IndexClient, SearchPage, SearchQuery, SCROLL_LIFETIME, SEARCH_PAGE_SIZE};
pub use memory::MemoryIndexClient;
pub use rest::RestIndexClient;

use crate::config::PathStoreConfig;
use crate::stats::Stats;
use crate::{Error, Result};

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// The path store: streaming index writes plus glob queries.
///
/// Cheap to share as `Arc`; `shutdown` drains the pipeline. Streaming
/// callers hold a channel obtained from [`PathStore::channel`] and must
/// drop it before shutdown can complete.
pub struct PathStore {
    config: PathStoreConfig,
    client: Arc<dyn IndexClient>,
    cache: Arc<SubPathCache>,
    ingress: Mutex<Option<mpsc::Sender<(String, String)>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PathStore {
    /// Create the store and spawn its pipeline stages.
    pub fn new(config: PathStoreConfig, client: Arc<dyn IndexClient>, stats: Arc<Stats>) -> Self {
        let cache = Arc::new(SubPathCache::new());
        let pipeline = pipeline::spawn(&config, client.clone(), cache.clone(), stats);

        info!(
            index = %config.index,
            chan_size = config.chan_size,
            batch_size = config.batch_size,
            "path store pipeline started"
        );

        Self {
            config,
            client,
            cache,
            ingress: Mutex::new(Some(pipeline.ingress)),
            tasks: Mutex::new(pipeline.tasks),
        }
    }

    /// Streaming ingress of `(tenant, path)` pairs.
    ///
    /// Sends block when the pipeline is saturated.
    pub fn channel(&self) -> Result<mpsc::Sender<(String, String)>> {
        self.ingress
            .lock()
            .as_ref()
            .cloned()
            .ok_or(Error::ChannelClosed)
    }

    /// Synchronous single-path registration: expand, check each document,
    /// write the missing ones. Does not touch the sub-path cache.
    pub async fn register(&self, tenant: &str, path: &str) -> Result<()> {
        for doc in expand(tenant, path) {
            if !self.client.exists(&doc.id()).await? {
                self.client.put(&doc).await?;
            }
        }
        Ok(())
    }

    /// All documents (prefixes and leafs) matching `glob`.
    pub async fn prefixes(&self, tenant: &str, glob: &str) -> Result<Vec<PathDocument>> {
        let query = query::build_query(tenant, glob, false);
        query::run_query(
            self.client.as_ref(),
            self.config.query_paths_threshold,
            query,
        )
        .await
    }

    /// Leaf paths matching `glob`.
    pub async fn lookup(&self, tenant: &str, glob: &str) -> Result<Vec<String>> {
        let query = query::build_query(tenant, glob, true);
        let docs = query::run_query(
            self.client.as_ref(),
            self.config.query_paths_threshold,
            query,
        )
        .await?;
        Ok(docs.into_iter().map(|d| d.path).collect())
    }

    /// Number of shallow prefix ids currently cached.
    pub fn cached_paths(&self) -> usize {
        self.cache.len()
    }

    /// Close the ingress and wait for all stages to drain.
    pub async fn shutdown(&self) {
        self.ingress.lock().take();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        info!("path store pipeline drained");
    }
}
