//! Streaming path index pipeline
//!
//! Three stages over bounded channels, each driven by the time-or-size
//! batcher: expand samples into prefix documents, filter out documents the
//! index already has, bulk-write the rest. Senders block when a stage falls
//! behind; that backpressure is the only flow control. Failures drop the
//! batch and the pipeline keeps going: a later sample for the same path
//! will miss in the filter stage again and retry the write.

use super::cache::SubPathCache;
use super::decompose::{expand_with_cache, PathDocument, STORE_TO_DEPTH};
use super::index::IndexClient;
use crate::batch::next_batch;
use crate::config::PathStoreConfig;
use crate::stats::Stats;

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub(crate) struct PathPipeline {
    pub(crate) ingress: mpsc::Sender<(String, String)>,
    pub(crate) tasks: Vec<JoinHandle<()>>,
}

/// Spawn the expand, filter and write stages.
///
/// The ingress carries `(tenant, path)` pairs. Dropping every clone of the
/// returned sender drains and terminates the stages in order.
pub(crate) fn spawn(
    config: &PathStoreConfig,
    client: Arc<dyn IndexClient>,
    cache: Arc<SubPathCache>,
    stats: Arc<Stats>,
) -> PathPipeline {
    let (ingress_tx, ingress_rx) = mpsc::channel(config.chan_size);
    let (docs_tx, docs_rx) = mpsc::channel(config.chan_size);
    let (missing_tx, missing_rx) = mpsc::channel(config.chan_size);

    let tasks = vec![
        tokio::spawn(expand_stage(
            ingress_rx,
            docs_tx,
            cache.clone(),
            config.batch_size,
            config.batch_interval,
        )),
        tokio::spawn(filter_stage(
            docs_rx,
            missing_tx,
            client.clone(),
            cache,
            config.batch_size,
            config.batch_interval,
        )),
        tokio::spawn(write_stage(
            missing_rx,
            client,
            stats,
            config.batch_size,
            config.batch_interval,
        )),
    ];

    PathPipeline {
        ingress: ingress_tx,
        tasks,
    }
}

/// Stage A: decompose each `(tenant, path)` into prefix documents,
/// deduplicated within the batch by document id.
async fn expand_stage(
    mut rx: mpsc::Receiver<(String, String)>,
    tx: mpsc::Sender<PathDocument>,
    cache: Arc<SubPathCache>,
    batch_size: usize,
    interval: std::time::Duration,
) {
    while let Some(batch) = next_batch(&mut rx, batch_size, interval).await {
        let mut seen = HashSet::with_capacity(batch.len());
        for (tenant, path) in batch {
            for doc in expand_with_cache(&tenant, &path, &cache) {
                if seen.insert(doc.id()) && tx.send(doc).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Stage B: multi-get against the index, union shallow existing prefixes
/// into the cache, forward missing documents. A multi-get error drops the
/// batch without touching the cache.
async fn filter_stage(
    mut rx: mpsc::Receiver<PathDocument>,
    tx: mpsc::Sender<PathDocument>,
    client: Arc<dyn IndexClient>,
    cache: Arc<SubPathCache>,
    batch_size: usize,
    interval: std::time::Duration,
) {
    while let Some(batch) = next_batch(&mut rx, batch_size, interval).await {
        let ids: Vec<String> = batch.iter().map(PathDocument::id).collect();
        let existing = match client.multi_get(&ids).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(error = %e, batch = ids.len(), "path multi-get failed, dropping batch");
                continue;
            }
        };

        let mut cache_ids = Vec::new();
        for doc in batch {
            let id = doc.id();
            if existing.contains(&id) {
                if !doc.leaf && doc.depth <= STORE_TO_DEPTH {
                    cache_ids.push(id);
                }
            } else if tx.send(doc).await.is_err() {
                return;
            }
        }
        cache.insert_all(cache_ids);
    }
}

/// Stage C: bulk-write missing documents.
async fn write_stage(
    mut rx: mpsc::Receiver<PathDocument>,
    client: Arc<dyn IndexClient>,
    stats: Arc<Stats>,
    batch_size: usize,
    interval: std::time::Duration,
) {
    while let Some(batch) = next_batch(&mut rx, batch_size, interval).await {
        match client.bulk_upsert(&batch).await {
            Ok(()) => {
                stats.record_index_create(batch.len() as u64);
                debug!(count = batch.len(), "indexed new path documents");
            }
            Err(e) => {
                warn!(error = %e, count = batch.len(), "bulk path write failed, dropping batch");
            }
        }
    }
}
