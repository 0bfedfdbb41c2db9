//! Batched metric writer
//!
//! One bounded channel of samples, drained by the time-or-size batcher and
//! written as one store batch per emission. The write path is
//! recovery-biased: a failed batch is logged and counted, never fatal.

use super::session::{Sample, StoreSession};
use crate::batch::next_batch;
use crate::config::MetricStoreConfig;
use crate::stats::Stats;
use crate::{Error, Result};

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Async batching writer over a [`StoreSession`]
pub struct MetricWriter {
    ingress: Mutex<Option<mpsc::Sender<Sample>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MetricWriter {
    /// Spawn the writer task.
    pub fn new(
        config: &MetricStoreConfig,
        session: Arc<dyn StoreSession>,
        stats: Arc<Stats>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<Sample>(config.chan_size);
        let batch_size = config.batch_size;
        let interval = config.batch_interval;

        let task = tokio::spawn(async move {
            while let Some(batch) = next_batch(&mut rx, batch_size, interval).await {
                match session.insert(&batch).await {
                    Ok(()) => {
                        stats.record_store_success(batch.len() as u64);
                        for sample in &batch {
                            stats.record_tenant_write(&sample.tenant, 1);
                        }
                    }
                    Err(e) => {
                        let e = Error::BatchWriteFailed(e.to_string());
                        stats.record_store_error(batch.len() as u64);
                        error!(error = %e, count = batch.len(), "dropping metric batch");
                    }
                }
            }
        });

        Self {
            ingress: Mutex::new(Some(tx)),
            task: Mutex::new(Some(task)),
        }
    }

    /// Streaming ingress; sends block when the writer is saturated.
    pub fn channel(&self) -> Result<mpsc::Sender<Sample>> {
        self.ingress
            .lock()
            .as_ref()
            .cloned()
            .ok_or(Error::ChannelClosed)
    }

    /// Synchronous single-point write (enqueued behind the same batcher).
    pub async fn insert(&self, sample: Sample) -> Result<()> {
        self.channel()?
            .send(sample)
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    /// Close the ingress and wait for in-flight batches to land.
    pub async fn shutdown(&self) {
        self.ingress.lock().take();
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        info!("metric writer drained");
    }
}
