//! Store middleware
//!
//! Composes the batched writer and the rollup cache behind one
//! [`Metricstore`] contract. A base-resolution sample is written raw and
//! fanned out into every non-base resolution's bucket; a sample addressed
//! to a higher resolution only feeds its own bucket. Reads never consult
//! the cache.

use super::fetch::{self, FetchResult};
use super::rollup::{spawn_sweeper, RollupCache, RollupConfig};
use super::session::{Sample, StoreSession};
use super::writer::MetricWriter;
use crate::agg::AggregationMethod;
use crate::clock::Clock;
use crate::config::{MetricStoreConfig, MiddlewareConfig};
use crate::stats::Stats;
use crate::{Error, Result};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The metric store contract consumed by ingest and query collaborators
#[async_trait]
pub trait Metricstore: Send + Sync {
    /// Synchronous single-point write.
    async fn insert(&self, sample: Sample) -> Result<()>;

    /// Streaming ingress.
    fn channel(&self) -> Result<mpsc::Sender<Sample>>;

    /// Range read over `paths`, aligned onto the output timegrid.
    async fn fetch(
        &self,
        agg: Option<AggregationMethod>,
        paths: Vec<String>,
        tenant: &str,
        rollup: u32,
        period: u32,
        from: i64,
        to: i64,
    ) -> Result<FetchResult>;
}

/// Writer plus rollup cache behind the [`Metricstore`] contract
pub struct CachingMetricstore {
    session: Arc<dyn StoreSession>,
    writer: Arc<MetricWriter>,
    cache: Arc<RollupCache>,
    rollups: RollupConfig,
    clock: Arc<Clock>,
    ingress: Mutex<Option<mpsc::Sender<Sample>>>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    sweep_token: CancellationToken,
}

impl CachingMetricstore {
    /// Build the middleware: spawns the writer, the rollup sweeper and the
    /// ingress dispatch task.
    pub fn new(
        config: MiddlewareConfig,
        store_config: &MetricStoreConfig,
        session: Arc<dyn StoreSession>,
        stats: Arc<Stats>,
        clock: Arc<Clock>,
    ) -> Result<Self> {
        let rollups = RollupConfig::new(config.rollups)?;
        let writer = Arc::new(MetricWriter::new(store_config, session.clone(), stats));
        let cache = Arc::new(RollupCache::new(
            writer.channel()?,
            config.rollup_method,
            config.grace,
            clock.clone(),
        ));

        let sweep_token = CancellationToken::new();
        let sweeper = spawn_sweeper(cache.clone(), config.sweep_interval, sweep_token.clone());

        let (ingress_tx, mut ingress_rx) = mpsc::channel::<Sample>(config.chan_size);
        let dispatch = {
            let writer = writer.clone();
            let cache = cache.clone();
            let rollups = rollups.clone();
            tokio::spawn(async move {
                while let Some(sample) = ingress_rx.recv().await {
                    if let Err(e) = dispatch_sample(&writer, &cache, &rollups, sample).await {
                        warn!(error = %e, "sample dispatch failed");
                    }
                }
            })
        };

        info!(
            base_rollup = rollups.base().rollup,
            resolutions = rollups.resolutions().len(),
            grace_secs = config.grace.as_secs(),
            "metric store middleware started"
        );

        Ok(Self {
            session,
            writer,
            cache,
            rollups,
            clock,
            ingress: Mutex::new(Some(ingress_tx)),
            dispatch: Mutex::new(Some(dispatch)),
            sweeper: Mutex::new(Some(sweeper)),
            sweep_token,
        })
    }

    pub fn rollups(&self) -> &RollupConfig {
        &self.rollups
    }

    /// Open buckets currently held by the rollup cache.
    pub fn open_buckets(&self) -> usize {
        self.cache.len()
    }

    /// Drain in order: ingress, dispatch, rollup cache, writer.
    ///
    /// The sweeper flushes every open bucket into the writer channel before
    /// the writer itself is closed; whatever was never sent is lost. The
    /// cache's downstream sender must be dropped here, or the writer
    /// channel would never close and its drain would block forever.
    pub async fn shutdown(&self) {
        self.ingress.lock().take();
        let dispatch = self.dispatch.lock().take();
        if let Some(task) = dispatch {
            let _ = task.await;
        }
        self.sweep_token.cancel();
        let sweeper = self.sweeper.lock().take();
        if let Some(task) = sweeper {
            let _ = task.await;
        }
        self.cache.close();
        self.writer.shutdown().await;
        info!("metric store middleware drained");
    }
}

async fn dispatch_sample(
    writer: &MetricWriter,
    cache: &RollupCache,
    rollups: &RollupConfig,
    sample: Sample,
) -> Result<()> {
    let base = rollups.base();
    if sample.rollup == base.rollup {
        writer.insert(sample.clone()).await?;
        for resolution in rollups.non_base() {
            cache.put(*resolution, &sample);
        }
        return Ok(());
    }

    match rollups.matching(sample.rollup) {
        Some(resolution) => {
            cache.put(resolution, &sample);
            Ok(())
        }
        None => {
            warn!(
                rollup = sample.rollup,
                path = %sample.path,
                "sample for unconfigured resolution dropped"
            );
            Ok(())
        }
    }
}

#[async_trait]
impl Metricstore for CachingMetricstore {
    async fn insert(&self, sample: Sample) -> Result<()> {
        dispatch_sample(&self.writer, &self.cache, &self.rollups, sample).await
    }

    fn channel(&self) -> Result<mpsc::Sender<Sample>> {
        self.ingress
            .lock()
            .as_ref()
            .cloned()
            .ok_or(Error::ChannelClosed)
    }

    async fn fetch(
        &self,
        agg: Option<AggregationMethod>,
        paths: Vec<String>,
        tenant: &str,
        rollup: u32,
        period: u32,
        from: i64,
        to: i64,
    ) -> Result<FetchResult> {
        fetch::fetch(
            self.session.clone(),
            &self.clock,
            agg,
            paths,
            tenant,
            rollup,
            period,
            from,
            to,
        )
        .await
    }
}
