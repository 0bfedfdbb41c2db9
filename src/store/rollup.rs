//! Rollup resolutions and the in-memory rollup cache
//!
//! Every non-base resolution accumulates samples in memory until its time
//! bucket closes; the sweeper then reduces the bucket to one sample and
//! feeds it back into the metric writer. Bucket state is not durable: a
//! crash loses open buckets, and a late sample after a flush simply opens
//! a second single-value bucket that the store's list-append absorbs.

use super::session::Sample;
use crate::agg::AggregationMethod;
use crate::clock::Clock;
use crate::{Error, Result};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One stored resolution: bucket width and retention count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Bucket width in seconds
    pub rollup: u32,
    /// Retention count
    pub period: u32,
}

impl Resolution {
    pub fn new(rollup: u32, period: u32) -> Self {
        Self { rollup, period }
    }

    /// Seconds to live for points at this resolution.
    pub fn ttl(&self) -> u32 {
        self.rollup * self.period
    }

    /// Aligned bucket start for `time`.
    pub fn rollup_to(&self, time: i64) -> i64 {
        time - time.rem_euclid(self.rollup as i64)
    }
}

/// Ordered resolution set; the smallest rollup is the base and is always
/// written raw.
#[derive(Debug, Clone)]
pub struct RollupConfig {
    resolutions: Vec<Resolution>,
}

impl RollupConfig {
    pub fn new(mut resolutions: Vec<Resolution>) -> Result<Self> {
        if resolutions.is_empty() {
            return Err(Error::Config(
                "at least one rollup resolution is required".to_string(),
            ));
        }
        resolutions.sort_by_key(|r| r.rollup);
        resolutions.dedup();
        Ok(Self { resolutions })
    }

    /// The base (smallest) resolution.
    pub fn base(&self) -> Resolution {
        self.resolutions[0]
    }

    /// Every resolution above the base.
    pub fn non_base(&self) -> &[Resolution] {
        &self.resolutions[1..]
    }

    pub fn resolutions(&self) -> &[Resolution] {
        &self.resolutions
    }

    /// The configured resolution with this bucket width, if any.
    pub fn matching(&self, rollup: u32) -> Option<Resolution> {
        self.resolutions.iter().copied().find(|r| r.rollup == rollup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    tenant: String,
    path: String,
    rollup: u32,
    period: u32,
    /// Aligned bucket start
    time: i64,
}

#[derive(Debug)]
struct Bucket {
    values: Vec<f64>,
    ttl: u32,
    last_update: i64,
}

/// In-memory partial aggregates keyed by
/// `(tenant, rollup, period, bucket-time, path)`.
///
/// The map is sharded internally; concurrent puts on different paths do not
/// contend on one lock.
pub struct RollupCache {
    buckets: DashMap<BucketKey, Bucket>,
    /// Taken on `close` so the writer channel can shut after the drain
    downstream: Mutex<Option<mpsc::Sender<Sample>>>,
    method: AggregationMethod,
    grace: Duration,
    clock: Arc<Clock>,
}

impl RollupCache {
    pub fn new(
        downstream: mpsc::Sender<Sample>,
        method: AggregationMethod,
        grace: Duration,
        clock: Arc<Clock>,
    ) -> Self {
        Self {
            buckets: DashMap::new(),
            downstream: Mutex::new(Some(downstream)),
            method,
            grace,
            clock,
        }
    }

    /// Deposit a sample into its aligned bucket for `resolution`.
    pub fn put(&self, resolution: Resolution, sample: &Sample) {
        let key = BucketKey {
            tenant: sample.tenant.clone(),
            path: sample.path.clone(),
            rollup: resolution.rollup,
            period: resolution.period,
            time: resolution.rollup_to(sample.time),
        };
        let now = self.clock.now_secs();

        let mut bucket = self.buckets.entry(key).or_insert_with(|| Bucket {
            values: Vec::new(),
            ttl: resolution.ttl(),
            last_update: now,
        });
        bucket.values.push(sample.metric);
        bucket.last_update = now;
    }

    /// Flush every bucket whose window closed before `now - grace`.
    /// Returns the number of buckets flushed.
    pub async fn flush_closed(&self) -> usize {
        let cutoff = self.clock.now_secs() - self.grace.as_secs() as i64;
        self.flush_where(|key| key.time + (key.rollup as i64) < cutoff)
            .await
    }

    /// Flush every bucket regardless of close state (shutdown drain).
    pub async fn flush_all(&self) -> usize {
        self.flush_where(|_| true).await
    }

    /// Drop the downstream sender. Flushes after this are discarded; call
    /// only once the final drain has run.
    pub fn close(&self) {
        self.downstream.lock().take();
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    async fn flush_where<F>(&self, eligible: F) -> usize
    where
        F: Fn(&BucketKey) -> bool,
    {
        let Some(downstream) = self.downstream.lock().as_ref().cloned() else {
            return 0;
        };

        let closed: Vec<BucketKey> = self
            .buckets
            .iter()
            .filter(|entry| eligible(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut flushed = 0;
        for key in closed {
            // Values deposited between the scan and this remove still make
            // the flush; a put racing after it opens a fresh bucket.
            let Some((key, bucket)) = self.buckets.remove(&key) else {
                continue;
            };
            let Some(metric) = self.method.apply(&bucket.values) else {
                continue;
            };
            let sample = Sample {
                tenant: key.tenant,
                path: key.path,
                time: key.time,
                metric,
                rollup: key.rollup,
                period: key.period,
                ttl: bucket.ttl,
            };
            if downstream.send(sample).await.is_err() {
                debug!("rollup downstream closed, dropping flushed bucket");
                return flushed;
            }
            flushed += 1;
        }
        flushed
    }
}

/// Run the sweeper until cancelled, then drain every open bucket.
pub(crate) fn spawn_sweeper(
    cache: Arc<RollupCache>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let flushed = cache.flush_closed().await;
                    if flushed > 0 {
                        debug!(flushed, "rollup buckets closed");
                    }
                }
                _ = token.cancelled() => {
                    let flushed = cache.flush_all().await;
                    info!(flushed, "rollup cache drained on shutdown");
                    break;
                }
            }
        }
    })
}
