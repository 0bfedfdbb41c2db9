//! Metric store subsystem
//!
//! Batched point writes into the wide-column store, in-memory rollup
//! aggregation for every non-base resolution, and aligned range reads.
//! The base resolution is always written raw and is ground truth; higher
//! resolutions are derived through the rollup cache.

mod fetch;
mod middleware;
mod rollup;
mod session;
mod writer;

pub use fetch::{fetch, max_points, FetchResult, FETCH_CONCURRENCY, FETCH_TIMEOUT};
pub use middleware::{CachingMetricstore, Metricstore};
pub use rollup::{Resolution, RollupCache, RollupConfig};
pub use session::{MemorySession, Row, Sample, StoreSession};
pub use writer::MetricWriter;
