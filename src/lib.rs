//! # cyanite
//!
//! Multi-tenant metric ingestion and query core in the Graphite lineage.
//!
//! Cyanite accepts a stream of `(tenant, path, timestamp, value)` samples,
//! batches them into a wide-column time-series store, keeps a searchable
//! index of dotted metric names for Graphite-style wildcard queries, and
//! serves aligned range reads over multiple retention resolutions.
//!
//! ## Architecture
//!
//! - **Path index**: every sample's name is decomposed into its ancestor
//!   prefixes and streamed through an expand → filter → write pipeline
//!   that keeps the search index consistent without blocking ingest
//! - **Metric store**: batched point writes with list-append semantics;
//!   an in-memory rollup cache aggregates each non-base resolution and
//!   flushes buckets as they close
//! - **Fetch**: parallel per-path reads collapsed by per-path reducers and
//!   aligned onto the requested timegrid
//!
//! Backends sit behind thin capability traits ([`path::IndexClient`],
//! [`store::StoreSession`]) with in-memory implementations for development
//! and tests.

pub mod agg;
pub mod clock;
pub mod config;
pub mod path;
pub mod stats;
pub mod store;
pub mod telemetry;

mod batch;
mod error;

pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::agg::AggregationMethod;
    pub use crate::clock::Clock;
    pub use crate::config::{
        ComponentFactory, MetricStoreConfig, MiddlewareConfig, PathStoreConfig,
    };
    pub use crate::path::{PathDocument, PathStore};
    pub use crate::stats::Stats;
    pub use crate::store::{
        CachingMetricstore, FetchResult, Metricstore, Resolution, RollupConfig, Sample,
    };
    pub use crate::{Error, Result};
}
