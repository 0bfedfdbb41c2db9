//! Component configuration and environment-based factory
//!
//! Each subsystem takes a plain config struct with production defaults.
//! `ComponentFactory` picks backend implementations from environment
//! variables so development setups can run entirely in memory.

use crate::agg::AggregationMethod;
use crate::path::{IndexClient, MemoryIndexClient, RestIndexClient};
use crate::store::{MemorySession, Resolution, StoreSession};
use crate::{Error, Result};

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Path store configuration
#[derive(Debug, Clone)]
pub struct PathStoreConfig {
    /// Search index name
    pub index: String,
    /// Search index base url
    pub url: String,
    /// Capacity of each pipeline channel
    pub chan_size: usize,
    /// Maximum documents per pipeline batch
    pub batch_size: usize,
    /// Maximum time a partial batch waits before emission
    pub batch_interval: Duration,
    /// Fail glob queries matching more paths than this
    pub query_paths_threshold: Option<usize>,
}

impl Default for PathStoreConfig {
    fn default() -> Self {
        Self {
            index: "cyanite_paths".to_string(),
            url: "http://localhost:9200".to_string(),
            chan_size: 10_000,
            batch_size: 300,
            batch_interval: Duration::from_secs(10),
            query_paths_threshold: None,
        }
    }
}

/// Metric store configuration
#[derive(Debug, Clone)]
pub struct MetricStoreConfig {
    /// Store keyspace
    pub keyspace: String,
    /// Contact points of the store cluster
    pub cluster: Vec<String>,
    /// Capacity of the sample channel
    pub chan_size: usize,
    /// Maximum samples per write batch
    pub batch_size: usize,
    /// Maximum time a partial batch waits before emission
    pub batch_interval: Duration,
}

impl Default for MetricStoreConfig {
    fn default() -> Self {
        Self {
            keyspace: "metric".to_string(),
            cluster: vec!["127.0.0.1".to_string()],
            chan_size: 10_000,
            batch_size: 100,
            batch_interval: Duration::from_secs(5),
        }
    }
}

impl MetricStoreConfig {
    /// Accept the cluster as a single comma-separated string.
    pub fn with_cluster_string(mut self, cluster: &str) -> Self {
        self.cluster = cluster
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }
}

/// Store middleware configuration
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    /// Capacity of the ingress channel
    pub chan_size: usize,
    /// Extra time a bucket stays open after its window ends, absorbing
    /// slightly-late samples
    pub grace: Duration,
    /// Sweeper tick interval
    pub sweep_interval: Duration,
    /// Reducer applied when closing rollup buckets
    pub rollup_method: AggregationMethod,
    /// Configured resolutions; the smallest rollup is the base
    pub rollups: Vec<Resolution>,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            chan_size: 10_000,
            grace: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
            rollup_method: AggregationMethod::Average,
            // 1 week at 10s, 1 year at 10m
            rollups: vec![Resolution::new(10, 60_480), Resolution::new(600, 52_560)],
        }
    }
}

/// Factory for environment-selected backend implementations
pub struct ComponentFactory;

impl ComponentFactory {
    /// Create the search index client from the environment.
    ///
    /// `CYANITE_INDEX_BACKEND`: `memory` (default) or `rest`.
    pub fn create_index_client(config: &PathStoreConfig) -> Result<Arc<dyn IndexClient>> {
        let backend =
            std::env::var("CYANITE_INDEX_BACKEND").unwrap_or_else(|_| "memory".to_string());

        match backend.as_str() {
            "memory" => {
                info!("using in-memory index client (development mode)");
                Ok(Arc::new(MemoryIndexClient::new()))
            }
            "rest" => {
                info!(url = %config.url, index = %config.index, "using REST index client");
                Ok(Arc::new(RestIndexClient::new(config)?))
            }
            other => Err(Error::Config(format!(
                "unknown CYANITE_INDEX_BACKEND '{other}', use 'memory' or 'rest'"
            ))),
        }
    }

    /// Create the wide-column store session from the environment.
    ///
    /// `CYANITE_STORE_BACKEND`: `memory` (default). Production deployments
    /// bind their CQL driver behind [`StoreSession`] and inject it
    /// directly.
    pub fn create_store_session(config: &MetricStoreConfig) -> Result<Arc<dyn StoreSession>> {
        let backend =
            std::env::var("CYANITE_STORE_BACKEND").unwrap_or_else(|_| "memory".to_string());

        match backend.as_str() {
            "memory" => {
                info!(
                    keyspace = %config.keyspace,
                    "using in-memory store session (development mode)"
                );
                Ok(Arc::new(MemorySession::new()))
            }
            other => Err(Error::Config(format!(
                "unknown CYANITE_STORE_BACKEND '{other}', use 'memory'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let path = PathStoreConfig::default();
        assert_eq!(path.index, "cyanite_paths");
        assert_eq!(path.chan_size, 10_000);
        assert_eq!(path.batch_size, 300);
        assert!(path.query_paths_threshold.is_none());

        let store = MetricStoreConfig::default();
        assert_eq!(store.chan_size, 10_000);
        assert_eq!(store.batch_size, 100);

        let mw = MiddlewareConfig::default();
        assert_eq!(mw.chan_size, 10_000);
        assert_eq!(mw.rollup_method, AggregationMethod::Average);
    }

    #[test]
    fn test_cluster_string_parsing() {
        let config = MetricStoreConfig::default().with_cluster_string("10.0.0.1, 10.0.0.2,");
        assert_eq!(config.cluster, vec!["10.0.0.1", "10.0.0.2"]);
    }
}
