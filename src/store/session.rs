//! Wide-column store session seam
//!
//! The metric table is `metric(tenant, rollup, period, path, time,
//! data list<double>)` with primary key `(tenant, rollup, period, path,
//! time)`. Writes append to the value list:
//!
//! ```cql
//! UPDATE metric USING TTL ? SET data = data + ? WHERE tenant = ? AND
//!   rollup = ? AND period = ? AND path = ? AND time = ?;
//! ```
//!
//! executed as one batched prepared statement per write batch at
//! consistency `any`. Binding a CQL driver to this trait is an external
//! concern; the in-memory session below backs development and tests.

use crate::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// One metric sample addressed to a specific resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub tenant: String,
    pub path: String,
    /// Epoch seconds
    pub time: i64,
    pub metric: f64,
    /// Bucket width in seconds
    pub rollup: u32,
    /// Retention count
    pub period: u32,
    /// Seconds to live, `rollup * period`
    pub ttl: u32,
}

/// One stored cell: a timestamp and its accumulated value list
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub time: i64,
    pub values: Vec<f64>,
}

/// Capability interface over the wide-column store
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Append each sample's value to its cell's list, as one batch.
    async fn insert(&self, samples: &[Sample]) -> Result<()>;

    /// Rows for one path in `[from, to]`, ordered by time.
    async fn select(
        &self,
        tenant: &str,
        path: &str,
        rollup: u32,
        period: u32,
        from: i64,
        to: i64,
    ) -> Result<Vec<Row>>;
}

type CellKey = (String, u32, u32, String, i64);

/// In-memory session for development and tests.
///
/// Keeps the same append semantics as the remote store; TTLs are ignored.
#[derive(Debug, Default)]
pub struct MemorySession {
    cells: DashMap<CellKey, Vec<f64>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct cell lookup for assertions.
    pub fn cell(
        &self,
        tenant: &str,
        rollup: u32,
        period: u32,
        path: &str,
        time: i64,
    ) -> Option<Vec<f64>> {
        self.cells
            .get(&(
                tenant.to_string(),
                rollup,
                period,
                path.to_string(),
                time,
            ))
            .map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn insert(&self, samples: &[Sample]) -> Result<()> {
        for sample in samples {
            let key = (
                sample.tenant.clone(),
                sample.rollup,
                sample.period,
                sample.path.clone(),
                sample.time,
            );
            self.cells.entry(key).or_default().push(sample.metric);
        }
        Ok(())
    }

    async fn select(
        &self,
        tenant: &str,
        path: &str,
        rollup: u32,
        period: u32,
        from: i64,
        to: i64,
    ) -> Result<Vec<Row>> {
        let mut rows: Vec<Row> = self
            .cells
            .iter()
            .filter(|e| {
                let (t, r, p, pa, time) = e.key();
                t == tenant
                    && *r == rollup
                    && *p == period
                    && pa == path
                    && (*time >= from && *time <= to)
            })
            .map(|e| Row {
                time: e.key().4,
                values: e.value().clone(),
            })
            .collect();
        rows.sort_by_key(|r| r.time);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &str, time: i64, metric: f64) -> Sample {
        Sample {
            tenant: "t".into(),
            path: path.into(),
            time,
            metric,
            rollup: 60,
            period: 1440,
            ttl: 86_400,
        }
    }

    #[tokio::test]
    async fn test_insert_appends_to_cell_list() {
        let session = MemorySession::new();
        for v in [1.0, 2.0, 3.0] {
            session.insert(&[sample("a.b", 60, v)]).await.unwrap();
        }

        assert_eq!(
            session.cell("t", 60, 1440, "a.b", 60),
            Some(vec![1.0, 2.0, 3.0])
        );
    }

    #[tokio::test]
    async fn test_select_filters_and_orders() {
        let session = MemorySession::new();
        session
            .insert(&[
                sample("a.b", 180, 3.0),
                sample("a.b", 60, 1.0),
                sample("a.b", 120, 2.0),
                sample("a.c", 60, 9.0),
            ])
            .await
            .unwrap();

        let rows = session.select("t", "a.b", 60, 1440, 60, 120).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, 60);
        assert_eq!(rows[1].time, 120);
    }
}
