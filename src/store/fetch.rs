//! Range reads aligned onto an output timegrid
//!
//! One read per path, in parallel, each bounded by a deadline; a deadline
//! hit fails the whole query. Per-timestamp value lists are collapsed with
//! the path's reducer, then laid out on the aligned grid with nulls in the
//! holes.

use super::session::{Row, StoreSession};
use crate::agg::AggregationMethod;
use crate::clock::Clock;
use crate::{Error, Result};

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-path read deadline
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Worker pool width: per-path reads in flight at once
pub const FETCH_CONCURRENCY: usize = 16;

/// An aligned fetch envelope
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    /// First grid point, `from` aligned down to the rollup
    pub from: i64,
    /// Last grid point, `min(to, now)` aligned down to the rollup
    pub to: i64,
    /// Grid step in seconds
    pub step: u32,
    /// One value slot per grid point per path; `None` where no data exists
    pub series: HashMap<String, Vec<Option<f64>>>,
}

/// Upper bound on the number of points a fetch would return, for clients
/// that want to reject oversized queries before issuing them.
pub fn max_points(paths: usize, rollup: u32, from: i64, to: i64) -> u64 {
    ((to - from).max(0) as u64 / rollup as u64 + 1) * paths as u64
}

/// Read `paths` over `[from, to]` and align onto the output grid.
#[allow(clippy::too_many_arguments)]
pub async fn fetch(
    session: Arc<dyn StoreSession>,
    clock: &Clock,
    agg: Option<AggregationMethod>,
    paths: Vec<String>,
    tenant: &str,
    rollup: u32,
    period: u32,
    from: i64,
    to: i64,
) -> Result<FetchResult> {
    let step = rollup as i64;
    let from_aligned = from - from.rem_euclid(step);
    let to_capped = to.min(clock.now_secs());
    let to_aligned = to_capped - to_capped.rem_euclid(step);

    let points = if to_aligned < from_aligned {
        0
    } else {
        ((to_aligned - from_aligned) / step + 1) as usize
    };

    // Worker pool: at most FETCH_CONCURRENCY reads in flight, results
    // gathered in path order. Spawning happens as the stream is polled,
    // so a query over thousands of paths never floods the store.
    let results = stream::iter(paths.iter().cloned())
        .map(|path| {
            let session = session.clone();
            let tenant = tenant.to_string();
            tokio::spawn(async move {
                tokio::time::timeout(
                    FETCH_TIMEOUT,
                    session.select(&tenant, &path, rollup, period, from, to),
                )
                .await
            })
        })
        .buffered(FETCH_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut series = HashMap::with_capacity(paths.len());
    for (path, joined) in paths.iter().zip(results) {
        let rows = match joined {
            Ok(Ok(Ok(rows))) => rows,
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Err(_)) => return Err(Error::FetchTimeout),
            Err(e) => return Err(Error::Internal(format!("fetch task failed: {e}"))),
        };

        let method = agg.unwrap_or_else(|| AggregationMethod::for_path(path));
        series.insert(path.clone(), align(rows, method, from_aligned, step, points));
    }

    Ok(FetchResult {
        from: from_aligned,
        to: to_aligned,
        step: rollup,
        series,
    })
}

/// Collapse rows onto the grid. Rows landing on the same grid point have
/// their value lists merged before reduction.
fn align(
    rows: Vec<Row>,
    method: AggregationMethod,
    from: i64,
    step: i64,
    points: usize,
) -> Vec<Option<f64>> {
    let mut by_time: HashMap<i64, Vec<f64>> = HashMap::with_capacity(rows.len());
    for row in rows {
        let grid_time = row.time - row.time.rem_euclid(step);
        by_time.entry(grid_time).or_default().extend(row.values);
    }

    (0..points)
        .map(|i| {
            by_time
                .get(&(from + i as i64 * step))
                .and_then(|values| method.apply(values))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_points() {
        assert_eq!(max_points(1, 60, 0, 300), 6);
        assert_eq!(max_points(3, 60, 0, 300), 18);
    }

    #[test]
    fn test_align_places_values_and_nulls() {
        let rows = vec![
            Row {
                time: 60,
                values: vec![2.0, 4.0],
            },
            Row {
                time: 180,
                values: vec![5.0],
            },
        ];
        let out = align(rows, AggregationMethod::Average, 0, 60, 4);
        assert_eq!(out, vec![None, Some(3.0), None, Some(5.0)]);
    }

    #[test]
    fn test_align_merges_rows_on_one_grid_point() {
        let rows = vec![
            Row {
                time: 61,
                values: vec![1.0],
            },
            Row {
                time: 119,
                values: vec![3.0],
            },
        ];
        let out = align(rows, AggregationMethod::Average, 60, 60, 1);
        assert_eq!(out, vec![Some(2.0)]);
    }
}
