//! Aggregation reducers
//!
//! Stored cells hold a list of raw values per timestamp; a reducer collapses
//! the list into one scalar on read, and the same reducers close rollup
//! buckets on write. The reducer for a path is chosen by its last dotted
//! segment unless the caller overrides it.

use std::fmt;
use std::str::FromStr;

/// Reduction applied to a list of values for one timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationMethod {
    Average,
    Sum,
    Min,
    Max,
    Last,
}

impl AggregationMethod {
    /// Collapse `values` into one scalar. Returns `None` on empty input.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            AggregationMethod::Average => values.iter().sum::<f64>() / values.len() as f64,
            AggregationMethod::Sum => values.iter().sum(),
            AggregationMethod::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggregationMethod::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            AggregationMethod::Last => values[values.len() - 1],
        })
    }

    /// Select the reducer for a metric path by its last segment.
    ///
    /// `web.srv1.requests.count` sums, `web.srv1.latency.max` takes the
    /// maximum, anything unrecognized averages.
    pub fn for_path(path: &str) -> Self {
        match path.rsplit('.').next().unwrap_or(path) {
            "count" | "sum" => AggregationMethod::Sum,
            "min" | "lower" => AggregationMethod::Min,
            "max" | "upper" => AggregationMethod::Max,
            "last" => AggregationMethod::Last,
            _ => AggregationMethod::Average,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Average => "avg",
            AggregationMethod::Sum => "sum",
            AggregationMethod::Min => "min",
            AggregationMethod::Max => "max",
            AggregationMethod::Last => "last",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avg" | "mean" | "average" => Ok(AggregationMethod::Average),
            "sum" => Ok(AggregationMethod::Sum),
            "min" => Ok(AggregationMethod::Min),
            "max" => Ok(AggregationMethod::Max),
            "last" => Ok(AggregationMethod::Last),
            other => Err(crate::Error::Config(format!(
                "unknown aggregation method '{other}', expected one of [avg, sum, min, max, last]"
            ))),
        }
    }
}
