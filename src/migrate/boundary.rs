//! Boundary discovery: earliest timestamp of a metric family

use super::TimeBoundary;
use crate::store::{influxql, Query, QueryResponse, StoreClient};
use serde_json::Value;
use tracing::{debug, info, warn};

/// What to do when a first-value row has an unparsable timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryParsePolicy {
    /// Skip only the offending row
    #[default]
    SkipValue,
    /// Stop scanning the rest of that series
    AbandonSeries,
}

/// Outcome of scanning a first-value response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryScan {
    /// Smallest parsed timestamp, `u64::MAX` if none parsed
    pub min: u64,
    /// Rows whose timestamp parsed
    pub rows: usize,
    /// Rows whose timestamp did not parse
    pub parse_failures: usize,
}

impl Default for BoundaryScan {
    fn default() -> Self {
        Self {
            min: u64::MAX,
            rows: 0,
            parse_failures: 0,
        }
    }
}

fn parse_timestamp(row: &[Value]) -> Option<u64> {
    row.first().and_then(Value::as_u64)
}

/// Fold every row of every series down to the minimum timestamp in column 0.
pub fn scan_first_timestamps(response: &QueryResponse, policy: BoundaryParsePolicy) -> BoundaryScan {
    response
        .series()
        .fold(BoundaryScan::default(), |mut scan, series| {
            for row in &series.values {
                match parse_timestamp(row) {
                    Some(ts) => {
                        scan.rows += 1;
                        scan.min = scan.min.min(ts);
                    }
                    None => {
                        scan.parse_failures += 1;
                        warn!(
                            series = %series.name,
                            value = ?row.first(),
                            "Failed to parse first-value timestamp"
                        );
                        if policy == BoundaryParsePolicy::AbandonSeries {
                            break;
                        }
                    }
                }
            }
            scan
        })
}

/// Discover the boundary for `pattern`, with `cutoff` as the fixed upper bound.
///
/// Query failures are logged and leave the minimum at `u64::MAX`, which makes
/// the boundary non-migratable.
pub async fn find_boundary(
    store: &dyn StoreClient,
    database: &str,
    pattern: &str,
    cutoff: u64,
    policy: BoundaryParsePolicy,
) -> (TimeBoundary, BoundaryScan) {
    let query = Query::new(influxql::first_value(pattern), database);

    let scan = match store.query(&query).await {
        Ok(response) => {
            if let Some(err) = response.error() {
                warn!(metric = %pattern, error = %err, "Response error querying first value");
            }
            scan_first_timestamps(&response, policy)
        }
        Err(e) => {
            warn!(metric = %pattern, error = %e, "Failed to query first value");
            BoundaryScan::default()
        }
    };

    let boundary = TimeBoundary::new(scan.min, cutoff);
    if scan.rows > 0 {
        info!(
            metric = %pattern,
            min = boundary.min,
            max = boundary.max,
            rows = scan.rows,
            parse_failures = scan.parse_failures,
            "Discovered time boundary"
        );
    } else {
        debug!(metric = %pattern, parse_failures = scan.parse_failures, "No first-value rows");
    }

    (boundary, scan)
}
