//! End-to-end migration runs against the in-memory store
//!
//! Covers:
//! - Boundary discovery, chunk planning and per-chunk writes
//! - Dry-run vs. commit semantics
//! - Skipped metrics, failed chunk queries, fatal write errors
//! - Re-running a migration (no deduplication)

use influx_rescale::config::MigrationConfig;
use influx_rescale::migrate::{ChunkPlan, Migrator, TimeBoundary, TimeRange};
use influx_rescale::store::{influxql, MemoryStore, QueryResponse, Series};
use influx_rescale::Error;

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;

const CUTOFF_NS: u64 = 1_499_176_800_000_000_000;

/// Progress sink whose contents can be inspected after the run
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn config(metrics: &[&str], chunks: u64, dry_run: bool) -> MigrationConfig {
    MigrationConfig {
        metrics: metrics.iter().map(|m| m.to_string()).collect(),
        chunks,
        dry_run,
        database: "dbu_test".to_string(),
        ..Default::default()
    }
}

fn first_value_response(name: &str, min: u64) -> QueryResponse {
    QueryResponse::from_series(vec![
        Series::new(name, &["time", "first"]).with_row(vec![json!(min), json!(1.0)])
    ])
}

fn rows(name: &str, rows: Vec<Vec<Value>>) -> QueryResponse {
    let series = rows.into_iter().fold(
        Series::new(name, &["time", "host", "value"]),
        |series, row| series.with_row(row),
    );
    QueryResponse::from_series(vec![series])
}

/// Script a metric whose history starts `4 * width` before the cutoff,
/// with one row per chunk at the chunk start and value `i + 1`.
fn script_metric(store: &MemoryStore, metric: &str, width: u64) -> Vec<TimeRange> {
    let min = CUTOFF_NS - 4 * width;
    store.respond(influxql::first_value(metric), first_value_response(metric, min));

    let plan = ChunkPlan::new(TimeBoundary::new(min, CUTOFF_NS), 4);
    for (i, range) in plan.iter().enumerate() {
        store.respond(
            influxql::select_range(metric, range),
            rows(
                metric,
                vec![vec![json!(range.start), json!("web-1"), json!(i as f64 + 1.0)]],
            ),
        );
    }
    plan.chunks().to_vec()
}

#[tokio::test]
async fn commit_mode_writes_once_per_non_empty_chunk() {
    let store = Arc::new(MemoryStore::new());
    let ranges = script_metric(&store, "network-in-percent", 1_000);

    let mut migrator = Migrator::new(config(&["network-in-percent"], 4, false), store.clone())
        .unwrap()
        .with_progress(std::io::sink());
    let report = migrator.run().await.unwrap();

    let writes = store.writes();
    assert_eq!(writes.len(), 4);
    assert_eq!(report.batches_written(), 4);
    assert_eq!(report.points_written(), 4);

    for (i, (batch, range)) in writes.iter().zip(&ranges).enumerate() {
        assert_eq!(batch.database, "dbu_test");
        let point = &batch.points[0];
        assert_eq!(point.measurement(), "network-in-percent");
        assert_eq!(point.timestamp() as u64, range.start);
        assert_eq!(point.fields()["value"], (i as f64 + 1.0) * 8.0);
        assert_eq!(point.tags()["host"], "web-1");
    }

    // first-value query, then one query per chunk in ascending order
    let queries: Vec<String> = store.queries().into_iter().map(|q| q.command).collect();
    assert_eq!(queries[0], influxql::first_value("network-in-percent"));
    for (query, range) in queries[1..].iter().zip(&ranges) {
        assert_eq!(query, &influxql::select_range("network-in-percent", *range));
    }
}

#[tokio::test]
async fn dry_run_never_writes() {
    let store = Arc::new(MemoryStore::new());
    script_metric(&store, "network-in-percent", 1_000);
    let progress = SharedBuffer::default();

    let mut migrator = Migrator::new(config(&["network-in-percent"], 4, true), store.clone())
        .unwrap()
        .with_progress(progress.clone());
    let report = migrator.run().await.unwrap();

    assert!(store.writes().is_empty());
    assert!(report.dry_run);
    assert_eq!(report.accepted(), 4);
    assert_eq!(report.points_written(), 0);
    // one newline per chunk, no dots below the cadence
    assert_eq!(progress.contents(), "\n\n\n\n");
}

#[tokio::test]
async fn dry_run_prints_progress_every_hundred_points() {
    let store = Arc::new(MemoryStore::new());
    let metric = "network-out-percent";
    let min = CUTOFF_NS - 1_000;
    store.respond(influxql::first_value(metric), first_value_response(metric, min));
    let range = TimeRange::new(min, CUTOFF_NS);
    let many = (0..250)
        .map(|i| vec![json!(min + i), json!("web-1"), json!(1.5)])
        .collect();
    store.respond(influxql::select_range(metric, range), rows(metric, many));

    let progress = SharedBuffer::default();
    let mut migrator = Migrator::new(config(&[metric], 1, true), store.clone())
        .unwrap()
        .with_progress(progress.clone());
    let report = migrator.run().await.unwrap();

    assert_eq!(progress.contents(), "\n..");
    assert_eq!(report.accepted(), 250);
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn metric_without_rows_is_skipped() {
    let store = Arc::new(MemoryStore::new());

    let mut migrator = Migrator::new(config(&["network-in-percent"], 4, false), store.clone())
        .unwrap()
        .with_progress(std::io::sink());
    let report = migrator.run().await.unwrap();

    let metric = &report.metrics[0];
    assert!(metric.skipped);
    assert_eq!(metric.boundary.min, u64::MAX);
    assert_eq!(metric.chunks_planned, 0);
    // only the first-value query was issued
    assert_eq!(store.queries().len(), 1);
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn metric_starting_after_cutoff_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    store.respond(
        influxql::first_value("network-in-percent"),
        first_value_response("network-in-percent", CUTOFF_NS + 1),
    );

    let mut migrator = Migrator::new(config(&["network-in-percent"], 4, false), store.clone())
        .unwrap()
        .with_progress(std::io::sink());
    let report = migrator.run().await.unwrap();

    assert!(report.metrics[0].skipped);
    assert_eq!(store.queries().len(), 1);
}

#[tokio::test]
async fn failed_boundary_query_skips_only_that_metric() {
    let store = Arc::new(MemoryStore::new());
    store.fail_query(influxql::first_value("network-in-percent"), "no such database");
    script_metric(&store, "network-out-percent", 500);

    let mut migrator = Migrator::new(
        config(&["network-in-percent", "network-out-percent"], 4, false),
        store.clone(),
    )
    .unwrap()
    .with_progress(std::io::sink());
    let report = migrator.run().await.unwrap();

    assert!(report.metrics[0].skipped);
    assert!(!report.metrics[1].skipped);
    assert_eq!(report.metrics[1].points_written, 4);
}

#[tokio::test]
async fn failed_chunk_query_moves_on_to_next_chunk() {
    let store = Arc::new(MemoryStore::new());
    let ranges = script_metric(&store, "network-in-percent", 1_000);
    store.fail_query(
        influxql::select_range("network-in-percent", ranges[1]),
        "query timeout",
    );

    let mut migrator = Migrator::new(config(&["network-in-percent"], 4, false), store.clone())
        .unwrap()
        .with_progress(std::io::sink());
    let report = migrator.run().await.unwrap();

    let metric = &report.metrics[0];
    assert_eq!(metric.chunks_processed, 4);
    assert_eq!(metric.failed_chunk_queries, 1);
    assert_eq!(store.writes().len(), 3);
}

#[tokio::test]
async fn bad_rows_do_not_stop_the_chunk() {
    let store = Arc::new(MemoryStore::new());
    let metric = "network-in-percent";
    let min = CUTOFF_NS - 1_000;
    store.respond(influxql::first_value(metric), first_value_response(metric, min));
    store.respond(
        influxql::select_range(metric, TimeRange::new(min, CUTOFF_NS)),
        rows(
            metric,
            vec![
                vec![json!(min + 1), json!("a"), json!(2.5)],
                vec![json!("not-a-time"), json!("a"), json!(4.0)],
                vec![json!(min + 3), json!("a"), json!(-1.0)],
                vec![json!(min + 4), json!(7), json!(1.0)],
            ],
        ),
    );

    let mut migrator = Migrator::new(config(&[metric], 1, false), store.clone())
        .unwrap()
        .with_progress(std::io::sink());
    let report = migrator.run().await.unwrap();

    let m = &report.metrics[0];
    assert_eq!(m.rows, 4);
    assert_eq!(m.accepted, 2);
    assert_eq!(m.rejected, 1);
    assert_eq!(m.filtered, 1);

    let points = store.written_points();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].fields()["value"], 20.0);
    assert_eq!(points[0].tags()["host"], "a");
    assert_eq!(points[1].tags()["host"], "", "non-string tag becomes empty");
}

#[tokio::test]
async fn write_failure_aborts_the_run() {
    let store = Arc::new(MemoryStore::new());
    script_metric(&store, "network-in-percent", 1_000);
    script_metric(&store, "network-out-percent", 1_000);
    store.fail_writes("partial write: field type conflict");

    let mut migrator = Migrator::new(
        config(&["network-in-percent", "network-out-percent"], 4, false),
        store.clone(),
    )
    .unwrap()
    .with_progress(std::io::sink());
    let err = migrator.run().await.unwrap_err();

    assert!(matches!(err, Error::Write(_)));
    assert!(err.is_fatal());
    // aborted after the first chunk of the first metric
    assert_eq!(store.queries().len(), 2);
}

#[tokio::test]
async fn rerun_writes_identical_points_again() {
    let store = Arc::new(MemoryStore::new());
    script_metric(&store, "network-in-percent", 1_000);

    for _ in 0..2 {
        let mut migrator =
            Migrator::new(config(&["network-in-percent"], 4, false), store.clone())
                .unwrap()
                .with_progress(std::io::sink());
        migrator.run().await.unwrap();
    }

    let writes = store.writes();
    assert_eq!(writes.len(), 8);
    assert_eq!(writes[..4], writes[4..]);
}
