//! Chunked scan-transform-rewrite migration
//!
//! For every configured metric the [`Migrator`]:
//! - finds the earliest timestamp with a first-value query
//! - splits `[earliest, cutoff)` into equal-width chunks
//! - reads each chunk, rescales every positive value, and commits the chunk
//!   as one batch (or only reports progress in dry-run mode)
//!
//! Chunks and metrics are processed strictly one after another. A committed
//! chunk is never rolled back; the first failed write ends the run.

mod batch;
mod boundary;
mod plan;
mod transform;

pub use batch::{BatchOutcome, BatchWriter, PROGRESS_MARKER};
pub use boundary::{find_boundary, scan_first_timestamps, BoundaryParsePolicy, BoundaryScan};
pub use plan::{ChunkPlan, TimeBoundary, TimeRange};
pub use transform::{RowOutcome, RowTransformer, TIME_COLUMN, VALUE_COLUMN};

use crate::config::MigrationConfig;
use crate::store::{influxql, Query, StoreClient};
use crate::Result;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

/// Counters for one processed chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    pub range: TimeRange,
    pub rows: usize,
    pub accepted: usize,
    pub filtered: usize,
    pub rejected: usize,
    pub written: usize,
    pub committed: bool,
    pub query_failed: bool,
    pub progress_marks: usize,
}

impl ChunkReport {
    fn new(range: TimeRange) -> Self {
        Self {
            range,
            rows: 0,
            accepted: 0,
            filtered: 0,
            rejected: 0,
            written: 0,
            committed: false,
            query_failed: false,
            progress_marks: 0,
        }
    }
}

/// Counters for one metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricReport {
    pub metric: String,
    pub boundary: TimeBoundary,
    /// No data before the cutoff; nothing was planned
    pub skipped: bool,
    pub boundary_parse_failures: usize,
    pub chunks_planned: usize,
    pub chunks_processed: usize,
    pub failed_chunk_queries: usize,
    pub rows: usize,
    pub accepted: usize,
    pub filtered: usize,
    pub rejected: usize,
    pub points_written: usize,
    pub batches_written: usize,
}

impl MetricReport {
    fn new(metric: &str, boundary: TimeBoundary) -> Self {
        Self {
            metric: metric.to_string(),
            boundary,
            skipped: false,
            boundary_parse_failures: 0,
            chunks_planned: 0,
            chunks_processed: 0,
            failed_chunk_queries: 0,
            rows: 0,
            accepted: 0,
            filtered: 0,
            rejected: 0,
            points_written: 0,
            batches_written: 0,
        }
    }

    fn absorb(&mut self, chunk: &ChunkReport) {
        self.chunks_processed += 1;
        self.failed_chunk_queries += chunk.query_failed as usize;
        self.rows += chunk.rows;
        self.accepted += chunk.accepted;
        self.filtered += chunk.filtered;
        self.rejected += chunk.rejected;
        self.points_written += chunk.written;
        self.batches_written += chunk.committed as usize;
    }
}

/// Result of a full run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub metrics: Vec<MetricReport>,
}

impl MigrationReport {
    pub fn points_written(&self) -> usize {
        self.metrics.iter().map(|m| m.points_written).sum()
    }

    pub fn batches_written(&self) -> usize {
        self.metrics.iter().map(|m| m.batches_written).sum()
    }

    pub fn accepted(&self) -> usize {
        self.metrics.iter().map(|m| m.accepted).sum()
    }

    pub fn rejected(&self) -> usize {
        self.metrics.iter().map(|m| m.rejected).sum()
    }
}

/// Migration driver
pub struct Migrator {
    config: MigrationConfig,
    store: Arc<dyn StoreClient>,
    transformer: RowTransformer,
    progress: Box<dyn Write + Send>,
}

impl Migrator {
    /// Create a driver; progress markers go to stdout.
    pub fn new(config: MigrationConfig, store: Arc<dyn StoreClient>) -> Result<Self> {
        config.validate()?;
        let transformer = RowTransformer::new(config.conversion_factor);
        Ok(Self {
            config,
            store,
            transformer,
            progress: Box::new(std::io::stdout()),
        })
    }

    /// Send dry-run progress output somewhere other than stdout.
    pub fn with_progress(mut self, sink: impl Write + Send + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Migrate every configured metric in order.
    ///
    /// Returns on the first unrecoverable error; earlier commits stay in place.
    pub async fn run(&mut self) -> Result<MigrationReport> {
        let cutoff = self.config.cutoff_nanos()?;
        let metrics = self.config.metrics.clone();

        info!(
            database = %self.config.database,
            metrics = ?metrics,
            cutoff = %self.config.cutoff,
            chunks = self.config.chunks,
            dry_run = self.config.dry_run,
            "Starting migration"
        );

        let mut report = MigrationReport {
            dry_run: self.config.dry_run,
            metrics: Vec::with_capacity(metrics.len()),
        };
        for metric in &metrics {
            report.metrics.push(self.migrate_metric(metric, cutoff).await?);
        }

        info!(
            accepted = report.accepted(),
            rejected = report.rejected(),
            points_written = report.points_written(),
            batches_written = report.batches_written(),
            dry_run = report.dry_run,
            "Migration complete"
        );
        Ok(report)
    }

    /// Discover, plan and process one metric.
    pub async fn migrate_metric(&mut self, metric: &str, cutoff: u64) -> Result<MetricReport> {
        let (boundary, scan) = find_boundary(
            self.store.as_ref(),
            &self.config.database,
            metric,
            cutoff,
            self.config.boundary_policy,
        )
        .await;

        let mut report = MetricReport::new(metric, boundary);
        report.boundary_parse_failures = scan.parse_failures;

        if !boundary.is_migratable() {
            info!(metric = %metric, min = boundary.min, max = boundary.max, "No data before cutoff, skipping metric");
            report.skipped = true;
            return Ok(report);
        }

        let plan = ChunkPlan::new(boundary, self.config.chunks);
        report.chunks_planned = plan.len();
        info!(
            metric = %metric,
            chunks = plan.len(),
            width = plan.chunks().first().map(TimeRange::width).unwrap_or(0),
            "Planned chunks"
        );

        for (index, range) in plan.iter().enumerate() {
            let chunk = self.migrate_chunk(metric, range).await?;
            info!(
                metric = %metric,
                chunk = index + 1,
                of = plan.len(),
                from = range.start,
                to = range.end,
                rows = chunk.rows,
                accepted = chunk.accepted,
                rejected = chunk.rejected,
                written = chunk.written,
                "Processed chunk"
            );
            report.absorb(&chunk);
        }

        info!(
            metric = %metric,
            rows = report.rows,
            accepted = report.accepted,
            filtered = report.filtered,
            rejected = report.rejected,
            points_written = report.points_written,
            failed_chunk_queries = report.failed_chunk_queries,
            "Metric migrated"
        );
        Ok(report)
    }

    /// Read one chunk, transform its rows and finish its batch.
    pub async fn migrate_chunk(&mut self, metric: &str, range: TimeRange) -> Result<ChunkReport> {
        let mut report = ChunkReport::new(range);
        let store = Arc::clone(&self.store);
        let transformer = self.transformer;

        if self.config.dry_run {
            self.progress.write_all(b"\n")?;
        }

        let query = Query::new(influxql::select_range(metric, range), &self.config.database);
        let response = match store.query(&query).await {
            Ok(response) => response,
            Err(e) if !e.is_fatal() => {
                warn!(metric = %metric, from = range.start, to = range.end, error = %e, "Chunk query failed");
                report.query_failed = true;
                return Ok(report);
            }
            Err(e) => return Err(e),
        };
        if let Some(err) = response.error() {
            warn!(metric = %metric, from = range.start, to = range.end, error = %err, "Chunk query response error");
        }

        let mut writer = BatchWriter::new(
            &self.config.database,
            self.config.dry_run,
            self.config.progress_every,
            &mut self.progress,
        );

        for series in response.series() {
            for row in &series.values {
                report.rows += 1;
                match transformer.transform(&series.name, &series.columns, row)? {
                    RowOutcome::Accepted(point) => writer.push(point)?,
                    RowOutcome::Filtered => report.filtered += 1,
                    RowOutcome::Rejected(_) => report.rejected += 1,
                }
            }
        }

        let outcome = writer.finish(store.as_ref()).await?;
        report.accepted = outcome.accepted;
        report.written = outcome.written;
        report.committed = outcome.committed;
        report.progress_marks = outcome.progress_marks;
        Ok(report)
    }
}
