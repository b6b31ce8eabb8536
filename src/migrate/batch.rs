//! Per-chunk batch accumulation and commit

use crate::store::{BatchPoints, Point, StoreClient};
use crate::{Error, Result};
use std::io::Write;
use tracing::debug;

/// Marker written to the progress sink during dry runs.
pub const PROGRESS_MARKER: &[u8] = b".";

/// Outcome of finishing one chunk's batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Points accepted into the batch
    pub accepted: usize,
    /// Points committed to the store (0 in dry-run)
    pub written: usize,
    /// Whether a write call was issued
    pub committed: bool,
    /// Progress markers emitted (dry-run only)
    pub progress_marks: usize,
}

/// Accumulates one chunk's points and commits them in a single write
///
/// In dry-run mode nothing is written; a progress marker goes to `progress`
/// every `progress_every` accepted points instead.
pub struct BatchWriter<'a, W: Write> {
    batch: BatchPoints,
    dry_run: bool,
    progress_every: usize,
    progress_marks: usize,
    progress: &'a mut W,
}

impl<'a, W: Write> BatchWriter<'a, W> {
    pub fn new(
        database: &str,
        dry_run: bool,
        progress_every: usize,
        progress: &'a mut W,
    ) -> Self {
        Self {
            batch: BatchPoints::new(database),
            dry_run,
            progress_every: progress_every.max(1),
            progress_marks: 0,
            progress,
        }
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn push(&mut self, point: Point) -> Result<()> {
        self.batch.points.push(point);

        if self.dry_run && self.batch.len() % self.progress_every == 0 {
            self.progress.write_all(PROGRESS_MARKER)?;
            self.progress.flush()?;
            self.progress_marks += 1;
        }
        Ok(())
    }

    /// Commit the batch (unless dry-run or empty) and report what happened.
    ///
    /// A failed write is returned as [`Error::Write`] and must end the run.
    pub async fn finish(self, store: &dyn StoreClient) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome {
            accepted: self.batch.len(),
            progress_marks: self.progress_marks,
            ..Default::default()
        };

        if self.dry_run || self.batch.is_empty() {
            return Ok(outcome);
        }

        store.write(&self.batch).await.map_err(|e| match e {
            Error::Write(msg) => Error::Write(msg),
            other => Error::Write(other.to_string()),
        })?;

        debug!(
            database = %self.batch.database,
            points = self.batch.len(),
            "Committed batch"
        );
        outcome.written = self.batch.len();
        outcome.committed = true;
        Ok(outcome)
    }
}
