//! Time boundary and chunk planning

/// Half-open nanosecond interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: u64,
    pub end: u64,
}

impl TimeRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: u64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    pub fn width(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Earliest observed timestamp of a metric and the migration cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBoundary {
    pub min: u64,
    pub max: u64,
}

impl TimeBoundary {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// True when there is anything before the cutoff to migrate.
    pub fn is_migratable(&self) -> bool {
        self.min < self.max
    }
}

/// Contiguous, equal-width chunks covering `[min, max)`
///
/// Width is `(max - min) / count` with integer division, so the last chunk
/// may end short of `max`. When the span is narrower than `count`, one chunk
/// per nanosecond is planned instead so no chunk is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<TimeRange>,
}

impl ChunkPlan {
    pub fn new(boundary: TimeBoundary, count: u64) -> Self {
        if count == 0 || !boundary.is_migratable() {
            return Self { chunks: Vec::new() };
        }

        let span = boundary.max - boundary.min;
        let count = count.min(span);
        let width = span / count;

        let chunks = (0..count)
            .map(|i| {
                TimeRange::new(
                    boundary.min + i * width,
                    boundary.min + (i + 1) * width,
                )
            })
            .collect();

        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[TimeRange] {
        &self.chunks
    }

    pub fn iter(&self) -> impl Iterator<Item = TimeRange> + '_ {
        self.chunks.iter().copied()
    }
}
