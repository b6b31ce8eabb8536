//! # influx-rescale
//!
//! Rewrites historical samples of percent-style network metrics into the
//! bit-rate unit used after the cutoff date, in place, inside one InfluxDB
//! database.
//!
//! ## Pipeline
//!
//! - **Boundary discovery**: a first-value query finds each metric's earliest
//!   timestamp
//! - **Chunk planning**: `[earliest, cutoff)` is split into equal-width,
//!   half-open chunks so memory stays bounded by one chunk's rows
//! - **Transform**: every row is parsed defensively; positive values are
//!   multiplied by the conversion factor, everything else is dropped
//! - **Batch write**: each chunk is committed in a single write, or only
//!   reported on in dry-run mode
//!
//! Row-level problems are logged and skipped. A point that cannot be built or
//! a batch that cannot be written ends the run (see [`ErrorClass`]).

pub mod config;
pub mod migrate;
pub mod store;
pub mod telemetry;

mod error;

pub use error::{Error, ErrorClass, Result, RowError};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::{ComponentFactory, MigrationConfig, StoreConfig};
    pub use crate::migrate::{
        BoundaryParsePolicy, ChunkPlan, MigrationReport, Migrator, RowOutcome, RowTransformer,
        TimeBoundary, TimeRange,
    };
    pub use crate::store::{HttpStoreClient, MemoryStore, Point, StoreClient};
    pub use crate::{Error, ErrorClass, Result};
}
