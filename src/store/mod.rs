//! Store client abstraction
//!
//! The migration talks to the time-series store through [`StoreClient`]:
//! a query call returning named series, and a batched point write.

mod http;
pub mod influxql;
pub mod line_protocol;
mod memory;

pub use http::HttpStoreClient;
pub use memory::MemoryStore;

use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Timestamp precision for queries and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "u",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        }
    }
}

/// A query against one database
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub command: String,
    pub database: String,
    pub precision: Precision,
}

impl Query {
    pub fn new(command: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            database: database.into(),
            precision: Precision::Nanoseconds,
        }
    }
}

/// Decoded `/query` response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueryResponse {
    /// Build a response holding a single statement's series.
    pub fn from_series(series: Vec<Series>) -> Self {
        Self {
            results: vec![StatementResult {
                statement_id: 0,
                series,
                error: None,
            }],
            error: None,
        }
    }

    /// The response-level error, or the first statement-level one.
    pub fn error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.results.iter().find_map(|r| r.error.as_deref()))
    }

    /// All series across all statements, in response order.
    pub fn series(&self) -> impl Iterator<Item = &Series> {
        self.results.iter().flat_map(|r| r.series.iter())
    }
}

/// Result of one statement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub statement_id: u32,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One named series with ordered columns and heterogeneous row values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl Series {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.values.push(row);
        self
    }
}

/// A point ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, f64>,
    timestamp: i64,
}

impl Point {
    /// Build a point, rejecting anything the store could not accept.
    pub fn try_new(
        measurement: impl Into<String>,
        tags: BTreeMap<String, String>,
        fields: BTreeMap<String, f64>,
        timestamp: i64,
    ) -> Result<Self> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(Error::PointConstruction(
                "measurement name cannot be empty".to_string(),
            ));
        }
        if fields.is_empty() {
            return Err(Error::PointConstruction(format!(
                "point for '{}' has no fields",
                measurement
            )));
        }
        if let Some((key, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::PointConstruction(format!(
                "field '{}' of '{}' is not finite: {}",
                key, measurement, value
            )));
        }
        if tags.keys().any(|k| k.is_empty()) {
            return Err(Error::PointConstruction(format!(
                "point for '{}' has an empty tag key",
                measurement
            )));
        }

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Points committed together in one write call
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPoints {
    pub database: String,
    pub precision: Precision,
    pub points: Vec<Point>,
}

impl BatchPoints {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            precision: Precision::Nanoseconds,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Store client interface
///
/// Calls are awaited one at a time by the migration; implementations do not
/// need to support concurrent use beyond `Send + Sync`.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Execute a read query
    async fn query(&self, query: &Query) -> Result<QueryResponse>;

    /// Commit a batch of points in a single call
    async fn write(&self, batch: &BatchPoints) -> Result<()>;
}
