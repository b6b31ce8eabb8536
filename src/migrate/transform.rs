//! Per-row transform: parse, validate, rescale

use crate::error::RowError;
use crate::store::Point;
use crate::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

pub const VALUE_COLUMN: &str = "value";
pub const TIME_COLUMN: &str = "time";

/// What became of one input row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// Value was positive; carries the rescaled point
    Accepted(Point),
    /// Value was zero or negative
    Filtered,
    /// Value or timestamp was missing or malformed
    Rejected(RowError),
}

fn parse_value(raw: &Value) -> std::result::Result<f64, RowError> {
    match raw {
        Value::Number(n) => n.as_f64().ok_or_else(|| RowError::ValueParse(n.to_string())),
        other => Err(RowError::InvalidValueType(other.to_string())),
    }
}

fn parse_time(raw: &Value) -> std::result::Result<i64, RowError> {
    match raw {
        Value::Number(n) => n.as_i64().ok_or_else(|| RowError::TimeParse(n.to_string())),
        other => Err(RowError::InvalidTimeType(other.to_string())),
    }
}

/// Converts raw result rows into rescaled points
#[derive(Debug, Clone, Copy)]
pub struct RowTransformer {
    factor: f64,
}

impl RowTransformer {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Transform one row of `series`.
    ///
    /// Only a point that cannot be constructed is an error; every other
    /// problem is reported through [`RowOutcome`].
    pub fn transform(&self, series: &str, columns: &[String], row: &[Value]) -> Result<RowOutcome> {
        let mut value = None;
        let mut timestamp = None;
        let mut tags = BTreeMap::new();

        for (column, raw) in columns.iter().zip(row) {
            match column.as_str() {
                VALUE_COLUMN => match parse_value(raw) {
                    Ok(v) => value = Some(v),
                    Err(e) => return Ok(self.reject(series, e)),
                },
                TIME_COLUMN => match parse_time(raw) {
                    Ok(ts) => timestamp = Some(ts),
                    Err(e) => return Ok(self.reject(series, e)),
                },
                tag => {
                    let tag_value = raw.as_str().unwrap_or_default().to_string();
                    tags.insert(tag.to_string(), tag_value);
                }
            }
        }

        let Some(value) = value else {
            return Ok(self.reject(series, RowError::MissingColumn(VALUE_COLUMN)));
        };
        let Some(timestamp) = timestamp else {
            return Ok(self.reject(series, RowError::MissingColumn(TIME_COLUMN)));
        };

        if value <= 0.0 {
            return Ok(RowOutcome::Filtered);
        }

        let fields = BTreeMap::from([(VALUE_COLUMN.to_string(), value * self.factor)]);
        let point = Point::try_new(series, tags, fields, timestamp)?;
        Ok(RowOutcome::Accepted(point))
    }

    fn reject(&self, series: &str, error: RowError) -> RowOutcome {
        warn!(series = %series, error = %error, "Skipping row");
        RowOutcome::Rejected(error)
    }
}
