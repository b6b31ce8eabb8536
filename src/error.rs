//! Error types for influx-rescale

use std::fmt;

/// Result type alias for migration operations
pub type Result<T> = std::result::Result<T, Error>;

/// How the migration driver must react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Log it, drop the affected query's rows, keep going.
    SkipAndContinue,
    /// Abort the whole run.
    Unrecoverable,
}

/// Error types for influx-rescale
#[derive(Debug)]
pub enum Error {
    /// HTTP transport errors
    Http(reqwest::Error),
    /// IO errors
    Io(std::io::Error),
    /// Response decoding errors
    Serialization(String),
    /// Configuration errors
    Config(String),
    /// Query rejected by the store
    Query(String),
    /// A transformed point could not be built
    PointConstruction(String),
    /// Batch commit failed
    Write(String),
}

impl Error {
    /// Classify the error for the driver's propagation policy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Http(_) | Error::Serialization(_) | Error::Query(_) => {
                ErrorClass::SkipAndContinue
            }
            Error::Io(_) | Error::Config(_) | Error::PointConstruction(_) | Error::Write(_) => {
                ErrorClass::Unrecoverable
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Unrecoverable
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Query(msg) => write!(f, "Query error: {}", msg),
            Error::PointConstruction(msg) => write!(f, "Point construction error: {}", msg),
            Error::Write(msg) => write!(f, "Write error: {}", msg),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Reasons a single result row is dropped by the transformer.
///
/// Row errors never leave the chunk loop; they are logged and counted.
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    /// The `value` column held something other than a number
    InvalidValueType(String),
    /// The `value` column was numeric but not representable as f64
    ValueParse(String),
    /// The `time` column held something other than a number
    InvalidTimeType(String),
    /// The `time` column was numeric but not an integer nanosecond timestamp
    TimeParse(String),
    /// A required column was absent from the row
    MissingColumn(&'static str),
}

impl std::error::Error for RowError {}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::InvalidValueType(v) => write!(f, "invalid metric value type: {}", v),
            RowError::ValueParse(v) => write!(f, "failed to parse metric value: {}", v),
            RowError::InvalidTimeType(v) => write!(f, "invalid timestamp type: {}", v),
            RowError::TimeParse(v) => write!(f, "failed to parse timestamp: {}", v),
            RowError::MissingColumn(c) => write!(f, "row has no '{}' column", c),
        }
    }
}
