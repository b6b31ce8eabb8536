//! Run configuration and component factory
//!
//! Everything the migration treats as a fixed business rule lives in
//! [`MigrationConfig`]; connection details for the store live in
//! [`StoreConfig`].

use crate::migrate::BoundaryParsePolicy;
use crate::store::{HttpStoreClient, StoreClient};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Metric families rewritten by default.
pub const DEFAULT_METRICS: [&str; 2] = ["network-in-percent", "network-out-percent"];

/// Data written at or after this instant is already in the new unit.
pub const DEFAULT_CUTOFF: &str = "2017-07-04 14:00";

/// Format of [`DEFAULT_CUTOFF`], interpreted as UTC.
pub const CUTOFF_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Percent-style readings are multiplied by this to get the bit-rate unit.
pub const DEFAULT_CONVERSION_FACTOR: f64 = 8.0;

/// Dry runs print one progress marker per this many accepted points.
pub const DEFAULT_PROGRESS_EVERY: usize = 100;

pub const DEFAULT_CHUNKS: u64 = 100;

pub const DEFAULT_INFLUX_IP: &str = "172.17.42.1";

pub const DEFAULT_CUSTOMER_ID: &str = "416c300b-2164-4ecd-92e0-ff77fcf08bec";

/// Migration parameters
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Measurement name patterns (regex bodies), processed in order
    pub metrics: Vec<String>,
    /// Exclusive upper bound of the migrated time range
    pub cutoff: DateTime<Utc>,
    /// Multiplier applied to every accepted value
    pub conversion_factor: f64,
    /// Dry-run progress cadence, in accepted points
    pub progress_every: usize,
    /// Number of time partitions per metric
    pub chunks: u64,
    /// Read and transform only
    pub dry_run: bool,
    /// Target database for both reads and writes
    pub database: String,
    /// Reaction to an unparsable timestamp during boundary discovery
    pub boundary_policy: BoundaryParsePolicy,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            cutoff: parse_cutoff(DEFAULT_CUTOFF).unwrap_or_default(),
            conversion_factor: DEFAULT_CONVERSION_FACTOR,
            progress_every: DEFAULT_PROGRESS_EVERY,
            chunks: DEFAULT_CHUNKS,
            dry_run: false,
            database: database_for_customer(DEFAULT_CUSTOMER_ID),
            boundary_policy: BoundaryParsePolicy::default(),
        }
    }
}

impl MigrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunks == 0 {
            return Err(Error::Config("chunks must be at least 1".to_string()));
        }
        if self.progress_every == 0 {
            return Err(Error::Config(
                "progress_every must be at least 1".to_string(),
            ));
        }
        if !self.conversion_factor.is_finite() || self.conversion_factor <= 0.0 {
            return Err(Error::Config(format!(
                "conversion_factor must be a positive finite number, got {}",
                self.conversion_factor
            )));
        }
        if self.database.trim().is_empty() {
            return Err(Error::Config("database cannot be empty".to_string()));
        }
        if self.metrics.iter().any(|m| m.trim().is_empty()) {
            return Err(Error::Config("metric patterns cannot be empty".to_string()));
        }
        self.cutoff_nanos()?;
        Ok(())
    }

    /// Cutoff as unsigned nanoseconds since the epoch.
    pub fn cutoff_nanos(&self) -> Result<u64> {
        self.cutoff
            .timestamp_nanos_opt()
            .and_then(|ns| u64::try_from(ns).ok())
            .ok_or_else(|| {
                Error::Config(format!(
                    "cutoff {} is outside the nanosecond timestamp range",
                    self.cutoff
                ))
            })
    }
}

/// Parse a `YYYY-MM-DD HH:MM` cutoff as UTC.
pub fn parse_cutoff(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), CUTOFF_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Config(format!("invalid cutoff '{}': {}", raw, e)))
}

/// Customer databases are named `dbu` + the customer UUID with `_` for `-`.
pub fn database_for_customer(customer_id: &str) -> String {
    format!("dbu{}", customer_id.trim().replace('-', "_"))
}

/// Store connection configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Host, optionally with `:port`
    pub address: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_INFLUX_IP.to_string(),
            timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
        }
    }
}

impl StoreConfig {
    /// Base URL; a bare host gets the `http://` scheme.
    pub fn base_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        }
    }
}

pub struct ComponentFactory;

impl ComponentFactory {
    /// Create the HTTP store client for `config`.
    pub fn create_store_client(config: &StoreConfig) -> Result<Arc<dyn StoreClient>> {
        if config.address.trim().is_empty() {
            return Err(Error::Config("store address cannot be empty".to_string()));
        }
        let client = HttpStoreClient::new(config)?;
        info!(
            base_url = %client.base_url(),
            timeout_secs = config.timeout.as_secs(),
            "Using HTTP store client"
        );
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cutoff_is_july_fourth_2017_utc() {
        let config = MigrationConfig::default();
        assert_eq!(config.cutoff_nanos().unwrap(), 1_499_176_800_000_000_000);
    }

    #[test]
    fn default_config_is_valid() {
        let config = MigrationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.metrics, vec!["network-in-percent", "network-out-percent"]);
        assert_eq!(config.conversion_factor, 8.0);
        assert_eq!(config.progress_every, 100);
        assert_eq!(config.chunks, 100);
    }

    #[test]
    fn zero_chunks_rejected() {
        let config = MigrationConfig {
            chunks: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunks"));
    }

    #[test]
    fn pre_epoch_cutoff_rejected() {
        let config = MigrationConfig {
            cutoff: parse_cutoff("1969-12-31 23:00").unwrap(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_cutoff_rejects_garbage() {
        assert!(parse_cutoff("July 4th").is_err());
        assert!(parse_cutoff("2017-07-04").is_err());
    }

    #[test]
    fn customer_database_name() {
        assert_eq!(
            database_for_customer(DEFAULT_CUSTOMER_ID),
            "dbu416c300b_2164_4ecd_92e0_ff77fcf08bec"
        );
    }

    #[test]
    fn base_url_adds_scheme() {
        let config = StoreConfig::default();
        assert_eq!(config.base_url(), "http://172.17.42.1");

        let config = StoreConfig {
            address: "https://influx.internal:8086/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://influx.internal:8086");
    }
}
