//! InfluxDB 1.x HTTP API client

use super::{line_protocol, BatchPoints, Query, QueryResponse, StoreClient};
use crate::config::StoreConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Store client speaking the `/query` and `/write` HTTP endpoints
#[derive(Debug, Clone)]
pub struct HttpStoreClient {
    client: Client,
    base_url: String,
}

impl HttpStoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn query(&self, query: &Query) -> Result<QueryResponse> {
        debug!(database = %query.database, command = %query.command, "Executing query");

        let resp = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("db", query.database.as_str()),
                ("q", query.command.as_str()),
                ("epoch", query.precision.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            // Failed queries still carry a JSON error body when the server got that far
            let detail = serde_json::from_slice::<QueryResponse>(&body)
                .ok()
                .and_then(|r| r.error().map(str::to_string))
                .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());
            return Err(Error::Query(format!("HTTP {}: {}", status, detail)));
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn write(&self, batch: &BatchPoints) -> Result<()> {
        let body = line_protocol::encode_points(&batch.points);
        debug!(
            database = %batch.database,
            points = batch.len(),
            bytes = body.len(),
            "Writing batch"
        );

        let resp = self
            .client
            .post(format!("{}/write", self.base_url))
            .query(&[
                ("db", batch.database.as_str()),
                ("precision", batch.precision.as_str()),
            ])
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Write(format!("HTTP request failed: {}", e)))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Write(format!(
                "HTTP {}: {}",
                status,
                resp.text().await.unwrap_or_default().trim()
            )))
        }
    }
}
