//! In-memory store client for development and testing

use super::{BatchPoints, Point, Query, QueryResponse, StoreClient};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

/// Scripted in-memory store
///
/// Answers queries from canned responses keyed by statement text (unknown
/// statements return an empty result) and records every committed batch.
#[derive(Debug, Default)]
pub struct MemoryStore {
    responses: RwLock<HashMap<String, std::result::Result<QueryResponse, String>>>,
    write_failure: RwLock<Option<String>>,
    queries: Mutex<Vec<Query>>,
    writes: Mutex<Vec<BatchPoints>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `response`.
    pub fn respond(&self, command: impl Into<String>, response: QueryResponse) {
        self.responses.write().insert(command.into(), Ok(response));
    }

    /// Fail `command` with a query error.
    pub fn fail_query(&self, command: impl Into<String>, message: impl Into<String>) {
        self.responses
            .write()
            .insert(command.into(), Err(message.into()));
    }

    /// Fail every subsequent write.
    pub fn fail_writes(&self, message: impl Into<String>) {
        *self.write_failure.write() = Some(message.into());
    }

    /// Queries received so far, in order.
    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().clone()
    }

    /// Batches committed so far, in order.
    pub fn writes(&self) -> Vec<BatchPoints> {
        self.writes.lock().clone()
    }

    /// Every committed point, flattened across batches.
    pub fn written_points(&self) -> Vec<Point> {
        self.writes
            .lock()
            .iter()
            .flat_map(|b| b.points.iter().cloned())
            .collect()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn query(&self, query: &Query) -> Result<QueryResponse> {
        self.queries.lock().push(query.clone());

        match self.responses.read().get(&query.command) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(Error::Query(message.clone())),
            None => Ok(QueryResponse::default()),
        }
    }

    async fn write(&self, batch: &BatchPoints) -> Result<()> {
        if let Some(message) = self.write_failure.read().as_ref() {
            return Err(Error::Write(message.clone()));
        }
        self.writes.lock().push(batch.clone());
        Ok(())
    }
}
