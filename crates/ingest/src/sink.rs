//! Destination table boundary.
//!
//! Sinks append; none of them deduplicate by (symbol, date). A failed append
//! may leave earlier rows of the same call durable.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use pricevault_core::config::StorageConfig;
use pricevault_core::PriceRecord;

use crate::error::StorageError;

/// Trait for storage backends that receive canonical records.
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Append `records` to the named destination, returning how many rows
    /// were written. Not transactional across the slice.
    async fn append(&self, destination: &str, records: &[PriceRecord]) -> Result<u64, StorageError>;
}

// ── Supabase (PostgREST) ─────────────────────────────────────────────

/// Supabase REST sink: one `POST /rest/v1/{table}` per chunk of rows.
pub struct SupabaseSink {
    client: Client,
    base_url: String,
    api_key: String,
    batch_size: usize,
}

impl SupabaseSink {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.url.clone().unwrap_or_default(),
            api_key: config.key.clone().unwrap_or_default(),
            batch_size: config.batch_size.max(1),
        }
    }

    fn table_url(&self, destination: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, destination)
    }
}

#[async_trait]
impl StorageSink for SupabaseSink {
    async fn append(&self, destination: &str, records: &[PriceRecord]) -> Result<u64, StorageError> {
        let url = self.table_url(destination);
        let mut written = 0u64;

        for chunk in records.chunks(self.batch_size) {
            let response = self
                .client
                .post(&url)
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Prefer", "return=minimal")
                .json(chunk)
                .send()
                .await
                .map_err(|e| StorageError::Request {
                    destination: destination.to_string(),
                    cause: e.without_url().to_string(),
                })?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(StorageError::Rejected {
                    destination: destination.to_string(),
                    status,
                    body,
                });
            }

            written += chunk.len() as u64;
            debug!(destination, written, total = records.len(), "inserted chunk");
        }

        Ok(written)
    }
}

// ── In-memory ────────────────────────────────────────────────────────

/// Process-local append-only table store.
///
/// Behaves like a destination without a unique (symbol, date) constraint:
/// appending the same records twice stores them twice.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<HashMap<String, Vec<PriceRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row in `destination`, in append order.
    pub fn rows(&self, destination: &str) -> Vec<PriceRecord> {
        self.tables
            .lock()
            .map(|tables| tables.get(destination).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Number of rows in `destination` belonging to `symbol`.
    pub fn count_for(&self, destination: &str, symbol: &str) -> usize {
        self.rows(destination)
            .iter()
            .filter(|r| r.symbol() == symbol)
            .count()
    }
}

#[async_trait]
impl StorageSink for MemorySink {
    async fn append(&self, destination: &str, records: &[PriceRecord]) -> Result<u64, StorageError> {
        let mut tables = self.tables.lock().map_err(|e| StorageError::Request {
            destination: destination.to_string(),
            cause: format!("table lock poisoned: {e}"),
        })?;
        tables
            .entry(destination.to_string())
            .or_default()
            .extend_from_slice(records);
        Ok(records.len() as u64)
    }
}
