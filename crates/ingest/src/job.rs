//! Per-symbol unit of work: fetch → normalize → store.
//!
//! A job walks `Pending → Fetching → Normalizing → Storing → Succeeded`,
//! or drops to `Failed` from whichever stage went wrong. It never retries
//! and never resumes; a retry is a fresh job.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use pricevault_core::SymbolSpec;

use crate::client::MarketDataClient;
use crate::error::{FailureKind, JobError, JobStage};
use crate::normalize::normalize;
use crate::sink::StorageSink;

/// Lifecycle of an [`IngestionJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Fetching,
    Normalizing,
    Storing,
    Succeeded,
    Failed(FailureKind),
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed(_))
    }

    /// Transitions are one-way: each working stage may only move to the
    /// next stage or to `Failed`.
    pub fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Pending, Fetching) => true,
            (Fetching, Normalizing) => true,
            (Normalizing, Storing) => true,
            (Storing, Succeeded) => true,
            (Fetching | Normalizing | Storing, Failed(_)) => true,
            _ => false,
        }
    }
}

/// Terminal result of one job, consumed once by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub symbol: String,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Success {
        records_written: u64,
    },
    Failure {
        kind: FailureKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<JobStage>,
        message: String,
    },
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Success { .. })
    }

    pub fn records_written(&self) -> Option<u64> {
        match self.outcome {
            JobOutcome::Success { records_written } => Some(records_written),
            JobOutcome::Failure { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.outcome {
            JobOutcome::Failure { kind, .. } => Some(kind),
            JobOutcome::Success { .. } => None,
        }
    }

    /// Result for a job whose task died without reporting.
    pub fn internal_failure(symbol: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            outcome: JobOutcome::Failure {
                kind: FailureKind::InternalError,
                stage: None,
                message: message.into(),
            },
        }
    }
}

/// One symbol's fetch/normalize/store run.
pub struct IngestionJob {
    spec: SymbolSpec,
    client: Arc<dyn MarketDataClient>,
    sink: Arc<dyn StorageSink>,
    state: JobState,
}

impl IngestionJob {
    pub fn new(
        spec: SymbolSpec,
        client: Arc<dyn MarketDataClient>,
        sink: Arc<dyn StorageSink>,
    ) -> Self {
        Self {
            spec,
            client,
            sink,
            state: JobState::Pending,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run to a terminal state. Stage errors are converted into a failure
    /// result here and never escape.
    pub async fn run(mut self) -> JobResult {
        let start = Instant::now();
        let outcome = match self.execute().await {
            Ok(records_written) => {
                self.transition(JobState::Succeeded);
                info!(
                    records = records_written,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "ingestion job succeeded"
                );
                JobOutcome::Success { records_written }
            }
            Err(e) => {
                let kind = e.kind();
                let stage = e.stage();
                self.transition(JobState::Failed(kind));
                warn!(
                    ?kind,
                    ?stage,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "ingestion job failed"
                );
                JobOutcome::Failure {
                    kind,
                    stage: Some(stage),
                    message: e.to_string(),
                }
            }
        };

        JobResult {
            symbol: self.spec.symbol,
            outcome,
        }
    }

    async fn execute(&mut self) -> Result<u64, JobError> {
        self.transition(JobState::Fetching);
        let payload = self.client.fetch(&self.spec.symbol).await?;

        self.transition(JobState::Normalizing);
        let records = normalize(&self.spec.symbol, &payload)?;
        drop(payload);

        self.transition(JobState::Storing);
        let written = self.sink.append(&self.spec.destination, &records).await?;
        Ok(written)
    }

    fn transition(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal job transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "job transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use pricevault_core::PriceRecord;

    use crate::client::RawPayload;
    use crate::error::{FetchError, StorageError};
    use crate::sink::MemorySink;

    struct StaticClient {
        response: fn() -> Result<RawPayload, FetchError>,
    }

    #[async_trait]
    impl MarketDataClient for StaticClient {
        async fn fetch(&self, _symbol: &str) -> Result<RawPayload, FetchError> {
            (self.response)()
        }
    }

    struct CountingSink {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl StorageSink for CountingSink {
        async fn append(&self, destination: &str, records: &[PriceRecord]) -> Result<u64, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StorageError::Request {
                    destination: destination.to_string(),
                    cause: "connection refused".into(),
                });
            }
            Ok(records.len() as u64)
        }
    }

    fn two_days() -> Result<RawPayload, FetchError> {
        Ok(RawPayload::from_value(json!({
            "Time Series (Daily)": {
                "2024-03-15": {"1. open": "191.99", "2. high": "193.06", "3. low": "190.70", "4. close": "191.07", "5. volume": "8828184"},
                "2024-03-14": {"1. open": "196.95", "2. high": "197.75", "3. low": "192.12", "4. close": "193.43", "5. volume": "4102285"}
            }
        }))
        .unwrap())
    }

    fn spec() -> SymbolSpec {
        SymbolSpec::new("IBM", "NYSE", "nyse_historical_prices")
    }

    #[test]
    fn transitions_are_one_way() {
        use JobState::*;
        assert!(Pending.can_advance_to(Fetching));
        assert!(Storing.can_advance_to(Succeeded));
        assert!(Normalizing.can_advance_to(Failed(FailureKind::MalformedRecordError)));
        assert!(!Fetching.can_advance_to(Pending));
        assert!(!Storing.can_advance_to(Normalizing));
        assert!(!Pending.can_advance_to(Storing));
        assert!(!Succeeded.can_advance_to(Failed(FailureKind::StorageError)));
        assert!(!Failed(FailureKind::NetworkError).can_advance_to(Fetching));
        assert!(Succeeded.is_terminal() && !Storing.is_terminal());
    }

    #[test]
    fn new_job_is_pending() {
        let job = IngestionJob::new(
            spec(),
            Arc::new(StaticClient { response: two_days }),
            Arc::new(MemorySink::new()),
        );
        assert_eq!(job.state(), JobState::Pending);
    }

    #[tokio::test]
    async fn successful_job_reports_rows_written() {
        let sink = Arc::new(MemorySink::new());
        let job = IngestionJob::new(spec(), Arc::new(StaticClient { response: two_days }), sink.clone());

        let result = job.run().await;
        assert_eq!(result.symbol, "IBM");
        assert_eq!(result.records_written(), Some(2));
        assert_eq!(sink.count_for("nyse_historical_prices", "IBM"), 2);
    }

    #[tokio::test]
    async fn fetch_failure_never_reaches_storage() {
        let sink = Arc::new(CountingSink { calls: AtomicUsize::new(0), fail: false });
        let client = StaticClient {
            response: || Err(FetchError::Network("connection timed out".into())),
        };

        let result = IngestionJob::new(spec(), Arc::new(client), sink.clone()).run().await;
        assert_eq!(result.failure_kind(), Some(FailureKind::NetworkError));
        match &result.outcome {
            JobOutcome::Failure { stage, message, .. } => {
                assert_eq!(*stage, Some(JobStage::Fetching));
                assert!(message.contains("timed out"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn storage_failure_fails_whole_symbol() {
        let sink = Arc::new(CountingSink { calls: AtomicUsize::new(0), fail: true });
        let result = IngestionJob::new(spec(), Arc::new(StaticClient { response: two_days }), sink.clone())
            .run()
            .await;

        assert!(!result.is_success());
        assert_eq!(result.failure_kind(), Some(FailureKind::StorageError));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let ok = JobResult {
            symbol: "AAPL".into(),
            outcome: JobOutcome::Success { records_written: 5 },
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["outcome"]["status"], "success");
        assert_eq!(json["outcome"]["records_written"], 5);

        let failed = JobResult::internal_failure("MSFT", "task panicked");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"]["status"], "failure");
        assert_eq!(json["outcome"]["kind"], "internal_error");
        assert!(json["outcome"].get("stage").is_none());
    }
}
