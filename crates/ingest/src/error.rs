//! Ingestion error taxonomy.
//!
//! Each pipeline stage has its own error type. [`JobError`] tags them with
//! the stage they came from; the job converts it into a [`FailureKind`] and
//! message so nothing propagates past the job boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fetch-stage failures from the market data provider.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx status or a response that is not the expected JSON envelope.
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider reported throttling. Worth retrying later.
    #[error("rate limited by provider: {0}")]
    RateLimited(String),
}

/// Normalize-stage failures. Any one of these aborts the whole symbol.
#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("malformed record for {date}: {reason}")]
    MalformedRecord { date: String, reason: String },

    #[error("malformed time series: {0}")]
    MalformedSeries(String),
}

/// Store-stage failures, always naming the destination table.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request to '{destination}' failed: {cause}")]
    Request { destination: String, cause: String },

    #[error("storage rejected insert into '{destination}' (HTTP {status}): {body}")]
    Rejected {
        destination: String,
        status: u16,
        body: String,
    },
}

/// Stage of the per-symbol pipeline a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Fetching,
    Normalizing,
    Storing,
}

/// Classification of a failed job, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NetworkError,
    ProviderError,
    RateLimitError,
    MalformedRecordError,
    StorageError,
    /// The job's task panicked before producing a result.
    InternalError,
}

impl FailureKind {
    /// Whether re-running the job later may reasonably succeed without
    /// any change on our side.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::RateLimitError)
    }
}

/// A stage error tagged with the stage that produced it.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StorageError),
}

impl JobError {
    pub fn stage(&self) -> JobStage {
        match self {
            JobError::Fetch(_) => JobStage::Fetching,
            JobError::Normalize(_) => JobStage::Normalizing,
            JobError::Store(_) => JobStage::Storing,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::Fetch(FetchError::Network(_)) => FailureKind::NetworkError,
            JobError::Fetch(FetchError::Provider(_)) => FailureKind::ProviderError,
            JobError::Fetch(FetchError::RateLimited(_)) => FailureKind::RateLimitError,
            JobError::Normalize(_) => FailureKind::MalformedRecordError,
            JobError::Store(_) => FailureKind::StorageError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_error_maps_stage_and_kind() {
        let cases = [
            (
                JobError::from(FetchError::Network("timeout".into())),
                JobStage::Fetching,
                FailureKind::NetworkError,
            ),
            (
                JobError::from(FetchError::RateLimited("5 calls/min".into())),
                JobStage::Fetching,
                FailureKind::RateLimitError,
            ),
            (
                JobError::from(NormalizeError::MalformedSeries("not an object".into())),
                JobStage::Normalizing,
                FailureKind::MalformedRecordError,
            ),
            (
                JobError::from(StorageError::Request {
                    destination: "nyse_historical_prices".into(),
                    cause: "connection reset".into(),
                }),
                JobStage::Storing,
                FailureKind::StorageError,
            ),
        ];
        for (err, stage, kind) in cases {
            assert_eq!(err.stage(), stage, "{err}");
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn failure_kind_serializes_with_error_suffix() {
        let json = serde_json::to_string(&FailureKind::MalformedRecordError).unwrap();
        assert_eq!(json, r#""malformed_record_error""#);
        let json = serde_json::to_string(&FailureKind::RateLimitError).unwrap();
        assert_eq!(json, r#""rate_limit_error""#);
    }

    #[test]
    fn only_rate_limits_are_retryable() {
        assert!(FailureKind::RateLimitError.is_retryable());
        assert!(!FailureKind::NetworkError.is_retryable());
        assert!(!FailureKind::StorageError.is_retryable());
    }

    #[test]
    fn storage_error_names_destination() {
        let err = StorageError::Rejected {
            destination: "lse_historical_prices".into(),
            status: 409,
            body: "duplicate key".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lse_historical_prices"));
        assert!(msg.contains("409"));
    }
}
