//! Aggregate outcome of one ingestion run.

use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use crate::job::{JobOutcome, JobResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every symbol succeeded (vacuously true for an empty run).
    AllSucceeded,
    /// At least one symbol failed, including the case where all did.
    PartialFailure,
    /// The run was refused before any job was dispatched.
    ConfigurationError,
}

/// Per-symbol results plus the overall classification. Built once per run.
///
/// `per_symbol` iterates in the order the symbols were requested, whatever
/// order the jobs finished in.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub run_id: Uuid,
    pub overall_status: OverallStatus,
    pub per_symbol: IndexMap<String, JobResult>,
    /// Why the run was refused. Only set for `ConfigurationError`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub configuration_problems: Vec<String>,
}

impl IngestionReport {
    pub fn configuration_error(run_id: Uuid, problems: Vec<String>) -> Self {
        Self {
            run_id,
            overall_status: OverallStatus::ConfigurationError,
            per_symbol: IndexMap::new(),
            configuration_problems: problems,
        }
    }

    /// Classify a completed run: all successes → `AllSucceeded`, anything
    /// else → `PartialFailure`.
    pub fn from_results(run_id: Uuid, per_symbol: IndexMap<String, JobResult>) -> Self {
        let overall_status = if per_symbol.values().all(JobResult::is_success) {
            OverallStatus::AllSucceeded
        } else {
            OverallStatus::PartialFailure
        };
        Self {
            run_id,
            overall_status,
            per_symbol,
            configuration_problems: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.overall_status == OverallStatus::AllSucceeded
    }

    /// Rows written per successful symbol.
    pub fn records_inserted(&self) -> IndexMap<String, u64> {
        self.per_symbol
            .iter()
            .filter_map(|(symbol, result)| result.records_written().map(|n| (symbol.clone(), n)))
            .collect()
    }

    pub fn total_records(&self) -> u64 {
        self.records_inserted().values().sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobResult> {
        self.per_symbol.values().filter(|r| !r.is_success())
    }

    /// Failed symbols whose failure kind suggests a later re-run may succeed.
    pub fn retryable_symbols(&self) -> Vec<&str> {
        self.failures()
            .filter(|r| matches!(&r.outcome, JobOutcome::Failure { kind, .. } if kind.is_retryable()))
            .map(|r| r.symbol.as_str())
            .collect()
    }
}
