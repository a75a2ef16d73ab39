//! Ingestion coordinator: fans out one job per symbol and aggregates.
//!
//! [`Coordinator::run`] checks configuration first and refuses to dispatch
//! anything if it is incomplete or the symbol list repeats a symbol. Both
//! cases share
//! [`ConfigurationError`](crate::report::OverallStatus::ConfigurationError),
//! which the HTTP layer answers with the same generic "environment" message.
//! The exact problem (`missing setting X` or `duplicate symbol Y`) is only
//! visible in `configuration_problems` and the logs. Otherwise every job runs
//! to a terminal state (no fail-fast) before the report is built.
//!
//! Jobs run as tokio tasks in a [`JoinSet`]. Each task returns its own
//! [`JobResult`]; the coordinator is the only writer of the result map, so
//! jobs share no mutable state. Dropping the `run` future aborts in-flight
//! jobs without rolling back rows they already stored.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use pricevault_core::config::IngestMode;
use pricevault_core::{Config, SymbolSpec};

use crate::client::{AlphaVantageClient, MarketDataClient};
use crate::job::{IngestionJob, JobResult};
use crate::report::IngestionReport;
use crate::sink::{StorageSink, SupabaseSink};

pub struct Coordinator {
    config: Config,
    client: Arc<dyn MarketDataClient>,
    sink: Arc<dyn StorageSink>,
}

impl Coordinator {
    pub fn new(
        config: Config,
        client: Arc<dyn MarketDataClient>,
        sink: Arc<dyn StorageSink>,
    ) -> Self {
        Self {
            config,
            client,
            sink,
        }
    }

    /// Production wiring: Alpha Vantage in, Supabase out.
    ///
    /// Always succeeds; incomplete credentials are reported by [`run`](Self::run)
    /// before any request is made.
    pub fn from_config(config: Config) -> Self {
        let client = Arc::new(AlphaVantageClient::new(&config.provider));
        let sink = Arc::new(SupabaseSink::new(&config.storage));
        Self::new(config, client, sink)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ingest every symbol and report per-symbol outcomes.
    pub async fn run(&self, specs: &[SymbolSpec]) -> IngestionReport {
        let run_id = Uuid::new_v4();
        self.run_inner(run_id, specs)
            .instrument(info_span!("ingest_run", %run_id))
            .await
    }

    async fn run_inner(&self, run_id: Uuid, specs: &[SymbolSpec]) -> IngestionReport {
        let problems = preflight(&self.config, specs);
        if !problems.is_empty() {
            error!(problems = ?problems, "ingestion refused: configuration incomplete");
            return IngestionReport::configuration_error(run_id, problems);
        }

        let mode = self.config.ingest.mode;
        info!(symbols = specs.len(), %mode, "ingestion run started");
        let start = Instant::now();

        let max_in_flight = match mode {
            IngestMode::Concurrent => specs.len(),
            IngestMode::Sequential => 1,
        };
        let mut results = self.dispatch(specs, max_in_flight).await;

        let per_symbol: IndexMap<String, JobResult> = specs
            .iter()
            .filter_map(|spec| results.remove_entry(&spec.symbol))
            .collect();
        let report = IngestionReport::from_results(run_id, per_symbol);

        info!(
            status = ?report.overall_status,
            records = report.total_records(),
            failed = report.failures().count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "ingestion run finished"
        );
        report
    }

    /// Run jobs with at most `max_in_flight` tasks alive, until all are terminal.
    async fn dispatch(&self, specs: &[SymbolSpec], max_in_flight: usize) -> HashMap<String, JobResult> {
        let mut pending = specs.iter();
        let mut tasks = JoinSet::new();
        let mut owners = HashMap::with_capacity(specs.len());
        let mut results = HashMap::with_capacity(specs.len());

        loop {
            while tasks.len() < max_in_flight {
                let Some(spec) = pending.next() else { break };
                let handle = tasks.spawn(self.job_for(spec));
                owners.insert(handle.id(), spec.symbol.clone());
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            let result = match joined {
                Ok((_, result)) => result,
                Err(e) => {
                    let symbol = owners.get(&e.id()).cloned().unwrap_or_default();
                    error!(symbol = %symbol, error = %e, "ingestion job task died");
                    JobResult::internal_failure(symbol, format!("job task failed: {e}"))
                }
            };
            results.insert(result.symbol.clone(), result);
        }

        results
    }

    fn job_for(&self, spec: &SymbolSpec) -> impl Future<Output = JobResult> + Send + 'static {
        let span = info_span!(
            "ingest_job",
            symbol = %spec.symbol,
            market = %spec.market,
            destination = %spec.destination
        );
        IngestionJob::new(spec.clone(), self.client.clone(), self.sink.clone())
            .run()
            .instrument(span)
    }
}

/// Everything that must hold before any job may be dispatched.
///
/// Duplicate symbols are reported here rather than per job because the
/// report is keyed by symbol. They are not an environment problem, so callers
/// rendering a refusal should log `configuration_problems` to tell the two
/// apart.
fn preflight(config: &Config, specs: &[SymbolSpec]) -> Vec<String> {
    let mut problems: Vec<String> = config
        .missing_required()
        .into_iter()
        .map(|name| format!("missing setting {name}"))
        .collect();

    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.symbol.as_str()) {
            problems.push(format!("duplicate symbol {}", spec.symbol));
        }
    }
    problems
}
