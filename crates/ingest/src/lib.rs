//! Concurrent fetch → normalize → store pipeline for daily price series.
//!
//! - [`client`]: market data provider boundary ([`MarketDataClient`])
//! - [`normalize`]: provider payload → canonical [`PriceRecord`](pricevault_core::PriceRecord)s
//! - [`sink`]: destination table boundary ([`StorageSink`])
//! - [`job`]: one symbol's fetch/normalize/store unit of work
//! - [`coordinator`]: fans jobs out and aggregates an [`IngestionReport`]

pub mod client;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod normalize;
pub mod report;
pub mod sink;

pub use client::{AlphaVantageClient, MarketDataClient, RawPayload};
pub use coordinator::Coordinator;
pub use error::{FailureKind, FetchError, JobError, JobStage, NormalizeError, StorageError};
pub use job::{IngestionJob, JobOutcome, JobResult, JobState};
pub use normalize::normalize;
pub use report::{IngestionReport, OverallStatus};
pub use sink::{MemorySink, StorageSink, SupabaseSink};
