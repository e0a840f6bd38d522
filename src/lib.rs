#![doc = include_str!("../README.md")]

/// Run configuration from the environment
pub mod config;
mod error;
/// Record extraction from plain, markup and rich SOCKS5 listings
pub mod extract;
/// Listing retrieval over HTTP and from local files
pub mod fetch;
/// Bounded admission for concurrent probes
pub mod gate;
/// Deduplication and address ordering
pub mod merge;
/// End-to-end harvest run
pub mod pipeline;
/// TCP reachability probing
pub mod probe;
mod record;
/// Report sinks
pub mod report;
/// Listing sources and the built-in catalogue
pub mod sources;
/// Aggregate statistics
pub mod stats;
/// IPv4 address and port validation
pub mod validation;

pub use config::{ProbeConfig, RunConfig};
pub use error::{HarvestError, Result};
pub use extract::{SourceKind, extract};
pub use fetch::{FileFetcher, Fetcher, HttpFetcher, RetryConfig};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use merge::{dedupe_and_sort, merge_records, sort_records};
pub use pipeline::{Harvester, RunReport};
pub use probe::{Dialer, FALLBACK_PORTS, ProbeError, ProbeOutcome, ProbeSummary, Prober, TcpDialer};
pub use record::{NetTypeTag, Record, Validity};
pub use report::{ReportContext, ReportWriter};
pub use sources::{SourceLocation, SourceSpec, default_sources};
pub use stats::{LatencySummary, Statistics};
pub use validation::{is_valid_ipv4, is_valid_port};
