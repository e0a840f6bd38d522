//! End-to-end harvest run
//!
//! fetch → extract → merge → probe, with every phase's counts carried in the
//! returned [`RunReport`].

use crate::config::RunConfig;
use crate::error::Result;
use crate::extract::extract;
use crate::fetch::{FileFetcher, Fetcher, HttpFetcher};
use crate::merge::dedupe_and_sort;
use crate::probe::{Dialer, ProbeSummary, Prober, TcpDialer};
use crate::record::Record;
use crate::report::ReportContext;
use crate::sources::{SourceLocation, SourceSpec};
use crate::stats::Statistics;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Outcome of one harvest run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Records extracted per source, in configuration order
    pub source_counts: Vec<(String, usize)>,
    /// Records extracted across all sources, before merging
    pub raw_total: usize,
    /// Records after merging
    pub unique_total: usize,
    /// Probe totals, `None` when validation was skipped
    pub probe: Option<ProbeSummary>,
    /// Finalized records in address order
    pub records: Vec<Record>,
}

impl RunReport {
    /// Whether the records went through the prober
    pub fn validated(&self) -> bool {
        self.probe.is_some()
    }

    /// Aggregate statistics over the finalized records
    pub fn statistics(&self) -> Statistics {
        Statistics::compute(&self.records)
    }

    /// Provenance handed to the report sinks
    pub fn context(&self) -> ReportContext {
        ReportContext {
            source_counts: self.source_counts.clone(),
            validated: self.validated(),
        }
    }
}

/// Runs the harvest over a set of sources
///
/// # Example
///
/// ```no_run
/// use ip_harvest::{Harvester, RunConfig, default_sources};
///
/// # async fn example() -> ip_harvest::Result<()> {
/// let harvester = Harvester::new(RunConfig::default(), default_sources())?;
/// let report = harvester.run().await;
/// println!("{} unique of {} raw", report.unique_total, report.raw_total);
/// # Ok(())
/// # }
/// ```
pub struct Harvester<D = TcpDialer> {
    sources: Vec<SourceSpec>,
    http: Arc<dyn Fetcher>,
    files: Arc<dyn Fetcher>,
    prober: Prober<D>,
    skip_validation: bool,
}

impl Harvester<TcpDialer> {
    /// Create a harvester with the HTTP and file fetchers and a TCP prober
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Http`](crate::HarvestError::Http) if the HTTP
    /// client cannot be built.
    pub fn new(config: RunConfig, sources: Vec<SourceSpec>) -> Result<Self> {
        Ok(Self::with_parts(
            config,
            sources,
            Arc::new(HttpFetcher::new()?),
            Arc::new(FileFetcher),
            TcpDialer,
        ))
    }
}

impl<D: Dialer> Harvester<D> {
    /// Create a harvester from explicit collaborators
    pub fn with_parts(
        config: RunConfig,
        sources: Vec<SourceSpec>,
        http: Arc<dyn Fetcher>,
        files: Arc<dyn Fetcher>,
        dialer: D,
    ) -> Self {
        Self {
            sources,
            http,
            files,
            prober: Prober::with_dialer(config.probe, dialer),
            skip_validation: config.skip_validation,
        }
    }

    /// Configured sources
    pub fn sources(&self) -> &[SourceSpec] {
        &self.sources
    }

    /// Fetches and extracts every source concurrently
    ///
    /// Returns the per-source counts in configuration order together with the
    /// concatenated records, also in configuration order.
    pub async fn collect(&self) -> (Vec<(String, usize)>, Vec<Record>) {
        let mut tasks = JoinSet::new();
        for (index, spec) in self.sources.iter().cloned().enumerate() {
            let fetcher = match spec.location {
                SourceLocation::Url(_) => Arc::clone(&self.http),
                SourceLocation::File(_) => Arc::clone(&self.files),
            };
            tasks.spawn(async move {
                info!("Fetching {}", spec);
                let text = fetcher.fetch(&spec.location.to_string()).await;
                let records = extract(&text, &spec.kind);
                info!("{}: {} records", spec.name, records.len());
                (index, records)
            });
        }

        let mut per_source: Vec<Vec<Record>> = vec![Vec::new(); self.sources.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, records)) => per_source[index] = records,
                Err(e) => warn!("Source task failed: {}", e),
            }
        }

        let counts = self
            .sources
            .iter()
            .zip(&per_source)
            .map(|(spec, records)| (spec.name.clone(), records.len()))
            .collect();
        (counts, per_source.into_iter().flatten().collect())
    }

    /// Merges, orders and (unless skipped) probes already extracted records
    pub async fn finish(&self, source_counts: Vec<(String, usize)>, raw: Vec<Record>) -> RunReport {
        let raw_total = raw.len();
        let mut records = dedupe_and_sort(raw);
        let unique_total = records.len();
        info!("Merged {} raw records into {} unique", raw_total, unique_total);

        let probe = if self.skip_validation {
            info!("Validation skipped");
            None
        } else {
            Some(self.prober.probe_all(&mut records).await)
        };

        RunReport {
            source_counts,
            raw_total,
            unique_total,
            probe,
            records,
        }
    }

    /// Runs all phases
    pub async fn run(&self) -> RunReport {
        let (counts, raw) = self.collect().await;
        self.finish(counts, raw).await
    }
}
