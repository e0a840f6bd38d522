use clap::Parser;
use ip_harvest::config::{parse_concurrency, parse_interval, parse_seconds};
use ip_harvest::{Harvester, ReportWriter, RunConfig, SourceSpec, default_sources};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Harvest, merge and probe IPv4 proxy/CDN address listings
///
/// Defaults come from `SKIP_VALIDATION`, `VALIDATION_TIMEOUT`,
/// `VALIDATION_CONCURRENCY`, `VALIDATION_PROGRESS_INTERVAL` and `OUTPUT_DIR`;
/// flags given on the command line take precedence.
#[derive(Parser, Debug)]
#[command(name = "ip-harvest", version, about)]
struct Args {
    /// Skip the reachability probe
    #[arg(long)]
    skip_validation: bool,

    /// Connect timeout per probe, in seconds [default: 3]
    #[arg(long, value_parser = timeout_arg)]
    timeout: Option<Duration>,

    /// Maximum number of probes in flight [default: 100]
    #[arg(long, value_parser = concurrency_arg)]
    concurrency: Option<usize>,

    /// Log probe progress every N completions, 0 disables [default: 100]
    #[arg(long, value_name = "N", value_parser = interval_arg)]
    progress_interval: Option<usize>,

    /// Report directory [default: output]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Add a local listing as NAME=KIND:PATH (KIND: plain, markup, socks5)
    #[arg(long = "source-file", value_name = "NAME=KIND:PATH", value_parser = source_arg)]
    source_files: Vec<SourceSpec>,

    /// Only use --source-file listings
    #[arg(long)]
    no_default_sources: bool,
}

fn timeout_arg(value: &str) -> Result<Duration, String> {
    parse_seconds("--timeout", value).map_err(|e| e.to_string())
}

fn concurrency_arg(value: &str) -> Result<usize, String> {
    parse_concurrency("--concurrency", value).map_err(|e| e.to_string())
}

fn interval_arg(value: &str) -> Result<usize, String> {
    parse_interval("--progress-interval", value).map_err(|e| e.to_string())
}

fn source_arg(value: &str) -> Result<SourceSpec, String> {
    SourceSpec::parse_file_arg(value).map_err(|e| e.to_string())
}

impl Args {
    /// Layer the command line over a base configuration
    fn apply(&self, mut config: RunConfig) -> RunConfig {
        config.skip_validation |= self.skip_validation;
        if let Some(timeout) = self.timeout {
            config.probe.timeout = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.probe.max_concurrency = concurrency;
        }
        if let Some(interval) = self.progress_interval {
            config.probe.progress_interval = interval;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config
    }

    fn sources(&self) -> Vec<SourceSpec> {
        let mut sources = if self.no_default_sources {
            Vec::new()
        } else {
            default_sources()
        };
        sources.extend(self.source_files.iter().cloned());
        sources
    }
}

async fn run(args: Args) -> ip_harvest::Result<()> {
    let config = args.apply(RunConfig::from_env()?);
    let sources = args.sources();
    info!("Harvesting {} sources", sources.len());

    let harvester = Harvester::new(config.clone(), sources)?;
    let report = harvester.run().await;

    let stats = report.statistics();
    info!(
        "{} unique records ({} raw), {} reachable, {} unreachable, {} untested",
        report.unique_total, report.raw_total, stats.reachable, stats.unreachable, stats.untested
    );

    ReportWriter::create(&config.output_dir)?.write_all(&report.records, &report.context())?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
