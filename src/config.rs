//! Run configuration
//!
//! Settings come from the environment (the variable names below), the
//! command line, or are built directly.
//!
//! | Variable                       | Field               | Default  |
//! |--------------------------------|---------------------|----------|
//! | `SKIP_VALIDATION`              | `skip_validation`   | `false`  |
//! | `VALIDATION_TIMEOUT`           | `probe_timeout`     | `3` (s)  |
//! | `VALIDATION_CONCURRENCY`       | `max_concurrency`   | `100`    |
//! | `VALIDATION_PROGRESS_INTERVAL` | `progress_interval` | `100`    |
//! | `OUTPUT_DIR`                   | `output_dir`        | `output` |

use crate::error::{HarvestError, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default per-attempt connect timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default maximum number of probes dialing at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

/// Default number of completions between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Prober settings
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    /// Timeout for a single connect attempt
    ///
    /// Port-less records spread this budget over their fallback ports.
    pub timeout: Duration,

    /// Maximum number of probes attempting a connection at the same time
    pub max_concurrency: usize,

    /// Log progress every this many completed probes (0 disables)
    pub progress_interval: usize,
}

impl ProbeConfig {
    /// Create a prober configuration
    pub fn new(timeout: Duration, max_concurrency: usize) -> Self {
        Self {
            timeout,
            max_concurrency,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT, DEFAULT_MAX_CONCURRENCY)
    }
}

/// Settings for a complete harvest run
///
/// # Example
///
/// ```
/// use ip_harvest::RunConfig;
/// use std::time::Duration;
///
/// let config = RunConfig {
///     skip_validation: true,
///     ..RunConfig::default()
/// };
/// assert_eq!(config.probe.timeout, Duration::from_secs(3));
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Skip the reachability probe entirely
    pub skip_validation: bool,

    /// Prober settings
    pub probe: ProbeConfig,

    /// Directory receiving the reports
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            skip_validation: false,
            probe: ProbeConfig::default(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl RunConfig {
    /// Build a configuration from the process environment
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Config`] if a variable is set to a value that
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("SKIP_VALIDATION") {
            config.skip_validation = parse_flag("SKIP_VALIDATION", &value)?;
        }
        if let Some(value) = lookup("VALIDATION_TIMEOUT") {
            config.probe.timeout = parse_seconds("VALIDATION_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("VALIDATION_CONCURRENCY") {
            config.probe.max_concurrency = parse_concurrency("VALIDATION_CONCURRENCY", &value)?;
        }
        if let Some(value) = lookup("VALIDATION_PROGRESS_INTERVAL") {
            config.probe.progress_interval =
                parse_interval("VALIDATION_PROGRESS_INTERVAL", &value)?;
        }
        if let Some(value) = lookup("OUTPUT_DIR") {
            if !value.trim().is_empty() {
                config.output_dir = PathBuf::from(value.trim());
            }
        }

        Ok(config)
    }
}

/// Parses a boolean flag; accepts `true/false`, `1/0`, `yes/no`
pub fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(HarvestError::Config(format!(
            "{key}: expected a boolean, got {other:?}"
        ))),
    }
}

/// Parses a positive, finite number of seconds
pub fn parse_seconds(key: &str, value: &str) -> Result<Duration> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| HarvestError::Config(format!("{key}: expected seconds, got {value:?}")))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(HarvestError::Config(format!(
            "{key}: timeout must be positive, got {seconds}"
        )));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| HarvestError::Config(format!("{key}: {e}, got {value:?}")))
}

/// Parses a concurrency limit (1 to [`Semaphore::MAX_PERMITS`])
pub fn parse_concurrency(key: &str, value: &str) -> Result<usize> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 && n <= Semaphore::MAX_PERMITS => Ok(n),
        Ok(n) if n > 0 => Err(HarvestError::Config(format!(
            "{key}: at most {} probes may run at once, got {n}",
            Semaphore::MAX_PERMITS
        ))),
        _ => Err(HarvestError::Config(format!(
            "{key}: expected a positive integer, got {value:?}"
        ))),
    }
}

/// Parses a progress interval; `0` disables progress logging
pub fn parse_interval(key: &str, value: &str) -> Result<usize> {
    value.trim().parse::<usize>().map_err(|_| {
        HarvestError::Config(format!(
            "{key}: expected a non-negative integer, got {value:?}"
        ))
    })
}
