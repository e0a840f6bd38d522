//! Integration tests for ip-harvest
//!
//! These tests verify the public API works correctly.
//! They do not touch the network.

use ip_harvest::{
    AdmissionGate, HarvestError, NetTypeTag, ProbeConfig, ProbeError, Record, RetryConfig,
    RunConfig, SourceKind, SourceLocation, SourceSpec, Statistics, Validity, default_sources,
    dedupe_and_sort, extract,
};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_run_config_defaults() {
    let config = RunConfig::default();
    assert!(!config.skip_validation);
    assert_eq!(config.probe.timeout, Duration::from_secs(3));
    assert_eq!(config.probe.max_concurrency, 100);
    assert_eq!(config.output_dir, PathBuf::from("output"));
}

#[test]
fn test_run_config_from_lookup() {
    let config = RunConfig::from_lookup(|key| match key {
        "VALIDATION_TIMEOUT" => Some("0.5".to_string()),
        "OUTPUT_DIR" => Some("  out  ".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.probe.timeout, Duration::from_millis(500));
    assert_eq!(config.output_dir, PathBuf::from("out"));
}

#[test]
fn test_probe_config_new() {
    let config = ProbeConfig::new(Duration::from_secs(1), 7);
    assert_eq!(config.max_concurrency, 7);
    assert_eq!(config.progress_interval, 100); // Should keep the default
}

#[test]
fn test_retry_config_default() {
    let config = RetryConfig::default();
    assert_eq!(config.max_attempts, 3);
    assert_eq!(config.initial_backoff_ms, 1000);
    assert_eq!(config.max_backoff_ms, 10_000);
    assert_eq!(config.backoff_multiplier, 1.0);
    assert!(!config.jitter);
}

#[test]
fn test_retry_config_no_retry() {
    let config = RetryConfig::no_retry();
    assert_eq!(config.max_attempts, 1);
}

#[test]
fn test_retry_config_with_max_attempts() {
    let config = RetryConfig::with_max_attempts(5);
    assert_eq!(config.max_attempts, 5);
    assert_eq!(config.initial_backoff_ms, 1000); // Should keep other defaults
}

#[test]
fn test_error_display() {
    let err = HarvestError::Config("VALIDATION_TIMEOUT: expected seconds".to_string());
    assert_eq!(
        err.to_string(),
        "Invalid configuration: VALIDATION_TIMEOUT: expected seconds"
    );

    let err = HarvestError::Http("status 500".to_string());
    assert_eq!(err.to_string(), "HTTP error: status 500");

    let err = HarvestError::GateClosed;
    assert_eq!(err.to_string(), "Admission gate closed");

    let err = HarvestError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
    assert_eq!(err.to_string(), "IO error: gone");
}

#[test]
fn test_probe_error_display() {
    assert_eq!(ProbeError::Timeout.to_string(), "timeout");
    assert_eq!(ProbeError::Refused.to_string(), "connection refused");
    assert_eq!(ProbeError::TaskFailed.to_string(), "probe task failed");
    assert_eq!(ProbeError::Other("broken pipe".into()).to_string(), "broken pipe");
}

#[test]
fn test_record_views() {
    let mut record = Record::new("5.6.7.8", Some(1080), "socks5-proxy", "socks5");
    assert_eq!(record.address(), "5.6.7.8:1080");
    assert_eq!(record.location(), "Unknown");
    assert_eq!(record.valid, Validity::Unknown);

    record.country = "韩国".into();
    record.region = "京畿道".into();
    assert_eq!(record.location(), "韩国 京畿道");

    record.net_type = "IDC".into();
    assert_eq!(record.net_type_tag(), NetTypeTag::Datacenter);
}

#[test]
fn test_default_sources() {
    let sources = default_sources();
    assert_eq!(sources.len(), 5);
    let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "ipTop10.html",
            "edgetunnel-output",
            "bestproxy",
            "bestcf",
            "socks5-proxy"
        ]
    );
}

#[test]
fn test_source_file_argument() {
    let spec = SourceSpec::parse_file_arg("mine=markup:./top.html").unwrap();
    assert_eq!(spec.location, SourceLocation::File("./top.html".into()));
    assert!(matches!(spec.kind, SourceKind::Markup { .. }));
    assert!(matches!(
        SourceSpec::parse_file_arg("broken"),
        Err(HarvestError::Config(_))
    ));
}

#[test]
fn test_gate_capacity() {
    let gate = AdmissionGate::new(10);
    assert_eq!(gate.capacity(), 10);
    assert_eq!(gate.available(), 10);
}

#[test]
fn test_extract_merge_statistics() {
    let kind = SourceKind::rich_socks5("socks", "socks5");
    let text = "\
socks5://5.6.7.8:1080 [[机房] 韩国 首尔 [KT]]
socks5://1.2.3.4:1080 [[家宽] 美国 纽约 [Comcast]]
socks5://5.6.7.8:1080
";
    let records = dedupe_and_sort(extract(text, &kind));
    let stats = Statistics::compute(&records);

    assert_eq!(stats.total, 2);
    assert_eq!(stats.untested, 2);
    assert_eq!(stats.by_net_type.get("datacenter"), 1);
    assert_eq!(stats.by_net_type.get("residential"), 1);
    assert_eq!(stats.by_source.get("socks"), 2);
}
