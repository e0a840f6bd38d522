//! End-to-end pipeline tests against a mock HTTP server and local files

use async_trait::async_trait;
use ip_harvest::fetch::{Fetcher, FileFetcher, HttpFetcher, RetryConfig};
use ip_harvest::{Dialer, Harvester, RunConfig, SourceKind, SourceSpec, Validity};
use std::io;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Reachable on port 443 only, with no real network traffic
struct Only443;

#[async_trait]
impl Dialer for Only443 {
    async fn dial(&self, addr: SocketAddrV4) -> io::Result<()> {
        if addr.port() == 443 {
            Ok(())
        } else {
            Err(io::ErrorKind::ConnectionRefused.into())
        }
    }
}

fn fast_retry(attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts: attempts,
        initial_backoff_ms: 10,
        ..RetryConfig::default()
    }
}

fn http(attempts: u32) -> Arc<dyn Fetcher> {
    Arc::new(HttpFetcher::with_config(Duration::from_secs(5), fast_retry(attempts)).unwrap())
}

#[tokio::test]
async fn test_failing_source_is_retried_then_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken.txt"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let text = http(3).fetch(&format!("{}/broken.txt", server.uri())).await;
    assert_eq!(text, "");
}

#[tokio::test]
async fn test_fetch_with_retry_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::with_config(Duration::from_secs(5), RetryConfig::no_retry()).unwrap();
    let err = fetcher
        .fetch_with_retry(&format!("{}/gone.txt", server.uri()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_retry_recovers_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky.txt"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4:443\n"))
        .mount(&server)
        .await;

    let text = http(3).fetch(&format!("{}/flaky.txt", server.uri())).await;
    assert_eq!(text, "1.2.3.4:443\n");
}

#[tokio::test]
async fn test_full_run_over_http_and_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plain.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("1.2.3.4:443\n5.6.7.8:1080\n# comment\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/socks.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("socks5://5.6.7.8:1080 [[机房] 韩国 首尔 [KT]]\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("local.html");
    std::fs::write(&local, "<table><tr><td>9.9.9.9</td></tr></table>").unwrap();

    let sources = vec![
        SourceSpec::url(
            format!("{}/plain.txt", server.uri()),
            SourceKind::plain("plain", "proxy"),
        ),
        SourceSpec::url(
            format!("{}/socks.txt", server.uri()),
            SourceKind::rich_socks5("socks", "socks5"),
        ),
        SourceSpec::url(
            format!("{}/down.txt", server.uri()),
            SourceKind::plain("down", "proxy"),
        ),
        SourceSpec::file(&local, SourceKind::markup("local", "cloudflare")),
    ];

    let harvester = Harvester::with_parts(
        RunConfig::default(),
        sources,
        http(1),
        Arc::new(FileFetcher),
        Only443,
    );
    let report = harvester.run().await;

    let counts: Vec<_> = report
        .source_counts
        .iter()
        .map(|(name, n)| (name.as_str(), *n))
        .collect();
    // The markup page yields the address from both the cell pass and the
    // flattened text pass
    assert_eq!(
        counts,
        vec![("plain", 2), ("socks", 1), ("down", 0), ("local", 2)]
    );
    assert_eq!(report.unique_total, 3);

    let addresses: Vec<_> = report.records.iter().map(|r| r.address()).collect();
    // Probing discovered a port for 9.9.9.9 but kept its position
    assert_eq!(addresses, vec!["1.2.3.4:443", "5.6.7.8:1080", "9.9.9.9:443"]);

    // The rich listing brought a country, so it replaced the plain entry
    assert_eq!(report.records[1].country, "韩国");
    assert_eq!(report.records[1].source, "socks");

    assert!(report.records[0].is_reachable());
    assert_eq!(report.records[1].valid, Validity::Unreachable);
    // Port-less record found on the first fallback port
    assert_eq!(report.records[2].port, Some(443));

    let summary = report.probe.unwrap();
    assert_eq!((summary.total, summary.reachable), (3, 2));
}

#[tokio::test]
async fn test_skip_validation_leaves_records_untested() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("list.txt");
    std::fs::write(&local, "1.1.1.1:443\n").unwrap();

    let config = RunConfig {
        skip_validation: true,
        ..RunConfig::default()
    };
    let harvester = Harvester::with_parts(
        config,
        vec![SourceSpec::file(&local, SourceKind::plain("local", "proxy"))],
        http(1),
        Arc::new(FileFetcher),
        Only443,
    );
    let report = harvester.run().await;

    assert!(!report.validated());
    assert!(report.records.iter().all(|r| r.valid == Validity::Unknown));
}
