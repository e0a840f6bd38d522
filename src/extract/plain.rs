//! Plain-text listing extraction
//!
//! Each non-comment line is run through an ordered chain of matchers
//! ([`PLAIN_MATCHERS`]). The first matcher that produces at least one valid
//! endpoint wins and the remaining matchers are not consulted for that line.

use super::Origin;
use crate::record::Record;
use crate::validation::{is_valid_ipv4, parse_port};
use regex::Regex;
use std::sync::LazyLock;

/// Dotted-quad pattern; octet range checks are repeated by the validator
pub(crate) const IPV4_PATTERN: &str = r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";

// Patterns are compile-time constants covered by the unit tests below
#[expect(clippy::expect_used)]
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("BUG: built-in listing pattern failed to compile")
}

/// `scheme://[user:pass@]ip:port`
pub(crate) static SCHEME_URI: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)(?:socks[45]|https?|ssr?|vmess|trojan)://(?:[^:@\s]+:[^:@\s]+@)?({IPV4_PATTERN}):(\d{{1,5}})"
    ))
});

/// `ip:port` or `ip#port` anywhere in a line
static LOOSE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\b({IPV4_PATTERN})[:#](\d{{1,5}})\b")));

/// A bare address without port
static BARE_ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"\b({IPV4_PATTERN})\b")));

/// An address (and optional port) found by a matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Dotted-quad address
    pub ip: String,
    /// Port, when the matched form carries one
    pub port: Option<u16>,
}

/// One step of the plain-line matcher chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMatcher {
    /// First `scheme://[user:pass@]ip:port` occurrence
    SchemeUri,
    /// Every `ip:port` / `ip#port` occurrence
    LoosePair,
    /// Every bare address occurrence
    BareAddress,
}

/// Matchers in the order they are attempted; first non-empty result wins
pub const PLAIN_MATCHERS: [LineMatcher; 3] = [
    LineMatcher::SchemeUri,
    LineMatcher::LoosePair,
    LineMatcher::BareAddress,
];

impl LineMatcher {
    /// Runs this matcher over a single line, returning validated endpoints
    pub fn apply(self, line: &str) -> Vec<Endpoint> {
        match self {
            LineMatcher::SchemeUri => scheme_uri(line).into_iter().collect(),
            LineMatcher::LoosePair => LOOSE_PAIR
                .captures_iter(line)
                .filter_map(|caps| endpoint(&caps[1], Some(&caps[2])))
                .collect(),
            LineMatcher::BareAddress => BARE_ADDRESS
                .captures_iter(line)
                .filter_map(|caps| endpoint(&caps[1], None))
                .collect(),
        }
    }
}

/// First scheme-qualified endpoint of a line, if it validates
pub(crate) fn scheme_uri(line: &str) -> Option<Endpoint> {
    let caps = SCHEME_URI.captures(line)?;
    endpoint(&caps[1], Some(&caps[2]))
}

/// Validates a matched address/port pair
///
/// A port group that is present but invalid rejects the whole match.
fn endpoint(ip: &str, port: Option<&str>) -> Option<Endpoint> {
    if !is_valid_ipv4(ip) {
        return None;
    }
    let port = match port {
        Some(raw) => Some(parse_port(raw)?),
        None => None,
    };
    Some(Endpoint {
        ip: ip.to_string(),
        port,
    })
}

/// Extracts the records of a single line
///
/// Empty lines and `#` comments produce nothing.
pub fn extract_line(line: &str, origin: &Origin<'_>) -> Vec<Record> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Vec::new();
    }

    for matcher in PLAIN_MATCHERS {
        let found = matcher.apply(line);
        if !found.is_empty() {
            return found
                .into_iter()
                .map(|ep| origin.record(ep.ip, ep.port))
                .collect();
        }
    }
    Vec::new()
}

/// Extracts every record of a plain-text document
pub fn extract_text(text: &str, origin: &Origin<'_>) -> Vec<Record> {
    text.lines()
        .flat_map(|line| extract_line(line, origin))
        .collect()
}
