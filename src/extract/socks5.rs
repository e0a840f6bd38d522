//! Rich SOCKS5 listing extraction
//!
//! Lines look like:
//!
//! ```text
//! socks5://5.6.7.8:1080 [[机房] 韩国 首尔 [KT]]
//! ```
//!
//! The inner bracket holds the network type, the bare words the location
//! (country, region, city) and the trailing bracket the ISP. Lines that do not
//! carry the metadata block still yield a bare record via the URI matcher.

use super::Origin;
use super::plain::{self, IPV4_PATTERN, compile};
use crate::record::Record;
use crate::validation::{is_valid_ipv4, parse_port};
use regex::Regex;
use std::sync::LazyLock;

static RICH_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"(?i)socks[45]://({IPV4_PATTERN}):(\d{{1,5}})\s*\[\[([^\]]*)\]\s*([^\[]*?)\[([^\]]*)\]\]"
    ))
});

/// Location tokens split positionally
#[derive(Debug, Default, PartialEq, Eq)]
struct Location<'a> {
    country: &'a str,
    region: &'a str,
    city: &'a str,
}

/// Splits `"country [region] [city]"` into its parts
///
/// With exactly two tokens the second one names the city, not the region.
fn split_location(text: &str) -> Location<'_> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    match *tokens.as_slice() {
        [] => Location::default(),
        [country] => Location {
            country,
            ..Default::default()
        },
        [country, city] => Location {
            country,
            region: "",
            city,
        },
        [country, region, city, ..] => Location {
            country,
            region,
            city,
        },
    }
}

/// Parses one rich SOCKS5 line
pub fn extract_line(line: &str, origin: &Origin<'_>) -> Option<Record> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if let Some(caps) = RICH_LINE.captures(line) {
        let ip = &caps[1];
        // An invalid address in the rich form rejects the line outright
        if !is_valid_ipv4(ip) {
            return None;
        }
        let port = parse_port(&caps[2])?;
        let location = split_location(&caps[4]);

        let mut record = origin.record(ip.to_string(), Some(port));
        record.net_type = caps[3].trim().to_string();
        record.country = location.country.to_string();
        record.region = location.region.to_string();
        record.city = location.city.to_string();
        record.isp = caps[5].trim().to_string();
        return Some(record);
    }

    plain::scheme_uri(line).map(|ep| origin.record(ep.ip, ep.port))
}

/// Extracts every record of a rich SOCKS5 document
pub fn extract_text(text: &str, origin: &Origin<'_>) -> Vec<Record> {
    text.lines()
        .filter_map(|line| extract_line(line, origin))
        .collect()
}
