//! Canonical address record

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// Outcome of the liveness probe for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    /// Not probed (validation skipped or not yet run)
    #[default]
    Unknown,
    /// A TCP connection was established
    Reachable,
    /// Every connect attempt failed
    Unreachable,
}

impl Validity {
    /// Tri-state as an optional boolean (`None` for unknown)
    pub fn as_option(self) -> Option<bool> {
        match self {
            Validity::Unknown => None,
            Validity::Reachable => Some(true),
            Validity::Unreachable => Some(false),
        }
    }

    /// Single character status marker used by the text listings
    pub fn marker(self) -> &'static str {
        match self {
            Validity::Unknown => "?",
            Validity::Reachable => "✓",
            Validity::Unreachable => "✗",
        }
    }
}

/// Normalized network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NetTypeTag {
    /// Hosting / datacenter address space
    Datacenter,
    /// Residential broadband
    Residential,
    /// No or unrecognised network type token
    Unknown,
}

impl NetTypeTag {
    /// Maps a raw network type token onto its normalized tag
    ///
    /// Listing sources use Chinese labels (`机房` = datacenter, `家宽` =
    /// residential); a few English spellings are accepted as well.
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "机房" => return NetTypeTag::Datacenter,
            "家宽" => return NetTypeTag::Residential,
            _ => {}
        }
        match raw.to_ascii_lowercase().as_str() {
            "datacenter" | "dc" | "idc" => NetTypeTag::Datacenter,
            "residential" => NetTypeTag::Residential,
            _ => NetTypeTag::Unknown,
        }
    }

    /// English label
    pub fn as_str(self) -> &'static str {
        match self {
            NetTypeTag::Datacenter => "datacenter",
            NetTypeTag::Residential => "residential",
            NetTypeTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NetTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized address listing entry
///
/// Identity is `ip` plus optional `port` (see [`Record::address`]). The
/// metadata fields default to empty strings; the validation fields are only
/// ever written by the prober.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Dotted-quad IPv4 address
    pub ip: String,
    /// Port, if the listing carried one (or the prober discovered one)
    pub port: Option<u16>,
    /// Name of the source the record was extracted from
    pub source: String,
    /// Category label of the source
    pub category: String,
    /// Country name (free-form, as listed)
    pub country: String,
    /// Region / province
    pub region: String,
    /// City
    pub city: String,
    /// Internet service provider
    pub isp: String,
    /// Raw network type token, verbatim from the listing
    pub net_type: String,
    /// Probe outcome
    pub valid: Validity,
    /// Connect latency in milliseconds (reachable records only)
    pub latency_ms: Option<f64>,
    /// Short failure classification (unreachable records only)
    pub validation_error: Option<String>,
}

impl Record {
    /// Create a record with identity and provenance set and no metadata
    pub fn new(
        ip: impl Into<String>,
        port: Option<u16>,
        source: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            ip: ip.into(),
            port,
            source: source.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    /// Address key: `ip` when port-less, otherwise `ip:port`
    ///
    /// This is the identity used for deduplication.
    pub fn address(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.ip, port),
            None => self.ip.clone(),
        }
    }

    /// Short location summary: country plus city (or region)
    ///
    /// Returns `"Unknown"` when no geo metadata is present.
    pub fn location(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.country.is_empty() {
            parts.push(self.country.as_str());
        }
        if !self.city.is_empty() {
            parts.push(self.city.as_str());
        } else if !self.region.is_empty() {
            parts.push(self.region.as_str());
        }
        if parts.is_empty() {
            "Unknown".to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Normalized network type
    pub fn net_type_tag(&self) -> NetTypeTag {
        NetTypeTag::from_raw(&self.net_type)
    }

    /// True if the prober established a connection
    pub fn is_reachable(&self) -> bool {
        self.valid == Validity::Reachable
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Record", 15)?;
        s.serialize_field("address", &self.address())?;
        s.serialize_field("ip", &self.ip)?;
        s.serialize_field("port", &self.port)?;
        s.serialize_field("source", &self.source)?;
        s.serialize_field("category", &self.category)?;
        s.serialize_field("country", &self.country)?;
        s.serialize_field("region", &self.region)?;
        s.serialize_field("city", &self.city)?;
        s.serialize_field("isp", &self.isp)?;
        s.serialize_field("net_type", &self.net_type)?;
        s.serialize_field("net_type_en", self.net_type_tag().as_str())?;
        s.serialize_field("location", &self.location())?;
        s.serialize_field("is_valid", &self.valid.as_option())?;
        s.serialize_field("latency_ms", &self.latency_ms)?;
        s.serialize_field("validation_error", &self.validation_error)?;
        s.end()
    }
}
