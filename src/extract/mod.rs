//! Record extraction from raw listing text
//!
//! A listing is turned into records according to its [`SourceKind`]:
//!
//! - [`SourceKind::Plain`]: one or more addresses per line ([`plain`])
//! - [`SourceKind::Markup`]: table cells, text elements and the flattened
//!   document text ([`markup`])
//! - [`SourceKind::RichSocks5`]: `socks5://` lines with bracketed network
//!   type, location and ISP metadata ([`socks5`])
//!
//! Extraction never fails. Fragments that do not match, or that match but
//! carry an invalid address or port, are dropped.
//!
//! # Example
//!
//! ```
//! use ip_harvest::extract::{extract, SourceKind};
//!
//! let kind = SourceKind::plain("bestproxy", "proxy");
//! let records = extract("1.2.3.4:8080\n# comment\nsocks5://5.6.7.8:1080", &kind);
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1].address(), "5.6.7.8:1080");
//! ```

pub mod markup;
pub mod plain;
pub mod socks5;

pub use plain::{Endpoint, LineMatcher, PLAIN_MATCHERS};

use crate::record::Record;
use std::fmt;

/// Listing format together with the provenance its records carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// Line-oriented text
    Plain {
        /// Source name stamped on every record
        source: String,
        /// Category label stamped on every record
        category: String,
        /// Country assigned to records that carry none
        region_hint: Option<String>,
    },
    /// HTML-like markup
    Markup {
        /// Source name stamped on every record
        source: String,
        /// Category label stamped on every record
        category: String,
        /// Country assigned to records that carry none
        region_hint: Option<String>,
    },
    /// `socks5://ip:port [[type] location [isp]]` lines
    RichSocks5 {
        /// Source name stamped on every record
        source: String,
        /// Category label stamped on every record
        category: String,
    },
}

impl SourceKind {
    /// Plain-text listing without a region hint
    pub fn plain(source: impl Into<String>, category: impl Into<String>) -> Self {
        SourceKind::Plain {
            source: source.into(),
            category: category.into(),
            region_hint: None,
        }
    }

    /// Markup listing without a region hint
    pub fn markup(source: impl Into<String>, category: impl Into<String>) -> Self {
        SourceKind::Markup {
            source: source.into(),
            category: category.into(),
            region_hint: None,
        }
    }

    /// Rich SOCKS5 listing
    pub fn rich_socks5(source: impl Into<String>, category: impl Into<String>) -> Self {
        SourceKind::RichSocks5 {
            source: source.into(),
            category: category.into(),
        }
    }

    /// Sets the region hint (ignored for rich SOCKS5 listings, which carry
    /// their own location)
    #[must_use]
    pub fn with_region_hint(mut self, hint: impl Into<String>) -> Self {
        match &mut self {
            SourceKind::Plain { region_hint, .. } | SourceKind::Markup { region_hint, .. } => {
                *region_hint = Some(hint.into());
            }
            SourceKind::RichSocks5 { .. } => {}
        }
        self
    }

    /// Source name
    pub fn source(&self) -> &str {
        match self {
            SourceKind::Plain { source, .. }
            | SourceKind::Markup { source, .. }
            | SourceKind::RichSocks5 { source, .. } => source,
        }
    }

    /// Category label
    pub fn category(&self) -> &str {
        match self {
            SourceKind::Plain { category, .. }
            | SourceKind::Markup { category, .. }
            | SourceKind::RichSocks5 { category, .. } => category,
        }
    }

    fn origin(&self) -> Origin<'_> {
        match self {
            SourceKind::Plain {
                source,
                category,
                region_hint,
            }
            | SourceKind::Markup {
                source,
                category,
                region_hint,
            } => Origin {
                source,
                category,
                region_hint: region_hint.as_deref().filter(|h| !h.is_empty()),
            },
            SourceKind::RichSocks5 { source, category } => Origin {
                source,
                category,
                region_hint: None,
            },
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = match self {
            SourceKind::Plain { .. } => "plain",
            SourceKind::Markup { .. } => "markup",
            SourceKind::RichSocks5 { .. } => "rich-socks5",
        };
        write!(f, "{} ({})", self.source(), format)
    }
}

/// Provenance shared by all records of one extraction
#[derive(Debug, Clone, Copy)]
pub struct Origin<'a> {
    /// Source name
    pub source: &'a str,
    /// Category label
    pub category: &'a str,
    /// Country for records that carry none
    pub region_hint: Option<&'a str>,
}

impl Origin<'_> {
    /// Builds a record stamped with this origin
    pub fn record(&self, ip: String, port: Option<u16>) -> Record {
        let mut record = Record::new(ip, port, self.source, self.category);
        if let Some(hint) = self.region_hint {
            if record.country.is_empty() {
                record.country = hint.to_string();
            }
        }
        record
    }
}

/// Extracts candidate records from `text`
///
/// Only identity and metadata fields are populated; validation fields are
/// left unset. An empty input yields no records.
pub fn extract(text: &str, kind: &SourceKind) -> Vec<Record> {
    let origin = kind.origin();
    match kind {
        SourceKind::Plain { .. } => plain::extract_text(text, &origin),
        SourceKind::Markup { .. } => markup::extract_text(text, &origin),
        SourceKind::RichSocks5 { .. } => socks5::extract_text(text, &origin),
    }
}
