//! Listing sources
//!
//! A [`SourceSpec`] names a listing, says where to read it and how to parse
//! it. [`default_sources`] is the built-in catalogue used when no other
//! sources are configured.

use crate::error::{HarvestError, Result};
use crate::extract::SourceKind;
use std::fmt;
use std::path::PathBuf;

/// Where a listing is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Fetched over HTTP(S)
    Url(String),
    /// Read from the local filesystem
    File(PathBuf),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Url(url) => f.write_str(url),
            SourceLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One configured listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Display name, also stamped on records as their source
    pub name: String,
    /// Where to read the listing
    pub location: SourceLocation,
    /// Listing format and record provenance
    pub kind: SourceKind,
}

impl SourceSpec {
    /// Remote listing
    pub fn url(url: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: kind.source().to_string(),
            location: SourceLocation::Url(url.into()),
            kind,
        }
    }

    /// Local listing
    pub fn file(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self {
            name: kind.source().to_string(),
            location: SourceLocation::File(path.into()),
            kind,
        }
    }

    /// Parses a local source argument of the form `NAME=KIND:PATH`
    ///
    /// `KIND` is `plain`, `markup` or `socks5`; the category is `local`.
    ///
    /// # Example
    ///
    /// ```
    /// use ip_harvest::sources::{SourceLocation, SourceSpec};
    ///
    /// let spec = SourceSpec::parse_file_arg("mine=plain:/tmp/list.txt").unwrap();
    /// assert_eq!(spec.name, "mine");
    /// assert_eq!(spec.location, SourceLocation::File("/tmp/list.txt".into()));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Config`] if the argument is malformed.
    pub fn parse_file_arg(arg: &str) -> Result<Self> {
        let malformed = || HarvestError::Config(format!("expected NAME=KIND:PATH, got {arg:?}"));

        let (name, rest) = arg.split_once('=').ok_or_else(malformed)?;
        let (kind, path) = rest.split_once(':').ok_or_else(malformed)?;
        let (name, path) = (name.trim(), path.trim());
        if name.is_empty() || path.is_empty() {
            return Err(malformed());
        }

        let kind = match kind.trim().to_ascii_lowercase().as_str() {
            "plain" | "txt" => SourceKind::plain(name, "local"),
            "markup" | "html" => SourceKind::markup(name, "local"),
            "socks5" | "rich" | "rich-socks5" => SourceKind::rich_socks5(name, "local"),
            other => {
                return Err(HarvestError::Config(format!(
                    "unknown source kind {other:?} in {arg:?}"
                )));
            }
        };
        Ok(Self::file(path, kind))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.kind, self.location)
    }
}

/// Built-in listings: one markup page, one plain Cloudflare list, two plain
/// proxy lists and one rich SOCKS5 list
pub fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::url(
            "https://raw.githubusercontent.com/chnbsdan/cf-speed-dns/refs/heads/main/ipTop10.html",
            SourceKind::markup("ipTop10.html", "cloudflare"),
        ),
        SourceSpec::url(
            "https://raw.githubusercontent.com/chnbsdan/edgetunnel3/refs/heads/main/output.txt",
            SourceKind::plain("edgetunnel-output", "cloudflare"),
        ),
        SourceSpec::url(
            "https://ipdb.api.030101.xyz/?type=bestproxy&country=true",
            SourceKind::plain("bestproxy", "proxy"),
        ),
        SourceSpec::url(
            "https://ipdb.api.030101.xyz/?type=bestcf",
            SourceKind::plain("bestcf", "proxy"),
        ),
        SourceSpec::url(
            "https://raw.githubusercontent.com/chnbsdan/free-proxy-list/refs/heads/main/proxy.txt",
            SourceKind::rich_socks5("socks5-proxy", "socks5"),
        ),
    ]
}
