//! Report sinks
//!
//! [`ReportWriter`] renders a finalized record list into the output
//! directory:
//!
//! | File             | Content                                              |
//! |------------------|------------------------------------------------------|
//! | `all.txt`        | aligned listing with status, type, latency, location |
//! | `all.json`       | metadata, statistics and every record                |
//! | `all.csv`        | every record, one row each                           |
//! | `valid_only.txt` | usable addresses, fastest first                      |
//! | `summary.md`     | overview tables                                      |

use crate::error::Result;
use crate::record::{NetTypeTag, Record, Validity};
use crate::stats::{Statistics, fastest};
use chrono::Utc;
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column order of `all.csv`
pub const CSV_HEADER: [&str; 15] = [
    "address",
    "ip",
    "port",
    "source",
    "category",
    "country",
    "region",
    "city",
    "isp",
    "net_type",
    "net_type_en",
    "location",
    "is_valid",
    "latency_ms",
    "validation_error",
];

const RULE: &str = "======================================================================";
const TOP_N: usize = 15;

/// Provenance of the list being written
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    /// Raw (pre-merge) record count per source, in fetch order
    pub source_counts: Vec<(String, usize)>,
    /// Whether the list went through the prober
    pub validated: bool,
}

#[derive(Serialize)]
struct Metadata<'a> {
    generated_at: &'a str,
    total_count: usize,
    valid_count: usize,
    validated: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: Metadata<'a>,
    statistics: &'a Statistics,
    data: &'a [Record],
}

/// Writes the report files into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    timestamp: String,
}

impl ReportWriter {
    /// Create a writer for `output_dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Io`](crate::HarvestError::Io) if the directory
    /// cannot be created.
    pub fn create(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        })
    }

    /// Overrides the generation timestamp printed in every file
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes all report files, returning their paths
    ///
    /// # Errors
    ///
    /// Any I/O or serialization failure aborts the remaining files.
    pub fn write_all(&self, records: &[Record], context: &ReportContext) -> Result<Vec<PathBuf>> {
        let stats = Statistics::compute(records);

        let written = vec![
            self.write_txt(records, &stats)?,
            self.write_json(records, &stats, context.validated)?,
            self.write_csv(records)?,
            self.write_valid_only(records)?,
            self.write_summary(records, &stats, context)?,
        ];

        info!(
            "Wrote {} reports to {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }

    fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        fs::write(&path, content)?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// `all.txt`
    pub fn write_txt(&self, records: &[Record], stats: &Statistics) -> Result<PathBuf> {
        let out = render(|out| self.render_txt(out, records, stats))?;
        self.write_file("all.txt", &out)
    }

    fn render_txt(&self, out: &mut String, records: &[Record], stats: &Statistics) -> fmt::Result {
        writeln!(out, "# {RULE}")?;
        writeln!(out, "# Aggregated IP/Proxy Addresses")?;
        writeln!(out, "# Generated: {}", self.timestamp)?;
        writeln!(out, "# Total: {} | Valid: {}", stats.total, stats.usable())?;
        writeln!(out, "# {RULE}")?;
        writeln!(out, "# Format: ADDRESS | TYPE | LATENCY | LOCATION | ISP")?;
        writeln!(out, "# {RULE}")?;
        writeln!(out)?;
        for record in records {
            writeln!(out, "{}", listing_line(record))?;
        }
        Ok(())
    }

    /// `all.json`
    pub fn write_json(
        &self,
        records: &[Record],
        stats: &Statistics,
        validated: bool,
    ) -> Result<PathBuf> {
        let report = JsonReport {
            metadata: Metadata {
                generated_at: &self.timestamp,
                total_count: stats.total,
                valid_count: stats.usable(),
                validated,
            },
            statistics: stats,
            data: records,
        };

        let path = self.output_dir.join("all.json");
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// `all.csv`; the header row is written even for an empty list
    pub fn write_csv(&self, records: &[Record]) -> Result<PathBuf> {
        let path = self.output_dir.join("all.csv");
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        writer.write_record(CSV_HEADER)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// `valid_only.txt`: reachable addresses by ascending latency, then
    /// untested ones in list order
    pub fn write_valid_only(&self, records: &[Record]) -> Result<PathBuf> {
        let usable = usable_in_order(records);
        let out = render(|out| {
            writeln!(out, "# Valid IPs - {}", self.timestamp)?;
            writeln!(out, "# Count: {}", usable.len())?;
            writeln!(out)?;
            for record in &usable {
                writeln!(out, "{}", record.address())?;
            }
            Ok(())
        })?;
        self.write_file("valid_only.txt", &out)
    }

    /// `summary.md`
    pub fn write_summary(
        &self,
        records: &[Record],
        stats: &Statistics,
        context: &ReportContext,
    ) -> Result<PathBuf> {
        let md = render(|md| self.render_summary(md, records, stats, context))?;
        self.write_file("summary.md", &md)
    }

    fn render_summary(
        &self,
        md: &mut String,
        records: &[Record],
        stats: &Statistics,
        context: &ReportContext,
    ) -> fmt::Result {
        writeln!(md, "# IP Aggregation Report\n")?;
        writeln!(md, "> **Generated:** {}\n", self.timestamp)?;

        writeln!(md, "## Overview\n")?;
        writeln!(md, "| Metric | Value |")?;
        writeln!(md, "|--------|-------|")?;
        writeln!(md, "| **Total Entries** | {} |", stats.total)?;
        writeln!(
            md,
            "| **Valid** | {} ({:.1}%) |",
            stats.reachable,
            stats.percent(stats.reachable)
        )?;
        writeln!(
            md,
            "| **Invalid** | {} ({:.1}%) |",
            stats.unreachable,
            stats.percent(stats.unreachable)
        )?;
        writeln!(md, "| **Untested** | {} |", stats.untested)?;
        if let Some(latency) = &stats.latency {
            writeln!(
                md,
                "| **Latency (min / median / max)** | {:.0}ms / {:.0}ms / {:.0}ms |",
                latency.min, latency.median, latency.max
            )?;
        }

        writeln!(md, "\n## Sources\n")?;
        writeln!(md, "| Source | Count |")?;
        writeln!(md, "|--------|-------|")?;
        for (name, count) in &context.source_counts {
            writeln!(md, "| {} | {} |", name, count)?;
        }

        writeln!(md, "\n## Network Type Distribution\n")?;
        writeln!(md, "| Type | Count | Percentage |")?;
        writeln!(md, "|------|-------|------------|")?;
        for (tag, label) in [
            (NetTypeTag::Datacenter, "机房 (Datacenter)"),
            (NetTypeTag::Residential, "家宽 (Residential)"),
            (NetTypeTag::Unknown, "未知 (Unknown)"),
        ] {
            let count = stats.by_net_type.get(tag.as_str());
            writeln!(
                md,
                "| {} | {} | {:.1}% |",
                label,
                count,
                stats.percent(count)
            )?;
        }

        writeln!(md, "\n## Geographic Distribution (Top {TOP_N})\n")?;
        writeln!(md, "| Country | Count | Percentage |")?;
        writeln!(md, "|---------|-------|------------|")?;
        for (country, count) in stats.by_country.iter().take(TOP_N) {
            writeln!(
                md,
                "| {} | {} | {:.1}% |",
                country,
                count,
                stats.percent(count)
            )?;
        }

        writeln!(md, "\n## Top {TOP_N} Fastest IPs\n")?;
        writeln!(md, "| Address | Latency | Type | Location | ISP |")?;
        writeln!(md, "|---------|---------|------|----------|-----|")?;
        for record in fastest(records, TOP_N) {
            writeln!(
                md,
                "| `{}` | {} | {} | {} | {} |",
                record.address(),
                latency_label(record),
                or_dash(&record.net_type),
                record.location(),
                ellipsize(&record.isp, 25)
            )?;
        }
        Ok(())
    }
}

/// Runs a text builder into a fresh buffer
fn render<F>(build: F) -> Result<String>
where
    F: FnOnce(&mut String) -> fmt::Result,
{
    let mut out = String::new();
    build(&mut out)?;
    Ok(out)
}

/// One `all.txt` row: `ADDRESS | STATUS NETTYPE | LATENCY | LOCATION | ISP`
pub fn listing_line(record: &Record) -> String {
    let isp: String = record.isp.chars().take(30).collect();
    format!(
        "{:<22} | {} {:<4} | {:<8} | {:<20} | {}",
        record.address(),
        record.valid.marker(),
        or_dash(&record.net_type),
        latency_label(record),
        record.location(),
        or_dash(&isp)
    )
}

/// Reachable records by ascending latency, followed by untested records in
/// their original order
pub fn usable_in_order(records: &[Record]) -> Vec<&Record> {
    let mut reachable: Vec<&Record> = records.iter().filter(|r| r.is_reachable()).collect();
    reachable.sort_by(|a, b| {
        a.latency_ms
            .unwrap_or(f64::MAX)
            .total_cmp(&b.latency_ms.unwrap_or(f64::MAX))
    });
    reachable.extend(records.iter().filter(|r| r.valid == Validity::Unknown));
    reachable
}

fn latency_label(record: &Record) -> String {
    match record.latency_ms {
        Some(ms) => format!("{:.0}ms", ms),
        None => "-".to_string(),
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

fn ellipsize(s: &str, max: usize) -> String {
    if s.is_empty() {
        return "-".to_string();
    }
    if s.chars().count() > max {
        let mut short: String = s.chars().take(max).collect();
        short.push_str("...");
        short
    } else {
        s.to_string()
    }
}
