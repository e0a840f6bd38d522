//! Benchmarks for listing extraction and merging
//!
//! Listings of a few thousand lines are typical; the markup path is the
//! slowest since it walks the document three ways.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ip_harvest::{SourceKind, dedupe_and_sort, extract};

fn plain_listing(lines: usize) -> String {
    let mut out = String::with_capacity(lines * 24);
    for i in 0..lines {
        match i % 4 {
            0 => out.push_str(&format!("{}.{}.1.{}:443\n", 1 + i % 200, i % 256, i % 250 + 1)),
            1 => out.push_str(&format!("socks5://u:p@{}.2.3.{}:1080\n", 1 + i % 200, i % 250 + 1)),
            2 => out.push_str("# comment line\n"),
            _ => out.push_str(&format!("{}.9.9.{}\n", 1 + i % 200, i % 250 + 1)),
        }
    }
    out
}

fn rich_listing(lines: usize) -> String {
    let mut out = String::with_capacity(lines * 56);
    for i in 0..lines {
        out.push_str(&format!(
            "socks5://{}.6.7.{}:1080 [[机房] 韩国 首尔 [KT]]\n",
            1 + i % 200,
            i % 250 + 1
        ));
    }
    out
}

fn markup_listing(rows: usize) -> String {
    let mut out = String::from("<html><body><table>");
    for i in 0..rows {
        out.push_str(&format!(
            "<tr><td>{}.16.{}.1</td><td>{}ms</td></tr>",
            104 + i % 50,
            i % 256,
            i % 300
        ));
    }
    out.push_str("</table></body></html>");
    out
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for lines in [100usize, 1_000, 10_000] {
        let inputs = [
            ("plain", plain_listing(lines), SourceKind::plain("bench", "proxy")),
            ("rich", rich_listing(lines), SourceKind::rich_socks5("bench", "socks5")),
            ("markup", markup_listing(lines), SourceKind::markup("bench", "cloudflare")),
        ];

        for (name, text, kind) in &inputs {
            group.throughput(Throughput::Bytes(text.len() as u64));
            group.bench_with_input(BenchmarkId::new(*name, lines), text, |b, text| {
                b.iter(|| extract(black_box(text), kind));
            });
        }
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for lines in [1_000usize, 10_000] {
        let kind = SourceKind::plain("bench", "proxy");
        let records = extract(&plain_listing(lines), &kind);
        group.throughput(Throughput::Elements(records.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &records, |b, records| {
            b.iter(|| dedupe_and_sort(black_box(records.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract, bench_merge);
criterion_main!(benches);
