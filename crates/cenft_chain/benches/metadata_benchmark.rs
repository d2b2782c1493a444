//! # Metadata Benchmark
//!
//! Token URI decoding runs once per discovered token, so a wallet holding
//! many badges decodes many URIs per page load.
//!
//! Run with: `cargo bench --package cenft_chain`

#![allow(missing_docs)]

use alloy_primitives::{Address, U256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cenft_chain::metadata::INLINE_JSON_PREFIX;
use cenft_chain::{parse_token_uri, CheckInLog, EventParser};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn inline_uri(attributes: usize) -> String {
    let attributes: Vec<String> = (0..attributes)
        .map(|i| format!(r#"{{"trait_type":"Trait {i}","value":"{i}"}}"#))
        .collect();
    let json = format!(
        r#"{{"name":"RustConf #7","description":"annual meetup","image":"ipfs://badge","attributes":[{}]}}"#,
        attributes.join(",")
    );
    format!("{INLINE_JSON_PREFIX}{}", STANDARD.encode(json))
}

fn bench_inline(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_inline_uri");

    for attributes in [0, 8, 64] {
        let uri = inline_uri(attributes);
        group.bench_with_input(BenchmarkId::from_parameter(attributes), &uri, |b, uri| {
            b.iter(|| black_box(parse_token_uri(black_box(uri))));
        });
    }

    group.finish();
}

fn bench_fallbacks(c: &mut Criterion) {
    // Control byte inside the JSON forces the sanitize-and-retry path
    let dirty = format!(
        "{INLINE_JSON_PREFIX}{}",
        STANDARD.encode("{\"name\":\"Badge\u{1}\",\"description\":\"x\"}")
    );
    let broken = format!("{INLINE_JSON_PREFIX}!!!!?tokenId=42");

    c.bench_function("parse_external_uri", |b| {
        b.iter(|| black_box(parse_token_uri(black_box("https://example.org/nft/1.json"))));
    });
    c.bench_function("parse_sanitized_uri", |b| {
        b.iter(|| black_box(parse_token_uri(black_box(&dirty))));
    });
    c.bench_function("parse_broken_uri", |b| {
        b.iter(|| black_box(parse_token_uri(black_box(&broken))));
    });
}

fn bench_log_parsing(c: &mut Criterion) {
    let logs: Vec<_> = (0..1_000u64)
        .map(|i| {
            CheckInLog {
                event_id: U256::from(i % 10),
                participant: Address::repeat_byte(0x11),
                token_id: U256::from(i),
                block_number: Some(i),
            }
            .to_raw_log(Address::repeat_byte(0xc0), i)
        })
        .collect();

    c.bench_function("parse_1k_check_in_logs", |b| {
        b.iter(|| {
            logs.iter()
                .filter_map(EventParser::parse_log)
                .count()
        });
    });
}

criterion_group!(benches, bench_inline, bench_fallbacks, bench_log_parsing);
criterion_main!(benches);
