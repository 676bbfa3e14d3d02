//! Benchmarks for the tw rewrite pipeline.
//! Run with: cargo bench -p tw2css-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;
use tw2css_core::{config::Config, parser::parse, transform};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn card_input() -> (String, Config) {
    let input = std::fs::read_to_string(fixture_path("card.jsx")).unwrap();
    let toml_str = std::fs::read_to_string(fixture_path("card.toml")).unwrap();
    let config = Config::from_toml(&toml_str).unwrap();
    (input, config)
}

/// Small component: the card fixture.
fn bench_transform_card(c: &mut Criterion) {
    let (input, config) = card_input();
    c.bench_function("transform_card", |b| {
        b.iter(|| {
            let _ = black_box(transform(black_box(&input), black_box(&config)).unwrap());
        })
    });
}

/// Large synthetic module with many tw props, merges and templates.
fn bench_transform_large(c: &mut Criterion) {
    let config = Config::default();
    let component = "export const Row = ({ label }) => (\n  <li tw=\"flex items-center\" css={[base, tw`mt-2`]}>\n    <span tw=\"text-sm\">{label}</span>\n  </li>\n)\n\n";
    let large = format!("import tw from 'twin.macro'\n\n{}", component.repeat(500));
    c.bench_function("transform_large", |b| {
        b.iter(|| {
            let _ = black_box(transform(black_box(&large), black_box(&config)).unwrap());
        })
    });
}

/// Plain JavaScript with no JSX: parser and printer overhead only.
fn bench_parse_plain_js(c: &mut Criterion) {
    let code = "function add(a, b) {\n  // sum\n  return a + b < 10 ? `${a}` : 'big';\n}\n\n".repeat(1000);
    c.bench_function("parse_plain_js", |b| {
        b.iter(|| {
            let _ = black_box(parse(black_box(&code)).unwrap());
        })
    });
}

criterion_group!(benches, bench_transform_card, bench_transform_large, bench_parse_plain_js);
criterion_main!(benches);
