//! Completion latency on a large page.
//!
//! Measures the declaration scanner on its own and the full completion
//! pipeline for an expression, a tag name and an attribute name.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use jspantom_lsp::completion::{self, CompletionRequest};
use jspantom_lsp::registry::Registry;
use jspantom_lsp::resolver::TaglibResolver;
use jspantom_lsp::scanner::scan_text;
use jspantom_lsp::sources::builtin;
use jspantom_lsp::sources::tlds::load_tlds;

const HEADER: &str = "<%@ taglib prefix=\"ts\" uri=\"http://example.com/jsp/test\" %>\n";

/// A page with `rows` iterations, each binding its own variables.
fn generate_page(rows: usize) -> String {
    let mut page = String::from(HEADER);
    for i in 0..rows {
        page.push_str(&format!(
            "<ts:forEach items=\"${{list{i}}}\" var=\"row{i}\" varStatus=\"status{i}\" requiredTest=\"x\">\n",
        ));
        page.push_str(&format!("  <p class=\"row\">${{row{i}.name}} (${{status{i}.index}})</p>\n"));
        page.push_str("</ts:forEach>\n");
    }
    page
}

fn setup() -> (Registry, TaglibResolver) {
    let mut registry = Registry::new();
    builtin::register(&mut registry).expect("built-in entries register");
    let report = load_tlds(&["tests/fixtures/tlds"], &mut registry);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    (registry, TaglibResolver::default())
}

fn bench_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_text");
    for rows in [10, 100, 1000] {
        let page = generate_page(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &page, |b, page| {
            b.iter(|| scan_text(black_box(page)));
        });
    }
    group.finish();
}

fn bench_complete(c: &mut Criterion) {
    let (mut registry, mut resolver) = setup();
    let page = generate_page(500);
    let cases = [
        ("expression", format!("{page}${{ts:con")),
        ("tag_name", format!("{page}<ts:for")),
        ("attribute", format!("{page}<ts:forEach va")),
    ];

    let mut group = c.benchmark_group("complete");
    for (name, text) in &cases {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let request = CompletionRequest::new(text, text.len()).manual(true);
                completion::complete(black_box(&request), &mut registry, &mut resolver)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scanner, bench_complete);
criterion_main!(benches);
