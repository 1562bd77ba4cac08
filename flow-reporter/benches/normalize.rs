//! Criterion benchmarks for the per-run hot paths
//!
//! Covers: step normalization, fingerprint derivation, and report rendering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flow_reporter::cache::{canonical_json, Fingerprint};
use flow_reporter::codegen::ReportRenderer;
use flow_reporter::flow::RawStep;
use flow_reporter::normalize::normalize;
use flow_reporter::synthesis::FlowSummary;
use serde_json::json;

fn make_steps(count: usize) -> Vec<RawStep> {
    (0..count)
        .map(|i| {
            let value = match i % 5 {
                0 => json!({"type": "IMAGE", "metadata": {"clickTarget": format!("Button {}", i)}}),
                1 => json!({"type": "IMAGE", "metadata": {"query": "blue shoes"}}),
                2 => json!({"type": "CHAPTER", "title": format!("Chapter {}", i)}),
                3 => json!({"type": "IMAGE", "metadata": {"coordinates": {"x": 10.5, "y": 20.25}}}),
                _ => json!({"type": "VIDEO", "timestamp": i}),
            };
            RawStep::decode(value)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for size in [10usize, 100, 1000] {
        let steps = make_steps(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &steps, |b, steps| {
            b.iter(|| normalize(black_box(steps)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

fn bench_fingerprint(c: &mut Criterion) {
    let raw = make_steps(200);
    let steps = normalize(&raw);
    let request = json!({
        "flow_name": "Checkout",
        "use_case": null,
        "steps": steps.iter().map(|s| s.human_description.as_str()).collect::<Vec<_>>(),
    });

    c.bench_function("canonical_json_200_steps", |b| {
        b.iter(|| canonical_json(black_box(&request)));
    });

    let canonical = canonical_json(&request);
    c.bench_function("fingerprint_200_steps", |b| {
        b.iter(|| {
            Fingerprint::derive([
                "narrative",
                "narrative-v1",
                "model",
                black_box(canonical.as_str()),
            ])
        });
    });
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn bench_render(c: &mut Criterion) {
    let raw = make_steps(200);
    let summary = FlowSummary {
        title: "Benchmark flow".to_string(),
        overall_narrative: "A long recorded session.".to_string(),
        step_descriptions: normalize(&raw)
            .into_iter()
            .map(|s| s.human_description)
            .collect(),
    };

    c.bench_function("render_200_steps", |b| {
        let mut renderer = ReportRenderer::new();
        b.iter(|| renderer.render(black_box(&summary), "social_image.png"));
    });
}

criterion_group!(benches, bench_normalize, bench_fingerprint, bench_render);
criterion_main!(benches);
