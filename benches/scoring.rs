use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use voiceauth::embedding::fbank::{Fbank, FbankConfig, subtract_mean};
use voiceauth::phrase::PhraseMatcher;
use voiceauth::similarity::cosine_similarity;

/// Deterministic pseudo-speech: a few harmonics with slow amplitude drift.
fn synthetic_audio(seconds: f32) -> Vec<f32> {
    let n = (16000.0 * seconds) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / 16000.0;
            let envelope = 0.5 + 0.5 * (t * 3.0).sin();
            envelope
                * (0.4 * (2.0 * std::f32::consts::PI * 180.0 * t).sin()
                    + 0.2 * (2.0 * std::f32::consts::PI * 360.0 * t).sin()
                    + 0.1 * (2.0 * std::f32::consts::PI * 1200.0 * t).sin())
        })
        .collect()
}

fn embedding(dim: usize, seed: f32) -> Vec<f32> {
    (0..dim).map(|i| ((i as f32 + seed) * 0.37).sin()).collect()
}

fn bench_phrase_matching(c: &mut Criterion) {
    let matcher = PhraseMatcher::default();
    let mut group = c.benchmark_group("phrase_match");

    group.bench_function("exact", |b| {
        b.iter(|| matcher.is_match(black_box("ola mundo"), black_box("ola mundo")))
    });
    group.bench_function("reordered", |b| {
        b.iter(|| {
            matcher.is_match(
                black_box("the quick brown fox jumps over the lazy dog"),
                black_box("over the lazy dog the quick brown fox jumps"),
            )
        })
    });
    group.finish();
}

fn bench_cosine(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_similarity");
    for dim in [192usize, 256, 512] {
        let a = embedding(dim, 0.0);
        let b = embedding(dim, 1.5);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |bench, _| {
            bench.iter(|| cosine_similarity(black_box(&a), black_box(&b)))
        });
    }
    group.finish();
}

fn bench_fbank(c: &mut Criterion) {
    let fbank = Fbank::new(FbankConfig::default());
    let mut group = c.benchmark_group("fbank");
    group.sample_size(20);

    for seconds in [1.0f32, 3.0, 10.0] {
        let audio = synthetic_audio(seconds);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{seconds}s")),
            &audio,
            |b, audio| {
                b.iter(|| {
                    if let Some(mut features) = fbank.compute(black_box(audio)) {
                        subtract_mean(&mut features);
                        black_box(features);
                    }
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_phrase_matching, bench_cosine, bench_fbank);
criterion_main!(benches);
