use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lsa_stats::{
    AlignmentOracle, LocalSimilarity, PValueMethod, PairwiseAnalysis, SeriesTensor,
};
use lsa_stats::statistics::PValueTable;

fn panel(factors: usize, timepoints: usize) -> SeriesTensor {
    let series: Vec<Vec<f64>> = (0..factors)
        .map(|f| {
            (0..timepoints)
                .map(|t| ((t * (f + 3)) as f64 * 0.17).sin() + 2.0)
                .collect()
        })
        .collect();
    SeriesTensor::from_series(&series).unwrap_or_else(|e| panic!("bench data: {e}"))
}

fn bench_alignment(c: &mut Criterion) {
    let x: Vec<f64> = (0..200).map(|t| (t as f64 * 0.1).sin()).collect();
    let y: Vec<f64> = (0..200).map(|t| (t as f64 * 0.1 + 0.5).sin()).collect();
    let mut group = c.benchmark_group("alignment");
    group.bench_function("local_similarity_n200_d3", |b| {
        b.iter(|| black_box(LocalSimilarity.score(black_box(&x), black_box(&y), 3)));
    });
    group.finish();
}

fn bench_pairwise(c: &mut Criterion) {
    let data = panel(12, 24);
    let mut group = c.benchmark_group("pairwise");
    group.sample_size(10);
    group.bench_function("permutation_12x24", |b| {
        b.iter(|| {
            // Small permutation count keeps each iteration short.
            let (rows, _) = PairwiseAnalysis::new()
                .permutations(100)
                .run_collect(&data, &data, &LocalSimilarity)
                .unwrap_or_else(|e| panic!("bench run: {e}"));
            black_box(rows.len())
        });
    });
    group.bench_function("theoretical_12x24", |b| {
        b.iter(|| {
            let (rows, _) = PairwiseAnalysis::new()
                .p_value_method(PValueMethod::Theoretical)
                .run_collect(&data, &data, &LocalSimilarity)
                .unwrap_or_else(|e| panic!("bench run: {e}"));
            black_box(rows.len())
        });
    });
    group.bench_function("table_build_r24_d3", |b| {
        b.iter(|| black_box(PValueTable::build(24, 3, 1e-3, 2).max_key()));
    });
    group.finish();
}

criterion_group!(benches, bench_alignment, bench_pairwise);
criterion_main!(benches);
