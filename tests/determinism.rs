//! Fixed seeds give reproducible results.

use lsa_stats::statistics::{counter_rng_seed, PermutationTest};
use lsa_stats::{
    CancelToken, LocalSimilarity, Pipeline, PairwiseAnalysis, ReplicateMatrix, SeriesTensor,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn wavy(n: usize, phase: f64) -> Vec<f64> {
    (0..n).map(|t| (t as f64 * 0.5 + phase).cos() + 3.0).collect()
}

#[test]
fn permutation_p_value_repeats_with_seed() {
    let pipeline = Pipeline::default();
    let test = PermutationTest {
        pipeline: &pipeline,
        delay_limit: 2,
        permutations: 300,
    };
    let x_raw = ReplicateMatrix::from_rows(&[wavy(18, 0.0)]).unwrap();
    let y = ReplicateMatrix::from_rows(&[wavy(18, 0.4)]).unwrap();
    let x = pipeline.process(&x_raw);
    let cancel = CancelToken::new();

    let p = |seed: u64| {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(seed, 0));
        test.p_value(&LocalSimilarity, &x, &y, 0.6, &mut rng, &cancel)
            .unwrap()
            .unwrap()
    };
    assert_eq!(p(42), p(42));
    assert!((0.0..=1.0).contains(&p(43)));
}

#[test]
fn full_runs_repeat_with_seed() {
    let data =
        SeriesTensor::from_series(&[wavy(16, 0.0), wavy(16, 0.8), wavy(16, 2.0), wavy(16, 3.1)])
            .unwrap();
    let run = || {
        PairwiseAnalysis::new()
            .permutations(120)
            .bootstraps(30)
            .seed(2024)
            .run_collect(&data, &data, &LocalSimilarity)
            .unwrap()
            .0
    };
    assert_eq!(run(), run());
}
