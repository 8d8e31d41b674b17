//! Main `PairwiseAnalysis` entry point and builder.

use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::alignment::AlignmentOracle;
use crate::cancel::CancelToken;
use crate::config::{Config, Emission, PValueMethod, PairingMode};
use crate::constants::PROMISING_P;
use crate::error::{DataError, Error};
use crate::fdr::QValueEstimator;
use crate::output::{ResultSink, VecSink};
use crate::pipeline::{FillMethod, Normalizer, Pipeline, Summarizer};
use crate::result::{PairStatus, QValues, ResultRow, RunSummary};
use crate::statistics::{
    counter_rng_seed, BootstrapCi, BootstrapInterval, CorrelationKind, PValueTable,
    PermutationTest, RangeStatistic, ScoreInterval,
};
use crate::types::SeriesTensor;

/// All-pairs local-similarity analysis.
///
/// Use the builder pattern to configure and run an analysis.
///
/// # Example
///
/// ```ignore
/// use lsa_stats::{LocalSimilarity, PairwiseAnalysis, SeriesTensor};
///
/// let data = SeriesTensor::from_series(&[x, y, z])?;
/// let (rows, summary) = PairwiseAnalysis::new()
///     .delay_limit(2)
///     .permutations(500)
///     .run_collect(&data, &data, &LocalSimilarity)?;
/// ```
#[derive(Debug, Clone)]
pub struct PairwiseAnalysis {
    config: Config,
    cancel: CancelToken,
    parallel: bool,
}

impl Default for PairwiseAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

/// One scheduled pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairJob {
    /// Position in the scan; seeds the pair's random stream.
    pub index: usize,
    /// Factor in the first tensor.
    pub i: usize,
    /// Factor in the second tensor.
    pub j: usize,
}

impl PairwiseAnalysis {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            parallel: true,
        }
    }

    /// Create with a fast configuration for exploration and tests.
    ///
    /// Settings:
    /// - Mixed p-values (table first, permutations only for promising pairs)
    /// - 200 permutations (vs 1,000 default)
    /// - no bootstrap
    pub fn quick() -> Self {
        Self::with_config(Config {
            p_value_method: PValueMethod::Mixed,
            permutations: 200,
            bootstraps: 0,
            ..Config::default()
        })
    }

    /// Create with a thorough configuration for final results.
    ///
    /// Settings:
    /// - 10,000 permutations (vs 1,000 default)
    /// - 1,000 bootstrap resamples with a 95% interval
    pub fn thorough() -> Self {
        Self::with_config(Config {
            permutations: 10_000,
            bootstraps: 1_000,
            ..Config::default()
        })
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Emission mode in effect; streaming runs never compute q-values.
    pub fn emission_mode(&self) -> Emission {
        self.config.emission
    }

    /// Set the pairing mode.
    pub fn pairing(mut self, mode: PairingMode) -> Self {
        self.config.pairing = mode;
        self
    }

    /// Set the largest alignment shift.
    pub fn delay_limit(mut self, d: usize) -> Self {
        self.config.delay_limit = d;
        self
    }

    /// Set the occurrence filter fraction.
    pub fn min_occurrence(mut self, fraction: f64) -> Self {
        self.config.min_occurrence = fraction;
        self
    }

    /// Set interior gap filling.
    pub fn fill(mut self, method: FillMethod) -> Self {
        self.config.fill = method;
        self
    }

    /// Set the replicate summarizer.
    pub fn summarizer(mut self, s: Summarizer) -> Self {
        self.config.summarizer = s;
        self
    }

    /// Set the normalizer.
    pub fn normalizer(mut self, n: Normalizer) -> Self {
        self.config.normalizer = n;
        self
    }

    /// Analyze trends with the given threshold.
    pub fn trend_threshold(mut self, threshold: f64) -> Self {
        self.config.trend_threshold = Some(threshold);
        self
    }

    /// Set the p-value method.
    pub fn p_value_method(mut self, method: PValueMethod) -> Self {
        self.config.p_value_method = method;
        self
    }

    /// Set permutations per pair.
    pub fn permutations(mut self, n: usize) -> Self {
        self.config.permutations = n;
        self
    }

    /// Set bootstrap resamples per pair.
    pub fn bootstraps(mut self, n: usize) -> Self {
        self.config.bootstraps = n;
        self
    }

    /// Set the bootstrap confidence width.
    pub fn ci_width(mut self, width: f64) -> Self {
        self.config.ci_width = width;
        self
    }

    /// Set the bootstrap bound construction.
    pub fn bootstrap_interval(mut self, interval: BootstrapInterval) -> Self {
        self.config.bootstrap_interval = interval;
        self
    }

    /// Collect every row and compute q-values (the default).
    pub fn buffered(mut self) -> Self {
        self.config.emission = Emission::Buffered;
        self
    }

    /// Flush rows in batches of `batch_size`; q-values stay undefined.
    pub fn streaming(mut self, batch_size: usize) -> Self {
        self.config.emission = Emission::Streaming { batch_size };
        self
    }

    /// Use the robust q-value denominator.
    pub fn robust_q_values(mut self, robust: bool) -> Self {
        self.config.robust_q_values = robust;
        self
    }

    /// Replace the q-value backend.
    pub fn fdr_backend(mut self, backend: Arc<dyn QValueEstimator>) -> Self {
        self.config.fdr_backend = Some(backend);
        self
    }

    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the approximate per-series variance used by the table lookup.
    pub fn approx_variance(mut self, variance: f64) -> Self {
        self.config.approx_variance = variance;
        self
    }

    /// Set the theoretical table quantization.
    pub fn table_decimals(mut self, decimals: u32) -> Self {
        self.config.table_decimals = decimals;
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Process pairs in parallel (default) or on the calling thread.
    ///
    /// Results are identical either way.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// The pairs a run over `first` and `second` would visit, in order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::DiagonalMismatch`] for on-diagonal pairing over
    /// factor sets of different size.
    pub fn pairs(&self, first: &SeriesTensor, second: &SeriesTensor) -> Result<Vec<PairJob>, Error> {
        let (n1, n2) = (first.factors(), second.factors());
        let mode = match self.config.pairing {
            PairingMode::Auto if n1 == n2 && first == second => PairingMode::OnDiagonal,
            PairingMode::Auto => PairingMode::Cross,
            other => other,
        };
        if mode == PairingMode::OnDiagonal && n1 != n2 {
            return Err(DataError::DiagonalMismatch {
                first: n1,
                second: n2,
            }
            .into());
        }
        let on_diagonal = mode == PairingMode::OnDiagonal;
        let cells = (0..n1)
            .flat_map(|i| (0..n2).map(move |j| (i, j)))
            .filter(|&(i, j)| !on_diagonal || i < j);
        Ok(cells
            .enumerate()
            .map(|(index, (i, j))| PairJob { index, i, j })
            .collect())
    }

    /// Analyze every pair and write rows to `sink`.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, incompatible tensors, sink errors or
    /// cancellation. Problems inside a single pair become
    /// [`PairStatus::Failed`] rows instead.
    pub fn run<O>(
        &self,
        first: &SeriesTensor,
        second: &SeriesTensor,
        oracle: &O,
        sink: &mut dyn ResultSink,
    ) -> Result<RunSummary, Error>
    where
        O: AlignmentOracle,
    {
        let start = Instant::now();
        self.config.validate()?;
        first.check_compatible(second)?;
        let jobs = self.pairs(first, second)?;

        let (first, second) = match self.config.fill {
            FillMethod::None => (Cow::Borrowed(first), Cow::Borrowed(second)),
            method => (
                Cow::Owned(first.fill_missing(method)),
                Cow::Owned(second.fill_missing(method)),
            ),
        };

        let pipeline = self.config.pipeline();
        let table = self.config.p_value_method.uses_table().then(|| {
            PValueTable::build(
                pipeline.output_len(first.timepoints()),
                self.config.delay_limit,
                self.config.table_precision(),
                self.config.table_decimals,
            )
        });
        let ctx = PairContext {
            first: &first,
            second: &second,
            config: &self.config,
            pipeline,
            table: table.as_ref(),
            oracle,
            cancel: &self.cancel,
        };

        info!(
            pairs = jobs.len(),
            factors = first.factors(),
            timepoints = first.timepoints(),
            replicates = first.replicates(),
            emission = ?self.config.emission,
            "starting pairwise analysis"
        );

        let mut summary = RunSummary::new(self.config.emission);
        sink.write_header()?;
        match self.config.emission {
            Emission::Buffered => {
                let mut rows = self.process(&ctx, &jobs)?;
                assign_q_values(&mut rows, self.config.q_value_estimator().as_ref());
                rows.iter().for_each(|row| summary.record(row));
                sink.write_rows(&rows)?;
            }
            Emission::Streaming { batch_size } => {
                for (n, batch) in jobs.chunks(batch_size).enumerate() {
                    let rows = self.process(&ctx, batch)?;
                    rows.iter().for_each(|row| summary.record(row));
                    sink.write_rows(&rows)?;
                    debug!(batch = n, rows = rows.len(), "flushed batch");
                }
            }
        }
        sink.finish()?;

        summary.runtime_secs = start.elapsed().as_secs_f64();
        info!(
            analyzed = summary.analyzed,
            no_data = summary.no_data,
            empty_alignment = summary.empty_alignment,
            failed = summary.failed,
            runtime_secs = summary.runtime_secs,
            "pairwise analysis finished"
        );
        Ok(summary)
    }

    /// Run and collect every row in memory.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_collect<O>(
        &self,
        first: &SeriesTensor,
        second: &SeriesTensor,
        oracle: &O,
    ) -> Result<(Vec<ResultRow>, RunSummary), Error>
    where
        O: AlignmentOracle,
    {
        let mut sink = VecSink::default();
        let summary = self.run(first, second, oracle, &mut sink)?;
        Ok((sink.into_rows(), summary))
    }

    fn process(&self, ctx: &PairContext<'_>, jobs: &[PairJob]) -> Result<Vec<ResultRow>, Error> {
        if !self.parallel {
            return jobs.iter().map(|job| ctx.run_guarded(job)).collect();
        }

        #[cfg(feature = "parallel")]
        let rows: Result<Vec<ResultRow>, Error> = crate::thread_pool::install(|| {
            jobs.par_iter().map(|job| ctx.run_guarded(job)).collect()
        });

        #[cfg(not(feature = "parallel"))]
        let rows: Result<Vec<ResultRow>, Error> =
            jobs.iter().map(|job| ctx.run_guarded(job)).collect();

        rows
    }
}

/// Read-only state shared by every pair of a run.
struct PairContext<'a> {
    first: &'a SeriesTensor,
    second: &'a SeriesTensor,
    config: &'a Config,
    pipeline: Pipeline,
    table: Option<&'a PValueTable>,
    oracle: &'a dyn AlignmentOracle,
    cancel: &'a CancelToken,
}

impl PairContext<'_> {
    /// Analyze one pair, turning errors and panics into `Failed` rows.
    /// Only cancellation propagates.
    fn run_guarded(&self, job: &PairJob) -> Result<ResultRow, Error> {
        self.cancel.check()?;
        let outcome = catch_unwind(AssertUnwindSafe(|| self.analyze(job)));
        match outcome {
            Ok(Ok(row)) => Ok(row),
            Ok(Err(Error::Cancelled)) => Err(Error::Cancelled),
            Ok(Err(e)) => {
                warn!(i = job.i, j = job.j, error = %e, "pair failed");
                Ok(self.sentinel(job, PairStatus::Failed))
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(i = job.i, j = job.j, %message, "pair panicked");
                Ok(self.sentinel(job, PairStatus::Failed))
            }
        }
    }

    fn sentinel(&self, job: &PairJob, status: PairStatus) -> ResultRow {
        ResultRow::sentinel(
            job.i,
            job.j,
            self.first.label(job.i),
            self.second.label(job.j),
            status,
        )
    }

    fn analyze(&self, job: &PairJob) -> Result<ResultRow, Error> {
        let config = self.config;
        let x_raw = self.first.factor(job.i);
        let y_raw = self.second.factor(job.j);

        if x_raw.all_invalid()
            || y_raw.all_invalid()
            || x_raw.occurrence() < config.min_occurrence
            || y_raw.occurrence() < config.min_occurrence
        {
            return Ok(self.sentinel(job, PairStatus::NoData));
        }

        let x = self.pipeline.process(x_raw);
        let y = self.pipeline.process(y_raw);
        let alignment = self
            .oracle
            .align(&x.filled(0.0), &y.filled(0.0), config.delay_limit, true);

        let x_mean = x_raw.replicate_mean();
        let y_mean = y_raw.replicate_mean();
        let d = config.delay_limit;
        let mut row = self.sentinel(job, PairStatus::EmptyAlignment);
        row.pearson = CorrelationKind::Pearson.correlate(&x_mean, &y_mean);
        row.spearman = CorrelationKind::Spearman.correlate(&x_mean, &y_mean);
        row.shifted_pearson = CorrelationKind::Pearson.correlate_shifted(&x_mean, &y_mean, d);
        row.shifted_spearman = CorrelationKind::Spearman.correlate_shifted(&x_mean, &y_mean, d);

        let Some((x_start, y_start)) = alignment.start() else {
            return Ok(row);
        };

        let mut rng =
            Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(config.seed, job.index as u64));
        let permutation = PermutationTest {
            pipeline: &self.pipeline,
            delay_limit: d,
            permutations: config.permutations,
        };
        let theoretical = || {
            self.table.and_then(|table| {
                table.lookup(&RangeStatistic::new(
                    alignment.score,
                    self.pipeline.output_len(x_raw.timepoints()),
                    config.approx_variance.sqrt(),
                    x_raw.replicates(),
                ))
            })
        };
        let p_value = match config.p_value_method {
            PValueMethod::Theoretical => theoretical(),
            PValueMethod::Permutation => permutation.p_value(
                self.oracle,
                &x,
                y_raw,
                alignment.score,
                &mut rng,
                self.cancel,
            )?,
            PValueMethod::Mixed => match theoretical() {
                Some(p) if p <= PROMISING_P => permutation.p_value(
                    self.oracle,
                    &x,
                    y_raw,
                    alignment.score,
                    &mut rng,
                    self.cancel,
                )?,
                other => other,
            },
        };

        let interval = if config.bootstraps > 0 {
            BootstrapCi {
                pipeline: &self.pipeline,
                delay_limit: d,
                resamples: config.bootstraps,
                width: config.ci_width,
                interval: config.bootstrap_interval,
            }
            .estimate(self.oracle, x_raw, y_raw, alignment.score, &mut rng, self.cancel)?
        } else {
            ScoreInterval::point(alignment.score)
        };

        row.status = PairStatus::Analyzed;
        row.score = interval.estimate;
        row.ci_low = interval.low;
        row.ci_high = interval.high;
        row.x_start = x_start as i64;
        row.y_start = y_start as i64;
        row.align_len = alignment.len();
        row.delay = x_start as i64 - y_start as i64;
        row.p_value = p_value;
        Ok(row)
    }
}

fn family<F>(rows: &[ResultRow], estimator: &dyn QValueEstimator, p: F) -> Vec<Option<f64>>
where
    F: Fn(&ResultRow) -> Option<f64>,
{
    let p_values: Vec<Option<f64>> = rows.iter().map(p).collect();
    estimator.q_values(&p_values)
}

/// One FDR pass per p-value family.
fn assign_q_values(rows: &mut [ResultRow], estimator: &dyn QValueEstimator) {
    let lsa = family(rows, estimator, ResultRow::lsa_p_for_fdr);
    let pearson = family(rows, estimator, |r| r.pearson.map(|c| c.p));
    let shifted_pearson = family(rows, estimator, |r| r.shifted_pearson.map(|c| c.p));
    let spearman = family(rows, estimator, |r| r.spearman.map(|c| c.p));
    let shifted_spearman = family(rows, estimator, |r| r.shifted_spearman.map(|c| c.p));
    for (k, row) in rows.iter_mut().enumerate() {
        row.q_values = QValues {
            lsa: lsa[k],
            pearson: pearson[k],
            shifted_pearson: shifted_pearson[k],
            spearman: spearman[k],
            shifted_spearman: shifted_spearman[k],
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{Alignment, LocalSimilarity};

    fn tensor(series: &[Vec<f64>]) -> SeriesTensor {
        SeriesTensor::from_series(series).unwrap()
    }

    fn wave(n: usize, phase: f64) -> Vec<f64> {
        (0..n).map(|t| (t as f64 * 0.7 + phase).sin() + 2.0).collect()
    }

    #[test]
    fn auto_pairing_on_identical_tensors() {
        let data = tensor(&[wave(8, 0.0), wave(8, 1.0), wave(8, 2.0)]);
        let jobs = PairwiseAnalysis::new().pairs(&data, &data).unwrap();
        let cells: Vec<(usize, usize)> = jobs.iter().map(|j| (j.i, j.j)).collect();
        assert_eq!(cells, vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(jobs[2].index, 2);
    }

    #[test]
    fn auto_pairing_cross_for_distinct_tensors() {
        let a = tensor(&[wave(8, 0.0), wave(8, 1.0)]);
        let b = tensor(&[wave(8, 3.0)]);
        let jobs = PairwiseAnalysis::new().pairs(&a, &b).unwrap();
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn on_diagonal_needs_equal_counts() {
        let a = tensor(&[wave(8, 0.0), wave(8, 1.0)]);
        let b = tensor(&[wave(8, 3.0)]);
        let err = PairwiseAnalysis::new()
            .pairing(PairingMode::OnDiagonal)
            .pairs(&a, &b)
            .unwrap_err();
        assert!(matches!(err, Error::Data(DataError::DiagonalMismatch { .. })));
    }

    #[test]
    fn incompatible_tensors_rejected() {
        let a = tensor(&[wave(8, 0.0)]);
        let b = tensor(&[wave(9, 0.0)]);
        let err = PairwiseAnalysis::new()
            .run_collect(&a, &b, &LocalSimilarity)
            .unwrap_err();
        assert!(matches!(err, Error::Data(DataError::Incompatible { .. })));
    }

    #[derive(Debug)]
    struct Exploding;

    impl AlignmentOracle for Exploding {
        fn align(&self, _: &[f64], _: &[f64], _: usize, _: bool) -> Alignment {
            panic!("oracle failure");
        }
    }

    #[test]
    fn panicking_pair_becomes_failed_row() {
        let data = tensor(&[wave(10, 0.0), wave(10, 1.0)]);
        let (rows, summary) = PairwiseAnalysis::new()
            .parallel(false)
            .run_collect(&data, &data, &Exploding)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, PairStatus::Failed);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn cancelled_run_errors() {
        let data = tensor(&[wave(10, 0.0), wave(10, 1.0)]);
        let token = CancelToken::new();
        token.cancel();
        let err = PairwiseAnalysis::new()
            .cancel_token(token)
            .run_collect(&data, &data, &LocalSimilarity)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn occurrence_filter_skips_sparse_factor() {
        let sparse = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0];
        let data = tensor(&[wave(8, 0.0), sparse]);
        let (rows, _) = PairwiseAnalysis::new()
            .permutations(10)
            .run_collect(&data, &data, &LocalSimilarity)
            .unwrap();
        assert_eq!(rows[0].status, PairStatus::NoData);
        assert_eq!(rows[0].pearson, None);
    }

    #[test]
    fn theoretical_method_fills_p_values() {
        let data = tensor(&[wave(20, 0.0), wave(20, 0.3), wave(20, 2.5)]);
        let (rows, summary) = PairwiseAnalysis::new()
            .p_value_method(PValueMethod::Theoretical)
            .normalizer(Normalizer::PercentileZ)
            .run_collect(&data, &data, &LocalSimilarity)
            .unwrap();
        assert_eq!(summary.analyzed, 3);
        for row in &rows {
            let p = row.p_value.unwrap();
            assert!((0.0..=1.0).contains(&p));
            assert_eq!(row.delay, row.x_start - row.y_start);
        }
        assert!(summary.q_values_computed);
    }
}
