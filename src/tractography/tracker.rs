//! Tractography orchestrator.
//!
//! Purpose
//! -------
//! Run a whole tracking job: generate seeds, follow one fiber per seed on a
//! fixed worker pool, drop unusable fibers and hand the rest to a
//! [`FiberWriter`].
//!
//! Key behaviors
//! -------------
//! - One rayon pool per run, sized by `num_threads` (rayon's default when
//!   unset). Seed generation runs inside it as a parallel iterator.
//! - Propagation uses `min(pool threads, seeds)` workers. Seeds are dealt to
//!   workers by [`partition`]; each worker builds its own estimator from the
//!   factory and writes into its own output slot.
//! - Outcomes are put back into seed order. Discarded fibers and fibers with
//!   fewer than `min_fiber_samples` samples are dropped.
//!
//! Invariants & assumptions
//! ------------------------
//! - Determinism: for a fixed `random_seed` and deterministic estimators the
//!   output does not depend on the thread count.
//! - The writer runs only after every worker finished without error, so a
//!   failed run never produces partial output.
use crate::tractography::{
    collaborators::{BranchDetector, FiberWriter, RecursiveEstimator, SignalSource},
    core::{fiber::Fiber, options::TractographyOptions},
    errors::{TrackError, TrackResult},
    parallel::partition,
    propagation::{FiberOutcome, Propagator},
    seeding::{SeedPointInfo, generate_seeds},
};
use rand::{SeedableRng, rngs::StdRng};
use rayon::ThreadPool;

/// Counts of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunReport {
    pub seeds: usize,
    pub workers: usize,
    /// Fibers handed to the writer.
    pub fibers: usize,
    /// Fibers dropped because they entered CSF.
    pub discarded: usize,
    /// Fibers dropped for having too few samples.
    pub too_short: usize,
}

/// Orchestrates seeding, propagation and output for one configuration.
#[derive(Debug, Clone)]
pub struct Tractography {
    opts: TractographyOptions,
}

impl Tractography {
    /// # Errors
    /// `InvalidOption` if `opts` fails validation.
    pub fn new(opts: TractographyOptions) -> TrackResult<Self> {
        opts.validate()?;
        Ok(Self { opts })
    }

    pub fn options(&self) -> &TractographyOptions {
        &self.opts
    }

    /// Track every seed of `source` and write the surviving fibers.
    ///
    /// `estimator_factory(worker)` is called once per worker.
    ///
    /// # Errors
    /// - `WorkerPool` if the pool cannot be built.
    /// - Seeding errors (`EmptyLabels`, `NoSeeds`, solver preconditions).
    /// - Propagation errors from any worker.
    /// - `NoFibers` if every fiber was dropped.
    /// - Writer failures.
    pub fn run<S, B, E, F, W>(
        &self, source: &S, detector: &B, estimator_factory: F, writer: &mut W,
    ) -> TrackResult<RunReport>
    where
        S: SignalSource,
        B: BranchDetector,
        E: RecursiveEstimator,
        F: Fn(usize) -> E + Sync,
        W: FiberWriter + ?Sized,
    {
        let pool = self.build_pool()?;
        let seeds = pool.install(|| {
            let mut rng = StdRng::seed_from_u64(self.opts.random_seed);
            generate_seeds(source, detector, &self.opts, &mut rng)
        })?;
        let workers = pool.current_num_threads().min(seeds.len()).max(1);
        log::info!("tracking {} seeds on {workers} workers", seeds.len());

        let outcomes = self.propagate(&pool, source, &seeds, workers, &estimator_factory)?;
        let mut report = RunReport { seeds: seeds.len(), workers, ..RunReport::default() };
        let fibers = self.keep_usable(outcomes, &mut report);
        if fibers.is_empty() {
            return Err(TrackError::NoFibers);
        }
        report.fibers = fibers.len();

        writer.write(&fibers)?;
        log::info!(
            "wrote {} fibers ({} discarded in CSF, {} too short)",
            report.fibers,
            report.discarded,
            report.too_short
        );
        Ok(report)
    }

    /// Follow every seed on `workers` workers of `pool`, in seed order.
    ///
    /// # Errors
    /// The first worker error in worker order.
    pub fn propagate<S, E, F>(
        &self, pool: &ThreadPool, source: &S, seeds: &[SeedPointInfo], workers: usize,
        estimator_factory: &F,
    ) -> TrackResult<Vec<FiberOutcome>>
    where
        S: SignalSource,
        E: RecursiveEstimator,
        F: Fn(usize) -> E + Sync,
    {
        let propagator = Propagator::new(source, &self.opts);
        let lists = partition(workers, seeds.len());
        let mut slots: Vec<TrackResult<Vec<(usize, FiberOutcome)>>> =
            (0..lists.len()).map(|_| Ok(Vec::new())).collect();

        pool.scope(|scope| {
            for (worker, (indices, slot)) in lists.iter().zip(slots.iter_mut()).enumerate() {
                let propagator = &propagator;
                scope.spawn(move |_| {
                    let mut estimator = estimator_factory(worker);
                    *slot = indices
                        .iter()
                        .map(|&i| propagator.follow(&seeds[i], &mut estimator).map(|o| (i, o)))
                        .collect();
                });
            }
        });

        let mut ordered: Vec<Option<FiberOutcome>> = (0..seeds.len()).map(|_| None).collect();
        for slot in slots {
            for (i, outcome) in slot? {
                ordered[i] = Some(outcome);
            }
        }
        Ok(ordered.into_iter().flatten().collect())
    }

    // ---- Helper Methods ----

    fn build_pool(&self) -> TrackResult<ThreadPool> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.opts.num_threads {
            builder = builder.num_threads(n);
        }
        builder.build().map_err(|e| TrackError::WorkerPool { text: e.to_string() })
    }

    fn keep_usable(&self, outcomes: Vec<FiberOutcome>, report: &mut RunReport) -> Vec<Fiber> {
        let mut fibers = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if outcome.discarded {
                report.discarded += 1;
            } else if outcome.fiber.len() < self.opts.min_fiber_samples {
                report.too_short += 1;
            } else {
                fibers.push(outcome.fiber);
            }
        }
        fibers
    }
}
