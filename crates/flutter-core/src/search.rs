// ─────────────────────────────────────────────────────────────────────
// Flutter Shutter Search — Search Driver
// ─────────────────────────────────────────────────────────────────────
//! Orchestrates candidate generation and scoring.
//!
//! A run moves `INIT → {EXHAUSTIVE | DELEGATED} → DONE`. The strategy is
//! picked once from the candidate count (`C(n-2, k-2)`, or the number of
//! reversal-distinct codes with `skip_reversals`) against
//! `max_exhaustive_search_times`:
//!
//! - `Exhaustive` scores every candidate in process and keeps the first
//!   candidate reaching the best score (strict improvement only).
//! - `Delegated` runs the external random search and reads its table.
//!
//! Every failure is fatal for the run: no partial result is returned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use flutter_types::{
    Code, Direction, FlutterError, FlutterResult, ObjectiveKind, ProgressRecord, SearchConfig,
    SearchOutcome, StrategyKind,
};

use crate::delegate::{
    parse_result, FsResultReader, ProcessRunner, RandomSearchParams, RandomSearchRunner,
    ResultReader,
};
use crate::generator::{verify_count, CandidateGenerator};
use crate::objective::{build_evaluator, Evaluator};

/// Progress callback: receives every improvement of the running best.
pub type ProgressCallback = Box<dyn Fn(&ProgressRecord) + Send + Sync>;

/// Search path chosen for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    /// Enumerate and score all `candidates` codes.
    Exhaustive { candidates: u64 },
    /// Hand the run to the external random search.
    Delegated(RandomSearchParams),
}

impl SearchStrategy {
    pub fn select(config: &SearchConfig, generator: &CandidateGenerator) -> Self {
        let candidates = generator.expected_count();
        if candidates < config.max_exhaustive_search_times {
            SearchStrategy::Exhaustive { candidates }
        } else {
            SearchStrategy::Delegated(RandomSearchParams::from_config(config))
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            SearchStrategy::Exhaustive { .. } => StrategyKind::Exhaustive,
            SearchStrategy::Delegated(_) => StrategyKind::Delegated,
        }
    }
}

/// Running optimum of a sequential scan.
struct BestSoFar {
    direction: Direction,
    best: Option<(Code, f64)>,
    improvements: u64,
}

impl BestSoFar {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            best: None,
            improvements: 0,
        }
    }

    /// Keep `code` if it strictly beats the incumbent. Returns true on replacement.
    fn offer(&mut self, code: Code, score: f64) -> bool {
        let incumbent = self
            .best
            .as_ref()
            .map_or(self.direction.worst(), |(_, s)| *s);
        let first = self.best.is_none() && !score.is_nan();
        if first || self.direction.is_better(score, incumbent) {
            self.best = Some((code, score));
            self.improvements += 1;
            true
        } else {
            false
        }
    }
}

/// Best slot shared by parallel workers.
///
/// Ties go to the lowest enumeration index, reproducing the first-seen
/// rule of the sequential scan.
struct SharedBest {
    direction: Direction,
    best: Option<(usize, Code, f64)>,
    improvements: u64,
}

impl SharedBest {
    /// Returns true only on a strict improvement (or the first entry).
    /// An equal score from an earlier index takes the slot silently.
    fn offer(&mut self, index: usize, code: Code, score: f64) -> bool {
        if score.is_nan() {
            return false;
        }
        let (improved, earlier_tie) = match &self.best {
            None => (true, false),
            Some((best_index, _, best_score)) => (
                self.direction.is_better(score, *best_score),
                score == *best_score && index < *best_index,
            ),
        };
        if improved {
            self.improvements += 1;
        }
        if improved || earlier_tie {
            self.best = Some((index, code, score));
        }
        improved
    }
}

/// Code search over one configuration.
pub struct CodeSearch {
    config: SearchConfig,
    generator: CandidateGenerator,
    evaluator: Box<dyn Evaluator>,
    runner: Arc<dyn RandomSearchRunner>,
    reader: Arc<dyn ResultReader>,
    progress: Option<ProgressCallback>,
}

impl CodeSearch {
    /// Search using the external process runner and the filesystem.
    pub fn new(config: SearchConfig) -> FlutterResult<Self> {
        let runner = Arc::new(ProcessRunner::from_config(&config));
        Self::with_backends(config, runner, Arc::new(FsResultReader))
    }

    pub fn with_backends(
        config: SearchConfig,
        runner: Arc<dyn RandomSearchRunner>,
        reader: Arc<dyn ResultReader>,
    ) -> FlutterResult<Self> {
        config.validate()?;
        let generator =
            CandidateGenerator::new(config.n, config.k)?.skip_reversals(config.skip_reversals);
        let evaluator = build_evaluator(&config);
        Ok(Self {
            config,
            generator,
            evaluator,
            runner,
            reader,
            progress: None,
        })
    }

    /// Replace the configured objective.
    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&ProgressRecord) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn strategy(&self) -> SearchStrategy {
        SearchStrategy::select(&self.config, &self.generator)
    }

    /// Run the search to completion.
    pub fn run(&self) -> FlutterResult<SearchOutcome> {
        let strategy = self.strategy();
        if self.generator.skips_reversals() {
            log::debug!(
                "skipping reversals: {} of {} candidates",
                self.generator.expected_count(),
                self.generator.full_count()
            );
        }
        log::info!(
            "code search n={} k={} objectwidth={} objective={}: {:?}",
            self.config.n,
            self.config.k,
            self.config.objectwidth,
            self.evaluator.name(),
            strategy
        );

        let outcome = match strategy {
            SearchStrategy::Exhaustive { .. } if self.generator.is_unique() => self.run_unique()?,
            SearchStrategy::Exhaustive { candidates } if self.config.parallel => {
                self.run_exhaustive_parallel(candidates)?
            }
            SearchStrategy::Exhaustive { candidates } => self.run_exhaustive(candidates)?,
            SearchStrategy::Delegated(params) => self.run_delegated(&params)?,
        };

        log::info!(
            "code search done: best {} score {:.6} ({} evaluated, {} improvements)",
            outcome.code,
            outcome.score,
            outcome.candidates_evaluated,
            outcome.improvements
        );
        Ok(outcome)
    }

    fn report(&self, code: &Code, score: f64) {
        let record = ProgressRecord {
            n: self.config.n,
            k: self.config.k,
            score,
            code: code.to_digit_string(),
        };
        log::info!(
            "n={} k={} best={:.6} code={}",
            record.n,
            record.k,
            record.score,
            record.code
        );
        if let Some(callback) = &self.progress {
            callback(&record);
        }
    }

    /// k = 2 and k = n admit exactly one code; score it without enumerating.
    fn run_unique(&self) -> FlutterResult<SearchOutcome> {
        let n = self.config.n;
        let interior: Vec<usize> = if self.config.k == n {
            (1..n - 1).collect()
        } else {
            Vec::new()
        };
        let code = Code::from_interior(n, &interior)?;
        code.check(n, self.config.k)
            .map_err(|e| FlutterError::Consistency(e.to_string()))?;
        let score = self.evaluator.score(&code)?;
        self.report(&code, score);
        Ok(SearchOutcome {
            code,
            score,
            strategy: StrategyKind::Exhaustive,
            candidates_evaluated: 1,
            improvements: 1,
        })
    }

    fn run_exhaustive(&self, expected: u64) -> FlutterResult<SearchOutcome> {
        let mut best = BestSoFar::new(self.evaluator.direction());
        let mut evaluated = 0u64;

        for candidate in self.generator.candidates() {
            let code = candidate?;
            let score = self.evaluator.score(&code)?;
            evaluated += 1;
            if best.offer(code, score) {
                if let Some((code, score)) = &best.best {
                    self.report(code, *score);
                }
            }
        }

        verify_count(evaluated, expected)?;
        let improvements = best.improvements;
        let (code, score) = best.best.ok_or_else(|| {
            FlutterError::Numerical("no candidate produced a comparable score".to_string())
        })?;
        Ok(SearchOutcome {
            code,
            score,
            strategy: StrategyKind::Exhaustive,
            candidates_evaluated: evaluated,
            improvements,
        })
    }

    fn run_exhaustive_parallel(&self, expected: u64) -> FlutterResult<SearchOutcome> {
        let slot = Mutex::new(SharedBest {
            direction: self.evaluator.direction(),
            best: None,
            improvements: 0,
        });
        let evaluated = AtomicU64::new(0);

        self.generator
            .candidates()
            .enumerate()
            .par_bridge()
            .try_for_each(|(index, candidate)| -> FlutterResult<()> {
                let code = candidate?;
                let score = self.evaluator.score(&code)?;
                evaluated.fetch_add(1, Ordering::Relaxed);
                let mut best = slot.lock();
                if best.offer(index, code, score) {
                    if let Some((_, code, score)) = &best.best {
                        self.report(code, *score);
                    }
                }
                Ok(())
            })?;

        let evaluated = evaluated.into_inner();
        verify_count(evaluated, expected)?;
        let shared = slot.into_inner();
        let (_, code, score) = shared.best.ok_or_else(|| {
            FlutterError::Numerical("no candidate produced a comparable score".to_string())
        })?;
        Ok(SearchOutcome {
            code,
            score,
            strategy: StrategyKind::Exhaustive,
            candidates_evaluated: evaluated,
            improvements: shared.improvements,
        })
    }

    fn run_delegated(&self, params: &RandomSearchParams) -> FlutterResult<SearchOutcome> {
        if self.config.objective != ObjectiveKind::SpectralMinimum {
            log::warn!(
                "random search ranks by its own objective, not {}",
                self.evaluator.name()
            );
        }
        let file = self.runner.run(params)?;
        let table = self.reader.read(&file)?;
        let (code, score) = parse_result(&file, &table, params.n, params.k)?;
        Ok(SearchOutcome {
            code,
            score,
            strategy: StrategyKind::Delegated,
            candidates_evaluated: 0,
            improvements: 0,
        })
    }
}

/// Run a search with the default backends and return the best code and score.
pub fn search(config: SearchConfig) -> FlutterResult<(Code, f64)> {
    let outcome = CodeSearch::new(config)?.run()?;
    Ok((outcome.code, outcome.score))
}
