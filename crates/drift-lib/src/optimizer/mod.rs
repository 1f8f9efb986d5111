//! Per-interval scalar optimization with tiered fallback
//!
//! Each completed interval is reduced to one target, expressed as a
//! fraction of the resource request. The solver is tried with the strict
//! percentage-error limit, then with the relaxed one, and finally replaced
//! by an inflated percentile. Solver failures never leave this module.

mod formulation;
mod solver;

pub use formulation::ProblemFormulation;
pub use solver::{BoundedSolver, SolveOutcome, SOLUTION_MAX, SOLUTION_MIN};

use crate::observability::RecommenderMetrics;
use crate::stats::{mean, percentile};
use tracing::{debug, warn};

/// Percentage-error limit of the first attempt
pub const PE_LIMIT: f64 = 5.0;

/// Percentage-error limit of the retry
pub const PE_LIMIT_RELAXED: f64 = 10.0;

/// Percentile used as the solver's starting point
const INITIAL_GUESS_PERCENTILE: f64 = 95.0;

/// Percentile used when the solver gives up or degenerates
const FALLBACK_PERCENTILE: f64 = 98.0;

/// Inflation of the fallback percentile after solver failure
const FALLBACK_INFLATION: f64 = 1.2;

/// Reduction of the fallback percentile for degenerate solutions
const DEGENERATE_REDUCTION: f64 = 0.5;

/// Mean throttle fraction above which the target is inflated
const THROTTLE_THRESHOLD: f64 = 0.1;

/// Which step of the fallback chain produced a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionTier {
    Primary,
    Relaxed,
    PercentileFallback,
}

impl SolutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolutionTier::Primary => "primary",
            SolutionTier::Relaxed => "relaxed",
            SolutionTier::PercentileFallback => "percentile_fallback",
        }
    }
}

/// Normalized target of one interval and how it was obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizedTarget {
    pub value: f64,
    pub tier: SolutionTier,
    /// Solution fell below the domain and was replaced by a percentile
    pub degenerate: bool,
    /// Heavy throttling inflated the value
    pub throttle_inflated: bool,
}

/// Solves the per-interval problem for a fixed under-estimation weight
pub struct Optimizer {
    ue_weight: f64,
    solver: BoundedSolver,
    metrics: RecommenderMetrics,
}

impl Optimizer {
    pub fn new(ue_weight: f64) -> Self {
        Self {
            ue_weight,
            solver: BoundedSolver::default(),
            metrics: RecommenderMetrics::new(),
        }
    }

    /// Optimize one interval of curated, normalized samples.
    ///
    /// `throttles` runs parallel to `samples`; an empty slice means no
    /// throttling was observed.
    pub fn optimize(&self, samples: &[f64], throttles: &[f64]) -> OptimizedTarget {
        let problem = ProblemFormulation::new(samples, self.ue_weight);
        let initial_guess = percentile(samples, INITIAL_GUESS_PERCENTILE);

        let attempts = [
            (SolutionTier::Primary, PE_LIMIT),
            (SolutionTier::Relaxed, PE_LIMIT_RELAXED),
        ];

        let mut solved = None;
        for (tier, pe_limit) in attempts {
            match self.solver.solve(&problem, initial_guess, pe_limit) {
                SolveOutcome::Solution(x) => {
                    solved = Some((tier, x));
                    break;
                }
                SolveOutcome::Infeasible { min_violation } => {
                    warn!(
                        tier = tier.as_str(),
                        pe_limit = pe_limit,
                        min_violation = min_violation,
                        "Constrained solve failed"
                    );
                }
            }
        }

        let (tier, mut value) = solved.unwrap_or_else(|| {
            let fallback = percentile(samples, FALLBACK_PERCENTILE) * FALLBACK_INFLATION;
            warn!(
                fallback = fallback,
                "Solver exhausted, using inflated 98th percentile"
            );
            (SolutionTier::PercentileFallback, fallback)
        });
        self.metrics.inc_optimizer_solution(tier.as_str());

        let degenerate = value < SOLUTION_MIN;
        if degenerate {
            let substitute = percentile(samples, FALLBACK_PERCENTILE) * DEGENERATE_REDUCTION;
            warn!(
                solution = value,
                substitute = substitute,
                "Solution below domain lower bound, using reduced 98th percentile"
            );
            self.metrics.inc_degenerate_solutions();
            value = substitute;
        }

        let mean_throttle = mean(throttles);
        let throttle_inflated = mean_throttle > THROTTLE_THRESHOLD;
        if throttle_inflated {
            let inflated = value + value * mean_throttle;
            warn!(
                mean_throttle = mean_throttle,
                solution = value,
                inflated = inflated,
                "Workload heavily throttled, inflating target"
            );
            self.metrics.inc_throttle_inflations();
            value = inflated;
        }

        debug!(
            ue_weight = self.ue_weight,
            tier = tier.as_str(),
            value = value,
            samples = samples.len(),
            "Interval optimized"
        );

        OptimizedTarget {
            value,
            tier,
            degenerate,
            throttle_inflated,
        }
    }
}
