//! Bounded scalar solver for the constrained per-interval problem
//!
//! The objective is piecewise linear with breakpoints at the samples. The
//! percentage error only counts samples strictly above `x`, so between two
//! neighboring breakpoints `[l, r)` the set of under-estimated samples is
//! fixed and the error falls continuously as `x` grows. The feasible part
//! of each gap is therefore `[a, r)`, and the constrained optimum is a
//! breakpoint, the left limit just below one, or a feasibility edge `a`.
//! The solver enumerates exactly those points.

use super::formulation::ProblemFormulation;
use std::cmp::Ordering;

/// Lower bound of the decision variable (fraction of the resource request)
pub const SOLUTION_MIN: f64 = 0.05;

/// Upper bound of the decision variable
pub const SOLUTION_MAX: f64 = 2.0;

const DEFAULT_REFINE_ITERATIONS: usize = 60;
const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// Result of one constrained solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolveOutcome {
    /// Feasible minimizer within the bounds
    Solution(f64),
    /// No point in the bounds satisfies the constraint
    Infeasible {
        /// Smallest amount by which the constraint was exceeded
        min_violation: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: f64,
    objective: f64,
    violation: f64,
}

impl Candidate {
    fn feasible(&self) -> bool {
        self.objective.is_finite() && self.violation <= FEASIBILITY_TOLERANCE
    }
}

/// Exact search over the breakpoints of `[lower, upper]`
#[derive(Debug, Clone)]
pub struct BoundedSolver {
    lower: f64,
    upper: f64,
    refine_iterations: usize,
}

impl Default for BoundedSolver {
    fn default() -> Self {
        Self::new(SOLUTION_MIN, SOLUTION_MAX)
    }
}

impl BoundedSolver {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            refine_iterations: DEFAULT_REFINE_ITERATIONS,
        }
    }

    /// Minimize the objective subject to `percentage_error(x) <= pe_limit`.
    ///
    /// `initial_guess` is scored alongside the breakpoints; ties go to the
    /// smallest `x`.
    pub fn solve(
        &self,
        problem: &ProblemFormulation<'_>,
        initial_guess: f64,
        pe_limit: f64,
    ) -> SolveOutcome {
        let evaluate = |x: f64| Candidate {
            x,
            objective: problem.objective(x),
            violation: problem.percentage_error(x) - pe_limit,
        };

        let breakpoints = self.breakpoints(problem.samples());
        let mut candidates: Vec<Candidate> = breakpoints.iter().map(|&x| evaluate(x)).collect();
        if initial_guess.is_finite() {
            candidates.push(evaluate(initial_guess.clamp(self.lower, self.upper)));
        }

        for gap in breakpoints.windows(2) {
            let (l, r) = (gap[0], gap[1]);
            let left_limit = next_below(r);
            if left_limit <= l {
                continue;
            }
            let start = evaluate(l);
            let end = evaluate(left_limit);
            candidates.push(end);
            if end.feasible() && !start.feasible() {
                candidates.push(self.bisect_edge(end, start, &evaluate));
            }
        }

        candidates.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        let best = candidates
            .iter()
            .filter(|c| c.feasible())
            .fold(None, |best: Option<&Candidate>, c| match best {
                Some(b) if b.objective <= c.objective => Some(b),
                _ => Some(c),
            });

        match best {
            Some(solution) => SolveOutcome::Solution(solution.x),
            None => {
                let min_violation = candidates
                    .iter()
                    .map(|c| c.violation)
                    .filter(|v| v.is_finite())
                    .fold(f64::INFINITY, f64::min);
                SolveOutcome::Infeasible { min_violation }
            }
        }
    }

    /// Bounds and in-range samples, sorted and deduplicated
    fn breakpoints(&self, samples: &[f64]) -> Vec<f64> {
        let mut points = Vec::with_capacity(samples.len() + 2);
        points.push(self.lower);
        points.push(self.upper);
        points.extend(
            samples
                .iter()
                .copied()
                .filter(|s| s.is_finite() && *s > self.lower && *s < self.upper),
        );
        points.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        points.dedup();
        points
    }

    /// Walk from a feasible point toward an infeasible one, keeping feasibility
    fn bisect_edge<F>(&self, feasible: Candidate, infeasible: Candidate, evaluate: &F) -> Candidate
    where
        F: Fn(f64) -> Candidate,
    {
        let (mut inside, mut outside) = (feasible, infeasible);
        for _ in 0..self.refine_iterations {
            let mid = evaluate(0.5 * (inside.x + outside.x));
            if mid.feasible() {
                inside = mid;
            } else {
                outside = mid;
            }
        }
        inside
    }
}

/// Largest `f64` strictly below a positive finite `x`
fn next_below(x: f64) -> f64 {
    f64::from_bits(x.to_bits() - 1)
}
