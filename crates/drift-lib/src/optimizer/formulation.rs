//! Objective and constraint of the per-interval optimization

/// Weighted asymmetric loss over one interval's normalized samples
pub struct ProblemFormulation<'a> {
    samples: &'a [f64],
    ue_weight: f64,
}

impl<'a> ProblemFormulation<'a> {
    pub fn new(samples: &'a [f64], ue_weight: f64) -> Self {
        Self { samples, ue_weight }
    }

    pub fn samples(&self) -> &[f64] {
        self.samples
    }

    /// Sum of weighted under- and over-estimation for candidate `x`
    pub fn objective(&self, x: f64) -> f64 {
        self.samples
            .iter()
            .map(|s| {
                let under = (s - x).max(0.0);
                let over = (x - s).max(0.0);
                self.ue_weight * under + (1.0 - self.ue_weight) * over
            })
            .sum()
    }

    /// Mean relative under-estimation in percent, over samples above `x`.
    ///
    /// When no sample is under-estimated the constraint holds trivially
    /// and the error is zero.
    pub fn percentage_error(&self, x: f64) -> f64 {
        let (sum, count) = self
            .samples
            .iter()
            .filter(|s| x < **s)
            .fold((0.0, 0usize), |(sum, count), s| (sum + (x - s).abs() / s, count + 1));
        if count == 0 {
            return 0.0;
        }
        100.0 * sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_weights_under_estimation() {
        let samples = [1.0, 2.0, 3.0];
        let p = ProblemFormulation::new(&samples, 0.9);
        // under: 1.0 (from 3.0), over: 1.0 (from 1.0)
        assert!((p.objective(2.0) - (0.9 + 0.1)).abs() < 1e-12);
        // everything under-estimated
        assert!((p.objective(0.0) - 0.9 * 6.0).abs() < 1e-12);
        // everything over-estimated
        assert!((p.objective(4.0) - 0.1 * 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentage_error() {
        let samples = [0.5, 1.0, 2.0];
        let p = ProblemFormulation::new(&samples, 0.9);
        // only 2.0 is above 1.5: |1.5 - 2| / 2 = 25%
        assert!((p.percentage_error(1.5) - 25.0).abs() < 1e-9);
        // 1.0 and 2.0 above 0.8: (0.2 + 0.6) / 2 = 40%
        assert!((p.percentage_error(0.8) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentage_error_empty_set_is_zero() {
        let samples = [0.5, 1.0];
        let p = ProblemFormulation::new(&samples, 0.9);
        assert_eq!(p.percentage_error(1.0), 0.0);
        assert_eq!(p.percentage_error(1.5), 0.0);
    }
}
