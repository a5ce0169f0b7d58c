/// Globally adaptive Gauss-Kronrod quadrature on a finite interval.
///
/// Each subinterval is estimated with the 15-point Kronrod rule. The embedded
/// 7-point Gauss rule supplies the error estimate. While the summed error
/// estimate exceeds `max(abs_tolerance, rel_tolerance * |value|)`, the
/// subinterval with the largest error is bisected, up to `max_subintervals`.
///
/// The integrator never fails. When the tolerance cannot be met within the
/// subinterval budget, it returns its best estimate and clears
/// [`QuadratureOutcome::converged`], so the caller decides how to report it.
/// Discontinuous integrands, such as differences of step functions, usually
/// end up there unless their jumps are handed to
/// [`AdaptiveQuadrature::integrate_with_points`].
///
/// # Examples
///
/// ```
/// # use tte_stats::quadrature::AdaptiveQuadrature;
/// let outcome = AdaptiveQuadrature::default().integrate(|x| x * x, 0.0, 3.0);
/// assert!(outcome.converged);
/// assert!((outcome.value - 9.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveQuadrature {
    /// Absolute error tolerance.
    pub abs_tolerance: f64,
    /// Relative error tolerance.
    pub rel_tolerance: f64,
    /// Maximum number of subintervals before giving up on the tolerance.
    pub max_subintervals: usize,
}

impl Default for AdaptiveQuadrature {
    fn default() -> Self {
        Self {
            abs_tolerance: 1.49e-8,
            rel_tolerance: 1.49e-8,
            max_subintervals: 50,
        }
    }
}

/// Result of an [`AdaptiveQuadrature::integrate`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureOutcome {
    /// The integral estimate.
    pub value: f64,
    /// Estimated absolute error of `value`.
    pub abs_error: f64,
    /// The error bound that had to be met.
    pub tolerance: f64,
    /// Number of subintervals in the final partition.
    pub subintervals: usize,
    /// Number of integrand evaluations.
    pub evaluations: usize,
    /// Whether `abs_error <= tolerance` was reached.
    pub converged: bool,
}

// Kronrod abscissae on [-1, 1], descending; odd indices are the Gauss nodes.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

#[derive(Debug, Clone, Copy)]
struct Segment {
    lower: f64,
    upper: f64,
    value: f64,
    error: f64,
}

impl Segment {
    fn estimate<F>(f: &mut F, lower: f64, upper: f64) -> Self
    where
        F: FnMut(f64) -> f64,
    {
        let center = 0.5 * (lower + upper);
        let half = 0.5 * (upper - lower);

        let fc = f(center);
        let mut kronrod = fc * WGK[7];
        let mut gauss = fc * WG[3];
        for (j, (&x, &wk)) in XGK.iter().zip(&WGK).take(7).enumerate() {
            let dx = half * x;
            let pair = f(center - dx) + f(center + dx);
            kronrod += wk * pair;
            if j % 2 == 1 {
                gauss += WG[j / 2] * pair;
            }
        }

        Self {
            lower,
            upper,
            value: kronrod * half,
            error: ((kronrod - gauss) * half).abs(),
        }
    }
}

const EVALUATIONS_PER_SEGMENT: usize = 15;

impl AdaptiveQuadrature {
    /// Integrates `f` over `[lower, upper]`.
    ///
    /// `lower` and `upper` must be finite. Reversed bounds give the negated
    /// integral; equal bounds give zero.
    pub fn integrate<F>(&self, f: F, lower: f64, upper: f64) -> QuadratureOutcome
    where
        F: FnMut(f64) -> f64,
    {
        self.integrate_with_points(f, lower, upper, &[])
    }

    /// Integrates `f` over `[lower, upper]`, starting from a partition cut at `points`.
    ///
    /// `points` marks known discontinuities or other trouble spots of `f`;
    /// those outside the open interval are ignored. The initial partition is
    /// never limited by `max_subintervals`, only the bisections after it are.
    /// A piecewise-constant integrand whose jumps are all listed is integrated
    /// exactly on the first pass.
    ///
    /// ```
    /// # use tte_stats::quadrature::AdaptiveQuadrature;
    /// let step = |x: f64| if x >= 4.2 && x < 4.7 { 1.0 } else { 0.0 };
    /// let quad = AdaptiveQuadrature::default();
    ///
    /// let outcome = quad.integrate_with_points(step, 0.0, 25.0, &[4.2, 4.7]);
    /// assert!(outcome.converged);
    /// assert!((outcome.value - 0.5).abs() < 1e-12);
    /// ```
    pub fn integrate_with_points<F>(
        &self,
        mut f: F,
        lower: f64,
        upper: f64,
        points: &[f64],
    ) -> QuadratureOutcome
    where
        F: FnMut(f64) -> f64,
    {
        if lower == upper {
            return QuadratureOutcome {
                value: 0.0,
                abs_error: 0.0,
                tolerance: self.abs_tolerance,
                subintervals: 0,
                evaluations: 0,
                converged: true,
            };
        }
        if upper < lower {
            let outcome = self.integrate_with_points(f, upper, lower, points);
            return QuadratureOutcome {
                value: -outcome.value,
                ..outcome
            };
        }

        let mut cuts = points
            .iter()
            .copied()
            .filter(|p| *p > lower && *p < upper)
            .collect::<Vec<_>>();
        cuts.push(lower);
        cuts.push(upper);
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();

        let mut segments = cuts
            .windows(2)
            .map(|w| Segment::estimate(&mut f, w[0], w[1]))
            .collect::<Vec<_>>();
        let mut evaluations = segments.len() * EVALUATIONS_PER_SEGMENT;
        let max_subintervals = self.max_subintervals.max(segments.len());

        loop {
            let value = segments.iter().map(|s| s.value).sum::<f64>();
            let abs_error = segments.iter().map(|s| s.error).sum::<f64>();
            let tolerance = f64::max(self.abs_tolerance, self.rel_tolerance * value.abs());

            let converged = abs_error <= tolerance;
            let worst = segments
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.error.total_cmp(&b.error))
                .map(|(i, _)| i);
            let splittable = worst.filter(|&i| {
                let s = segments[i];
                let mid = 0.5 * (s.lower + s.upper);
                mid > s.lower && mid < s.upper
            });

            let (Some(i), false, true) = (
                splittable,
                converged,
                segments.len() < max_subintervals,
            ) else {
                return QuadratureOutcome {
                    value,
                    abs_error,
                    tolerance,
                    subintervals: segments.len(),
                    evaluations,
                    converged,
                };
            };

            let s = segments.swap_remove(i);
            let mid = 0.5 * (s.lower + s.upper);
            segments.push(Segment::estimate(&mut f, s.lower, mid));
            segments.push(Segment::estimate(&mut f, mid, s.upper));
            evaluations += 2 * EVALUATIONS_PER_SEGMENT;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_polynomial_is_exact_on_first_pass() {
        let outcome = AdaptiveQuadrature::default().integrate(|x| 3.0 * x * x - x, -1.0, 2.0);
        assert!(outcome.converged);
        assert_eq!(outcome.subintervals, 1);
        assert_eq!(outcome.evaluations, 15);
        assert_abs_diff_eq!(outcome.value, 7.5, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_integrand_converges() {
        let outcome = AdaptiveQuadrature::default().integrate(f64::sin, 0.0, PI);
        assert!(outcome.converged);
        assert_abs_diff_eq!(outcome.value, 2.0, epsilon = 1e-10);
        assert!(outcome.abs_error <= outcome.tolerance);
    }

    #[test]
    fn test_step_integrand_reports_non_convergence() {
        let quad = AdaptiveQuadrature::default();
        // A staircase with 100 jumps cannot be resolved within 50 subintervals.
        let outcome = quad.integrate(|x| (x * 100.0).floor() / 100.0, 0.0, 1.0);
        assert!(!outcome.converged);
        assert_eq!(outcome.subintervals, quad.max_subintervals);
        assert!(outcome.abs_error > outcome.tolerance);
        assert_abs_diff_eq!(outcome.value, 0.495, epsilon = 1e-2);
    }

    #[test]
    fn test_points_resolve_narrow_features() {
        // The bump lies between the first-pass Kronrod nodes of [0, 25], so the
        // plain integrator never sees it.
        let bump = |x: f64| if (4.2..4.7).contains(&x) { 1.0 } else { 0.0 };
        let quad = AdaptiveQuadrature::default();

        let blind = quad.integrate(bump, 0.0, 25.0);
        assert_eq!(blind.value, 0.0);

        let outcome = quad.integrate_with_points(bump, 0.0, 25.0, &[4.2, 4.7, -3.0, 40.0]);
        assert!(outcome.converged);
        assert_eq!(outcome.subintervals, 3);
        assert_abs_diff_eq!(outcome.value, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_points_beyond_budget_are_kept() {
        let quad = AdaptiveQuadrature {
            max_subintervals: 2,
            ..AdaptiveQuadrature::default()
        };
        let points = (1..10).map(f64::from).collect::<Vec<_>>();
        let outcome = quad.integrate_with_points(f64::floor, 0.0, 10.0, &points);
        assert!(outcome.converged);
        assert_eq!(outcome.subintervals, 10);
        assert_abs_diff_eq!(outcome.value, 45.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reversed_and_empty_bounds() {
        let quad = AdaptiveQuadrature::default();
        let forward = quad.integrate(|x| x, 0.0, 4.0);
        let backward = quad.integrate(|x| x, 4.0, 0.0);
        assert_abs_diff_eq!(forward.value, 8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(backward.value, -8.0, epsilon = 1e-12);

        let empty = quad.integrate(|_| panic!("must not evaluate"), 1.0, 1.0);
        assert_eq!(empty.value, 0.0);
        assert!(empty.converged);
        assert_eq!(empty.evaluations, 0);
    }

    #[test]
    fn test_subinterval_budget_is_respected() {
        let quad = AdaptiveQuadrature {
            max_subintervals: 4,
            ..AdaptiveQuadrature::default()
        };
        let mut calls = 0;
        let outcome = quad.integrate(
            |x| {
                calls += 1;
                if x >= 0.5_f64.sqrt() { 1.0 } else { 0.0 }
            },
            0.0,
            1.0,
        );
        assert!(!outcome.converged);
        assert!(outcome.subintervals <= 4);
        assert_eq!(outcome.evaluations, calls);
    }
}
