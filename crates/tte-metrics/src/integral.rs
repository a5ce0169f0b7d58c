//! Integral error: the L1 distance between the predicted and observed CDFs.
//!
//! The predicted CDF is the empirical CDF of one representative sample of the
//! forecast (see [`PredictedSample`]), the observed CDF that of the
//! observations. Their absolute gap is integrated over a fixed domain:
//!
//! ```text
//! E = integral over [lower, upper] of |F_pred(x) - F_obs(x)| dx
//! ```
//!
//! Mass outside the domain does not contribute. The domain is never widened to
//! fit the data; an [`IntegralDiagnostic::OutsideDomain`] reports it instead.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tte_stats::quadrature::AdaptiveQuadrature;

use crate::{
    curves::{CdfComparison, PredictedSample},
    error::MetricError,
    observation::Observations,
};

/// Settings of the adaptive Gauss-Kronrod integrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadratureConfig {
    /// Absolute error tolerance. Defaults to `1.49e-8`.
    pub abs_tolerance: f64,
    /// Relative error tolerance. Defaults to `1.49e-8`.
    pub rel_tolerance: f64,
    /// Subinterval budget of the refinement loop. Defaults to 50.
    pub max_subintervals: usize,
    /// Starts from a partition cut at every CDF jump inside the domain.
    /// Defaults to `true`.
    ///
    /// The gap is constant between jumps, so every initial segment is
    /// integrated exactly. Without the cuts, steps narrower than the spacing
    /// of the Kronrod nodes can be missed entirely and ECDFs with many steps
    /// usually exhaust the budget.
    pub split_at_jumps: bool,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        let AdaptiveQuadrature {
            abs_tolerance,
            rel_tolerance,
            max_subintervals,
        } = AdaptiveQuadrature::default();
        Self {
            abs_tolerance,
            rel_tolerance,
            max_subintervals,
            split_at_jumps: true,
        }
    }
}

impl QuadratureConfig {
    #[must_use]
    pub fn integrator(&self) -> AdaptiveQuadrature {
        AdaptiveQuadrature {
            abs_tolerance: self.abs_tolerance,
            rel_tolerance: self.rel_tolerance,
            max_subintervals: self.max_subintervals,
        }
    }
}

/// Interval `[lower, upper)` the CDF gap is integrated over.
///
/// The upper end is open: a CDF jump exactly at `upper` only takes effect
/// where integration stops, so it is as invisible to the integral as one
/// beyond it. A jump at `lower` shifts the CDF across the whole domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationDomain {
    pub lower: f64,
    pub upper: f64,
}

impl Default for IntegrationDomain {
    /// `[0, 25]`, wide enough for typical waiting times in minutes.
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 25.0,
        }
    }
}

impl IntegrationDomain {
    /// Whether a CDF jump at `x` contributes to the integral.
    #[must_use]
    pub fn contains(&self, x: f64) -> bool {
        (self.lower..self.upper).contains(&x)
    }

    fn count_outside<'a>(&self, values: impl IntoIterator<Item = &'a f64>) -> usize {
        values.into_iter().filter(|v| !self.contains(**v)).count()
    }
}

/// Settings of [`integral_error`].
///
/// Every field is optional when deserializing:
///
/// ```
/// # use tte_metrics::integral::IntegralErrorConfig;
/// let config: IntegralErrorConfig =
///     serde_json::from_str(r#"{ "seed": 7, "domain": { "lower": 0, "upper": 60 } }"#).unwrap();
/// assert_eq!(config.seed, Some(7));
/// assert_eq!(config.domain.upper, 60.0);
/// assert_eq!(config.sample_size, 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegralErrorConfig {
    /// Integration domain. Defaults to `[0, 25]`.
    pub domain: IntegrationDomain,
    /// Draws taken from the pooled Gaussian of a parametric forecast.
    /// Defaults to 1000.
    pub sample_size: usize,
    /// Seed of the sampling generator. `None` seeds from the OS, so repeated
    /// parametric evaluations differ slightly.
    pub seed: Option<u64>,
    pub quadrature: QuadratureConfig,
}

impl Default for IntegralErrorConfig {
    fn default() -> Self {
        Self {
            domain: IntegrationDomain::default(),
            sample_size: 1000,
            seed: None,
            quadrature: QuadratureConfig::default(),
        }
    }
}

impl IntegralErrorConfig {
    /// Checks that the configuration describes a computable integral.
    pub fn validate(&self) -> Result<(), MetricError> {
        let invalid = |reason: String| Err(MetricError::InvalidConfig { reason });
        let IntegrationDomain { lower, upper } = self.domain;
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return invalid(format!("domain [{lower}, {upper}] must be finite and non-empty"));
        }
        if self.sample_size == 0 {
            return invalid("sample size must be positive".to_owned());
        }
        let QuadratureConfig {
            abs_tolerance,
            rel_tolerance,
            max_subintervals,
            ..
        } = self.quadrature;
        if !(abs_tolerance >= 0.0 && rel_tolerance >= 0.0) {
            return invalid(format!(
                "tolerances must be non-negative, got {abs_tolerance} and {rel_tolerance}"
            ));
        }
        if abs_tolerance == 0.0 && rel_tolerance == 0.0 {
            return invalid("at least one tolerance must be positive".to_owned());
        }
        if max_subintervals == 0 {
            return invalid("subinterval budget must be positive".to_owned());
        }
        Ok(())
    }
}

/// Condition worth reporting that does not invalidate the integral.
#[derive(
    Debug, Clone, Copy, PartialEq, Serialize, derive_more::Display, derive_more::IsVariant,
)]
#[serde(tag = "kind")]
pub enum IntegralDiagnostic {
    /// The tolerance was not met within the subinterval budget. The value is
    /// the best estimate reached.
    #[display(
        "integral did not converge within {subintervals} subintervals: error estimate {abs_error_estimate:e} above tolerance {tolerance:e}"
    )]
    NonConvergence {
        subintervals: usize,
        abs_error_estimate: f64,
        tolerance: f64,
    },
    /// Values outside the domain. Their mass is invisible to the integral.
    #[display(
        "{observations} observations and {predictions} predicted values lie outside [{lower}, {upper})"
    )]
    OutsideDomain {
        observations: usize,
        predictions: usize,
        lower: f64,
        upper: f64,
    },
}

/// Result of [`integral_error`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegralErrorReport {
    /// Integral of the CDF gap.
    pub value: f64,
    /// Absolute error estimate of the integrator.
    pub abs_error: f64,
    pub diagnostics: Vec<IntegralDiagnostic>,
}

impl IntegralErrorReport {
    /// `true` unless the integrator ran out of subintervals.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(IntegralDiagnostic::is_non_convergence)
    }
}

/// Computes the integral error of a forecast against the observations.
///
/// Parametric forecasts are represented by `config.sample_size` draws from
/// their pooled Gaussian, so the result varies with the seed. Quantile tables
/// are represented by their per-level column means.
///
/// # Examples
///
/// ```
/// use tte_metrics::{
///     integral::{IntegralErrorConfig, integral_error},
///     observation::Observations,
///     prediction::NonParametricPrediction,
/// };
///
/// let observations = Observations::new(vec![3.0, 6.0, 12.0]).unwrap();
/// let prediction = NonParametricPrediction::from_keyed([
///     ("0.1", vec![2.0, 3.0, 4.0]),
///     ("0.5", vec![5.0, 6.0, 7.0]),
///     ("0.9", vec![9.0, 10.0, 11.0]),
/// ])
/// .unwrap();
///
/// let report = integral_error(&prediction, &observations, &IntegralErrorConfig::default()).unwrap();
/// // The CDFs only differ on [10, 12), by one third.
/// assert!((report.value - 2.0 / 3.0).abs() < 1e-9);
/// assert!(report.is_converged());
/// ```
pub fn integral_error<P>(
    prediction: &P,
    observations: &Observations,
    config: &IntegralErrorConfig,
) -> Result<IntegralErrorReport, MetricError>
where
    P: PredictedSample + ?Sized,
{
    config.validate()?;
    let comparison = CdfComparison::build(prediction, observations, config)?;

    let IntegrationDomain { lower, upper } = config.domain;
    let integrator = config.quadrature.integrator();
    let gap = |x| comparison.gap(x);
    let outcome = if config.quadrature.split_at_jumps {
        integrator.integrate_with_points(gap, lower, upper, &comparison.jump_points())
    } else {
        integrator.integrate(gap, lower, upper)
    };
    debug!(
        "integral error {:.6} (error estimate {:.2e}, {} subintervals, {} evaluations)",
        outcome.value, outcome.abs_error, outcome.subintervals, outcome.evaluations
    );

    let mut diagnostics = vec![];
    if !outcome.converged {
        diagnostics.push(IntegralDiagnostic::NonConvergence {
            subintervals: outcome.subintervals,
            abs_error_estimate: outcome.abs_error,
            tolerance: outcome.tolerance,
        });
    }
    let outside_observations = config.domain.count_outside(comparison.observed().values());
    let outside_predictions = config.domain.count_outside(comparison.predicted().values());
    if outside_observations > 0 || outside_predictions > 0 {
        diagnostics.push(IntegralDiagnostic::OutsideDomain {
            observations: outside_observations,
            predictions: outside_predictions,
            lower,
            upper,
        });
    }
    for diagnostic in &diagnostics {
        warn!("{diagnostic}");
    }

    Ok(IntegralErrorReport {
        value: outcome.value,
        abs_error: outcome.abs_error,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64;

    use super::*;
    use crate::prediction::{NonParametricPrediction, ParametricPrediction, Prediction, QuantileLevel};

    fn seeded(seed: u64) -> IntegralErrorConfig {
        IntegralErrorConfig {
            seed: Some(seed),
            ..IntegralErrorConfig::default()
        }
    }

    fn gaussian_observations(location: f64, scale: f64, count: usize) -> Observations {
        let mut rng = Pcg64::seed_from_u64(1234);
        let normal = Normal::new(location, scale).unwrap();
        Observations::new(
            (0..count)
                .map(|_| normal.sample(&mut rng).max(0.0))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_matching_distribution_gives_small_error() {
        let observations = gaussian_observations(10.0, 2.0, 2000);
        let prediction = ParametricPrediction::new(vec![10.0; 2000], vec![2.0; 2000]).unwrap();
        let report = integral_error(&prediction, &observations, &seeded(7)).unwrap();
        assert!(report.value < 0.3, "{report:?}");
        assert!(report.is_converged());
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_shifted_distribution_gives_large_error() {
        // The L1 distance between CDFs of equal shape is the shift.
        let observations = gaussian_observations(10.0, 2.0, 2000);
        let prediction = ParametricPrediction::new(vec![15.0; 2000], vec![2.0; 2000]).unwrap();
        let report = integral_error(&prediction, &observations, &seeded(7)).unwrap();
        assert_abs_diff_eq!(report.value, 5.0, epsilon = 0.3);
    }

    #[test]
    fn test_parametric_result_is_reproducible_with_seed() {
        let observations = gaussian_observations(8.0, 3.0, 200);
        let prediction: Prediction =
            ParametricPrediction::new(vec![9.0; 200], vec![3.0; 200]).unwrap().into();
        let first = integral_error(&prediction, &observations, &seeded(99)).unwrap();
        let second = integral_error(&prediction, &observations, &seeded(99)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_quadrature_matches_exact_distance() {
        let observations = gaussian_observations(12.0, 4.0, 300);
        let prediction = ParametricPrediction::new(vec![11.0; 300], vec![3.0; 300]).unwrap();
        let config = seeded(3);
        let report = integral_error(&prediction, &observations, &config).unwrap();
        let exact = CdfComparison::build(&prediction, &observations, &config)
            .unwrap()
            .exact_distance(0.0, 25.0);
        assert_abs_diff_eq!(report.value, exact, epsilon = 1e-9);
    }

    fn staircase() -> (NonParametricPrediction, Observations) {
        // 80 observed jumps at 0.25 k, each trailed 0.1 later by a predicted one.
        let observations =
            Observations::new((1..=80_u8).map(|k| 0.25 * f64::from(k)).collect()).unwrap();
        let prediction = NonParametricPrediction::new((1..=80_u8).map(|k| {
            let level = QuantileLevel::from_probability(f64::from(k) / 100.0).unwrap();
            (level, vec![0.25 * f64::from(k) + 0.1; 80])
        }))
        .unwrap();
        (prediction, observations)
    }

    #[test]
    fn test_split_at_jumps_is_exact() {
        let (prediction, observations) = staircase();
        let report =
            integral_error(&prediction, &observations, &IntegralErrorConfig::default()).unwrap();
        assert_abs_diff_eq!(report.value, 0.1, epsilon = 1e-9);
        assert!(report.is_converged());
    }

    #[test]
    fn test_plain_integration_reports_non_convergence() {
        let (prediction, observations) = staircase();
        let mut config = IntegralErrorConfig::default();
        config.quadrature.split_at_jumps = false;
        let report = integral_error(&prediction, &observations, &config).unwrap();
        assert!(!report.is_converged());
        assert!(matches!(
            report.diagnostics.as_slice(),
            [IntegralDiagnostic::NonConvergence {
                subintervals: 50,
                ..
            }]
        ));
    }

    #[test]
    fn test_outside_domain_is_reported_not_widened() {
        let observations = Observations::new(vec![5.0, 30.0]).unwrap();
        let prediction = NonParametricPrediction::from_keyed([
            ("0.25", vec![4.0, 6.0]),
            ("0.75", vec![28.0, 34.0]),
        ])
        .unwrap();
        let report =
            integral_error(&prediction, &observations, &IntegralErrorConfig::default()).unwrap();
        assert_eq!(
            report.diagnostics,
            vec![IntegralDiagnostic::OutsideDomain {
                observations: 1,
                predictions: 1,
                lower: 0.0,
                upper: 25.0,
            }]
        );
        // Only [0, 25] counts, where both CDFs step from 0 to 1/2 at 5.
        assert_abs_diff_eq!(report.value, 0.0, epsilon = 1e-12);

        let mut config = IntegralErrorConfig::default();
        config.domain.upper = 40.0;
        let report = integral_error(&prediction, &observations, &config).unwrap();
        assert!(report.diagnostics.is_empty());
        // Observed reaches 1 at 30, predicted only at 31.
        assert_abs_diff_eq!(report.value, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_values_at_upper_bound_are_outside() {
        let domain = IntegrationDomain::default();
        assert!(domain.contains(0.0));
        assert!(domain.contains(24.999));
        assert!(!domain.contains(25.0));

        // The jumps at 25 happen where integration stops and change nothing.
        let observations = Observations::new(vec![5.0, 25.0]).unwrap();
        let prediction = NonParametricPrediction::from_keyed([
            ("0.25", vec![5.0, 5.0]),
            ("0.75", vec![25.0, 25.0]),
        ])
        .unwrap();
        let report =
            integral_error(&prediction, &observations, &IntegralErrorConfig::default()).unwrap();
        assert_abs_diff_eq!(report.value, 0.0, epsilon = 1e-12);
        assert_eq!(
            report.diagnostics,
            vec![IntegralDiagnostic::OutsideDomain {
                observations: 1,
                predictions: 1,
                lower: 0.0,
                upper: 25.0,
            }]
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let observations = Observations::new(vec![5.0, 6.0]).unwrap();
        let prediction = NonParametricPrediction::from_keyed([("0.5", vec![5.0])]).unwrap();
        assert_eq!(
            integral_error(&prediction, &observations, &IntegralErrorConfig::default()),
            Err(MetricError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config = IntegralErrorConfig::default();
        assert_eq!(config.domain, IntegrationDomain { lower: 0.0, upper: 25.0 });
        assert_eq!(config.sample_size, 1000);
        assert_eq!(config.quadrature.integrator(), AdaptiveQuadrature::default());
        assert!(config.quadrature.split_at_jumps);
        assert_eq!(config.validate(), Ok(()));

        let config: IntegralErrorConfig = serde_json::from_str(
            r#"{ "sample_size": 200, "quadrature": { "split_at_jumps": false } }"#,
        )
        .unwrap();
        assert_eq!(config.sample_size, 200);
        assert_eq!(config.seed, None);
        assert!(!config.quadrature.split_at_jumps);
        assert_eq!(config.quadrature.max_subintervals, 50);
    }

    #[test]
    fn test_invalid_configs() {
        let mut reversed = IntegralErrorConfig::default();
        reversed.domain = IntegrationDomain {
            lower: 25.0,
            upper: 0.0,
        };
        let mut unbounded = IntegralErrorConfig::default();
        unbounded.domain.upper = f64::INFINITY;
        let mut no_samples = IntegralErrorConfig::default();
        no_samples.sample_size = 0;
        let mut no_tolerance = IntegralErrorConfig::default();
        no_tolerance.quadrature.abs_tolerance = 0.0;
        no_tolerance.quadrature.rel_tolerance = 0.0;
        let mut nan_tolerance = IntegralErrorConfig::default();
        nan_tolerance.quadrature.rel_tolerance = f64::NAN;
        let mut no_budget = IntegralErrorConfig::default();
        no_budget.quadrature.max_subintervals = 0;

        let observations = Observations::new(vec![5.0]).unwrap();
        let prediction = NonParametricPrediction::from_keyed([("0.5", vec![5.0])]).unwrap();
        for config in [
            reversed,
            unbounded,
            no_samples,
            no_tolerance,
            nan_tolerance,
            no_budget,
        ] {
            assert!(matches!(
                config.validate(),
                Err(MetricError::InvalidConfig { .. })
            ));
            assert!(integral_error(&prediction, &observations, &config).is_err());
        }
    }

    #[test]
    fn test_report_serializes_tagged_diagnostics() {
        let report = IntegralErrorReport {
            value: 1.5,
            abs_error: 0.0,
            diagnostics: vec![IntegralDiagnostic::NonConvergence {
                subintervals: 50,
                abs_error_estimate: 0.5,
                tolerance: 0.25,
            }],
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "value": 1.5,
                "abs_error": 0.0,
                "diagnostics": [{
                    "kind": "NonConvergence",
                    "subintervals": 50,
                    "abs_error_estimate": 0.5,
                    "tolerance": 0.25,
                }],
            })
        );
        assert!(!report.is_converged());
    }
}
