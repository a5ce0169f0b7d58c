//! Critical and non-critical error at operator-chosen security levels.
//!
//! A security level `sl` asks for a prediction the realized event beats with
//! probability `sl`. The forecast is therefore read at the `1 - sl` quantile.
//! Each residual `observation - prediction` is then split by sign:
//!
//! ```text
//! residual >= 0   event at or after the prediction   -> non-critical (slack)
//! residual <  0   event before the prediction        -> critical (miss)
//! ```
//!
//! For departure times, a critical miss means the vehicle left before the
//! predicted time and whoever relied on the prediction missed it. Non-critical
//! slack means it left later and they waited. The two sides have different
//! costs, so they are reported separately and never netted out.

use log::debug;
use tte_stats::descriptive::mean;

use crate::{
    error::{LevelDomain, MetricError},
    observation::Observations,
    prediction::{QuantileResolver, check_aligned, resolve_aligned},
    table::{MetricRow, MetricTable},
};

/// Mean one-sided errors at one security level.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct CriticalErrorRow {
    /// Mean slack of events at or after the predicted quantile.
    pub non_critical: f64,
    /// Mean shortfall of events before the predicted quantile.
    pub critical: f64,
}

/// Splits a residual into its `(non_critical, critical)` contributions.
///
/// A zero residual counts as non-critical. Exactly one side can be nonzero, and
/// `non_critical - critical == residual`.
#[must_use]
pub fn split_residual(residual: f64) -> (f64, f64) {
    if residual >= 0.0 {
        (residual, 0.0)
    } else {
        (0.0, -residual)
    }
}

/// Computes critical and non-critical error for every requested security level.
///
/// All levels are validated against `(0, 1)` and the forecast against the
/// observation count before any row is computed. Any failure, including a
/// quantile missing from a non-parametric table, fails the whole call.
///
/// # Examples
///
/// ```
/// use tte_metrics::{
///     critical::critical_errors, observation::Observations,
///     prediction::ParametricPrediction,
/// };
///
/// let observations = Observations::from_groups([vec![5.0, 10.0, 15.0]]).unwrap();
/// let prediction = ParametricPrediction::new(vec![10.0; 3], vec![0.0; 3]).unwrap();
///
/// let table = critical_errors(&prediction, &observations, &[0.5]).unwrap();
/// let row = table.get(0.5).unwrap();
/// assert!((row.non_critical - 5.0 / 3.0).abs() < 1e-12);
/// assert!((row.critical - 5.0 / 3.0).abs() < 1e-12);
/// ```
pub fn critical_errors<R>(
    prediction: &R,
    observations: &Observations,
    security_levels: &[f64],
) -> Result<MetricTable<CriticalErrorRow>, MetricError>
where
    R: QuantileResolver + ?Sized,
{
    for &level in security_levels {
        LevelDomain::SecurityLevel.check(level)?;
    }
    check_aligned(prediction, observations)?;

    let rows = security_levels
        .iter()
        .map(|&level| {
            let values = critical_error_at(prediction, observations, level)?;
            debug!(
                "security level {level}: non-critical {:.4}, critical {:.4}",
                values.non_critical, values.critical
            );
            Ok(MetricRow { level, values })
        })
        .collect::<Result<Vec<_>, MetricError>>()?;
    Ok(MetricTable::from_rows(rows))
}

fn critical_error_at<R>(
    prediction: &R,
    observations: &Observations,
    security_level: f64,
) -> Result<CriticalErrorRow, MetricError>
where
    R: QuantileResolver + ?Sized,
{
    let quantile = resolve_aligned(prediction, 1.0 - security_level, observations)?;
    let (non_critical, critical): (Vec<f64>, Vec<f64>) = observations
        .iter()
        .zip(quantile)
        .map(|(observed, predicted)| split_residual(observed - predicted))
        .unzip();

    Ok(CriticalErrorRow {
        non_critical: mean(non_critical).unwrap_or(f64::NAN),
        critical: mean(critical).unwrap_or(f64::NAN),
    })
}

/// Plot-ready series for stacking critical against non-critical error.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SecurityLevelChart {
    /// Security levels as whole percentages, in table order.
    pub labels: Vec<f64>,
    pub critical: Vec<f64>,
    pub non_critical: Vec<f64>,
}

impl MetricTable<CriticalErrorRow> {
    /// Extracts the series of a stacked security-level chart.
    ///
    /// Labels are `level * 100` rounded to whole percent, half to even.
    #[must_use]
    pub fn chart(&self) -> SecurityLevelChart {
        SecurityLevelChart {
            labels: self
                .levels()
                .map(|level| (level * 100.0).round_ties_even())
                .collect(),
            critical: self.rows().iter().map(|row| row.values.critical).collect(),
            non_critical: self
                .rows()
                .iter()
                .map(|row| row.values.non_critical)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::prediction::{NonParametricPrediction, ParametricPrediction, Prediction};

    fn observations() -> Observations {
        Observations::from_groups([vec![5.0, 10.0, 15.0]]).unwrap()
    }

    fn degenerate() -> ParametricPrediction {
        ParametricPrediction::new(vec![10.0; 3], vec![0.0; 3]).unwrap()
    }

    #[test]
    fn test_degenerate_parametric_scenario() {
        let table = critical_errors(&degenerate(), &observations(), &[0.5]).unwrap();
        let row = table.get(0.5).unwrap();
        assert_abs_diff_eq!(row.non_critical, 5.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(row.critical, 5.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_table_scenario_matches_parametric() {
        let table = NonParametricPrediction::from_keyed([("0.50", vec![10.0; 3])]).unwrap();
        let from_table = critical_errors(&table, &observations(), &[0.5]).unwrap();
        let from_gaussian = critical_errors(&degenerate(), &observations(), &[0.5]).unwrap();
        assert_eq!(from_table, from_gaussian);
    }

    #[test]
    fn test_rows_follow_request_order() {
        let prediction = ParametricPrediction::new(vec![10.0; 3], vec![2.0; 3]).unwrap();
        let levels = [0.9, 0.1, 0.5];
        let table = critical_errors(&prediction, &observations(), &levels).unwrap();
        assert_eq!(table.levels().collect::<Vec<_>>(), levels);
    }

    #[test]
    fn test_higher_security_moves_prediction_earlier() {
        let prediction = ParametricPrediction::new(vec![10.0; 3], vec![2.0; 3]).unwrap();
        let table = critical_errors(&prediction, &observations(), &[0.1, 0.5, 0.9]).unwrap();
        let critical = table.rows().iter().map(|r| r.values.critical).collect::<Vec<_>>();
        let non_critical = table
            .rows()
            .iter()
            .map(|r| r.values.non_critical)
            .collect::<Vec<_>>();
        assert!(critical.is_sorted_by(|a, b| a >= b), "{critical:?}");
        assert!(non_critical.is_sorted_by(|a, b| a <= b), "{non_critical:?}");
    }

    #[test]
    fn test_parametric_prediction_is_clamped() {
        // The 0.1 quantile of N(1, 5) is far below zero and clamps to 0, so every
        // observation counts as slack.
        let prediction = ParametricPrediction::new(vec![1.0; 3], vec![5.0; 3]).unwrap();
        let table = critical_errors(&prediction, &observations(), &[0.9]).unwrap();
        let row = table.get(0.9).unwrap();
        assert_abs_diff_eq!(row.non_critical, 10.0, epsilon = 1e-12);
        assert_eq!(row.critical, 0.0);
    }

    #[test]
    fn test_invalid_level_fails_before_computing() {
        // The missing 0.50 key would fail too, but the level check comes first.
        let table = NonParametricPrediction::from_keyed([("0.10", vec![1.0; 3])]).unwrap();
        for level in [0.0, 1.0, -0.2, f64::NAN] {
            let err = critical_errors(&table, &observations(), &[0.9, 0.5, level]).unwrap_err();
            assert!(
                matches!(
                    err,
                    MetricError::InvalidLevel {
                        domain: LevelDomain::SecurityLevel,
                        ..
                    }
                ),
                "{err}"
            );
        }
    }

    #[test]
    fn test_missing_key_fails_whole_call() {
        let table = NonParametricPrediction::from_keyed([("0.10", vec![1.0; 3])]).unwrap();
        let err = critical_errors(&table, &observations(), &[0.9, 0.5]).unwrap_err();
        assert_eq!(
            err,
            MetricError::KeyMissing {
                level: "0.5".parse().unwrap()
            }
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let prediction: Prediction = ParametricPrediction::new(vec![1.0; 2], vec![1.0; 2])
            .unwrap()
            .into();
        assert_eq!(
            critical_errors(&prediction, &observations(), &[0.5]),
            Err(MetricError::ShapeMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_chart_series() {
        let table = critical_errors(&degenerate(), &observations(), &[0.125, 0.5]).unwrap();
        let chart = table.chart();
        assert_eq!(chart.labels, vec![12.0, 50.0]);
        assert_eq!(chart.critical.len(), 2);
        assert_eq!(chart.non_critical[1], table.get(0.5).unwrap().non_critical);
    }

    proptest! {
        #[test]
        fn residual_split_is_disjoint(residual in -1e6..1e6_f64) {
            let (non_critical, critical) = split_residual(residual);
            prop_assert!(non_critical >= 0.0 && critical >= 0.0);
            prop_assert!(non_critical == 0.0 || critical == 0.0);
            prop_assert_eq!(non_critical - critical, residual);
        }
    }

    #[test]
    fn test_zero_residual_is_non_critical() {
        assert_eq!(split_residual(0.0), (0.0, 0.0));
        assert_eq!(split_residual(2.5), (2.5, 0.0));
        assert_eq!(split_residual(-2.5), (0.0, 2.5));
    }
}
