//! Prediction-interval coverage: how far observations fall outside a central
//! quantile band, and how wide that band is.

use log::{debug, warn};
use tte_stats::descriptive::mean;

use crate::{
    error::{LevelDomain, MetricError},
    observation::Observations,
    prediction::{
        QuantileLevel, QuantileResolver, check_aligned, resolve_aligned, round_to_hundredths,
    },
    table::{MetricRow, MetricTable},
};

/// Quantile levels bounding a symmetric prediction interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IntervalLevels {
    pub lower: QuantileLevel,
    pub upper: QuantileLevel,
}

impl IntervalLevels {
    /// Converts an interval width in percent to its bounding levels.
    ///
    /// Every step rounds to two decimals:
    ///
    /// ```text
    /// pi    = round(width / 100)
    /// lower = round((1 - pi) / 2)
    /// upper = round(1 - lower)
    /// ```
    ///
    /// ```
    /// # use tte_metrics::interval::IntervalLevels;
    /// let levels = IntervalLevels::from_width(95.0).unwrap();
    /// assert_eq!(levels.lower.to_string(), "0.03");
    /// assert_eq!(levels.upper.to_string(), "0.97");
    /// ```
    pub fn from_width(width_pct: f64) -> Result<Self, MetricError> {
        let width_pct = LevelDomain::IntervalWidth.check(width_pct)?;
        let pi = round_to_hundredths(width_pct / 100.0);
        let lower = QuantileLevel::from_probability(round_to_hundredths((1.0 - pi) / 2.0))?;
        let upper = QuantileLevel::from_probability(round_to_hundredths(1.0 - lower.probability()))?;
        Ok(Self { lower, upper })
    }
}

/// Coverage statistics of one prediction interval.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct IntervalCoverageRow {
    /// Mean distance of observations to the interval, zero for those inside.
    pub mean_outside_error: f64,
    /// Mean of `upper - lower` over all cases.
    ///
    /// Negative when the forecast's quantiles cross; see `crossed_quantiles`.
    pub mean_width: f64,
    /// Number of cases whose lower bound exceeds their upper bound.
    ///
    /// Always zero for parametric forecasts. A nonzero count means the quantile
    /// table is not monotone in probability. The row is still reported as
    /// computed, but widths and outside errors for those cases are not meaningful.
    pub crossed_quantiles: usize,
}

/// Distance of `observed` to the interval `[lower, upper]`.
///
/// Falling early is checked first: an observation below `lower` contributes
/// `lower - observed`, one above `upper` contributes `observed - upper`, and
/// one inside contributes zero.
#[must_use]
pub fn outside_error(observed: f64, lower: f64, upper: f64) -> f64 {
    if lower > observed {
        lower - observed
    } else if observed > upper {
        observed - upper
    } else {
        0.0
    }
}

/// Computes coverage error and width for every requested interval width.
///
/// Widths are percentages in `(0, 100]`. As with the critical error, all
/// widths and the forecast shape are validated up front and any failure fails
/// the whole call.
///
/// # Examples
///
/// ```
/// use tte_metrics::{
///     interval::interval_coverage, observation::Observations,
///     prediction::NonParametricPrediction,
/// };
///
/// let observations = Observations::from_groups([vec![2.0, 6.0, 12.0]]).unwrap();
/// let prediction = NonParametricPrediction::from_keyed([
///     ("0.05", vec![4.0, 4.0, 4.0]),
///     ("0.95", vec![10.0, 10.0, 10.0]),
/// ])
/// .unwrap();
///
/// let table = interval_coverage(&prediction, &observations, &[90.0]).unwrap();
/// let row = table.get(90.0).unwrap();
/// assert_eq!(row.mean_width, 6.0);
/// assert_eq!(row.mean_outside_error, (2.0 + 0.0 + 2.0) / 3.0);
/// ```
pub fn interval_coverage<R>(
    prediction: &R,
    observations: &Observations,
    widths_pct: &[f64],
) -> Result<MetricTable<IntervalCoverageRow>, MetricError>
where
    R: QuantileResolver + ?Sized,
{
    let levels = widths_pct
        .iter()
        .map(|&width| IntervalLevels::from_width(width))
        .collect::<Result<Vec<_>, _>>()?;
    check_aligned(prediction, observations)?;

    let rows = widths_pct
        .iter()
        .zip(levels)
        .map(|(&level, bounds)| {
            let values = coverage_at(prediction, observations, bounds)?;
            debug!(
                "interval {level}% [{}, {}]: outside error {:.4}, width {:.4}",
                bounds.lower, bounds.upper, values.mean_outside_error, values.mean_width
            );
            if values.crossed_quantiles > 0 {
                warn!(
                    "interval {level}%: {} of {} cases have quantile {} above quantile {}",
                    values.crossed_quantiles,
                    observations.len(),
                    bounds.lower,
                    bounds.upper
                );
            }
            Ok(MetricRow { level, values })
        })
        .collect::<Result<Vec<_>, MetricError>>()?;
    Ok(MetricTable::from_rows(rows))
}

fn coverage_at<R>(
    prediction: &R,
    observations: &Observations,
    bounds: IntervalLevels,
) -> Result<IntervalCoverageRow, MetricError>
where
    R: QuantileResolver + ?Sized,
{
    let upper = resolve_aligned(prediction, bounds.upper.probability(), observations)?;
    let lower = resolve_aligned(prediction, bounds.lower.probability(), observations)?;

    let mean_width = mean(upper.iter().zip(&lower).map(|(u, l)| u - l)).unwrap_or(f64::NAN);
    let crossed_quantiles = upper.iter().zip(&lower).filter(|(u, l)| l > u).count();
    let mean_outside_error = mean(
        observations
            .iter()
            .zip(lower.iter().zip(&upper))
            .map(|(observed, (&l, &u))| outside_error(observed, l, u)),
    )
    .unwrap_or(f64::NAN);

    Ok(IntervalCoverageRow {
        mean_outside_error,
        mean_width,
        crossed_quantiles,
    })
}
