//! Forecast representations and the shared quantile derivation step.
//!
//! A forecast is either parametric, a Gaussian `location`/`scale` pair per
//! case, or non-parametric, a table of predicted values per quantile level.
//! Every metric reduces a forecast to per-case predictions at some probability
//! through [`QuantileResolver::resolve`]. The metrics are written once against
//! that capability instead of once per representation.

use std::{collections::BTreeMap, fmt, str::FromStr};

use statrs::distribution::{ContinuousCDF as _, Normal};
use tte_stats::descriptive::{DescriptiveStats, mean};

use crate::{
    error::{LevelDomain, MetricError},
    observation::Observations,
};

/// Rounds `x` to two decimals, half to even on the scaled value.
///
/// Quantile table keys are matched on the rounded level, so this must agree
/// exactly with how the tables were keyed: scale by 100, round ties to even,
/// scale back.
///
/// ```
/// # use tte_metrics::prediction::round_to_hundredths;
/// assert_eq!(round_to_hundredths(0.125), 0.12);
/// // (1 - 0.95) / 2 is slightly above 0.025 in binary.
/// assert_eq!(round_to_hundredths((1.0 - 0.95) / 2.0), 0.03);
/// ```
#[must_use]
pub fn round_to_hundredths(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// A quantile level in `[0, 1]` with two-decimal resolution.
///
/// This is the key type of [`NonParametricPrediction`] tables. It stores whole
/// hundredths, so `"0.5"`, `"0.50"` and `0.499999` all name the same column.
/// It displays and serializes with two decimals (`"0.50"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuantileLevel(u8);

impl QuantileLevel {
    pub const MIN: Self = Self(0);
    pub const MEDIAN: Self = Self(50);
    pub const MAX: Self = Self(100);

    /// Rounds a probability in `[0, 1]` to its two-decimal level.
    ///
    /// ```
    /// # use tte_metrics::prediction::QuantileLevel;
    /// let level = QuantileLevel::from_probability(1.0 - 0.9).unwrap();
    /// assert_eq!(level.hundredths(), 10);
    /// assert_eq!(level.to_string(), "0.10");
    /// ```
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_probability(probability: f64) -> Result<Self, MetricError> {
        let probability = LevelDomain::Probability.check(probability)?;
        Ok(Self((probability * 100.0).round_ties_even() as u8))
    }

    #[must_use]
    pub fn hundredths(self) -> u8 {
        self.0
    }

    /// The level as a probability, identical to `round_to_hundredths` of any
    /// probability that maps to it.
    #[must_use]
    pub fn probability(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for QuantileLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.probability())
    }
}

impl FromStr for QuantileLevel {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MetricError::InvalidQuantileKey { key: s.to_owned() };
        let probability = s.trim().parse::<f64>().map_err(|_| invalid())?;
        Self::from_probability(probability).map_err(|_| invalid())
    }
}

impl serde::Serialize for QuantileLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for QuantileLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

/// Derives per-case predictions at a probability level.
pub trait QuantileResolver {
    /// Number of cases the forecast covers.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns one predicted value per case at `probability`.
    ///
    /// Fails with [`MetricError::InvalidLevel`] when `probability` lies outside
    /// `[0, 1]`.
    fn resolve(&self, probability: f64) -> Result<Vec<f64>, MetricError>;
}

/// Fails with [`MetricError::ShapeMismatch`] unless the forecast covers every observation.
pub(crate) fn check_aligned<R>(prediction: &R, observations: &Observations) -> Result<(), MetricError>
where
    R: QuantileResolver + ?Sized,
{
    if prediction.len() == observations.len() {
        Ok(())
    } else {
        Err(MetricError::ShapeMismatch {
            expected: observations.len(),
            actual: prediction.len(),
        })
    }
}

/// Resolves `probability` and checks the result lines up with `observations`.
pub(crate) fn resolve_aligned<R>(
    prediction: &R,
    probability: f64,
    observations: &Observations,
) -> Result<Vec<f64>, MetricError>
where
    R: QuantileResolver + ?Sized,
{
    let values = prediction.resolve(probability)?;
    if values.len() != observations.len() {
        return Err(MetricError::ShapeMismatch {
            expected: observations.len(),
            actual: values.len(),
        });
    }
    Ok(values)
}

/// Gaussian forecast with an individual location and scale per case.
#[derive(Debug, Clone, PartialEq)]
pub struct ParametricPrediction {
    location: Vec<f64>,
    scale: Vec<f64>,
}

/// A single Gaussian summarizing a [`ParametricPrediction`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PooledGaussian {
    /// Mean of the per-case locations.
    pub location: f64,
    /// Root mean square of the per-case scales.
    pub scale: f64,
}

impl ParametricPrediction {
    /// Pairs per-case locations and scales.
    ///
    /// Both sequences must have the same length, every location must be finite
    /// and every scale finite and non-negative. A zero scale describes a
    /// deterministic forecast.
    pub fn new(location: Vec<f64>, scale: Vec<f64>) -> Result<Self, MetricError> {
        if location.len() != scale.len() {
            return Err(MetricError::ShapeMismatch {
                expected: location.len(),
                actual: scale.len(),
            });
        }
        if let Some((index, &value)) = location.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(MetricError::InvalidParameter {
                parameter: "location",
                index,
                value,
            });
        }
        if let Some((index, &value)) = scale
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(MetricError::InvalidParameter {
                parameter: "scale",
                index,
                value,
            });
        }
        Ok(Self { location, scale })
    }

    #[must_use]
    pub fn location(&self) -> &[f64] {
        &self.location
    }

    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Collapses the per-case Gaussians into one representative distribution.
    ///
    /// Returns `None` for a forecast without cases.
    ///
    /// ```
    /// # use tte_metrics::prediction::ParametricPrediction;
    /// let prediction = ParametricPrediction::new(vec![8.0, 12.0], vec![3.0, 4.0]).unwrap();
    /// let pooled = prediction.pooled().unwrap();
    /// assert_eq!(pooled.location, 10.0);
    /// assert_eq!(pooled.scale, 12.5_f64.sqrt());
    /// ```
    #[must_use]
    pub fn pooled(&self) -> Option<PooledGaussian> {
        let location = mean(self.location.iter().copied())?;
        let scale = DescriptiveStats::new(self.scale.iter().copied())?.root_mean_square;
        Some(PooledGaussian { location, scale })
    }
}

impl QuantileResolver for ParametricPrediction {
    fn len(&self) -> usize {
        self.location.len()
    }

    /// Applies each case's Gaussian inverse CDF, clamping negative times to zero.
    ///
    /// A zero scale resolves to the location at every probability. At
    /// probability 0 and 1 the quantiles are infinite, which become `0.0` and
    /// `+inf` after clamping.
    fn resolve(&self, probability: f64) -> Result<Vec<f64>, MetricError> {
        let probability = LevelDomain::Probability.check(probability)?;
        let z = Normal::standard().inverse_cdf(probability);
        Ok(self
            .location
            .iter()
            .zip(&self.scale)
            .map(|(&location, &scale)| {
                let q = if scale == 0.0 {
                    location
                } else {
                    location + scale * z
                };
                if q < 0.0 { 0.0 } else { q }
            })
            .collect())
    }
}

/// Quantile-table forecast: predicted values per case, one column per level.
#[derive(Debug, Clone, PartialEq)]
pub struct NonParametricPrediction {
    columns: BTreeMap<QuantileLevel, Vec<f64>>,
    len: usize,
}

impl NonParametricPrediction {
    /// Builds a table from `(level, per-case values)` columns.
    ///
    /// All columns must have the same length. Two columns for the same level
    /// are rejected with [`MetricError::InvalidQuantileKey`].
    pub fn new<I>(columns: I) -> Result<Self, MetricError>
    where
        I: IntoIterator<Item = (QuantileLevel, Vec<f64>)>,
    {
        let mut table = BTreeMap::new();
        let mut len = None;
        for (level, values) in columns {
            let expected = *len.get_or_insert(values.len());
            if values.len() != expected {
                return Err(MetricError::ShapeMismatch {
                    expected,
                    actual: values.len(),
                });
            }
            if table.insert(level, values).is_some() {
                return Err(MetricError::InvalidQuantileKey {
                    key: level.to_string(),
                });
            }
        }
        Ok(Self {
            columns: table,
            len: len.unwrap_or(0),
        })
    }

    /// Builds a table keyed by string levels such as `"0.5"` or `"0.05"`.
    ///
    /// ```
    /// # use tte_metrics::prediction::{NonParametricPrediction, QuantileLevel};
    /// let table = NonParametricPrediction::from_keyed([
    ///     ("0.1", vec![4.0, 6.0]),
    ///     ("0.5", vec![5.0, 8.0]),
    /// ])
    /// .unwrap();
    /// assert_eq!(table.column(QuantileLevel::MEDIAN), Some(&[5.0, 8.0][..]));
    /// ```
    pub fn from_keyed<I, K>(columns: I) -> Result<Self, MetricError>
    where
        I: IntoIterator<Item = (K, Vec<f64>)>,
        K: AsRef<str>,
    {
        let columns = columns
            .into_iter()
            .map(|(key, values)| Ok((key.as_ref().parse::<QuantileLevel>()?, values)))
            .collect::<Result<Vec<_>, MetricError>>()?;
        Self::new(columns)
    }

    #[must_use]
    pub fn column(&self, level: QuantileLevel) -> Option<&[f64]> {
        self.columns.get(&level).map(Vec::as_slice)
    }

    /// Levels present in the table, ascending.
    pub fn levels(&self) -> impl Iterator<Item = QuantileLevel> + '_ {
        self.columns.keys().copied()
    }

    /// Mean predicted value of every column, in ascending level order.
    ///
    /// This is the representative quantile curve of the table, averaged over
    /// cases. A table without cases yields no means.
    #[must_use]
    pub fn level_means(&self) -> Vec<f64> {
        self.columns
            .values()
            .filter_map(|values| mean(values.iter().copied()))
            .collect()
    }
}

impl QuantileResolver for NonParametricPrediction {
    fn len(&self) -> usize {
        self.len
    }

    /// Looks up the column at `probability` rounded to two decimals.
    ///
    /// Values are returned as stored, without clamping. Fails with
    /// [`MetricError::KeyMissing`] when the table has no such column.
    fn resolve(&self, probability: f64) -> Result<Vec<f64>, MetricError> {
        let level = QuantileLevel::from_probability(probability)?;
        self.column(level)
            .map(<[f64]>::to_vec)
            .ok_or(MetricError::KeyMissing { level })
    }
}

/// A forecast in either representation.
#[derive(Debug, Clone, PartialEq, derive_more::From, derive_more::IsVariant)]
pub enum Prediction {
    Parametric(ParametricPrediction),
    NonParametric(NonParametricPrediction),
}

impl QuantileResolver for Prediction {
    fn len(&self) -> usize {
        match self {
            Self::Parametric(p) => p.len(),
            Self::NonParametric(p) => p.len(),
        }
    }

    fn resolve(&self, probability: f64) -> Result<Vec<f64>, MetricError> {
        match self {
            Self::Parametric(p) => p.resolve(probability),
            Self::NonParametric(p) => p.resolve(probability),
        }
    }
}
