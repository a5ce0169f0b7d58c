//! Predicted-versus-observed CDF curves.
//!
//! [`CdfComparison`] is the single place where the two empirical CDFs are
//! built. The integral error integrates its gap and the plotting layer samples
//! the same gap through [`CdfComparison::profile`], so a shaded plot always
//! matches the reported number.

use rand::{Rng, RngCore as _, SeedableRng as _};
use rand_distr::{Distribution as _, StandardNormal};
use rand_pcg::Pcg64;
use tte_stats::ecdf::EmpiricalCdf;

use crate::{
    error::MetricError,
    integral::IntegralErrorConfig,
    observation::Observations,
    prediction::{
        NonParametricPrediction, ParametricPrediction, Prediction, QuantileResolver, check_aligned,
    },
};

/// Default grid spacing of [`CdfComparison::profile`].
pub const DEFAULT_PROFILE_STEP: f64 = 0.1;

/// Largest grid [`CdfComparison::profile`] builds.
pub const MAX_PROFILE_POINTS: usize = 1_000_000;

/// A forecast that can be summarized by one sample of predicted times.
pub trait PredictedSample: QuantileResolver {
    /// Values whose empirical CDF stands for the forecast as a whole.
    ///
    /// Representations that need no randomness ignore `rng` and `sample_size`.
    fn predicted_sample<G>(&self, sample_size: usize, rng: &mut G) -> Vec<f64>
    where
        G: Rng + ?Sized;
}

impl PredictedSample for ParametricPrediction {
    /// Draws from the pooled Gaussian, clamping negative draws to zero.
    ///
    /// A forecast without cases yields an empty sample.
    fn predicted_sample<G>(&self, sample_size: usize, rng: &mut G) -> Vec<f64>
    where
        G: Rng + ?Sized,
    {
        let Some(pooled) = self.pooled() else {
            return vec![];
        };
        (0..sample_size)
            .map(|_| {
                let z: f64 = StandardNormal.sample(&mut *rng);
                (pooled.location + pooled.scale * z).max(0.0)
            })
            .collect()
    }
}

impl PredictedSample for NonParametricPrediction {
    /// The per-level column means.
    fn predicted_sample<G>(&self, _sample_size: usize, _rng: &mut G) -> Vec<f64>
    where
        G: Rng + ?Sized,
    {
        self.level_means()
    }
}

impl PredictedSample for Prediction {
    fn predicted_sample<G>(&self, sample_size: usize, rng: &mut G) -> Vec<f64>
    where
        G: Rng + ?Sized,
    {
        match self {
            Self::Parametric(p) => p.predicted_sample(sample_size, rng),
            Self::NonParametric(p) => p.predicted_sample(sample_size, rng),
        }
    }
}

/// One grid point of the integral-error profile.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ProfilePoint {
    pub x: f64,
    /// Predicted CDF at `x`.
    pub predicted: f64,
    /// Observed CDF at `x`.
    pub observed: f64,
    /// `|predicted - observed|`, the integrand of the integral error.
    pub gap: f64,
}

/// Predicted and observed empirical CDFs of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CdfComparison {
    predicted: EmpiricalCdf,
    observed: EmpiricalCdf,
}

impl CdfComparison {
    /// Builds both CDFs the way [`integral_error`] does.
    ///
    /// Parametric forecasts are sampled with a generator seeded from
    /// `config.seed`, or from the OS when no seed is set. Only the sampling
    /// settings of `config` are used.
    ///
    /// [`integral_error`]: crate::integral::integral_error
    pub fn build<P>(
        prediction: &P,
        observations: &Observations,
        config: &IntegralErrorConfig,
    ) -> Result<Self, MetricError>
    where
        P: PredictedSample + ?Sized,
    {
        check_aligned(prediction, observations)?;
        let mut rng = Pcg64::seed_from_u64(config.seed.unwrap_or_else(|| rand::rng().next_u64()));
        let sample = prediction.predicted_sample(config.sample_size, &mut rng);
        let predicted = EmpiricalCdf::new(sample).ok_or(MetricError::ShapeMismatch {
            expected: observations.len(),
            actual: 0,
        })?;
        let observed =
            EmpiricalCdf::new(observations.iter()).ok_or(MetricError::EmptyObservations)?;
        Ok(Self {
            predicted,
            observed,
        })
    }

    #[must_use]
    pub fn predicted(&self) -> &EmpiricalCdf {
        &self.predicted
    }

    #[must_use]
    pub fn observed(&self) -> &EmpiricalCdf {
        &self.observed
    }

    /// Absolute difference of the two CDFs at `x`.
    #[must_use]
    pub fn gap(&self, x: f64) -> f64 {
        (self.predicted.eval(x) - self.observed.eval(x)).abs()
    }

    /// Every point where either CDF jumps, ascending and without repeats.
    #[must_use]
    pub fn jump_points(&self) -> Vec<f64> {
        let mut points = [self.predicted.values(), self.observed.values()].concat();
        points.sort_by(f64::total_cmp);
        points.dedup();
        points
    }

    /// Exact integral of [`Self::gap`] over `[lower, upper]`.
    #[must_use]
    pub fn exact_distance(&self, lower: f64, upper: f64) -> f64 {
        self.predicted.l1_distance(&self.observed, lower, upper)
    }

    /// Samples both CDFs on `min(obs), min(obs) + step, ...` up to, but
    /// excluding, `max(obs)`.
    ///
    /// `step` must be positive and finite, and small enough relative to the
    /// observed range that the grid has at most [`MAX_PROFILE_POINTS`] points.
    /// A single distinct observed value gives an empty profile.
    ///
    /// ```
    /// use tte_metrics::{
    ///     curves::CdfComparison, integral::IntegralErrorConfig,
    ///     observation::Observations, prediction::NonParametricPrediction,
    /// };
    ///
    /// let observations = Observations::new(vec![1.0, 2.0, 3.0]).unwrap();
    /// let prediction = NonParametricPrediction::from_keyed([("0.5", vec![2.0; 3])]).unwrap();
    /// let comparison =
    ///     CdfComparison::build(&prediction, &observations, &IntegralErrorConfig::default())
    ///         .unwrap();
    ///
    /// let profile = comparison.profile(0.5).unwrap();
    /// let xs = profile.iter().map(|p| p.x).collect::<Vec<_>>();
    /// assert_eq!(xs, vec![1.0, 1.5, 2.0, 2.5]);
    /// ```
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn profile(&self, step: f64) -> Result<Vec<ProfilePoint>, MetricError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(MetricError::InvalidConfig {
                reason: format!("profile step must be positive and finite, got {step}"),
            });
        }
        let start = self.observed.min();
        let count = ((self.observed.max() - start) / step).ceil();
        if count.is_nan() || count > MAX_PROFILE_POINTS as f64 {
            return Err(MetricError::InvalidConfig {
                reason: format!(
                    "profile step {step} gives {count} points, more than {MAX_PROFILE_POINTS}"
                ),
            });
        }
        Ok((0..count as usize)
            .map(|k| {
                let x = start + k as f64 * step;
                let predicted = self.predicted.eval(x);
                let observed = self.observed.eval(x);
                ProfilePoint {
                    x,
                    predicted,
                    observed,
                    gap: (predicted - observed).abs(),
                }
            })
            .collect())
    }
}
