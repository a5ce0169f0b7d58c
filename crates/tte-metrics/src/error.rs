use crate::prediction::QuantileLevel;

/// Valid range a caller-supplied level was checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum LevelDomain {
    /// Security levels, open interval `(0, 1)`.
    #[display("(0, 1)")]
    SecurityLevel,
    /// Prediction interval widths in percent, `(0, 100]`.
    #[display("(0, 100]")]
    IntervalWidth,
    /// Quantile probabilities, `[0, 1]`.
    #[display("[0, 1]")]
    Probability,
}

impl LevelDomain {
    #[must_use]
    pub fn contains(self, level: f64) -> bool {
        match self {
            Self::SecurityLevel => level > 0.0 && level < 1.0,
            Self::IntervalWidth => level > 0.0 && level <= 100.0,
            Self::Probability => (0.0..=1.0).contains(&level),
        }
    }

    pub(crate) fn check(self, level: f64) -> Result<f64, MetricError> {
        if self.contains(level) {
            Ok(level)
        } else {
            Err(MetricError::InvalidLevel {
                level,
                domain: self,
            })
        }
    }
}

/// Failure of a metric computation or of building its inputs.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum MetricError {
    /// A forecast does not have one value per observation, or its columns
    /// differ in length.
    #[display("prediction covers {actual} observations, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },
    /// The rounded level has no column in the quantile table.
    #[display("quantile level {level} is missing from the prediction table")]
    KeyMissing { level: QuantileLevel },
    /// A security level, interval width or probability outside its domain.
    #[display("level {level} is outside {domain}")]
    InvalidLevel { level: f64, domain: LevelDomain },
    /// A table key that does not parse as a level in `[0, 1]`, or repeats one.
    #[display("'{key}' is not a quantile level in [0, 1]")]
    InvalidQuantileKey { key: String },
    /// A non-finite location, or a negative or non-finite scale.
    #[display("{parameter} at index {index} is invalid: {value}")]
    InvalidParameter {
        parameter: &'static str,
        index: usize,
        value: f64,
    },
    /// A negative or non-finite observation.
    #[display("observation at index {index} must be finite and non-negative, got {value}")]
    InvalidObservation { index: usize, value: f64 },
    /// No observations were supplied.
    #[display("observation set is empty")]
    EmptyObservations,
    /// Settings that cannot produce a result, such as an empty domain or a
    /// zero-width profile step.
    #[display("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}
