use crate::error::MetricError;

/// Realized time-to-event values, one per evaluated case.
///
/// Observations usually arrive grouped (per trip, per day, ...). The metrics
/// only need the flattened sequence, which must line up element for element
/// with the prediction arrays.
///
/// # Examples
///
/// ```
/// use tte_metrics::observation::Observations;
///
/// let observations = Observations::from_groups([vec![5.0, 10.0], vec![15.0]]).unwrap();
/// assert_eq!(observations.as_slice(), &[5.0, 10.0, 15.0]);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct Observations {
    values: Vec<f64>,
}

impl Observations {
    /// Wraps an already flat sequence of observations.
    ///
    /// Fails with [`MetricError::EmptyObservations`] for an empty sequence and
    /// [`MetricError::InvalidObservation`] for a negative or non-finite value.
    pub fn new(values: Vec<f64>) -> Result<Self, MetricError> {
        if values.is_empty() {
            return Err(MetricError::EmptyObservations);
        }
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(MetricError::InvalidObservation { index, value });
        }
        Ok(Self { values })
    }

    /// Flattens grouped observations, preserving group order and order within groups.
    pub fn from_groups<I, G>(groups: I) -> Result<Self, MetricError>
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = f64>,
    {
        Self::new(groups.into_iter().flatten().collect())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; construction rejects empty sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}

impl<'a> IntoIterator for &'a Observations {
    type Item = f64;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter().copied()
    }
}
