/// Summary statistics over a set of `f64` values.
///
/// Only the measures the forecast metrics aggregate with are kept: the
/// arithmetic mean, and the root mean square used to pool per-case scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescriptiveStats {
    /// The arithmetic mean of the dataset.
    pub mean: f64,
    /// The root mean square, `sqrt(sum(v^2) / n)`.
    pub root_mean_square: f64,
}

impl DescriptiveStats {
    /// Computes summary statistics from values in any order.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use tte_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([3.0, 4.0]).unwrap();
    /// assert_eq!(stats.mean, 3.5);
    /// assert!((stats.root_mean_square - 12.5_f64.sqrt()).abs() < 1e-12);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let (count, sum, sum_sq) = values
            .into_iter()
            .fold((0_usize, 0.0, 0.0), |(count, sum, sum_sq), v| {
                (count + 1, sum + v, sum_sq + v * v)
            });
        if count == 0 {
            return None;
        }

        let n = count as f64;
        Some(Self {
            mean: sum / n,
            root_mean_square: (sum_sq / n).sqrt(),
        })
    }
}

/// Arithmetic mean of `values`, or `None` when there are none.
///
/// ```
/// # use tte_stats::descriptive::mean;
/// assert_eq!(mean([1.0, 2.0, 6.0]), Some(3.0));
/// assert_eq!(mean(std::iter::empty()), None);
/// ```
#[must_use]
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    DescriptiveStats::new(values).map(|stats| stats.mean)
}
