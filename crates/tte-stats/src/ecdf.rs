/// Empirical cumulative distribution function of a finite sample.
///
/// The ECDF is the right-continuous step function
///
/// ```text
/// F(x) = #{ v_i <= x } / n
/// ```
///
/// It jumps by `1/n` at every sample value (by `k/n` where `k` values tie) and is
/// flat in between: `0.0` left of the smallest value, `1.0` from the largest on.
///
/// # Examples
///
/// ```
/// # use tte_stats::ecdf::EmpiricalCdf;
/// let cdf = EmpiricalCdf::new([3.0, 1.0, 2.0, 2.0]).unwrap();
/// assert_eq!(cdf.eval(0.5), 0.0);
/// assert_eq!(cdf.eval(2.0), 0.75);
/// assert_eq!(cdf.eval(2.5), 0.75);
/// assert_eq!(cdf.eval(3.0), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalCdf {
    /// Sample values sorted in ascending order.
    sorted: Vec<f64>,
}

impl EmpiricalCdf {
    /// Builds the ECDF of `values`, which may be in any order.
    ///
    /// Returns `None` for an empty sample, whose ECDF is undefined.
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted = values.into_iter().collect::<Vec<_>>();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        Some(Self { sorted })
    }

    /// Number of sample values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Always `false`: an ECDF is never built from an empty sample.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// The sample values in ascending order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.sorted
    }

    /// Smallest sample value.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    /// Largest sample value.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }

    /// Evaluates `F(x)`, the fraction of sample values less than or equal to `x`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        let count = self.sorted.partition_point(|v| *v <= x);
        count as f64 / self.sorted.len() as f64
    }

    /// Returns the corner points of the step function.
    ///
    /// One `(x, F(x))` pair per distinct sample value, in ascending `x`. Tied
    /// values collapse into one point carrying the full jump.
    ///
    /// ```
    /// # use tte_stats::ecdf::EmpiricalCdf;
    /// let cdf = EmpiricalCdf::new([2.0, 1.0, 2.0, 4.0]).unwrap();
    /// assert_eq!(cdf.steps(), vec![(1.0, 0.25), (2.0, 0.75), (4.0, 1.0)]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn steps(&self) -> Vec<(f64, f64)> {
        let n = self.sorted.len() as f64;
        let mut steps: Vec<(f64, f64)> = Vec::with_capacity(self.sorted.len());
        for (i, &x) in self.sorted.iter().enumerate() {
            let y = (i + 1) as f64 / n;
            match steps.last_mut() {
                Some(last) if last.0 == x => last.1 = y,
                _ => steps.push((x, y)),
            }
        }
        steps
    }

    /// Computes `∫ |F(x) - G(x)| dx` over `[lower, upper]` exactly.
    ///
    /// Both ECDFs are constant between consecutive sample values, so the
    /// integral is a finite sum of rectangle areas over the merged breakpoints.
    /// Returns `0.0` when `upper <= lower`.
    ///
    /// ```
    /// # use tte_stats::ecdf::EmpiricalCdf;
    /// let f = EmpiricalCdf::new([1.0]).unwrap();
    /// let g = EmpiricalCdf::new([3.0]).unwrap();
    /// assert_eq!(f.l1_distance(&g, 0.0, 10.0), 2.0);
    /// assert_eq!(f.l1_distance(&g, 2.0, 10.0), 1.0);
    /// ```
    #[must_use]
    pub fn l1_distance(&self, other: &Self, lower: f64, upper: f64) -> f64 {
        if upper <= lower {
            return 0.0;
        }

        let mut breakpoints = self
            .sorted
            .iter()
            .chain(&other.sorted)
            .copied()
            .filter(|x| *x > lower && *x < upper)
            .collect::<Vec<_>>();
        breakpoints.push(lower);
        breakpoints.push(upper);
        breakpoints.sort_by(f64::total_cmp);
        breakpoints.dedup();

        breakpoints
            .windows(2)
            .map(|w| (self.eval(w[0]) - other.eval(w[0])).abs() * (w[1] - w[0]))
            .sum()
    }
}
