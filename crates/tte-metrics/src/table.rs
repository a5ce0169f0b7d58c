/// One row of a [`MetricTable`]: the requested level and what was computed for it.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MetricRow<R> {
    /// The security level or interval width exactly as the caller supplied it.
    pub level: f64,
    #[serde(flatten)]
    pub values: R,
}

/// Per-level metric results, in the order the levels were requested.
///
/// Rows are never reordered or deduplicated: requesting `[0.9, 0.1]` yields
/// the 0.9 row first.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct MetricTable<R> {
    rows: Vec<MetricRow<R>>,
}

impl<R> MetricTable<R> {
    pub(crate) fn from_rows(rows: Vec<MetricRow<R>>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[MetricRow<R>] {
        &self.rows
    }

    /// Requested levels in table order.
    pub fn levels(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|row| row.level)
    }

    /// Returns the first row requested at exactly `level`.
    #[must_use]
    pub fn get(&self, level: f64) -> Option<&R> {
        self.rows
            .iter()
            .find(|row| row.level == level)
            .map(|row| &row.values)
    }
}

impl<'a, R> IntoIterator for &'a MetricTable<R> {
    type Item = &'a MetricRow<R>;
    type IntoIter = std::slice::Iter<'a, MetricRow<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
