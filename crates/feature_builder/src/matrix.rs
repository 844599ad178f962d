use std::collections::BTreeMap;

use station_structs::{PipelineError, PipelineResult};

/// Dense row-major feature table with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Vec<f32>,
    n_rows: usize,
    /// Sorted levels seen per categorical field, reference level included
    categorical_levels: BTreeMap<String, Vec<String>>,
}

impl FeatureMatrix {
    /// Builds a matrix from row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Schema`] if `values` does not fill
    /// `n_rows` rows of `columns.len()` cells.
    pub fn new(
        columns: Vec<String>,
        values: Vec<f32>,
        n_rows: usize,
        categorical_levels: BTreeMap<String, Vec<String>>,
    ) -> PipelineResult<Self> {
        if values.len() != n_rows * columns.len() {
            return Err(PipelineError::Schema(format!(
                "Feature matrix has {} cells, expected {n_rows} rows x {} columns",
                values.len(),
                columns.len()
            )));
        }

        Ok(Self {
            columns,
            values,
            n_rows,
            categorical_levels,
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[must_use]
    pub const fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn categorical_levels(&self) -> &BTreeMap<String, Vec<String>> {
        &self.categorical_levels
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns one row, or `None` past the end.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.n_rows {
            return None;
        }
        let width = self.n_cols();
        self.values.get(index * width..(index + 1) * width)
    }

    /// Returns a matrix holding the given rows, in the given order.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let rows: Vec<&[f32]> = indices.iter().filter_map(|&i| self.row(i)).collect();

        Self {
            columns: self.columns.clone(),
            n_rows: rows.len(),
            values: rows.concat(),
            categorical_levels: self.categorical_levels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> FeatureMatrix {
        FeatureMatrix::new(
            vec![String::from("a"), String::from("b")],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            3,
            BTreeMap::new(),
        )
        .expect("matrix")
    }

    #[test]
    fn test_shape_is_checked() {
        assert!(FeatureMatrix::new(vec![String::from("a")], vec![1.0, 2.0], 3, BTreeMap::new()).is_err());
    }

    #[test]
    fn test_rows_and_selection() {
        let m = matrix();

        assert_eq!(m.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(m.row(3), None);
        assert_eq!(m.column_index("b"), Some(1));

        let picked = m.select_rows(&[2, 0]);
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(picked.values(), &[5.0, 6.0, 1.0, 2.0]);
        assert_eq!(picked.columns(), m.columns());
    }
}
