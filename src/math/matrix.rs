use crate::error::{NetworkError, Result};

/// Dense row-major matrix. `data[i]` is row `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Builds a matrix from nested rows. Every row must have the same length.
    /// An empty outer vector gives the 0×0 matrix.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let rows = data.len();
        let cols = data.first().map_or(0, |row| row.len());
        if let Some((i, row)) = data.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(NetworkError::InvalidLayer(format!(
                "row {} has {} columns, expected {}",
                i, row.len(), cols
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Overwrites every element with successive values from `sample`.
    pub fn fill_with<F>(&mut self, mut sample: F)
    where
        F: FnMut() -> f64,
    {
        for row in &mut self.data {
            for x in row.iter_mut() {
                *x = sample();
            }
        }
    }

    /// `self · v`. `v.len()` must equal `cols`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.cols);
        self.data.iter()
            .map(|row| row.iter().zip(v).map(|(w, x)| w * x).sum())
            .collect()
    }

    /// `selfᵗ · v`, without materializing the transpose. `v.len()` must equal `rows`.
    pub fn transpose_mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.rows);
        let mut res = vec![0.0; self.cols];
        for (row, &d) in self.data.iter().zip(v) {
            for (r, w) in res.iter_mut().zip(row) {
                *r += w * d;
            }
        }
        res
    }

    /// `self -= scale · (u ⊗ v)` where `u.len() == rows` and `v.len() == cols`.
    pub fn sub_scaled_outer(&mut self, scale: f64, u: &[f64], v: &[f64]) {
        debug_assert_eq!(u.len(), self.rows);
        debug_assert_eq!(v.len(), self.cols);
        for (row, &ui) in self.data.iter_mut().zip(u) {
            for (w, &vj) in row.iter_mut().zip(v) {
                *w -= scale * ui * vj;
            }
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

/// Element-wise (Hadamard) product of two same-length vectors.
pub fn hadamard(a: &[f64], b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}
