//! Square matrix storage for distance and duration data.

use serde::{Deserialize, Serialize};

/// A dense square matrix stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix<T> {
    size: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Create a size x size matrix filled with the default value.
    pub fn new(size: usize) -> Self {
        Matrix {
            size,
            data: vec![T::default(); size * size],
        }
    }

    /// Build a matrix from nested rows. All rows must have length
    /// `rows.len()`.
    pub fn from_rows(rows: &[Vec<T>]) -> Self {
        let size = rows.len();
        let mut matrix = Matrix::new(size);

        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                matrix.set(i, j, value);
            }
        }

        matrix
    }

    /// The number of rows (equal to the number of columns).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.size + col] = value;
    }
}
