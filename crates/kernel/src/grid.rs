use serde::{Deserialize, Serialize};

/// Dense 2D storage: a flat vector with `(row, col)` addressing.
///
/// Rows run along the spline's u axis and columns along v, so
/// `get(iu, iv)` reads the same way the control vertex and patch grids do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }
}

impl<T: Default> Grid<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        data.resize_with(rows * cols, T::default);
        Self { rows, cols, data }
    }

    /// Change the dimensions, keeping the overlapping block of cells.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if rows == self.rows && cols == self.cols {
            return;
        }
        let mut next = Grid::new(rows, cols);
        let old = std::mem::take(&mut self.data);
        for (idx, item) in old.into_iter().enumerate() {
            let (r, c) = (idx / self.cols, idx % self.cols);
            if r < rows && c < cols {
                next.data[r * cols + c] = item;
            }
        }
        *self = next;
    }
}

impl<T> Grid<T> {
    /// Wrap row-major data; returns `None` when the length does not fit.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.index(row, col).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        self.index(row, col).map(move |i| &mut self.data[i])
    }

    /// Store `value`; returns false if the cell is outside the grid.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> bool {
        match self.index(row, col) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.data.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Copy> Grid<T> {
    /// Copy of the cell, for grids of plain values that are known in range.
    pub fn at(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_bounds() {
        let mut g = Grid::filled(2, 3, 0.0);
        assert!(g.set(1, 2, 5.0));
        assert!(!g.set(2, 0, 1.0));
        assert_eq!(g.get(1, 2), Some(&5.0));
        assert_eq!(g.get(0, 3), None);
        assert_eq!(g.at(1, 2), 5.0);
    }

    #[test]
    fn test_resize_keeps_overlap() {
        let mut g = Grid::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        g.resize(3, 1);
        assert_eq!((g.rows(), g.cols()), (3, 1));
        assert_eq!(g.as_slice(), &[1, 3, 0]);
        g.resize(2, 3);
        assert_eq!(g.as_slice(), &[1, 0, 0, 3, 0, 0]);
    }

    #[test]
    fn test_from_vec_rejects_bad_length() {
        assert!(Grid::from_vec(2, 2, vec![1, 2, 3]).is_none());
    }
}
