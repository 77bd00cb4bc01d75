//! Dense cell grid with row-major storage.

use std::fmt;

use crate::error::BoundsError;

/// A single cell. Stored as an integer so neighbour counts are plain sums.
pub type Cell = u8;

pub const DEAD: Cell = 0;
pub const ALIVE: Cell = 1;

/// Smallest grid side for which an interior cell exists.
pub const MIN_SIDE: usize = 3;

/// A `height` x `width` grid of cells, stored as `row * width + col`.
///
/// Used both for the global grid (seed, gathered snapshots) and for a
/// partition's local band including its ghost rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every cell dead.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            cells: vec![DEAD; height * width],
        }
    }

    /// Build a grid from an existing row-major buffer.
    ///
    /// Returns `None` if the buffer length does not match the dimensions.
    pub fn from_cells(height: usize, width: usize, cells: Vec<Cell>) -> Option<Self> {
        (cells.len() == height * width).then_some(Self {
            height,
            width,
            cells,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn index(&self, row: usize, col: usize) -> Result<usize, BoundsError> {
        if row >= self.height || col >= self.width {
            return Err(BoundsError {
                row,
                col,
                height: self.height,
                width: self.width,
            });
        }
        Ok(row * self.width + col)
    }

    /// Read a cell.
    pub fn get(&self, row: usize, col: usize) -> Result<Cell, BoundsError> {
        let idx = self.index(row, col)?;
        Ok(self.cells[idx])
    }

    /// Mutable access to a cell.
    pub fn at_mut(&mut self, row: usize, col: usize) -> Result<&mut Cell, BoundsError> {
        let idx = self.index(row, col)?;
        Ok(&mut self.cells[idx])
    }

    /// Overwrite a cell.
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) -> Result<(), BoundsError> {
        *self.at_mut(row, col)? = cell;
        Ok(())
    }

    pub fn is_alive(&self, row: usize, col: usize) -> Result<bool, BoundsError> {
        Ok(self.get(row, col)? != DEAD)
    }

    /// One row as a slice.
    ///
    /// # Panics
    /// If `row >= height`.
    pub fn row(&self, row: usize) -> &[Cell] {
        let start = row * self.width;
        &self.cells[start..start + self.width]
    }

    /// One row as a mutable slice.
    ///
    /// # Panics
    /// If `row >= height`.
    pub fn row_mut(&mut self, row: usize) -> &mut [Cell] {
        let start = row * self.width;
        &mut self.cells[start..start + self.width]
    }

    /// Rows `[start, end)` as one contiguous slice.
    pub fn rows(&self, start: usize, end: usize) -> &[Cell] {
        &self.cells[start * self.width..end * self.width]
    }

    /// Overwrite rows starting at `start` with a row-major buffer.
    ///
    /// # Panics
    /// If the buffer is not a whole number of rows or runs past the grid.
    pub fn copy_rows_from(&mut self, start: usize, cells: &[Cell]) {
        assert_eq!(cells.len() % self.width, 0, "partial row in buffer");
        let offset = start * self.width;
        self.cells[offset..offset + cells.len()].copy_from_slice(cells);
    }

    pub fn as_slice(&self) -> &[Cell] {
        &self.cells
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Number of live cells.
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&c| c != DEAD).count()
    }

    /// Coordinates of every live cell, in row-major order.
    pub fn live_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != DEAD)
            .map(|(i, _)| (i / self.width, i % self.width))
            .collect()
    }

    /// First cell holding something other than `DEAD` or `ALIVE`, as
    /// `(row, col, value)`.
    pub fn first_invalid_cell(&self) -> Option<(usize, usize, Cell)> {
        self.cells
            .iter()
            .position(|&c| c != DEAD && c != ALIVE)
            .map(|i| (i / self.width, i % self.width, self.cells[i]))
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.height {
            for &cell in self.row(r) {
                f.write_str(if cell == DEAD { "_" } else { "X" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
