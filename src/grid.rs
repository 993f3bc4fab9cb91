//! # Cell Grid
//!
//! A read-only, rectangular, 0-indexed view of one worksheet. Grids are built
//! once by the spreadsheet loader (or by hand in tests) and only borrowed by
//! the lookup routines.
use std::fmt::Display;

/// Returned for coordinates outside the grid extent.
static EMPTY: CellValue = CellValue::Empty;

/// Typed value of a single cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    /// Text cells, the only kind the name search looks at
    Text(String),
    /// Plain numeric cells
    Number(f64),
    #[default]
    Empty,
    /// Booleans, dates, times, durations and error values, kept as display text
    Other(String),
}

impl CellValue {
    /// Returns true if the cell holds no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the raw text of a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) | Self::Other(text) => write!(f, "{}", text),
            Self::Number(value) => write!(f, "{}", value),
            Self::Empty => Ok(()),
        }
    }
}

/// Empty strings become empty cells.
impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_owned())
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Dense row-major cell storage with fixed dimensions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grid {
    nrows: usize,
    ncols: usize,
    cells: Vec<CellValue>,
}

impl Grid {
    /// Creates a grid of the given size filled with empty cells.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            cells: vec![CellValue::Empty; nrows * ncols],
        }
    }

    /// Builds a grid from rows of values. Short rows are padded with empty
    /// cells so that the result is rectangular.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = CellValue>,
    {
        let rows: Vec<Vec<CellValue>> = rows
            .into_iter()
            .map(|row| row.into_iter().collect())
            .collect();
        let ncols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self::new(rows.len(), ncols);
        for (row, values) in rows.into_iter().enumerate() {
            for (col, value) in values.into_iter().enumerate() {
                grid.set(row, col, value);
            }
        }
        grid
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Stores a value; coordinates outside the extent are ignored.
    pub(crate) fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if row < self.nrows && col < self.ncols {
            self.cells[row * self.ncols + col] = value;
        }
    }

    /// Gets the cell at (row, col), or None outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        if row < self.nrows && col < self.ncols {
            self.cells.get(row * self.ncols + col)
        } else {
            None
        }
    }

    /// Gets the cell at (row, col); outside the grid every cell is empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.get(row, col).unwrap_or(&EMPTY)
    }

    /// Display text of the cell at (row, col).
    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).to_string()
    }

    /// Iterates over all cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &CellValue)> + '_ {
        let ncols = self.ncols.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (index / ncols, index % ncols, cell))
    }
}
