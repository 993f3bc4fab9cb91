use crate::grid::Grid;
use crate::lookup::LookupError;
use std::ops::RangeInclusive;
use tracing::debug;

/// Inclusive row range of a block of non-empty cells in one column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableBounds {
    /// First row of the block
    pub low_row: usize,
    /// Last row of the block
    pub high_row: usize,
}

impl TableBounds {
    /// Rows covered by the table.
    pub fn rows(&self) -> RangeInclusive<usize> {
        self.low_row..=self.high_row
    }
}

/// Finds the vertical extent of the table containing the cell at (row, col).
///
/// The table is the run of non-empty cells in `col` around `row`, delimited
/// by an empty cell above and below. The sheet edge does not count as a
/// delimiter: a run touching the first or last row of the grid, or a start
/// cell that is itself empty, is reported as `MalformedTable`.
pub fn find_bounds(grid: &Grid, row: usize, col: usize) -> Result<TableBounds, LookupError> {
    let malformed = || LookupError::MalformedTable { row, col };
    if grid.cell(row, col).is_empty() {
        Err(malformed())?
    }

    let mut low_row = row;
    while !grid.cell(low_row, col).is_empty() {
        low_row = low_row.checked_sub(1).ok_or_else(malformed)?;
    }

    let mut high_row = row;
    while !grid.cell(high_row, col).is_empty() {
        high_row += 1;
        if high_row >= grid.nrows() {
            Err(malformed())?
        }
    }

    let bounds = TableBounds {
        low_row: low_row + 1,
        high_row: high_row - 1,
    };
    debug!(row, col, low_row = bounds.low_row, high_row = bounds.high_row, "found table bounds");
    Ok(bounds)
}
