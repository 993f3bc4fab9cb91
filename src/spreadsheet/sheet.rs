use crate::grid::Grid;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use std::collections::HashMap;
use std::collections::HashSet;

/// Cells read from one worksheet, in the order the file stores them.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells in the sheet
    pub(crate) cells: Vec<Cell>,
    /// Last used row and column
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(super) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_upper_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell and widens the used range to include it.
    pub(super) fn push(&mut self, cell: Cell) {
        self.row_upper_bound = Some(self.row_upper_bound.map_or(cell.row, |row| row.max(cell.row)));
        self.col_upper_bound = Some(self.col_upper_bound.map_or(cell.col, |col| col.max(cell.col)));
        self.cells.push(cell);
    }

    /// Indexes into the shared string table referenced by this sheet.
    pub(crate) fn shared_string_indexes(&self) -> HashSet<usize> {
        self.cells
            .iter()
            .filter(|cell| cell.kind == CellType::SharedString)
            .filter_map(|cell| cell.value.parse::<usize>().ok())
            .collect()
    }

    /// Builds a grid spanning A1 to the last used cell.
    ///
    /// `mappings` translates a shared string index into a position in
    /// `shared_strings`; indexes without a mapping are used directly.
    pub(crate) fn to_grid(&self, shared_strings: &[String], mappings: &HashMap<usize, usize>) -> Grid {
        let nrows = self.row_upper_bound.map_or(0, |row| row + 1);
        let ncols = self.col_upper_bound.map_or(0, |col| col + 1);
        let mut grid = Grid::new(nrows, ncols);
        for cell in &self.cells {
            let value = if cell.kind == CellType::SharedString {
                let string = cell
                    .value
                    .parse::<usize>()
                    .ok()
                    .map(|index| mappings.get(&index).copied().unwrap_or(index))
                    .and_then(|index| shared_strings.get(index));
                match string {
                    Some(string) => Cell {
                        kind: CellType::InlineString,
                        value: string.to_owned(),
                        ..cell.clone()
                    }
                    .to_cell_value(),
                    None => cell.to_cell_value(),
                }
            } else {
                cell.to_cell_value()
            };
            grid.set(cell.row, cell.col, value);
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellValue;

    fn push(sheet: &mut Sheet, row: usize, col: usize, kind: CellType, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind,
            value: value.to_owned(),
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("league.xlsx", "Saison");
        assert!(sheet.is_empty());
        assert_eq!(sheet.row_upper_bound, None);
        assert_eq!(sheet.col_upper_bound, None);
        assert_eq!(sheet.to_grid(&[], &HashMap::new()), Grid::new(0, 0));
    }

    #[test]
    fn sheet_tracks_used_range() {
        let mut sheet = Sheet::new("", "");
        push(&mut sheet, 1, 3, CellType::InlineString, "a");
        push(&mut sheet, 4, 1, CellType::InlineString, "b");
        push(&mut sheet, 2, 2, CellType::InlineString, "c");

        assert_eq!(sheet.cells.len(), 3);
        assert_eq!(sheet.row_upper_bound, Some(4));
        assert_eq!(sheet.col_upper_bound, Some(3));

        let grid = sheet.to_grid(&[], &HashMap::new());
        assert_eq!((grid.nrows(), grid.ncols()), (5, 4));
        assert_eq!(grid.text(4, 1), "b");
        assert!(grid.cell(0, 0).is_empty());
    }

    #[test]
    fn shared_strings_are_resolved_through_mappings() {
        let mut sheet = Sheet::new("", "");
        push(&mut sheet, 0, 0, CellType::SharedString, "7");
        push(&mut sheet, 0, 1, CellType::SharedString, "3");
        push(&mut sheet, 1, 0, CellType::Number, "42");

        assert_eq!(sheet.shared_string_indexes(), HashSet::from([3, 7]));

        let strings = vec!["Group A".to_owned(), "Meyer M.".to_owned()];
        let mappings = HashMap::from([(3, 0), (7, 1)]);
        let grid = sheet.to_grid(&strings, &mappings);
        assert_eq!(grid.cell(0, 0), &CellValue::Text("Meyer M.".to_owned()));
        assert_eq!(grid.cell(0, 1), &CellValue::Text("Group A".to_owned()));
        assert_eq!(grid.cell(1, 0), &CellValue::Number(42.0));
    }

    #[test]
    fn unmapped_shared_string_uses_index_directly() {
        let mut sheet = Sheet::new("", "");
        push(&mut sheet, 0, 0, CellType::SharedString, "1");
        push(&mut sheet, 0, 1, CellType::SharedString, "9");
        let strings = vec!["x".to_owned(), "y".to_owned()];
        let grid = sheet.to_grid(&strings, &HashMap::new());
        assert_eq!(grid.text(0, 0), "y");
        assert_eq!(grid.cell(0, 1), &CellValue::Other("9".to_owned()));
    }
}
