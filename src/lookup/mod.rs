//! # Opponent Lookup
//!
//! Searches the league grid for a player's group and opponents, then resolves
//! every opponent against the players grid to a contact record.
//!
//! Every search that is expected to identify one person has to match exactly
//! one cell. Zero or several matches are reported as errors, never resolved
//! by picking the first hit.
use crate::spreadsheet::index_to_reference;
use thiserror::Error;

pub mod bounds;
pub mod contacts;
pub mod group;
pub mod matcher;
pub mod names;

pub use bounds::{find_bounds, TableBounds};
pub use contacts::{get_contacts, ContactRecord};
pub use group::get_group_and_opponents;
pub use matcher::{normalize_whitespace, search_text};
pub use names::{parse_name, resolve, PlayerNameQuery};

/// A (row, column) pair identifying one cell.
pub type MatchCoordinate = (usize, usize);

/// Errors raised while searching the league and players grids.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Name does not split into at most two whitespace separated tokens
    #[error("'{name}' is not a valid player name")]
    InvalidNameFormat { name: String },

    /// Nothing matched where exactly one match was required
    #[error("No match found for '{name}'")]
    NoMatch { name: String },

    /// Several cells matched where exactly one match was required
    #[error("More than one ({count}) match found for '{name}'")]
    AmbiguousMatch { name: String, count: usize },

    /// The table around the cell is not enclosed by empty cells inside the sheet
    #[error("Table at '{}' is not bounded by empty cells", cell_reference(.row, .col))]
    MalformedTable { row: usize, col: usize },
}

fn cell_reference(row: &usize, col: &usize) -> String {
    index_to_reference(*row, *col)
}

#[cfg(test)]
pub(crate) fn grid_of(rows: &[&[&str]]) -> crate::grid::Grid {
    use crate::grid::{CellValue, Grid};
    Grid::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|value| CellValue::from(*value)).collect::<Vec<_>>()),
    )
}
