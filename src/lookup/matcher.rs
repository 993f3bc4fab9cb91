use crate::grid::Grid;
use crate::lookup::MatchCoordinate;
use tracing::debug;

/// Collapses whitespace runs to single spaces and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Finds all text cells whose normalized value equals `target`.
///
/// Only the cell side is normalized; `target` is compared as given, so a
/// target with redundant whitespace never matches. The comparison is case
/// sensitive and results come back in row-major order.
pub fn search_text(grid: &Grid, target: &str) -> Vec<MatchCoordinate> {
    let matches: Vec<MatchCoordinate> = grid
        .cells()
        .filter_map(|(row, col, cell)| cell.as_text().map(|text| (row, col, text)))
        .filter(|(_, _, text)| normalize_whitespace(text) == target)
        .map(|(row, col, _)| (row, col))
        .collect();
    debug!(text = target, count = matches.len(), "searched grid for text");
    matches
}
