use crate::grid::Grid;
use crate::lookup::{find_bounds, search_text, LookupError};
use tracing::info;

/// Finds the group of `player_name` in the league grid and lists the other
/// players of that group.
///
/// The player name is matched as a whole. The group label sits one row above
/// and one column left of the first table entry. Opponents are returned in
/// ascending row order with the player's own row left out.
pub fn get_group_and_opponents(
    grid: &Grid,
    player_name: &str,
) -> Result<(String, Vec<String>), LookupError> {
    let (row, col) = match search_text(grid, player_name).as_slice() {
        [] => Err(LookupError::NoMatch { name: player_name.to_owned() })?,
        [coordinate] => *coordinate,
        matches => Err(LookupError::AmbiguousMatch {
            name: player_name.to_owned(),
            count: matches.len(),
        })?,
    };

    let bounds = find_bounds(grid, row, col)?;
    let header = bounds
        .low_row
        .checked_sub(1)
        .zip(col.checked_sub(1))
        .ok_or(LookupError::MalformedTable { row, col })?;
    let group = grid.text(header.0, header.1);

    let opponents: Vec<String> = (bounds.low_row..row)
        .chain(row + 1..=bounds.high_row)
        .map(|opponent_row| grid.text(opponent_row, col))
        .collect();

    info!(player_name, group = %group, opponents = opponents.len(), "found group");
    Ok((group, opponents))
}
