use crate::grid::Grid;
use crate::lookup::{search_text, LookupError, MatchCoordinate};
use std::fmt::Display;
use tracing::debug;

/// A last name plus the leading letters of a first name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerNameQuery {
    pub last_name: String,
    /// Periods removed; an empty prefix accepts any first name
    pub first_name_prefix: String,
}

impl Display for PlayerNameQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.first_name_prefix.is_empty() {
            write!(f, "{}", self.last_name)
        } else {
            write!(f, "{} {}", self.last_name, self.first_name_prefix)
        }
    }
}

impl TryFrom<&str> for PlayerNameQuery {
    type Error = LookupError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        parse_name(raw)
    }
}

/// Splits a free-text name such as `"Meyer M."` into a query.
pub fn parse_name(raw: &str) -> Result<PlayerNameQuery, LookupError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let (last_name, first_name_prefix) = match tokens.as_slice() {
        [] => ("", String::new()),
        [last] => (*last, String::new()),
        [last, first] => (*last, first.replace('.', "")),
        _ => Err(LookupError::InvalidNameFormat { name: raw.to_owned() })?,
    };
    Ok(PlayerNameQuery {
        last_name: last_name.to_owned(),
        first_name_prefix,
    })
}

/// Locates the last-name cell of the one player matching `query`.
///
/// Candidates are text cells equal to the last name whose right neighbour
/// starts with the first-name prefix.
pub fn resolve(grid: &Grid, query: &PlayerNameQuery) -> Result<MatchCoordinate, LookupError> {
    let candidates: Vec<MatchCoordinate> = search_text(grid, &query.last_name)
        .into_iter()
        .filter(|(row, col)| {
            grid.text(*row, col + 1)
                .starts_with(query.first_name_prefix.as_str())
        })
        .collect();
    debug!(%query, count = candidates.len(), "resolved player name");

    match candidates.as_slice() {
        [] => Err(LookupError::NoMatch { name: query.to_string() }),
        [coordinate] => Ok(*coordinate),
        _ => Err(LookupError::AmbiguousMatch {
            name: query.to_string(),
            count: candidates.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::grid_of;

    fn query(last_name: &str, first_name_prefix: &str) -> PlayerNameQuery {
        PlayerNameQuery {
            last_name: last_name.to_owned(),
            first_name_prefix: first_name_prefix.to_owned(),
        }
    }

    fn players() -> Grid {
        grid_of(&[
            &["Name", "Vorname"],
            &["Meyer", "Markus"],
            &["Meyer", "Thomas"],
            &["Meyer", "Theo"],
            &["Schulz", "Anna"],
            &["", ""],
        ])
    }

    #[test]
    fn parse_splits_last_name_and_prefix() {
        assert_eq!(parse_name("Meyer M."), Ok(query("Meyer", "M")));
        assert_eq!(parse_name("Meyer Th"), Ok(query("Meyer", "Th")));
        assert_eq!(parse_name("Meyer"), Ok(query("Meyer", "")));
        assert_eq!(parse_name(""), Ok(query("", "")));
        assert_eq!(parse_name("  Meyer \t M.  "), Ok(query("Meyer", "M")));
    }

    #[test]
    fn parse_strips_every_period() {
        assert_eq!(parse_name("Meyer H.-J."), Ok(query("Meyer", "H-J")));
    }

    #[test]
    fn parse_rejects_three_tokens() {
        assert_eq!(
            parse_name("A B C"),
            Err(LookupError::InvalidNameFormat { name: "A B C".to_owned() })
        );
        assert!(PlayerNameQuery::try_from("von der Heide").is_err());
    }

    #[test]
    fn resolve_uses_the_first_name_prefix() {
        let grid = players();
        assert_eq!(resolve(&grid, &query("Meyer", "M")), Ok((1, 0)));
        assert_eq!(resolve(&grid, &query("Meyer", "Tho")), Ok((2, 0)));
        assert_eq!(resolve(&grid, &query("Schulz", "")), Ok((4, 0)));
    }

    #[test]
    fn resolve_reports_ambiguity_with_count() {
        let grid = players();
        assert_eq!(
            resolve(&grid, &query("Meyer", "")),
            Err(LookupError::AmbiguousMatch {
                name: "Meyer".to_owned(),
                count: 3
            })
        );
        assert_eq!(
            resolve(&grid, &query("Meyer", "Th")),
            Err(LookupError::AmbiguousMatch {
                name: "Meyer Th".to_owned(),
                count: 2
            })
        );
    }

    #[test]
    fn resolve_reports_no_match() {
        let grid = players();
        assert_eq!(
            resolve(&grid, &query("Meyer", "X")),
            Err(LookupError::NoMatch { name: "Meyer X".to_owned() })
        );
        assert!(matches!(
            resolve(&grid, &query("Fischer", "")),
            Err(LookupError::NoMatch { .. })
        ));
    }

    #[test]
    fn prefix_is_case_sensitive() {
        let grid = players();
        assert!(resolve(&grid, &query("Schulz", "a")).is_err());
    }
}
