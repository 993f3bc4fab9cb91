use crate::grid::Grid;
use crate::lookup::{parse_name, resolve, LookupError};
use tracing::debug;

// Column offsets from the last-name cell in the players grid
const FIRST_NAME: usize = 1;
const PHONE_HOME: usize = 2;
const PHONE_OFFICE: usize = 3;
const PHONE_MOBILE: usize = 4;
const EMAIL: usize = 5;

/// Contact details of one opponent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_mobile: String,
    pub phone_home: String,
    pub phone_office: String,
}

impl ContactRecord {
    /// Phone numbers in reachability order: mobile, home, office.
    pub fn phones(&self) -> [&str; 3] {
        [
            self.phone_mobile.as_str(),
            self.phone_home.as_str(),
            self.phone_office.as_str(),
        ]
    }

    /// The most reachable phone number that is not blank.
    pub fn best_phone(&self) -> Option<&str> {
        self.phones().into_iter().find(|phone| !phone.trim().is_empty())
    }
}

/// Looks up the contact record of every opponent, in input order.
///
/// The batch fails as a whole: the first opponent that cannot be identified
/// uniquely aborts the lookup and no records are returned.
pub fn get_contacts<S: AsRef<str>>(
    grid: &Grid,
    opponents: &[S],
) -> Result<Vec<ContactRecord>, LookupError> {
    opponents
        .iter()
        .map(|opponent| {
            let opponent: &str = opponent.as_ref();
            let query = parse_name(opponent)?;
            let (row, col) = resolve(grid, &query)?;
            debug!(opponent, row, col, "found contact row");
            Ok(ContactRecord {
                first_name: grid.text(row, col + FIRST_NAME),
                last_name: query.last_name,
                email: grid.text(row, col + EMAIL),
                phone_mobile: grid.text(row, col + PHONE_MOBILE),
                phone_home: grid.text(row, col + PHONE_HOME),
                phone_office: grid.text(row, col + PHONE_OFFICE),
            })
        })
        .collect()
}
