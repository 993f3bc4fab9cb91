//! # League Contacts
//!
//! Compiles the list of a squash league player's opponents and how to reach
//! them, from two spreadsheets:
//!
//! - the **league database**, whose first sheet lists the season's groups as
//!   vertical runs of player names headed by the group name, and
//! - the **players database**, whose first sheet holds one row per player:
//!   last name, first name, home, office and mobile phone, e-mail.
//!
//! ## Supported formats
//!
//! Excel 97-2003 (`.xls`, `.xla`), Office Open XML (`.xlsx`, `.xlsm`, `.xlam`)
//! and OpenDocument (`.ods`) workbooks are read by a pure Rust loader into a
//! [`grid::Grid`]. The lookup in [`lookup`] only ever works on grids.
//!
//! ## Example
//!
//! ```no_run
//! use league_contacts::lookup::{get_contacts, get_group_and_opponents};
//! use league_contacts::spreadsheet::load_grid;
//!
//! let league = load_grid("Liga.ods")?;
//! let (group, opponents) = get_group_and_opponents(&league, "Meyer M.")?;
//! let players = load_grid("Rangliste Adressen.xls")?;
//! for contact in get_contacts(&players, &opponents)? {
//!     println!("{} {}: {:?}", contact.first_name, contact.last_name, contact.best_phone());
//! }
//! # let _ = group;
//! # Ok::<(), league_contacts::error::ContactsError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod grid;
pub(crate) mod helpers;
pub mod logging;
pub mod lookup;
pub mod report;
pub mod spreadsheet;

pub use error::ContactsError;
