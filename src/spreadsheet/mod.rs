//! # Spreadsheet Loading
//!
//! Reads the first worksheet of an Excel (.xls, .xla, .xlsx, .xlsm, .xlam) or
//! OpenDocument (.ods) file into a [`Grid`]. Each format has its own reader
//! behind the [`Spreadsheet`] trait; the lookup code only ever sees the grid.
use crate::error::ContactsError;
use crate::error::ResultMessage;
use crate::grid::Grid;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xls::XlsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub(crate) mod cell;
pub(crate) mod excel;
pub(crate) mod ods;
pub mod reference;
pub(crate) mod sheet;
pub(crate) mod xls;
pub(crate) mod xlsx;

pub use reference::index_to_reference;
pub use reference::reference_to_index;

/// Errors raised while opening a workbook or locating a sheet.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect file format for '{0}'")]
    UnsupportedFileFormat(String),

    #[error("Spreadsheet '{0}' is password protected")]
    PasswordProtected(String),

    #[error("Spreadsheet '{0}' contains no sheets")]
    EmptyWorkbook(String),

    #[error("Missing '{1}' in '{0}'")]
    MissingFile(String, String),

    #[error("Sheet #{1} not found in '{0}'")]
    SheetNotFound(String, usize),
}

/// Type alias for buffered file reader
pub type FileReader = BufReader<File>;

/// A workbook opened for reading.
pub(crate) trait Spreadsheet {
    /// Returns the file name of the workbook.
    fn name(&self) -> String;

    /// Loads the shared string table.
    ///
    /// With `indexes` set, only those entries are loaded and the returned map
    /// translates each original index to its position in the returned vector.
    fn load_shared_strings(
        &mut self,
        indexes: Option<HashSet<usize>>,
    ) -> Result<(Vec<String>, HashMap<usize, usize>), ContactsError>;

    /// Reads the worksheet at `index`, counting from zero in workbook order.
    fn read_sheet(&mut self, index: usize) -> Result<Sheet, ContactsError>;
}

/// Opens a workbook with the reader matching its file extension.
pub(crate) fn open_spreadsheet(file_name: &str) -> Result<Box<dyn Spreadsheet>, ContactsError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let spreadsheet: Box<dyn Spreadsheet> = match extension.as_str() {
        "xls" | "xla" => Box::new(XlsSpreadsheet::open(file_name)?),
        "xlsx" | "xlsm" | "xlam" => Box::new(XlsxSpreadsheet::open(file_name)?),
        "ods" => Box::new(OdsSpreadsheet::open(file_name)?),
        _ => Err(SpreadsheetError::UnsupportedFileFormat(file_name.to_owned()))?,
    };
    Ok(spreadsheet)
}

/// Loads the first worksheet of the workbook at `path` into a grid.
///
/// Errors name the file they occurred in.
pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<Grid, ContactsError> {
    let file_name = path.as_ref().to_string_lossy();
    let prefix = format!("Read '{}'", file_name);
    let mut spreadsheet = open_spreadsheet(&file_name).with_prefix(&prefix)?;
    let sheet = spreadsheet.read_sheet(0).with_prefix(&prefix)?;
    let (shared_strings, mappings) = spreadsheet
        .load_shared_strings(Some(sheet.shared_string_indexes()))
        .with_prefix(&prefix)?;
    let grid = sheet.to_grid(&shared_strings, &mappings);
    info!(
        file = %spreadsheet.name(),
        sheet = %sheet.name,
        rows = grid.nrows(),
        cols = grid.ncols(),
        "loaded worksheet"
    );
    Ok(grid)
}
