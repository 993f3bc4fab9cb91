//! Helpers shared by the Office Open XML readers
use crate::error::ContactsError;
use crate::helpers::cfb::Cfb;
use crate::helpers::xml::XmlElementExt;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::Epoch;
use crate::spreadsheet::FileReader;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements in Excel files
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Workbook parts needed to read worksheets
pub(super) struct Workbook<RS: Read + Seek> {
    pub(super) zip: ZipArchive<RS>,
    /// Cell type per style index
    pub(super) number_formats: Vec<CellType>,
    /// (sheet name, path inside the archive) in workbook order
    pub(super) sheets: Vec<(String, String)>,
}

/// Opens an Excel workbook file and loads its sheet list and number formats.
pub(super) fn open<W, F>(file_name: &str, load_workbook: W, load_number_formats: F) -> Result<Workbook<FileReader>, ContactsError>
where
    W: Fn(&mut ZipArchive<FileReader>) -> Result<(Vec<(String, String)>, Epoch), ContactsError>,
    F: Fn(&mut ZipArchive<FileReader>, Epoch) -> Result<Vec<CellType>, ContactsError>,
{
    let mut reader = BufReader::new(File::open(file_name)?);

    // Encrypted OOXML files are CFB containers instead of ZIP archives
    if is_password_protected(&mut reader) {
        Err(SpreadsheetError::PasswordProtected(file_name.to_owned()))?;
    }

    let mut zip = ZipArchive::new(reader)?;
    let (sheets, epoch) = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::EmptyWorkbook(file_name.to_owned()))?
    }

    let number_formats = load_number_formats(&mut zip, epoch)?;
    Ok(Workbook { zip, number_formats, sheets })
}

/// Loads the worksheet relationships, mapping relationship id to archive path.
pub(super) fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, ContactsError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingFile(String::new(), path.to_owned()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.attribute("Id")?;
            let kind = event.attribute("Type")?;
            let target = event.attribute("Target")?;
            // Only worksheet relationships matter
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Maps style indexes to cell types using custom and built-in number formats.
pub(super) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>, epoch: Epoch) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::builtin_format(id, epoch))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Normalizes a relationship target to a path inside the archive.
pub(crate) fn to_zip_path(path: &str) -> String {
    if let Some(path) = path.strip_prefix('/') {
        path.to_owned()
    } else if path.starts_with("xl/") {
        path.to_owned()
    } else {
        format!("xl/{path}")
    }
}

/// Checks for the encrypted package stream of a protected workbook.
fn is_password_protected<RS: Read + Seek>(reader: &mut RS) -> bool {
    match Cfb::new(reader) {
        Ok(cfb) => cfb.exists("EncryptedPackage"),
        Err(_) => false,
    }
}
