use crate::error::ContactsError;
use crate::helpers::xml::XmlElementExt;
use crate::helpers::xml::XmlTextBuffer;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::FileReader;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
const TABLE: QName = QName(b"table:table");
const TABLE_ROW: QName = QName(b"table:table-row");
const TABLE_CELL: QName = QName(b"table:table-cell");
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
const ANNOTATION: QName = QName(b"office:annotation");
const PARAGRAPH: QName = QName(b"text:p");
const SPACES: QName = QName(b"text:s");
const FILE_ENTRY: QName = QName(b"manifest:file-entry");
const ENCRYPTION_DATA: QName = QName(b"manifest:encryption-data");

#[derive(Error, Debug)]
pub enum OdsError {
    #[error("Invalid ODS MIME type")]
    MimeTypeError,
}

/// An OpenDocument spreadsheet (.ods)
pub(crate) struct OdsSpreadsheet {
    pub(crate) name: String,
    zip: ZipArchive<FileReader>,
}

impl OdsSpreadsheet {
    /// Opens an ODS file, checking its MIME type and encryption.
    pub(crate) fn open(file_name: &str) -> Result<Self, ContactsError> {
        let file = File::open(file_name)?;
        let mut zip = ZipArchive::new(BufReader::new(file))?;
        check_mime(&mut zip)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::PasswordProtected(file_name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: file_name.to_owned(),
            zip,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// ODS keeps all strings inline.
    fn load_shared_strings(
        &mut self,
        _indexes: Option<HashSet<usize>>,
    ) -> Result<(Vec<String>, HashMap<usize, usize>), ContactsError> {
        Ok((Vec::new(), HashMap::new()))
    }

    fn read_sheet(&mut self, index: usize) -> Result<Sheet, ContactsError> {
        let mut reader = self
            .zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::MissingFile(self.name.to_owned(), "content.xml".to_owned()))?;

        let mut table = 0usize;
        let mut found = None::<Sheet>;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                if table == index {
                    let sheet_name = event.attribute("table:name")?.map(Cow::into_owned).unwrap_or_default();
                    found = Some(Sheet::new(&self.name, &sheet_name));
                    break;
                }
                table += 1;
            }
        });
        let Some(mut sheet) = found else {
            return Err(SpreadsheetError::SheetNotFound(self.name.to_owned(), index).into());
        };
        debug!(file = %self.name, sheet = %sheet.name, "reading worksheet");

        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        // Text content is collected only for string cells, outside annotations
        let mut text_context = false;
        let mut comment_context = false;
        match_xml_events!(reader => {
            Event::End(event) if event.name() == TABLE => break,
            Event::Start(event) if event.name() == TABLE_ROW => {
                row_count = event.parse_attribute("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if event.name() == TABLE_ROW => row += row_count,
            Event::Start(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                value.clear();
                col_count = event.parse_attribute::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                let value_type = event.attribute("office:value-type")?;
                kind = match value_type.as_deref() {
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some("string") if event.attribute("calcext:value-type")?.as_deref() == Some("error") => CellType::Error,
                    Some("string") => CellType::InlineString,
                    Some(_) => CellType::Number,
                    None => CellType::Empty,
                };
                match value_type.as_deref() {
                    Some("string") => text_context = true,
                    Some("boolean") => {
                        let flag = event.attribute("office:boolean-value")?;
                        value.push_str(if flag.is_some_and(|flag| flag != "false" && flag != "0") { "1" } else { "0" });
                    }
                    Some("date") => value.push_str(&event.attribute("office:date-value")?.unwrap_or_default()),
                    Some("time") => value.push_str(&event.attribute("office:time-value")?.unwrap_or_default()),
                    Some(_) => value.push_str(&event.attribute("office:value")?.unwrap_or_default()),
                    None => (),
                }
            }
            Event::End(event) if event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL => {
                if kind != CellType::Empty && !value.is_empty() {
                    for row_number in row..row + row_count {
                        for col_number in col..col + col_count {
                            sheet.push(Cell {
                                row: row_number,
                                col: col_number,
                                kind,
                                value: value.to_owned(),
                            });
                        }
                    }
                }
                col += col_count;
                text_context = false;
                comment_context = false;
            }
            Event::Start(event) if text_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if text_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if text_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if text_context && !comment_context && event.name() == SPACES => {
                let count = event.parse_attribute("text:c")?.unwrap_or(1);
                value.extend(std::iter::repeat_n(' ', count));
            }
            Event::Text(event) if text_context && !comment_context => value.push_text(&event)?,
            Event::GeneralRef(event) if text_context && !comment_context => value.push_reference(&event)?,
        });
        Ok(sheet)
    }
}

/// Rejects archives whose `mimetype` entry names another document type.
fn check_mime(zip: &mut ZipArchive<FileReader>) -> Result<(), ContactsError> {
    if let Some(mut file) = zip.file("mimetype")? {
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        if buffer.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError)?;
        }
    }
    Ok(())
}

/// Looks for encryption data on any manifest entry.
fn is_password_protected(zip: &mut ZipArchive<FileReader>) -> Result<bool, ContactsError> {
    let Some(mut reader) = zip.xml_reader("META-INF/manifest.xml")? else {
        return Ok(false);
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == FILE_ENTRY => in_file_entry = true,
        Event::End(event) if event.name() == FILE_ENTRY => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == ENCRYPTION_DATA => return Ok(true),
    });
    Ok(false)
}
