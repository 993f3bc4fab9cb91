use crate::error::ContactsError;
use crate::error::ResultOptionChain;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::match_biff8_record;
use crate::spreadsheet::cell::error_text;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::Epoch;
use crate::spreadsheet::excel::load_number_formats;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use either::Either;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

// BIFF8 record types
const FORMULA: u16 = 6;
const EOF: u16 = 10;
const DATE1904: u16 = 34;
const FILE_PASS: u16 = 47;
const CODE_PAGE: u16 = 66;
const BOUND_SHEET8: u16 = 133;
const MUL_RK: u16 = 189;
const XF: u16 = 224;
const SST: u16 = 252;
const LABEL_SST: u16 = 253;
const NUMBER: u16 = 515;
const LABEL: u16 = 516;
const BOOL_ERR: u16 = 517;
const STRING: u16 = 519;
const ARRAY: u16 = 545;
const TABLE: u16 = 566;
const RK: u16 = 638;
const FORMAT: u16 = 1054;
const SHARED_FORMULA: u16 = 1212;
const BOF: u16 = 2057;

/// Errors specific to Excel 97-2003 workbooks
#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid Formula value '{0}'")]
    FormulaValueError(u64),
}

/// Either a fixed cell type or an index into the number formats
type CellKind = Either<CellType, usize>;

/// An Excel 97-2003 workbook (.xls, .xla)
pub(crate) struct XlsSpreadsheet {
    pub(crate) name: String,
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    /// Cell type per XF index
    number_formats: Vec<CellType>,
    /// (sheet name, stream offset of its BOF record) in workbook order
    sheets: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    /// Opens an XLS file and reads the workbook globals substream.
    pub(crate) fn open(file_name: &str) -> Result<XlsSpreadsheet, ContactsError> {
        let mut buf_reader = BufReader::new(File::open(file_name)?);
        let cfb = Cfb::new(&mut buf_reader)?;
        let stream = cfb
            .read("Workbook")
            .ok_none_else(|| cfb.read("Book"))?
            .ok_or_else(|| SpreadsheetError::MissingFile(file_name.to_owned(), "Workbook".to_owned()))?;
        Self::from_stream(file_name, stream)
    }

    /// Parses the globals of a workbook stream already extracted from its container.
    pub(crate) fn from_stream(file_name: &str, stream: Vec<u8>) -> Result<XlsSpreadsheet, ContactsError> {
        let mut reader = Biff8Reader::new(stream);
        let mut epoch = Epoch::default();
        let mut shared_strings = Vec::new();
        let mut custom_formats: HashMap<String, CellType> = HashMap::new();
        let mut format_indexes: Vec<String> = Vec::new();
        let mut sheets: Vec<(String, usize)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::PasswordProtected(file_name.to_owned()))?,
            DATE1904 if reader.read_u16()? == 1 => epoch = Epoch::Mac1904,
            // BIFF8 strings are UTF-16LE or Latin-1 whatever the declared code page
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                match codepage::to_encoding(code_page) {
                    Some(encoding) => debug!(code_page, encoding = encoding.name(), "workbook code page"),
                    None => warn!(code_page, "unknown workbook code page"),
                }
            }
            FORMAT => {
                let id = reader.read_u16()?;
                let format = reader.read_string()?;
                custom_formats.insert(id.to_string(), CellType::from_format_code(&format, epoch));
            }
            XF => {
                reader.skip(2)?;
                let id = reader.read_u16()?;
                format_indexes.push(id.to_string());
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_usize()?;
                reader.skip(2)?;
                let sheet_name = reader.read_short_string()?;
                sheets.push((sheet_name, pointer));
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(file_name.to_owned()))?
        }
        debug!(file = file_name, sheets = sheets.len(), shared_strings = shared_strings.len(), "read workbook globals");

        Ok(XlsSpreadsheet {
            name: file_name.to_owned(),
            reader,
            shared_strings,
            number_formats: load_number_formats(format_indexes, custom_formats, epoch),
            sheets,
        })
    }

    fn resolve(&self, kind: CellKind) -> CellType {
        match kind {
            Either::Left(kind) => kind,
            Either::Right(index) => self.number_formats.get(index).copied().unwrap_or(CellType::Number),
        }
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> String {
        self.name.clone()
    }

    /// The table was read with the globals, so every requested index maps to itself.
    fn load_shared_strings(
        &mut self,
        indexes: Option<HashSet<usize>>,
    ) -> Result<(Vec<String>, HashMap<usize, usize>), ContactsError> {
        let mappings = indexes
            .unwrap_or_default()
            .into_iter()
            .map(|key| (key, key))
            .collect();
        Ok((self.shared_strings.to_owned(), mappings))
    }

    fn read_sheet(&mut self, index: usize) -> Result<Sheet, ContactsError> {
        let (sheet_name, pointer) = self
            .sheets
            .get(index)
            .cloned()
            .ok_or_else(|| SpreadsheetError::SheetNotFound(self.name.to_owned(), index))?;
        debug!(file = %self.name, sheet = %sheet_name, pointer, "reading worksheet");

        self.reader.goto(pointer);
        self.reader.next()?;
        let mut sheet = Sheet::new(&self.name, &sheet_name);
        while let Some(tag) = self.reader.next()? {
            match tag {
                BOF | EOF => break,
                MUL_RK => {
                    let row = self.reader.read_u16()? as usize;
                    let col_lower_bound = self.reader.read_u16()? as usize;
                    let col_upper_bound = self.reader.get_u16_back(2)? as usize;
                    for col in col_lower_bound..=col_upper_bound {
                        let index = self.reader.read_u16()? as usize;
                        let kind = self.resolve(Either::Right(index));
                        let value = self.reader.read_rk_number()?;
                        sheet.push(Cell { row, col, kind, value });
                    }
                }
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = self.reader.read_u16()? as usize;
                    let col = self.reader.read_u16()? as usize;
                    let (kind, value) = match tag {
                        BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                        NUMBER => read_number_cell(&mut self.reader)?,
                        RK => read_rk_cell(&mut self.reader)?,
                        LABEL_SST => read_label_sst_cell(&mut self.reader)?,
                        LABEL => read_label_cell(&mut self.reader)?,
                        _ => read_formula_cell(&mut self.reader)?,
                    };
                    if !value.is_empty() {
                        let kind = self.resolve(kind);
                        sheet.push(Cell { row, col, kind, value });
                    }
                }
                _ => (),
            }
        }
        Ok(sheet)
    }
}

/// Reads every string of the SST record.
fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, ContactsError> {
    reader.skip(4)?;
    let count = reader.read_usize()?;
    (0..count).map(|_| reader.read_rich_string()).collect()
}

fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), ContactsError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    let flag = reader.read_u8()?;
    if flag == 0 {
        Ok((Either::Left(CellType::Boolean), value.to_string()))
    } else {
        Ok((Either::Left(CellType::Error), error_text(value).to_owned()))
    }
}

fn read_number_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), ContactsError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_f64()?;
    Ok((Either::Right(index), value.to_string()))
}

fn read_rk_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), ContactsError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_rk_number()?;
    Ok((Either::Right(index), value))
}

fn read_label_sst_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), ContactsError> {
    reader.skip(2)?;
    let value = reader.read_usize()?;
    Ok((Either::Left(CellType::SharedString), value.to_string()))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), ContactsError> {
    reader.skip(2)?;
    let value = reader.read_string()?;
    Ok((Either::Left(CellType::InlineString), value))
}

/// Reads the cached result of a formula.
///
/// String results live in the STRING record that follows, possibly after
/// the SHRFMLA, ARRAY or TABLE record holding the formula itself.
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<(CellKind, String), ContactsError> {
    let index = reader.read_u16()? as usize;
    let formula = reader.read_u64()?;
    let is_number = (formula & 0xFFFF000000000000) != 0xFFFF000000000000;
    if is_number {
        return Ok((Either::Right(index), f64::from_bits(formula).to_string()));
    }
    match formula & 0xFF {
        0 => loop {
            match reader.next()? {
                Some(STRING) => break Ok((Either::Left(CellType::InlineString), reader.read_string()?)),
                Some(SHARED_FORMULA | ARRAY | TABLE) => continue,
                _ => break Err(XlsError::FormulaValueError(formula).into()),
            }
        },
        1 => {
            let value = if (formula & 0xFF0000) > 0 { "1" } else { "0" };
            Ok((Either::Left(CellType::Boolean), value.to_owned()))
        }
        2 => {
            let code = ((formula >> 16) & 0xFF) as u8;
            Ok((Either::Left(CellType::Error), error_text(code).to_owned()))
        }
        3 => Ok((Either::Left(CellType::InlineString), String::new())),
        _ => Err(XlsError::FormulaValueError(formula))?,
    }
}
