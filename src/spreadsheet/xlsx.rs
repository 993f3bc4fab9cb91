use crate::error::ContactsError;
use crate::helpers::xml::XmlElementExt;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextBuffer;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::Epoch;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::FileReader;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::HashSet;
use std::io::BufReader;
use tracing::debug;
use zip::read::ZipFile;
use zip::ZipArchive;

const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// An Office Open XML workbook (.xlsx, .xlsm, .xlam)
pub(crate) struct XlsxSpreadsheet {
    pub(crate) name: String,
    zip: ZipArchive<FileReader>,
    /// Cell type per style index
    number_formats: Vec<CellType>,
    /// (sheet name, path inside the archive) in workbook order
    sheets: Vec<(String, String)>,
}

impl XlsxSpreadsheet {
    /// Opens an XLSX workbook and reads its sheet list and styles.
    pub(crate) fn open(file_name: &str) -> Result<XlsxSpreadsheet, ContactsError> {
        let workbook = excel::open(file_name, load_workbook, load_number_formats)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip: workbook.zip,
            number_formats: workbook.number_formats,
            sheets: workbook.sheets,
        })
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    /// Streams `xl/sharedStrings.xml`, stopping once every requested index is found.
    fn load_shared_strings(&mut self, mut indexes: Option<HashSet<usize>>) -> Result<(Vec<String>, HashMap<usize, usize>), ContactsError> {
        let mut shared_strings = Vec::<String>::new();
        let mut mappings = HashMap::<usize, usize>::new();
        if indexes.as_ref().is_some_and(HashSet::is_empty) {
            return Ok((shared_strings, mappings));
        }
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok((shared_strings, mappings)),
        };

        let mut id = 0usize;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                if let Some(keys) = &mut indexes {
                    if keys.remove(&id) {
                        let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                        mappings.insert(id, shared_strings.len());
                        shared_strings.push(string);
                    }
                    if keys.is_empty() {
                        break;
                    }
                } else {
                    let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                    shared_strings.push(string);
                }
                id += 1;
            }
        });
        Ok((shared_strings, mappings))
    }

    fn read_sheet(&mut self, index: usize) -> Result<Sheet, ContactsError> {
        let Self { name, zip, number_formats, sheets } = self;
        let (sheet_name, zip_path) = sheets
            .get(index)
            .ok_or_else(|| SpreadsheetError::SheetNotFound(name.to_owned(), index))?;
        debug!(file = %name, sheet = %sheet_name, path = %zip_path, "reading worksheet");

        let mut reader = zip
            .xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::MissingFile(name.to_owned(), zip_path.to_owned()))?;
        let mut sheet = Sheet::new(name, sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = None::<CellType>;
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.parse_attribute::<usize>("r")? {
                    row_count = number.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => row_count += 1,
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event
                    .attribute("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                let t = event.attribute("t")?;
                let s = event.attribute("s")?;
                kind = Some(cell_type(number_formats, t.as_deref(), s.as_deref())?);
                value.clear();
            }
            Event::Start(event) if kind.is_some() && event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if kind.is_some() && event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if let Some(kind) = kind.take() {
                    if !value.is_empty() {
                        sheet.push(Cell { row, col, kind, value: std::mem::take(&mut value) });
                    }
                }
            }
        });
        debug!(sheet = %sheet.name, cells = sheet.cells.len(), "worksheet read");
        Ok(sheet)
    }
}

/// Resolves the cell type from the `t` and `s` attributes of a cell.
fn cell_type(number_formats: &[CellType], kind: Option<&str>, format_id: Option<&str>) -> Result<CellType, ContactsError> {
    let kind = match kind {
        Some("inlineStr" | "str") => CellType::InlineString,
        Some("s") => CellType::SharedString,
        Some("d") => CellType::IsoDateTime,
        Some("b") => CellType::Boolean,
        Some("e") => CellType::Error,
        _ => CellType::Number,
    };
    match format_id {
        Some(format_id) if kind == CellType::Number && !format_id.is_empty() => {
            let index = format_id.parse::<usize>()?;
            Ok(number_formats.get(index).copied().unwrap_or(CellType::Number))
        }
        _ => Ok(kind),
    }
}

/// Reads the sheet list and date system from `xl/workbook.xml`.
fn load_workbook(zip: &mut ZipArchive<FileReader>) -> Result<(Vec<(String, String)>, Epoch), ContactsError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingFile(String::new(), "xl/workbook.xml".to_owned()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut epoch = Epoch::default();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let name = event.attribute("name")?;
            let id = event.local_attribute("id")?;
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            if matches!(event.attribute("date1904")?.as_deref(), Some("1" | "true")) {
                epoch = Epoch::Mac1904;
            }
        }
    });
    Ok((sheets, epoch))
}

/// Reads `xl/styles.xml` into a cell type per style index.
fn load_number_formats(zip: &mut ZipArchive<FileReader>, epoch: Epoch) -> Result<Vec<CellType>, ContactsError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.attribute("numFmtId")?;
            let format = event.attribute("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::from_format_code(&format, epoch));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.attribute("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, epoch))
}

/// Collects the text of a string element up to `end_tag`, skipping phonetic runs.
fn read_string_value(
    reader: &mut XmlReader<BufReader<ZipFile<'_, FileReader>>>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, ContactsError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = is_text_content,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_reference(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellValue;
    use std::io::Write;
    use std::path::Path;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Saison" sheetId="1" r:id="rId1"/><sheet name="Archiv" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;

    const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    const STYLES: &str = r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts>
<cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="20"/></cellXfs></styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<sst><si><t>Group A</t></si><si><r><t>Meyer</t></r><r><t xml:space="preserve"> M.</t></r><rPh><t>meiya</t></rPh></si><si><t>unused</t></si></sst>"#;

    const SHEET: &str = r#"<worksheet><sheetData>
<row r="2"><c r="B2" t="s"><v>0</v></c></row>
<row r="3"><c r="C3" t="s"><v>1</v></c><c r="D3" s="1"><v>45000</v></c><c r="E3"><v>1701234567</v></c></row>
<row r="4"><c r="C4" t="inlineStr"><is><t>Kurz &amp; Co</t></is></c><c r="D4" t="e"><v>#N/A</v></c><c r="E4" t="b"><v>1</v></c><c><v>7</v></c></row>
</sheetData></worksheet>"#;

    fn write_xlsx(path: &Path, parts: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(std::fs::File::create(path).unwrap());
        for (name, contents) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn workbook(dir: &Path) -> XlsxSpreadsheet {
        let path = dir.join("league.xlsx");
        write_xlsx(
            &path,
            &[
                ("xl/workbook.xml", WORKBOOK),
                ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
                ("xl/styles.xml", STYLES),
                ("xl/sharedStrings.xml", SHARED_STRINGS),
                ("xl/worksheets/sheet1.xml", SHEET),
            ],
        );
        XlsxSpreadsheet::open(path.to_str().unwrap()).unwrap()
    }

    #[test]
    fn reads_sheet_list_and_styles() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = workbook(dir.path());
        assert_eq!(
            xlsx.sheets,
            vec![
                ("Saison".to_owned(), "xl/worksheets/sheet1.xml".to_owned()),
                ("Archiv".to_owned(), "xl/worksheets/sheet2.xml".to_owned()),
            ]
        );
        assert_eq!(xlsx.number_formats, vec![CellType::Number, CellType::Date(Epoch::Windows1900), CellType::Time]);
    }

    #[test]
    fn reads_first_sheet_into_grid() {
        let dir = tempfile::tempdir().unwrap();
        let mut xlsx = workbook(dir.path());
        let sheet = xlsx.read_sheet(0).unwrap();
        assert_eq!(sheet.shared_string_indexes(), HashSet::from([0, 1]));

        let (strings, mappings) = xlsx.load_shared_strings(Some(sheet.shared_string_indexes())).unwrap();
        assert_eq!(strings, vec!["Group A".to_owned(), "Meyer M.".to_owned()]);

        let grid = sheet.to_grid(&strings, &mappings);
        assert_eq!((grid.nrows(), grid.ncols()), (4, 6));
        assert_eq!(grid.text(1, 1), "Group A");
        assert_eq!(grid.text(2, 2), "Meyer M.");
        assert_eq!(grid.cell(2, 3), &CellValue::Other("2023-03-15".to_owned()));
        assert_eq!(grid.cell(2, 4), &CellValue::Number(1701234567.0));
        assert_eq!(grid.text(3, 2), "Kurz & Co");
        assert_eq!(grid.cell(3, 3), &CellValue::Other("#N/A".to_owned()));
        assert_eq!(grid.cell(3, 4), &CellValue::Other("TRUE".to_owned()));
        assert_eq!(grid.cell(3, 5), &CellValue::Number(7.0));
    }

    #[test]
    fn missing_sheet_part_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut xlsx = workbook(dir.path());
        assert!(matches!(
            xlsx.read_sheet(1),
            Err(ContactsError::SpreadsheetError(SpreadsheetError::MissingFile(_, path))) if path == "xl/worksheets/sheet2.xml"
        ));
        assert!(matches!(
            xlsx.read_sheet(2),
            Err(ContactsError::SpreadsheetError(SpreadsheetError::SheetNotFound(_, 2)))
        ));
    }

    #[test]
    fn workbook_without_sheets_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        write_xlsx(
            &path,
            &[
                ("xl/workbook.xml", "<workbook><sheets/></workbook>"),
                ("xl/_rels/workbook.xml.rels", "<Relationships/>"),
            ],
        );
        assert!(matches!(
            XlsxSpreadsheet::open(path.to_str().unwrap()),
            Err(ContactsError::SpreadsheetError(SpreadsheetError::EmptyWorkbook(_)))
        ));
    }
}
