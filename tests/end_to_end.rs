use league_contacts::grid::CellValue;
use league_contacts::lookup::{get_contacts, get_group_and_opponents, LookupError};
use league_contacts::report::write_report;
use league_contacts::spreadsheet::{index_to_reference, load_grid};
use league_contacts::ContactsError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A cell of a test sheet: row, column, value. Values that parse as numbers
/// are written as numeric cells.
type TestCell = (usize, usize, &'static str);

fn league_cells() -> Vec<TestCell> {
    vec![
        (0, 0, "Squash Liga 2024"),
        (4, 1, "Group A"),
        (5, 2, "Schulz A."),
        (6, 2, "Weber"),
        (7, 2, "Meyer  M."),
        (8, 2, "Wagner P"),
        (9, 2, "Fischer K"),
        (11, 1, "Group B"),
        (12, 2, "Becker"),
        (13, 2, "Hoffmann"),
    ]
}

fn players_cells(with_second_fischer: bool) -> Vec<TestCell> {
    let rows: &[[&'static str; 6]] = &[
        ["Name", "Vorname", "Privat", "Dienst", "Mobil", "E-Mail"],
        ["Meyer", "Markus", "111", "222", "333", "markus@example.org"],
        ["Schulz", "Anna", "", "555", "666", "anna@example.org"],
        ["Weber", "Tim", "", "", "", "tim@example.org"],
        ["Wagner", "Paul", "777", "", "888", ""],
        ["Fischer", "Klaus", "0301 234", "", "", "klaus@example.org"],
        ["Meyer", "Thomas", "444", "", "", "thomas@example.org"],
        ["Fischer", "Karin", "", "", "999", "karin@example.org"],
    ];
    let count = if with_second_fischer { rows.len() } else { rows.len() - 1 };
    rows[..count]
        .iter()
        .enumerate()
        .flat_map(|(row, values)| {
            values
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_empty())
                .map(move |(col, value)| (row, col, *value))
        })
        .collect()
}

fn by_row(cells: &[TestCell]) -> BTreeMap<usize, Vec<(usize, &'static str)>> {
    let mut rows: BTreeMap<usize, Vec<(usize, &'static str)>> = BTreeMap::new();
    for (row, col, value) in cells {
        rows.entry(*row).or_default().push((*col, *value));
    }
    for cells in rows.values_mut() {
        cells.sort();
    }
    rows
}

fn is_number(value: &str) -> bool {
    value.parse::<f64>().is_ok()
}

fn write_zip(path: &Path, parts: &[(&str, String)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, contents) in parts {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Writes an .xlsx workbook; text goes to the shared string table.
fn write_xlsx(path: &Path, cells: &[TestCell]) {
    let mut strings: Vec<&str> = Vec::new();
    let mut sheet = String::from("<worksheet><sheetData>");
    for (row, cells) in by_row(cells) {
        sheet.push_str(&format!("<row r=\"{}\">", row + 1));
        for (col, value) in cells {
            let reference = index_to_reference(row, col);
            if is_number(value) {
                sheet.push_str(&format!("<c r=\"{reference}\"><v>{value}</v></c>"));
            } else {
                sheet.push_str(&format!("<c r=\"{reference}\" t=\"s\"><v>{}</v></c>", strings.len()));
                strings.push(value);
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");
    let shared_strings: String = strings.iter().map(|string| format!("<si><t>{string}</t></si>")).collect();

    write_zip(
        path,
        &[
            (
                "xl/workbook.xml",
                r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Tabelle1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_owned(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_owned(),
            ),
            ("xl/sharedStrings.xml", format!("<sst>{shared_strings}</sst>")),
            ("xl/worksheets/sheet1.xml", sheet),
        ],
    );
}

/// Writes an .ods document, filling gaps with repeated empty rows and cells.
fn write_ods(path: &Path, cells: &[TestCell]) {
    let mut table = String::from("<table:table table:name=\"Tabelle1\">");
    let mut next_row = 0;
    for (row, cells) in by_row(cells) {
        if row > next_row {
            table.push_str(&format!(
                "<table:table-row table:number-rows-repeated=\"{}\"><table:table-cell/></table:table-row>",
                row - next_row
            ));
        }
        table.push_str("<table:table-row>");
        let mut next_col = 0;
        for (col, value) in cells {
            if col > next_col {
                table.push_str(&format!("<table:table-cell table:number-columns-repeated=\"{}\"/>", col - next_col));
            }
            if is_number(value) {
                table.push_str(&format!(
                    "<table:table-cell office:value-type=\"float\" office:value=\"{value}\"><text:p>{value}</text:p></table:table-cell>"
                ));
            } else {
                table.push_str(&format!("<table:table-cell office:value-type=\"string\"><text:p>{value}</text:p></table:table-cell>"));
            }
            next_col = col + 1;
        }
        table.push_str("</table:table-row>");
        next_row = row + 1;
    }
    table.push_str("</table:table>");

    write_zip(
        path,
        &[
            ("mimetype", "application/vnd.oasis.opendocument.spreadsheet".to_owned()),
            (
                "content.xml",
                format!("<office:document-content><office:body><office:spreadsheet>{table}</office:spreadsheet></office:body></office:document-content>"),
            ),
        ],
    )
}

fn fixture(name: &str, cells: &[TestCell]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    if name.ends_with(".ods") {
        write_ods(&path, cells);
    } else {
        write_xlsx(&path, cells);
    }
    (dir, path)
}

fn run(league: &Path, players: &Path, player_name: &str) -> Result<String, ContactsError> {
    let league = load_grid(league)?;
    let (group, opponents) = get_group_and_opponents(&league, player_name)?;
    let players = load_grid(players)?;
    let contacts = get_contacts(&players, &opponents)?;
    let mut output = Vec::new();
    write_report(&mut output, &group, &contacts)?;
    Ok(String::from_utf8(output).unwrap())
}

const EXPECTED_REPORT: &str = "In this season you play in group Group A.\n\
    \n\
    Your opponents are as follows:\n\
    Last name, first name\tMobile\tWork\tHome\tE-Mail\n\
    Schulz, Anna\t666\t555\t\tanna@example.org\n\
    Weber, Tim\t\t\t\ttim@example.org\n\
    Wagner, Paul\t888\t\t777\t\n\
    Fischer, Klaus\t\t\t0301 234\tklaus@example.org\n";

#[test]
fn xlsx_league_and_ods_players() {
    let (_league_dir, league) = fixture("Liga.xlsx", &league_cells());
    let (_players_dir, players) = fixture("Rangliste Adressen.ods", &players_cells(false));
    assert_eq!(run(&league, &players, "Meyer M.").unwrap(), EXPECTED_REPORT);
}

#[test]
fn ods_league_and_xlsx_players() {
    let (_league_dir, league) = fixture("Liga.ods", &league_cells());
    let (_players_dir, players) = fixture("Rangliste Adressen.xlsx", &players_cells(false));
    assert_eq!(run(&league, &players, "Meyer M.").unwrap(), EXPECTED_REPORT);
}

#[test]
fn loaded_grids_keep_layout_and_types() {
    let (_dir, path) = fixture("Rangliste Adressen.xlsx", &players_cells(false));
    let grid = load_grid(&path).unwrap();
    assert_eq!((grid.nrows(), grid.ncols()), (7, 6));
    assert_eq!(grid.cell(1, 0), &CellValue::Text("Meyer".to_owned()));
    assert_eq!(grid.cell(1, 4), &CellValue::Number(333.0));
    assert_eq!(grid.cell(3, 2), &CellValue::Empty);

    let (_dir, path) = fixture("Liga.ods", &league_cells());
    let grid = load_grid(&path).unwrap();
    assert_eq!((grid.nrows(), grid.ncols()), (14, 3));
    assert_eq!(grid.text(4, 1), "Group A");
    assert!(grid.cell(10, 2).is_empty());
}

#[test]
fn ambiguous_opponent_fails_the_whole_lookup() {
    let (_league_dir, league) = fixture("Liga.ods", &league_cells());
    let (_players_dir, players) = fixture("Rangliste Adressen.ods", &players_cells(true));
    let error = run(&league, &players, "Meyer M.").unwrap_err();
    assert!(matches!(
        error,
        ContactsError::LookupError(LookupError::AmbiguousMatch { ref name, count: 2 }) if name == "Fischer K"
    ));
}

#[test]
fn player_not_in_league() {
    let (_league_dir, league) = fixture("Liga.xlsx", &league_cells());
    let (_players_dir, players) = fixture("Rangliste Adressen.xlsx", &players_cells(false));
    let error = run(&league, &players, "Meyer").unwrap_err();
    assert!(matches!(
        error,
        ContactsError::LookupError(LookupError::NoMatch { ref name }) if name == "Meyer"
    ));
}

#[test]
fn unsupported_and_broken_files_name_the_file() {
    let dir = tempfile::tempdir().unwrap();

    let csv = dir.path().join("players.csv");
    std::fs::write(&csv, "Meyer;Markus").unwrap();
    let message = load_grid(&csv).unwrap_err().to_string();
    assert!(message.contains("players.csv"));
    assert!(message.contains("Cannot detect file format"));

    let xls = dir.path().join("Rangliste Adressen.xls");
    std::fs::write(&xls, vec![0u8; 1024]).unwrap();
    let message = load_grid(&xls).unwrap_err().to_string();
    assert!(message.starts_with(&format!("Read '{}'", xls.display())));
    assert!(message.contains("Invalid OLE signature"));
}
