use crate::error::ContactsError;
use crate::grid::CellValue;
use crate::spreadsheet::reference::index_to_reference;
use chrono::Duration;
use chrono::NaiveDate;
use tracing::warn;

/// Day zero of the serial numbers stored in date and time cells.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum Epoch {
    /// Serial 1 is 1900-01-01 and the nonexistent 1900-02-29 is serial 60.
    #[default]
    Windows1900,
    /// Serial 0 is 1904-01-01.
    Mac1904,
}

impl Epoch {
    /// Days since 1899-12-30 for the whole part of `serial`.
    fn days_since_1899_12_30(self, serial: i64) -> i64 {
        match self {
            Epoch::Windows1900 if serial < 60 => serial + 1,
            Epoch::Windows1900 => serial,
            Epoch::Mac1904 => serial + 1462,
        }
    }
}

/// How the raw text of a [`Cell`] is to be read.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    Boolean,
    Number,
    /// Serial number with a date format
    Date(Epoch),
    /// Serial number with a date and time format
    DateTime(Epoch),
    /// Fraction of a day
    Time,
    /// `2023-03-15T19:30:00` style text
    IsoDateTime,
    /// `PT19H30M00S` style text
    IsoDuration,
    InlineString,
    /// Index into the workbook's shared string table
    SharedString,
    Error,
}

impl CellType {
    /// Type implied by one of the number formats every workbook has without
    /// declaring it. Ids not listed here are plain numbers.
    pub(crate) fn builtin_format(id: &str, epoch: Epoch) -> Option<Self> {
        match id.parse::<u16>().ok()? {
            14..=17 => Some(Self::Date(epoch)),
            18..=21 | 45..=47 => Some(Self::Time),
            22 => Some(Self::DateTime(epoch)),
            _ => None,
        }
    }

    /// Type implied by a custom format code such as `dd.mm.yyyy hh:mm`.
    ///
    /// Quoted literals, bracketed sections and escaped characters are
    /// ignored. `m` alone says nothing since it means month or minute.
    pub(crate) fn from_format_code(code: &str, epoch: Epoch) -> Self {
        #[derive(Copy, Clone)]
        enum Scan {
            Code,
            Escaped,
            Quoted,
            Bracketed,
        }

        let mut state = Scan::Code;
        let mut has_date = false;
        let mut has_time = false;
        for character in code.chars() {
            state = match (state, character) {
                (Scan::Escaped, _) => Scan::Code,
                (Scan::Quoted, '"') | (Scan::Bracketed, ']') => Scan::Code,
                (Scan::Quoted | Scan::Bracketed, _) => state,
                (Scan::Code, '\\' | '_') => Scan::Escaped,
                (Scan::Code, '"') => Scan::Quoted,
                (Scan::Code, '[') => Scan::Bracketed,
                (Scan::Code, character) => {
                    match character.to_ascii_lowercase() {
                        'y' | 'd' => has_date = true,
                        'h' | 's' => has_time = true,
                        _ => (),
                    }
                    Scan::Code
                }
            };
        }

        match (has_date, has_time) {
            (true, true) => Self::DateTime(epoch),
            (true, false) => Self::Date(epoch),
            (false, true) => Self::Time,
            (false, false) => Self::Number,
        }
    }
}

/// Text shown for a BIFF error code.
pub(crate) fn error_text(code: u8) -> &'static str {
    match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// A single cell as read from a worksheet, before it becomes part of a grid.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Cell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    /// Raw cell value; an index into the shared strings for `SharedString`
    pub(crate) value: String,
}

impl Cell {
    /// A1 style position, for log messages.
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the raw value to a typed grid value.
    ///
    /// Shared strings must have been resolved to inline strings beforehand;
    /// an unresolved reference is kept as other.
    pub(crate) fn to_cell_value(&self) -> CellValue {
        match self.kind {
            CellType::Empty => CellValue::Empty,
            CellType::InlineString if self.value.is_empty() => CellValue::Empty,
            CellType::InlineString => CellValue::Text(self.value.clone()),
            CellType::Number => match self.value.trim().parse::<f64>() {
                Ok(number) => CellValue::Number(number),
                Err(_) => {
                    warn!(cell = %self.reference(), value = %self.value, "invalid number");
                    CellValue::Other(self.value.clone())
                }
            },
            _ => CellValue::Other(self.rendered()),
        }
    }

    /// Human readable text of a value that is neither text nor a number.
    /// Serials that cannot be decoded are returned as stored.
    fn rendered(&self) -> String {
        let value = &self.value;
        let rendered = match self.kind {
            CellType::Boolean => Ok(if value == "1" || value == "true" { "TRUE" } else { "FALSE" }.to_owned()),
            CellType::Date(epoch) => serial_date(value, epoch),
            CellType::DateTime(epoch) => serial_date(value, epoch)
                .and_then(|date| Ok(format!("{date} {}", serial_time(value)?))),
            CellType::Time => serial_time(value),
            CellType::IsoDateTime => Ok(value.replacen('T', " ", 1)),
            CellType::IsoDuration => Ok(clock_duration(value)),
            _ => Ok(value.clone()),
        };
        rendered.unwrap_or_else(|error| {
            warn!(cell = %self.reference(), value = %value, "{}", error);
            value.clone()
        })
    }
}

/// `45000` becomes `2023-03-15` in the 1900 system.
fn serial_date(serial: &str, epoch: Epoch) -> Result<String, ContactsError> {
    let days = epoch.days_since_1899_12_30(serial.parse::<f64>()?.trunc() as i64);
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|base| base.checked_add_signed(Duration::days(days)))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| ContactsError::WithContextError(format!("Date '{serial}' out of range")))
}

/// Time of day of the fractional part, with milliseconds only when present.
fn serial_time(serial: &str) -> Result<String, ContactsError> {
    let millis = (serial.parse::<f64>()?.fract() * 86_400_000.0).round() as u64;
    let seconds = millis / 1_000;
    let clock = format!("{:02}:{:02}:{:02}", seconds / 3_600, seconds / 60 % 60, seconds % 60);
    Ok(match millis % 1_000 {
        0 => clock,
        fraction => format!("{clock}.{fraction:03}"),
    })
}

/// `PT19H30M00S` becomes `19:30:00`.
fn clock_duration(duration: &str) -> String {
    duration
        .trim_start_matches("PT")
        .chars()
        .filter_map(|character| match character {
            'H' | 'M' => Some(':'),
            'S' => None,
            other => Some(other),
        })
        .collect()
}
