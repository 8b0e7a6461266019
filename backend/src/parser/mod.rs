//! Workbook reading and row normalization.
//!
//! A bulk workbook has three named sheets: `manifest`, `handlers` and
//! `wastes`. Each sheet's first row is its header; every following non-blank
//! row becomes a [`RawRow`] keyed by column name. No manifest-specific logic
//! lives here; see [`normalize`] and [`comments`] for that.

pub mod comments;
pub mod normalize;

use calamine::{open_workbook, Data, DataType, Range, Reader, Xlsx};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::error::{InputError, InputResult};

pub use comments::{parse_codes, parse_comments, ParsedComments};
pub use normalize::{
    normalize_handler_rows, normalize_manifest_rows, normalize_waste_rows, NormalizedRow,
    NormalizedSheet,
};

/// Manifest header sheet.
pub const MANIFEST_SHEET: &str = "manifest";
/// Handler entity sheet.
pub const HANDLERS_SHEET: &str = "handlers";
/// Waste line sheet.
pub const WASTES_SHEET: &str = "wastes";

/// Sheets read from a workbook, in the order they are checked.
pub const REQUIRED_SHEETS: [&str; 3] = [MANIFEST_SHEET, HANDLERS_SHEET, WASTES_SHEET];

// =============================================================================
// Cells and Rows
// =============================================================================

/// A decoded, non-empty spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    fn from_data(data: &Data) -> Option<Self> {
        match data {
            Data::Empty => None,
            Data::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| Cell::Text(trimmed.to_string()))
            }
            Data::Float(f) => Some(Cell::Number(*f)),
            Data::Int(i) => Some(Cell::Number(*i as f64)),
            Data::Bool(b) => Some(Cell::Bool(*b)),
            // calamine applies the workbook's 1900 or 1904 epoch
            Data::DateTime(_) | Data::DateTimeIso(_) => data.as_date().map(Cell::Date),
            other => {
                let text = other.to_string();
                (!text.trim().is_empty()).then(|| Cell::Text(text.trim().to_string()))
            }
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(f64::from(value))
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

/// One data row of a sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// Position below the header; the first data row is 1.
    pub row: usize,
    /// Non-empty cells keyed by header name.
    pub cells: BTreeMap<String, Cell>,
}

impl RawRow {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            cells: BTreeMap::new(),
        }
    }

    /// Builder-style cell insertion.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Cell>) -> Self {
        self.cells.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column)
    }
}

// =============================================================================
// Workbook
// =============================================================================

/// The three sheets of a bulk workbook, borrowed from a [`Workbook`].
#[derive(Debug, Clone, Copy)]
pub struct BulkSheets<'a> {
    pub manifest: &'a [RawRow],
    pub handlers: &'a [RawRow],
    pub wastes: &'a [RawRow],
}

/// Decoded workbook: sheet name → data rows.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: HashMap<String, Vec<RawRow>>,
}

impl Workbook {
    /// Open an `.xlsx` file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> InputResult<Self> {
        let workbook: Xlsx<_> = open_workbook(path.as_ref())?;
        Self::from_xlsx(workbook)
    }

    /// Decode an `.xlsx` file held in memory (e.g. an HTTP upload).
    pub fn from_bytes(bytes: &[u8]) -> InputResult<Self> {
        let workbook = Xlsx::new(Cursor::new(bytes.to_vec()))?;
        Self::from_xlsx(workbook)
    }

    /// Build a workbook from already-decoded rows.
    pub fn from_sheets<I, S>(sheets: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<RawRow>)>,
        S: Into<String>,
    {
        Self {
            sheets: sheets
                .into_iter()
                .map(|(name, rows)| (name.into(), rows))
                .collect(),
        }
    }

    fn from_xlsx<RS: Read + Seek>(mut workbook: Xlsx<RS>) -> InputResult<Self> {
        let mut sheets = HashMap::new();
        for name in workbook.sheet_names() {
            if !REQUIRED_SHEETS.contains(&name.as_str()) {
                continue;
            }
            let range = workbook.worksheet_range(&name)?;
            sheets.insert(name, rows_from_range(&range));
        }
        Ok(Self { sheets })
    }

    /// Data rows of a required sheet.
    ///
    /// A missing sheet and a sheet without data rows are both input errors.
    pub fn sheet(&self, name: &str) -> InputResult<&[RawRow]> {
        let rows = self
            .sheets
            .get(name)
            .ok_or_else(|| InputError::MissingSheet(name.to_string()))?;
        if rows.is_empty() {
            return Err(InputError::EmptySheet(name.to_string()));
        }
        Ok(rows)
    }

    /// All three required sheets, checked in [`REQUIRED_SHEETS`] order.
    pub fn bulk_sheets(&self) -> InputResult<BulkSheets<'_>> {
        Ok(BulkSheets {
            manifest: self.sheet(MANIFEST_SHEET)?,
            handlers: self.sheet(HANDLERS_SHEET)?,
            wastes: self.sheet(WASTES_SHEET)?,
        })
    }
}

/// Turn a worksheet range into header-keyed rows, skipping blank rows.
fn rows_from_range(range: &Range<Data>) -> Vec<RawRow> {
    let mut rows = range.rows().enumerate();

    let headers: Vec<String> = match rows.next() {
        Some((_, header)) => header.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Vec::new(),
    };

    rows.filter_map(|(position, cells)| {
        let mut raw = RawRow::new(position);
        for (header, data) in headers.iter().zip(cells.iter()) {
            if header.is_empty() {
                continue;
            }
            if let Some(cell) = Cell::from_data(data) {
                raw.cells.insert(header.clone(), cell);
            }
        }
        (!raw.cells.is_empty()).then_some(raw)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_row() -> RawRow {
        RawRow::new(1).with("manifestId", 1).with("status", "Pending")
    }

    fn date_cell(serial: f64, is_1904: bool) -> Option<Cell> {
        Cell::from_data(&Data::DateTime(ExcelDateTime::new(
            serial,
            ExcelDateTimeType::DateTime,
            is_1904,
        )))
    }

    #[test]
    fn test_date_cells_in_both_epochs() {
        let may_first = NaiveDate::from_ymd_opt(2024, 5, 1).map(Cell::Date);

        // 45413 in the 1900 system, 43951 in the 1904 system
        assert_eq!(date_cell(45413.0, false), may_first);
        assert_eq!(date_cell(45413.75, false), may_first);
        assert_eq!(date_cell(43951.0, true), may_first);
    }

    #[test]
    fn test_iso_date_cell() {
        assert_eq!(
            Cell::from_data(&Data::DateTimeIso("2024-05-01T00:00:00".into())),
            NaiveDate::from_ymd_opt(2024, 5, 1).map(Cell::Date)
        );
    }

    #[test]
    fn test_cell_from_data() {
        assert_eq!(Cell::from_data(&Data::Empty), None);
        assert_eq!(Cell::from_data(&Data::String("   ".into())), None);
        assert_eq!(
            Cell::from_data(&Data::String(" DM ".into())),
            Some(Cell::Text("DM".into()))
        );
        assert_eq!(Cell::from_data(&Data::Int(3)), Some(Cell::Number(3.0)));
        assert_eq!(Cell::from_data(&Data::Bool(true)), Some(Cell::Bool(true)));
    }

    #[test]
    fn test_missing_sheet() {
        let workbook = Workbook::from_sheets([(MANIFEST_SHEET, vec![sample_row()])]);
        assert!(workbook.sheet(MANIFEST_SHEET).is_ok());

        let err = workbook.bulk_sheets().unwrap_err();
        assert_eq!(err, InputError::MissingSheet(HANDLERS_SHEET.into()));
    }

    #[test]
    fn test_empty_sheet() {
        let workbook = Workbook::from_sheets([
            (MANIFEST_SHEET, vec![sample_row()]),
            (HANDLERS_SHEET, vec![]),
            (WASTES_SHEET, vec![sample_row()]),
        ]);
        let err = workbook.bulk_sheets().unwrap_err();
        assert_eq!(err, InputError::EmptySheet(HANDLERS_SHEET.into()));
        assert_eq!(err.sheet(), Some(HANDLERS_SHEET));
    }

    #[test]
    fn test_open_missing_file() {
        let err = Workbook::open("does-not-exist.xlsx").unwrap_err();
        assert!(matches!(err, InputError::Unreadable(_)));
    }

    #[test]
    fn test_open_not_a_workbook() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "manifestId,status").unwrap();

        let err = Workbook::open(file.path()).unwrap_err();
        assert!(matches!(err, InputError::Unreadable(_)));
        assert!(Workbook::from_bytes(b"not a zip archive").is_err());
    }
}
