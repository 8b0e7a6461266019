//! Row normalization.
//!
//! Turns header-keyed [`RawRow`]s into JSON objects ready for schema
//! validation. Each sheet has a small column table saying how a column is
//! coerced; columns missing from the table pass through unchanged so the
//! schemas can still reject them as unknown.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use super::comments::{parse_codes, parse_comments};
use super::{Cell, RawRow};
use crate::error::{PipelineError, PipelineResult};
use crate::validation::{FieldError, RowError};

/// How a column's cell is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    /// Whole number; numeric text is parsed.
    Integer,
    /// `TRUE`/`FALSE`, as a bool cell or text.
    Boolean,
    /// Always a string; ten digits become `NNN-NNN-NNNN`.
    Phone,
    /// Calendar date as `YYYY-MM-DD`, or `""` when unparseable.
    Date,
    /// Always a string.
    Text,
    /// `|`-delimited list; always present, possibly empty.
    Codes,
    /// Comment mini-language; always present, possibly empty.
    Comments,
}

type ColumnTable = &'static [(&'static str, ColumnKind)];

const MANIFEST_COLUMNS: ColumnTable = &[
    ("manifestId", ColumnKind::Integer),
    ("submissionType", ColumnKind::Text),
    ("status", ColumnKind::Text),
    ("potentialShipDate", ColumnKind::Date),
    ("emergencyResponsePhone", ColumnKind::Phone),
    ("comments", ColumnKind::Comments),
    ("handlingInstructions", ColumnKind::Text),
];

const WASTE_COLUMNS: ColumnTable = &[
    ("manifestId", ColumnKind::Integer),
    ("lineNumber", ColumnKind::Integer),
    ("dotHazardous", ColumnKind::Boolean),
    ("epaWaste", ColumnKind::Boolean),
    ("description", ColumnKind::Text),
    ("idNumber", ColumnKind::Text),
    ("containerNumber", ColumnKind::Integer),
    ("containerType", ColumnKind::Text),
    ("unitOfMeasurement", ColumnKind::Text),
    ("federalWasteCodes", ColumnKind::Codes),
    ("generatorWasteCodes", ColumnKind::Codes),
    ("tsdfWasteCodes", ColumnKind::Codes),
    ("txWasteCodes", ColumnKind::Codes),
    ("managementMethodCode", ColumnKind::Text),
    ("densityUnitOfMeasurement", ColumnKind::Text),
    ("comments", ColumnKind::Comments),
    ("handlingInstructions", ColumnKind::Text),
];

const HANDLER_COLUMNS: ColumnTable = &[
    ("manifestId", ColumnKind::Integer),
    ("type", ColumnKind::Text),
    ("epaSiteId", ColumnKind::Text),
    ("order", ColumnKind::Integer),
    ("name", ColumnKind::Text),
    ("siteAddressStreetNumber", ColumnKind::Integer),
    ("siteAddress1", ColumnKind::Text),
    ("siteAddress2", ColumnKind::Text),
    ("siteAddressCity", ColumnKind::Text),
    ("siteAddressState", ColumnKind::Text),
    ("siteAddressZip", ColumnKind::Text),
    ("siteAddressCountry", ColumnKind::Text),
    ("mailAddressStreetNumber", ColumnKind::Integer),
    ("mailAddress1", ColumnKind::Text),
    ("mailAddress2", ColumnKind::Text),
    ("mailAddressCity", ColumnKind::Text),
    ("mailAddressState", ColumnKind::Text),
    ("mailAddressZip", ColumnKind::Text),
    ("mailAddressCountry", ColumnKind::Text),
    ("contactPhone", ColumnKind::Phone),
    ("contactEmail", ColumnKind::Text),
];

// =============================================================================
// Normalized Rows
// =============================================================================

/// One normalized row: its sheet position plus a JSON object of its cells.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub row: usize,
    pub data: Map<String, Value>,
}

impl NormalizedRow {
    /// Integer `manifestId`, if the column holds one.
    pub fn manifest_id(&self) -> Option<i64> {
        self.data.get("manifestId").and_then(Value::as_i64)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    /// Whether the column is present with a non-blank value.
    pub fn has(&self, key: &str) -> bool {
        match self.data.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }

    /// Deserialize the row into a domain record.
    pub fn to_record<T: DeserializeOwned>(&self, sheet: &'static str) -> PipelineResult<T> {
        serde_json::from_value(self.to_value()).map_err(|e| PipelineError::Record {
            sheet,
            row: self.row,
            message: e.to_string(),
        })
    }
}

/// All rows of a sheet plus the errors found while normalizing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedSheet {
    pub rows: Vec<NormalizedRow>,
    /// Comment format errors, one entry per affected row.
    pub parse_errors: Vec<RowError>,
}

pub fn normalize_manifest_rows(rows: &[RawRow]) -> NormalizedSheet {
    normalize_rows(rows, MANIFEST_COLUMNS)
}

pub fn normalize_waste_rows(rows: &[RawRow]) -> NormalizedSheet {
    normalize_rows(rows, WASTE_COLUMNS)
}

pub fn normalize_handler_rows(rows: &[RawRow]) -> NormalizedSheet {
    normalize_rows(rows, HANDLER_COLUMNS)
}

fn normalize_rows(rows: &[RawRow], columns: ColumnTable) -> NormalizedSheet {
    let mut sheet = NormalizedSheet::default();
    for raw in rows {
        let (row, errors) = normalize_row(raw, columns);
        if !errors.is_empty() {
            sheet.parse_errors.push(RowError::at_row(row.row, errors));
        }
        sheet.rows.push(row);
    }
    sheet
}

fn normalize_row(raw: &RawRow, columns: ColumnTable) -> (NormalizedRow, Vec<FieldError>) {
    let mut data = Map::new();
    let mut errors = Vec::new();

    for (column, cell) in &raw.cells {
        let kind = columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, kind)| *kind);

        let value = match kind {
            Some(ColumnKind::Integer) => integer_value(cell),
            Some(ColumnKind::Boolean) => boolean_value(cell),
            Some(ColumnKind::Phone) => Value::String(phone_text(cell)),
            Some(ColumnKind::Date) => Value::String(date_text(cell)),
            Some(ColumnKind::Text) => Value::String(cell_text(cell)),
            Some(ColumnKind::Codes) => {
                Value::from(parse_codes(Some(cell_text(cell).as_str())))
            }
            Some(ColumnKind::Comments) => {
                let parsed = parse_comments(Some(cell_text(cell).as_str()));
                errors.extend(parsed.errors);
                serde_json::to_value(parsed.comments).unwrap_or_default()
            }
            None => cell_value(cell),
        };
        data.insert(column.clone(), value);
    }

    // list-valued columns are always present
    for (column, kind) in columns {
        if matches!(kind, ColumnKind::Codes | ColumnKind::Comments) {
            data.entry(column.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
        }
    }

    (NormalizedRow { row: raw.row, data }, errors)
}

// =============================================================================
// Cell Coercion
// =============================================================================

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Natural JSON value of a cell, used for columns without a coercion rule.
fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Number(n) => number_value(*n),
        Cell::Bool(b) => Value::Bool(*b),
        Cell::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
    }
}

fn cell_text(cell: &Cell) -> String {
    match cell_value(cell) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn integer_value(cell: &Cell) -> Value {
    match cell {
        Cell::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(s.clone())),
        other => cell_value(other),
    }
}

fn boolean_value(cell: &Cell) -> Value {
    match cell {
        Cell::Text(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
        Cell::Text(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
        other => cell_value(other),
    }
}

fn phone_text(cell: &Cell) -> String {
    let text = cell_text(cell);
    if text.len() == 10 && text.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &text[..3], &text[3..6], &text[6..])
    } else {
        text
    }
}

fn date_text(cell: &Cell) -> String {
    let date = match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
            .ok(),
        _ => None,
    };
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
