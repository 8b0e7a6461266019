//! Spreadsheet validation.
//!
//! Each sheet is checked against an embedded JSON Schema (Draft 7) and then
//! against cross-sheet rules that a schema cannot express:
//!
//! ```text
//! manifest rows ──► schema + duplicate ids + batch size        (manifestErrors)
//! waste rows    ──► schema + manifestId links + line rules     (wasteErrors)
//! handler rows  ──► schema + manifestId links                  (handlerBasicErrors)
//!               ──► role cardinality per manifest              (handlerTypeErrors)
//!               ──► nested handler schema                      (handlerFullErrors)
//! ```
//!
//! Nothing here fails fast; every check returns the errors it found.
//!
//! # Embedded Schemas
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `manifest_schema.json`
//! - `waste_schema.json`
//! - `handler_basic_schema.json`
//! - `handler_full_schema.json`

pub mod handler;
pub mod manifest;
pub mod report;
pub mod schema;
pub mod waste;

use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

use crate::error::SchemaError;
use crate::parser::NormalizedRow;

pub use handler::{validate_handler_types, validate_handlers_basic, validate_handlers_full};
pub use manifest::{validate_manifest_rows, MAX_MANIFESTS_PER_BATCH};
pub use report::{
    merge_errors_by_row, ErrorGroup, FieldError, RowError, ValidationReport, ValidationStage,
};
pub use schema::{Rule, SchemaValidator, Violation};
pub use waste::validate_waste_rows;

const MANIFEST_SCHEMA: &str = include_str!("../../schemas/manifest_schema.json");
const WASTE_SCHEMA: &str = include_str!("../../schemas/waste_schema.json");
const HANDLER_BASIC_SCHEMA: &str = include_str!("../../schemas/handler_basic_schema.json");
const HANDLER_FULL_SCHEMA: &str = include_str!("../../schemas/handler_full_schema.json");

/// The four compiled sheet schemas.
#[derive(Debug)]
pub struct Schemas {
    pub manifest: SchemaValidator,
    pub waste: SchemaValidator,
    pub handler_basic: SchemaValidator,
    pub handler_full: SchemaValidator,
}

impl Schemas {
    /// Compile the embedded schemas.
    pub fn embedded() -> Result<Self, SchemaError> {
        Ok(Self {
            manifest: SchemaValidator::from_source("manifest", MANIFEST_SCHEMA)?,
            waste: SchemaValidator::from_source("waste", WASTE_SCHEMA)?,
            handler_basic: SchemaValidator::from_source("handler basic", HANDLER_BASIC_SCHEMA)?,
            handler_full: SchemaValidator::from_source("handler full", HANDLER_FULL_SCHEMA)?,
        })
    }
}

// =============================================================================
// Cross-sheet helpers
// =============================================================================

/// Distinct integer manifest ids of a sheet.
pub fn manifest_ids(rows: &[NormalizedRow]) -> BTreeSet<i64> {
    rows.iter().filter_map(NormalizedRow::manifest_id).collect()
}

/// Valid manifest ids with no row on the given sheet, ascending.
pub fn missing_ids(valid_ids: &BTreeSet<i64>, rows: &[NormalizedRow]) -> Vec<i64> {
    let present: HashSet<i64> = rows.iter().filter_map(NormalizedRow::manifest_id).collect();
    valid_ids
        .iter()
        .copied()
        .filter(|id| !present.contains(id))
        .collect()
}

/// Error for a row whose manifestId has no matching manifest row.
pub fn reference_error(row: &NormalizedRow, valid_ids: &BTreeSet<i64>) -> Option<FieldError> {
    let id = row.manifest_id()?;
    (!valid_ids.contains(&id)).then(|| {
        FieldError::new(
            "manifestId",
            format!("manifestId {id} is not valid because it does not exist on the manifest tab."),
        )
    })
}

/// Display form of a cell value in messages: strings unquoted.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn row(n: usize, id: Value) -> NormalizedRow {
        let mut data = Map::new();
        data.insert("manifestId".into(), id);
        NormalizedRow { row: n, data }
    }

    #[test]
    fn test_embedded_schemas_compile() {
        let schemas = Schemas::embedded().unwrap();
        assert_eq!(schemas.manifest.name(), "manifest");
        assert_eq!(schemas.handler_full.name(), "handler full");
    }

    #[test]
    fn test_manifest_ids_ignore_non_integers() {
        let rows = vec![row(1, json!(2)), row(2, json!("x")), row(3, json!(1)), row(4, json!(2))];
        let ids: Vec<i64> = manifest_ids(&rows).into_iter().collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_missing_and_reference() {
        let valid: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
        let rows = vec![row(1, json!(1)), row(2, json!(9))];

        assert_eq!(missing_ids(&valid, &rows), vec![2, 3]);
        assert!(reference_error(&rows[0], &valid).is_none());

        let err = reference_error(&rows[1], &valid).unwrap();
        assert_eq!(
            err.message,
            "manifestId 9 is not valid because it does not exist on the manifest tab."
        );
    }
}
