//! Manifest sheet checks.

use std::collections::HashMap;

use super::report::{FieldError, RowError};
use super::schema::SchemaValidator;
use super::display_value;
use crate::parser::NormalizedRow;

/// Most manifests accepted in one batch.
pub const MAX_MANIFESTS_PER_BATCH: usize = 100;

/// Schema errors, duplicate ids and the batch ceiling.
pub fn validate_manifest_rows(rows: &[NormalizedRow], schema: &SchemaValidator) -> Vec<RowError> {
    let counts = id_frequency(rows);
    let mut errors = Vec::new();

    for row in rows {
        let mut row_errors = schema.row_errors(&row.to_value());

        if let Some(id) = row.data.get("manifestId").map(display_value) {
            if counts.get(&id).copied().unwrap_or(0) > 1 {
                row_errors.push(FieldError::new(
                    "manifestId",
                    format!("manifestId {id} is duplicated"),
                ));
            }
        }

        if !row_errors.is_empty() {
            errors.push(RowError::at_row(row.row, row_errors));
        }
    }

    if rows.len() > MAX_MANIFESTS_PER_BATCH {
        errors.push(RowError::batch(FieldError::new(
            "manifestId",
            format!(
                "a batch may contain at most {MAX_MANIFESTS_PER_BATCH} manifests; found {}",
                rows.len()
            ),
        )));
    }

    errors
}

fn id_frequency(rows: &[NormalizedRow]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for id in rows.iter().filter_map(|r| r.data.get("manifestId")) {
        *counts.entry(display_value(id)).or_insert(0) += 1;
    }
    counts
}
