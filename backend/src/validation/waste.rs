//! Waste sheet checks.

use std::collections::BTreeSet;

use super::report::{FieldError, RowError};
use super::schema::SchemaValidator;
use super::{missing_ids, reference_error};
use crate::parser::NormalizedRow;

/// Schema errors, manifestId links, line-level rules and waste completeness.
pub fn validate_waste_rows(
    rows: &[NormalizedRow],
    valid_ids: &BTreeSet<i64>,
    schema: &SchemaValidator,
) -> Vec<RowError> {
    let mut errors = Vec::new();

    for row in rows {
        let mut row_errors = schema.row_errors(&row.to_value());
        row_errors.extend(reference_error(row, valid_ids));
        row_errors.extend(line_rules(row));

        if !row_errors.is_empty() {
            errors.push(RowError::at_row(row.row, row_errors));
        }
    }

    for id in missing_ids(valid_ids, rows) {
        errors.push(RowError::batch(FieldError::new(
            "manifestId",
            format!("at least one waste row is required for manifestId {id}"),
        )));
    }

    errors
}

/// Conditional column rules.
fn line_rules(row: &NormalizedRow) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if row.bool_field("dotHazardous") == Some(true) && !row.has("idNumber") {
        errors.push(FieldError::new(
            "idNumber",
            "idNumber is required when dotHazardous is true",
        ));
    }

    match (row.has("density"), row.has("densityUnitOfMeasurement")) {
        (true, false) => errors.push(FieldError::new(
            "densityUnitOfMeasurement",
            "densityUnitOfMeasurement is required when density is provided",
        )),
        (false, true) => errors.push(FieldError::new(
            "density",
            "density is required when densityUnitOfMeasurement is provided",
        )),
        _ => {}
    }

    errors
}
