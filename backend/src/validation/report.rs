//! Validation error reporting.
//!
//! Errors are collected, never raised: every check returns [`RowError`]s, and
//! the pipeline gathers them into [`ErrorGroup`]s tagged by stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A problem with one field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors for one row, one manifest, or the whole batch.
///
/// - `row` set: tied to a sheet row (schema, referential, comment errors)
/// - `manifest_id` set: tied to a manifest (role cardinality)
/// - neither: batch-level completeness errors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<i64>,
    pub errors: Vec<FieldError>,
}

impl RowError {
    pub fn at_row(row: usize, errors: Vec<FieldError>) -> Self {
        Self {
            row: Some(row),
            manifest_id: None,
            errors,
        }
    }

    pub fn for_manifest(manifest_id: i64, errors: Vec<FieldError>) -> Self {
        Self {
            row: None,
            manifest_id: Some(manifest_id),
            errors,
        }
    }

    pub fn batch(error: FieldError) -> Self {
        Self {
            row: None,
            manifest_id: None,
            errors: vec![error],
        }
    }
}

/// Validation stage an error group came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ValidationStage {
    ManifestErrors,
    WasteErrors,
    HandlerBasicErrors,
    HandlerTypeErrors,
    HandlerFullErrors,
}

impl ValidationStage {
    /// Sheet the stage's errors refer to.
    pub fn sheet(&self) -> &'static str {
        match self {
            Self::ManifestErrors => crate::parser::MANIFEST_SHEET,
            Self::WasteErrors => crate::parser::WASTES_SHEET,
            Self::HandlerBasicErrors | Self::HandlerTypeErrors | Self::HandlerFullErrors => {
                crate::parser::HANDLERS_SHEET
            }
        }
    }
}

/// Non-empty errors of one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorGroup {
    pub stage: ValidationStage,
    pub errors: Vec<RowError>,
}

impl ErrorGroup {
    /// Total number of field errors in the group.
    pub fn error_count(&self) -> usize {
        self.errors.iter().map(|e| e.errors.len()).sum()
    }
}

/// Collects error groups across stages; empty stages are skipped.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    groups: Vec<ErrorGroup>,
}

impl ValidationReport {
    pub fn push(&mut self, stage: ValidationStage, errors: Vec<RowError>) {
        if !errors.is_empty() {
            self.groups.push(ErrorGroup { stage, errors });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[ErrorGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<ErrorGroup> {
        self.groups
    }
}

/// Merge two error lists so each row appears once.
///
/// Row-keyed entries are combined and sorted by row; entries without a row
/// follow in their original order.
pub fn merge_errors_by_row(first: Vec<RowError>, second: Vec<RowError>) -> Vec<RowError> {
    let mut by_row: BTreeMap<usize, Vec<FieldError>> = BTreeMap::new();
    let mut unrowed = Vec::new();

    for entry in first.into_iter().chain(second) {
        match entry.row {
            Some(row) => by_row.entry(row).or_default().extend(entry.errors),
            None => unrowed.push(entry),
        }
    }

    by_row
        .into_iter()
        .map(|(row, errors)| RowError::at_row(row, errors))
        .chain(unrowed)
        .collect()
}
