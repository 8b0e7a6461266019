//! Batch orchestration: workbook in, result object out.
//!
//! ```text
//! Reading → Normalizing → ValidatingBasic ─┬─► Transforming → ValidatingFull ─┬─► Building → Submitting → Classifying
//!                                          └─ errors: report, stop            └─ errors: report, stop
//! ```
//!
//! Nothing is submitted unless every validation stage came back clean.
//!
//! # Example
//!
//! ```rust,ignore
//! use manifest_bulk::api::EManifestClient;
//! use manifest_bulk::transform::process_file;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EManifestClient::from_env()?;
//!     let response = process_file("bulk.xlsx", &client).await;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```

use std::path::Path;

use super::grouper::{group_handlers, group_wastes};
use super::handlers::map_handler_rows;
use super::payload::build_manifests;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::api::submit::{submit_all, ManifestSubmitter};
use crate::api::types::BatchResponse;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{ManifestPayload, ManifestRecord, WasteLineRecord};
use crate::parser::{
    normalize_handler_rows, normalize_manifest_rows, normalize_waste_rows, Workbook,
    MANIFEST_SHEET, WASTES_SHEET,
};
use crate::validation::{
    manifest_ids, merge_errors_by_row, validate_handler_types, validate_handlers_basic,
    validate_handlers_full, validate_manifest_rows, validate_waste_rows, ErrorGroup, Schemas,
    ValidationReport, ValidationStage,
};

/// Steps of a batch run, used for progress logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Reading,
    Normalizing,
    ValidatingBasic,
    Transforming,
    ValidatingFull,
    Building,
    Submitting,
    Classifying,
}

impl std::fmt::Display for BatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Reading => "📖 Reading workbook",
            Self::Normalizing => "🧹 Normalizing rows",
            Self::ValidatingBasic => "✔️  Validating sheets",
            Self::Transforming => "📦 Grouping handlers",
            Self::ValidatingFull => "✔️  Validating handlers",
            Self::Building => "🏗️  Building manifests",
            Self::Submitting => "🚀 Submitting manifests",
            Self::Classifying => "📊 Classifying results",
        };
        f.write_str(label)
    }
}

fn enter(stage: BatchStage) {
    log_info(format!("{stage}..."));
}

// =============================================================================
// Preparation (no network)
// =============================================================================

/// Read, validate and build every manifest of a workbook.
///
/// Returns the payloads ready for submission, or the first gate that failed.
pub fn prepare_batch(workbook: &Workbook) -> PipelineResult<Vec<ManifestPayload>> {
    enter(BatchStage::Reading);
    let sheets = workbook.bulk_sheets()?;
    log_success(format!(
        "Read {} manifest, {} handler and {} waste rows",
        sheets.manifest.len(),
        sheets.handlers.len(),
        sheets.wastes.len()
    ));

    enter(BatchStage::Normalizing);
    let manifests = normalize_manifest_rows(sheets.manifest);
    let wastes = normalize_waste_rows(sheets.wastes);
    let handlers = normalize_handler_rows(sheets.handlers);
    let schemas = Schemas::embedded()?;

    enter(BatchStage::ValidatingBasic);
    let mut report = ValidationReport::default();

    report.push(
        ValidationStage::ManifestErrors,
        merge_errors_by_row(
            validate_manifest_rows(&manifests.rows, &schemas.manifest),
            manifests.parse_errors,
        ),
    );

    let valid_ids = manifest_ids(&manifests.rows);
    report.push(
        ValidationStage::WasteErrors,
        merge_errors_by_row(
            validate_waste_rows(&wastes.rows, &valid_ids, &schemas.waste),
            wastes.parse_errors,
        ),
    );

    let basic_errors = validate_handlers_basic(&handlers.rows, &valid_ids, &schemas.handler_basic);
    let type_errors = if basic_errors.is_empty() {
        validate_handler_types(&handlers.rows)
    } else {
        Vec::new()
    };
    let handlers_ok = basic_errors.is_empty() && type_errors.is_empty();
    report.push(ValidationStage::HandlerBasicErrors, basic_errors);
    report.push(ValidationStage::HandlerTypeErrors, type_errors);

    // Full handler checks only need a clean handler sheet; running them even
    // when other sheets failed lets one report cover every sheet.
    let mut groups = Vec::new();
    if handlers_ok {
        enter(BatchStage::Transforming);
        groups = group_handlers(map_handler_rows(&handlers.rows));
        log_success(format!("{} handler groups", groups.len()));

        enter(BatchStage::ValidatingFull);
        report.push(
            ValidationStage::HandlerFullErrors,
            validate_handlers_full(&groups, &schemas.handler_full),
        );
    }

    if !report.is_empty() {
        log_validation_report(report.groups());
        return Err(PipelineError::Validation(report.into_groups()));
    }
    log_success("All sheets valid");

    enter(BatchStage::Building);
    let records = manifests
        .rows
        .iter()
        .map(|row| row.to_record::<ManifestRecord>(MANIFEST_SHEET))
        .collect::<PipelineResult<Vec<_>>>()?;
    let lines = wastes
        .rows
        .iter()
        .map(|row| row.to_record::<WasteLineRecord>(WASTES_SHEET))
        .collect::<PipelineResult<Vec<_>>>()?;

    let payloads = build_manifests(&records, &groups, &group_wastes(lines))?;
    log_success(format!("{} manifests ready", payloads.len()));
    Ok(payloads)
}

fn log_validation_report(groups: &[ErrorGroup]) {
    for group in groups {
        log_error(format!(
            "{} error(s) on sheet '{}' ({:?})",
            group.error_count(),
            group.stage.sheet(),
            group.stage
        ));
        for entry in group.errors.iter().take(3) {
            for error in &entry.errors {
                log_info_indent(format!("{}: {}", error.field, error.message), 1);
            }
        }
    }
}

/// Validate and build without submitting.
pub fn check_file<P: AsRef<Path>>(path: P) -> PipelineResult<Vec<ManifestPayload>> {
    let workbook = Workbook::open(path)?;
    prepare_batch(&workbook)
}

/// Validate and build an in-memory workbook without submitting.
pub fn check_bytes(bytes: &[u8]) -> PipelineResult<Vec<ManifestPayload>> {
    let workbook = Workbook::from_bytes(bytes)?;
    prepare_batch(&workbook)
}

// =============================================================================
// Submission
// =============================================================================

/// Submit prepared payloads one by one, in order, and classify the outcome.
pub async fn submit_payloads<S>(payloads: &[ManifestPayload], submitter: &S) -> BatchResponse
where
    S: ManifestSubmitter + ?Sized,
{
    enter(BatchStage::Submitting);
    let outcome = submit_all(payloads, submitter).await;

    enter(BatchStage::Classifying);
    let response = match outcome {
        Ok(items) => BatchResponse::from_items(items),
        Err(aborted) => {
            log_error(format!("Batch aborted: {}", aborted.reason));
            BatchResponse::from_abort(aborted)
        }
    };

    if let BatchResponse::Submitted { batch_result, results } = &response {
        let summary = format!(
            "{} saved, {} failed ({})",
            results.success.len(),
            results.fail.len(),
            batch_result
        );
        if results.fail.is_empty() {
            log_success(summary);
        } else {
            log_warning(summary);
        }
    }
    response
}

/// Full run over an opened workbook.
pub async fn process_workbook<S>(workbook: &Workbook, submitter: &S) -> BatchResponse
where
    S: ManifestSubmitter + ?Sized,
{
    match prepare_batch(workbook) {
        Ok(payloads) => submit_payloads(&payloads, submitter).await,
        Err(err) => err.into(),
    }
}

/// Full run over a workbook on disk.
pub async fn process_file<P, S>(path: P, submitter: &S) -> BatchResponse
where
    P: AsRef<Path>,
    S: ManifestSubmitter + ?Sized,
{
    match Workbook::open(path) {
        Ok(workbook) => process_workbook(&workbook, submitter).await,
        Err(err) => PipelineError::from(err).into(),
    }
}

/// Full run over an uploaded workbook.
pub async fn process_bytes<S>(bytes: &[u8], submitter: &S) -> BatchResponse
where
    S: ManifestSubmitter + ?Sized,
{
    match Workbook::from_bytes(bytes) {
        Ok(workbook) => process_workbook(&workbook, submitter).await,
        Err(err) => PipelineError::from(err).into(),
    }
}
