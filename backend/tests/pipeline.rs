//! End-to-end batch runs over in-memory workbooks with a fake e-Manifest.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use manifest_bulk::api::{ManifestSubmitter, SaveResponse};
use manifest_bulk::error::{SubmitError, SubmitResult};
use manifest_bulk::{
    logging, prepare_batch, process_workbook, BatchOutcome, BatchResponse, ManifestPayload,
    PipelineError, RawRow, ValidationStage, Workbook, HANDLERS_SHEET, MANIFEST_SHEET,
    WASTES_SHEET,
};

// =============================================================================
// Fixtures
// =============================================================================

/// Saves everything except the manifests it was told to reject or fail on.
#[derive(Default)]
struct FakeEManifest {
    rejections: HashMap<i64, Value>,
    fatal: HashMap<i64, SubmitError>,
    saved: Mutex<Vec<Value>>,
    calls: Mutex<Vec<i64>>,
}

impl FakeEManifest {
    fn reject(mut self, manifest_id: i64) -> Self {
        self.rejections.insert(
            manifest_id,
            json!({ "operationStatus": "Invalid", "errors": [{ "field": "generator" }] }),
        );
        self
    }

    fn fail_with(mut self, manifest_id: i64, error: SubmitError) -> Self {
        self.fatal.insert(manifest_id, error);
        self
    }

    fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManifestSubmitter for FakeEManifest {
    async fn save(&self, manifest: &ManifestPayload) -> SubmitResult<SaveResponse> {
        let id = manifest.manifest_id;
        self.calls.lock().unwrap().push(id);

        if let Some(error) = self.fatal.get(&id) {
            return Err(error.clone());
        }
        if let Some(report) = self.rejections.get(&id) {
            return Err(SubmitError::Rejected(report.clone()));
        }

        self.saved
            .lock()
            .unwrap()
            .push(serde_json::to_value(&manifest.payload).unwrap());
        Ok(SaveResponse {
            manifest_tracking_number: format!("{:09}ELC", 100_000_000 + id),
            details: Map::new(),
        })
    }
}

fn manifest_row(row: usize, id: i64) -> RawRow {
    RawRow::new(row)
        .with("manifestId", id)
        .with("submissionType", "FullElectronic")
        .with("status", "Pending")
        .with("potentialShipDate", "2024-05-01")
        .with("emergencyResponsePhone", 5555551234_i64)
}

fn handler(row: usize, id: i64, role: &str, site: &str) -> RawRow {
    RawRow::new(row)
        .with("manifestId", id)
        .with("type", role)
        .with("epaSiteId", site)
        .with("name", format!("{role} {id}"))
        .with("siteAddress1", "1 Main St")
        .with("siteAddressCity", "Richmond")
        .with("siteAddressState", "VA")
}

/// Generator, one transporter and a facility for each id.
fn handlers_for(ids: &[i64]) -> Vec<RawRow> {
    let mut rows = Vec::new();
    for id in ids {
        let n = rows.len();
        rows.push(handler(n + 1, *id, "Generator", "VATESTGEN001"));
        rows.push(handler(n + 2, *id, "Transporter", "VATESTTRN001").with("order", 1));
        rows.push(handler(n + 3, *id, "DesignatedFacility", "VATESTTSD001"));
    }
    rows
}

fn waste_row(row: usize, id: i64) -> RawRow {
    RawRow::new(row)
        .with("manifestId", id)
        .with("lineNumber", 1)
        .with("dotHazardous", true)
        .with("epaWaste", true)
        .with("idNumber", "UN1203")
        .with("description", "UN1203, Gasoline, 3, PG II")
        .with("containerNumber", 2)
        .with("containerType", "DM")
        .with("quantity", 110)
        .with("unitOfMeasurement", "G")
        .with("federalWasteCodes", "D001|D018")
}

fn workbook(manifest: Vec<RawRow>, handlers: Vec<RawRow>, wastes: Vec<RawRow>) -> Workbook {
    Workbook::from_sheets([
        (MANIFEST_SHEET, manifest),
        (HANDLERS_SHEET, handlers),
        (WASTES_SHEET, wastes),
    ])
}

fn batch(ids: &[i64]) -> Workbook {
    workbook(
        ids.iter()
            .enumerate()
            .map(|(i, id)| manifest_row(i + 1, *id))
            .collect(),
        handlers_for(ids),
        ids.iter()
            .enumerate()
            .map(|(i, id)| waste_row(i + 1, *id))
            .collect(),
    )
}

fn validation_groups(wb: &Workbook) -> Vec<manifest_bulk::ErrorGroup> {
    match prepare_batch(wb) {
        Err(PipelineError::Validation(groups)) => groups,
        other => panic!("expected validation errors, got {other:?}"),
    }
}

// =============================================================================
// Full runs
// =============================================================================

#[tokio::test]
async fn test_valid_batch_is_submitted_in_order() {
    logging::init_test();
    let api = FakeEManifest::default();

    let response = process_workbook(&batch(&[1, 2, 3]), &api).await;

    assert!(response.is_success());
    assert_eq!(api.calls(), vec![1, 2, 3]);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["result"], "submitted");
    assert_eq!(json["batchResult"], "success");
    assert_eq!(json["results"]["success"][0]["mtn"], "100000001ELC");
}

#[tokio::test]
async fn test_invalid_row_blocks_every_submission() {
    logging::init_test();
    let api = FakeEManifest::default();
    let mut wb_wastes: Vec<RawRow> = (1..=3).map(|id| waste_row(id as usize, id)).collect();
    wb_wastes[2] = wb_wastes[2].clone().with("containerType", "XX");

    let wb = workbook(
        (1..=3).map(|id| manifest_row(id as usize, id)).collect(),
        handlers_for(&[1, 2, 3]),
        wb_wastes,
    );
    let response = process_workbook(&wb, &api).await;

    assert!(api.calls().is_empty());
    let BatchResponse::ValidationErrors { all_errors } = response else {
        panic!("expected validation errors");
    };
    assert_eq!(all_errors.len(), 1);
    assert_eq!(all_errors[0].stage, ValidationStage::WasteErrors);
    assert_eq!(all_errors[0].errors[0].row, Some(3));
}

#[tokio::test]
async fn test_invalid_manifest_row_blocks_valid_sibling() {
    logging::init_test();
    let api = FakeEManifest::default();
    let wb = workbook(
        vec![
            manifest_row(1, 1).with("submissionType", "Carrier Pigeon"),
            manifest_row(2, 2),
        ],
        handlers_for(&[1, 2]),
        vec![waste_row(1, 1), waste_row(2, 2)],
    );

    let response = process_workbook(&wb, &api).await;

    assert!(api.calls().is_empty());
    let BatchResponse::ValidationErrors { all_errors } = response else {
        panic!("expected validation errors");
    };
    assert_eq!(all_errors.len(), 1);
    assert_eq!(all_errors[0].stage, ValidationStage::ManifestErrors);
    assert_eq!(all_errors[0].errors[0].row, Some(1));
    assert_eq!(all_errors[0].errors[0].errors[0].field, "submissionType");
}

#[tokio::test]
async fn test_rejection_gives_some_failed() {
    logging::init_test();
    let api = FakeEManifest::default().reject(2);

    let response = process_workbook(&batch(&[1, 2, 3]), &api).await;

    assert_eq!(api.calls(), vec![1, 2, 3]);
    let BatchResponse::Submitted { batch_result, results } = response else {
        panic!("expected submitted batch");
    };
    assert_eq!(batch_result, BatchOutcome::SomeFailed);
    assert_eq!(results.success.len(), 2);
    assert_eq!(results.fail[0].manifest_id, 2);
    assert_eq!(results.fail[0].result, "apiValidationError");
    assert_eq!(results.fail[0].response["operationStatus"], "Invalid");
}

#[tokio::test]
async fn test_auth_failure_aborts_with_partial_results() {
    logging::init_test();
    let api = FakeEManifest::default().fail_with(
        2,
        SubmitError::Authentication("API ID is locked.".into()),
    );

    let response = process_workbook(&batch(&[1, 2, 3]), &api).await;

    assert_eq!(api.calls(), vec![1, 2]);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["result"], "authErrors");
    assert_eq!(json["message"], "API ID is locked.");
    assert_eq!(json["partialResults"]["success"][0]["manifestId"], 1);
    assert_eq!(json["partialResults"]["fail"], json!([]));
}

#[tokio::test]
async fn test_missing_credentials_before_first_save() {
    logging::init_test();
    let api = FakeEManifest::default().fail_with(1, SubmitError::MissingCredentials);

    let response = process_workbook(&batch(&[1, 2]), &api).await;

    assert_eq!(api.calls(), vec![1]);
    let BatchResponse::AuthErrors { partial_results, .. } = response else {
        panic!("expected auth errors");
    };
    assert!(partial_results.is_none());
}

#[tokio::test]
async fn test_same_workbook_builds_same_payloads() {
    logging::init_test();
    let wb = batch(&[1, 2]);

    let first = FakeEManifest::default();
    let second = FakeEManifest::default();
    process_workbook(&wb, &first).await;
    process_workbook(&wb, &second).await;

    assert_eq!(*first.saved.lock().unwrap(), *second.saved.lock().unwrap());
}

// =============================================================================
// Payload shape
// =============================================================================

#[test]
fn test_payload_shape() {
    logging::init_test();
    let payloads = prepare_batch(&batch(&[7])).unwrap();
    assert_eq!(payloads.len(), 1);

    let json = serde_json::to_value(&payloads[0]).unwrap();
    assert_eq!(json["manifestId"], 7);

    let manifest = &json["payload"];
    assert_eq!(manifest["potentialShipDate"], "2024-05-01T12:00:00.000Z");
    assert_eq!(manifest["generator"]["emergencyPhone"]["number"], "555-555-1234");
    assert_eq!(manifest["generator"]["siteAddress"]["state"]["code"], "VA");
    assert_eq!(manifest["transporters"][0]["order"], 1);

    let line = &manifest["wastes"][0];
    assert_eq!(
        line["hazardousWaste"]["federalWasteCodes"],
        json!([{ "code": "D001" }, { "code": "D018" }])
    );
    assert_eq!(line["dotInformation"]["idNumber"]["code"], "UN1203");
    assert_eq!(line["quantity"]["quantity"], 110);
    assert!(line.get("wasteDescription").is_none());
}

#[test]
fn test_numeric_handler_text_is_sent_as_string() {
    let mut handlers = handlers_for(&[1]);
    handlers[0] = handlers[0].clone().with("siteAddress2", 200);

    let wb = workbook(vec![manifest_row(1, 1)], handlers, vec![waste_row(1, 1)]);
    let payloads = prepare_batch(&wb).unwrap();

    let json = serde_json::to_value(&payloads[0].payload).unwrap();
    assert_eq!(json["generator"]["siteAddress"]["address2"], "200");
}

#[test]
fn test_transporters_follow_order_column() {
    let mut handlers = handlers_for(&[1]);
    handlers.push(handler(4, 1, "Transporter", "VATESTTRN002").with("order", 2));
    handlers.swap(1, 3);

    let wb = workbook(vec![manifest_row(1, 1)], handlers, vec![waste_row(1, 1)]);
    let payloads = prepare_batch(&wb).unwrap();
    let sites: Vec<&str> = payloads[0]
        .payload
        .transporters
        .iter()
        .map(|t| t.epa_site_id.as_str())
        .collect();
    assert_eq!(sites, vec!["VATESTTRN001", "VATESTTRN002"]);
}

// =============================================================================
// Validation reports
// =============================================================================

#[test]
fn test_malformed_comment_reported_on_its_row() {
    let wb = workbook(
        vec![manifest_row(1, 1).with("comments", "VATESTGEN001:Note|broken")],
        handlers_for(&[1]),
        vec![waste_row(1, 1)],
    );
    let groups = validation_groups(&wb);

    assert_eq!(groups[0].stage, ValidationStage::ManifestErrors);
    let entry = &groups[0].errors[0];
    assert_eq!(entry.row, Some(1));
    assert_eq!(entry.errors[0].field, "comment");
    assert!(entry.errors[0].message.starts_with("Comment 1 is invalid"));
}

#[test]
fn test_duplicate_manifest_ids_flag_each_row() {
    let wb = workbook(
        vec![manifest_row(1, 1), manifest_row(2, 1)],
        handlers_for(&[1]),
        vec![waste_row(1, 1)],
    );
    let groups = validation_groups(&wb);

    let manifest_errors = &groups[0];
    assert_eq!(manifest_errors.stage, ValidationStage::ManifestErrors);
    let rows: Vec<Option<usize>> = manifest_errors.errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![Some(1), Some(2)]);
    assert_eq!(manifest_errors.errors[0].errors[0].message, "manifestId 1 is duplicated");
}

#[test]
fn test_role_cardinality_errors() {
    let mut handlers = handlers_for(&[1]);
    handlers.retain(|row| {
        !matches!(row.get("type"), Some(manifest_bulk::Cell::Text(t)) if t == "DesignatedFacility")
    });
    handlers.push(handler(9, 1, "Generator", "VATESTGEN002"));

    let wb = workbook(vec![manifest_row(1, 1)], handlers, vec![waste_row(1, 1)]);
    let groups = validation_groups(&wb);

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].stage, ValidationStage::HandlerTypeErrors);
    let messages: Vec<&str> = groups[0].errors[0]
        .errors
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "at least one handler row required for manifestId 1 with type: DesignatedFacility",
            "cannot have more than one row for manifestId 1 with type: Generator (extra row 9)",
        ]
    );
}

#[test]
fn test_unknown_manifest_reference() {
    let wb = workbook(
        vec![manifest_row(1, 1)],
        handlers_for(&[1]),
        vec![waste_row(1, 1), waste_row(2, 5)],
    );
    let groups = validation_groups(&wb);

    assert_eq!(groups[0].stage, ValidationStage::WasteErrors);
    assert_eq!(groups[0].errors[0].row, Some(2));
    assert_eq!(
        groups[0].errors[0].errors[0].message,
        "manifestId 5 is not valid because it does not exist on the manifest tab."
    );
}

#[test]
fn test_report_serialization() {
    let wb = workbook(
        vec![manifest_row(1, 1).with("status", "Shipped")],
        handlers_for(&[1]),
        vec![waste_row(1, 1)],
    );
    let response: BatchResponse = PipelineError::Validation(validation_groups(&wb)).into();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["result"], "validationErrors");
    assert_eq!(json["allErrors"][0]["stage"], "manifestErrors");
    assert_eq!(json["allErrors"][0]["errors"][0]["row"], 1);
    assert_eq!(json["allErrors"][0]["errors"][0]["errors"][0]["field"], "status");
}
