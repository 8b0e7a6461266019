//! Sequential submission of prepared manifests.
//!
//! The [`ManifestSubmitter`] trait is the seam between the pipeline and the
//! e-Manifest API; [`crate::api::EManifestClient`] is the real implementation
//! and tests plug in fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::logs::{log_info_indent, log_warning};
use crate::error::{SubmitError, SubmitResult};
use crate::models::ManifestPayload;

/// Saves one manifest.
#[async_trait]
pub trait ManifestSubmitter: Send + Sync {
    async fn save(&self, manifest: &ManifestPayload) -> SubmitResult<SaveResponse>;
}

/// Body of a successful save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub manifest_tracking_number: String,
    /// Remaining fields of the API report, kept verbatim.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Why a single manifest was not saved.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFailure {
    /// The API returned a structured validation report.
    ApiValidation(Value),
    /// Anything else the API answered.
    UnknownApi(String),
}

impl ItemFailure {
    /// Result label used in the batch report.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ApiValidation(_) => "apiValidationError",
            Self::UnknownApi(_) => "unknownApiError",
        }
    }

    /// Response payload used in the batch report.
    pub fn response(&self) -> Value {
        match self {
            Self::ApiValidation(report) => report.clone(),
            Self::UnknownApi(message) => json!({ "message": message }),
        }
    }
}

/// Outcome of one submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionItem {
    pub manifest_id: i64,
    pub outcome: Result<SaveResponse, ItemFailure>,
}

/// A batch stopped by a fatal error.
#[derive(Debug, Clone)]
pub struct BatchAborted {
    pub reason: SubmitError,
    /// Attempts made before the abort, in order.
    pub completed: Vec<SubmissionItem>,
}

const UNKNOWN_API_MESSAGE: &str =
    "There was an error submitting to the e-Manifest API. Please try again or check logs.";

/// Submit every manifest in order.
///
/// Per-manifest rejections are recorded and the loop continues; an
/// authentication or network failure stops it, and manifests after the
/// failing one are never attempted.
pub async fn submit_all<S>(
    payloads: &[ManifestPayload],
    submitter: &S,
) -> Result<Vec<SubmissionItem>, BatchAborted>
where
    S: ManifestSubmitter + ?Sized,
{
    let mut items = Vec::with_capacity(payloads.len());

    for manifest in payloads {
        let outcome = match submitter.save(manifest).await {
            Ok(saved) => {
                log_info_indent(
                    format!(
                        "manifestId {} saved as {}",
                        manifest.manifest_id, saved.manifest_tracking_number
                    ),
                    1,
                );
                Ok(saved)
            }
            Err(reason) if reason.is_fatal() => {
                return Err(BatchAborted {
                    reason,
                    completed: items,
                });
            }
            Err(SubmitError::Rejected(report)) => {
                log_warning(format!("manifestId {} rejected by the API", manifest.manifest_id));
                Err(ItemFailure::ApiValidation(report))
            }
            Err(other) => {
                log_warning(format!("manifestId {} failed: {other}", manifest.manifest_id));
                Err(ItemFailure::UnknownApi(UNKNOWN_API_MESSAGE.to_string()))
            }
        };
        items.push(SubmissionItem {
            manifest_id: manifest.manifest_id,
            outcome,
        });
    }

    Ok(items)
}
