//! Batch result object returned by the CLI and the HTTP API.
//!
//! Discriminated by `result`, so clients can tell "fix your spreadsheet"
//! (`validationErrors`, `inputErrors`) from "fix your credentials"
//! (`authErrors`) and "try again later" (`systemError`).

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::submit::{BatchAborted, SubmissionItem};
use crate::error::{PipelineError, SubmitError};
use crate::models::ManifestPayload;
use crate::validation::ErrorGroup;

/// Overall outcome of a submitted batch.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchOutcome {
    Success,
    #[serde(rename = "someFailed")]
    SomeFailed,
    #[serde(rename = "allFailed")]
    AllFailed,
}

impl std::fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::SomeFailed => "someFailed",
            Self::AllFailed => "allFailed",
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedManifest {
    pub manifest_id: i64,
    pub mtn: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedManifest {
    pub manifest_id: i64,
    /// `apiValidationError` or `unknownApiError`
    pub result: String,
    pub response: Value,
}

/// Per-manifest outcomes, each list in submission order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SubmissionResults {
    pub success: Vec<SubmittedManifest>,
    pub fail: Vec<FailedManifest>,
}

impl SubmissionResults {
    pub fn from_items(items: Vec<SubmissionItem>) -> Self {
        let mut results = Self::default();
        for item in items {
            match item.outcome {
                Ok(saved) => results.success.push(SubmittedManifest {
                    manifest_id: item.manifest_id,
                    mtn: saved.manifest_tracking_number,
                }),
                Err(failure) => results.fail.push(FailedManifest {
                    manifest_id: item.manifest_id,
                    result: failure.label().to_string(),
                    response: failure.response(),
                }),
            }
        }
        results
    }

    pub fn outcome(&self) -> BatchOutcome {
        match (self.success.is_empty(), self.fail.is_empty()) {
            (_, true) => BatchOutcome::Success,
            (true, false) => BatchOutcome::AllFailed,
            (false, false) => BatchOutcome::SomeFailed,
        }
    }
}

/// Terminal result of a batch run.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum BatchResponse {
    /// One or more validation stages failed; nothing was submitted.
    #[serde(rename_all = "camelCase")]
    ValidationErrors { all_errors: Vec<ErrorGroup> },

    /// The workbook or a required sheet could not be read.
    #[serde(rename_all = "camelCase")]
    InputErrors {
        #[serde(skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
        message: String,
    },

    /// Credentials were missing or refused.
    #[serde(rename_all = "camelCase")]
    AuthErrors {
        message: String,
        /// Manifests handled before the failure.
        #[serde(skip_serializing_if = "Option::is_none")]
        partial_results: Option<SubmissionResults>,
    },

    /// Connectivity or internal failure.
    #[serde(rename_all = "camelCase")]
    SystemError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        partial_results: Option<SubmissionResults>,
    },

    /// Every manifest was attempted.
    #[serde(rename_all = "camelCase")]
    Submitted {
        batch_result: BatchOutcome,
        results: SubmissionResults,
    },
}

impl BatchResponse {
    pub fn from_items(items: Vec<SubmissionItem>) -> Self {
        let results = SubmissionResults::from_items(items);
        Self::Submitted {
            batch_result: results.outcome(),
            results,
        }
    }

    pub fn from_abort(aborted: BatchAborted) -> Self {
        let partial = SubmissionResults::from_items(aborted.completed);
        let partial_results = (!partial.success.is_empty() || !partial.fail.is_empty())
            .then_some(partial);

        match aborted.reason {
            SubmitError::Network(reason) => Self::SystemError {
                message: format!(
                    "Unable to reach the e-Manifest API ({reason}). Please try again later."
                ),
                partial_results,
            },
            SubmitError::MissingCredentials => Self::AuthErrors {
                message: SubmitError::MissingCredentials.to_string(),
                partial_results,
            },
            SubmitError::Authentication(reason) => Self::AuthErrors {
                message: reason,
                partial_results,
            },
            other => Self::SystemError {
                message: other.to_string(),
                partial_results,
            },
        }
    }

    /// Whether the batch went through without any failure.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Submitted {
                batch_result: BatchOutcome::Success,
                ..
            }
        )
    }
}

impl From<PipelineError> for BatchResponse {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(all_errors) => Self::ValidationErrors { all_errors },
            PipelineError::Input(input) => Self::InputErrors {
                sheet: input.sheet().map(String::from),
                message: input.to_string(),
            },
            other => Self::SystemError {
                message: other.to_string(),
                partial_results: None,
            },
        }
    }
}

/// Response of a dry run: the payloads that would be submitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub job_id: String,
    pub result: &'static str,
    pub total_manifests: usize,
    pub manifests: Vec<ManifestPayload>,
}

impl CheckResponse {
    pub fn ready(manifests: Vec<ManifestPayload>) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            result: "ready",
            total_manifests: manifests.len(),
            manifests,
        }
    }
}
