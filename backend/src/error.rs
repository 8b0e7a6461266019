//! Error types for the bulk manifest pipeline.
//!
//! - [`InputError`] - workbook and sheet problems (fatal, before validation)
//! - [`SchemaError`] - embedded validation schemas that fail to compile
//! - [`SubmitError`] - failures reported by the submission collaborator
//! - [`ConfigError`] - invalid environment configuration
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Spreadsheet validation problems are never raised as errors while they are
//! being collected; they travel as [`crate::validation::ErrorGroup`] values and
//! only surface here once a gate fails ([`PipelineError::Validation`]).

use serde_json::Value;
use thiserror::Error;

use crate::validation::ErrorGroup;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while reading the workbook or one of its required sheets.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InputError {
    /// The file could not be opened or decoded as a workbook.
    #[error("Unable to read workbook: {0}")]
    Unreadable(String),

    /// A required sheet is absent.
    #[error("File is missing the following sheet: {0}")]
    MissingSheet(String),

    /// A required sheet has a header but no data rows.
    #[error("No data on the following sheet: {0}")]
    EmptySheet(String),
}

impl InputError {
    /// Name of the offending sheet, if the error is tied to one.
    pub fn sheet(&self) -> Option<&str> {
        match self {
            Self::MissingSheet(name) | Self::EmptySheet(name) => Some(name),
            Self::Unreadable(_) => None,
        }
    }
}

impl From<std::io::Error> for InputError {
    fn from(err: std::io::Error) -> Self {
        InputError::Unreadable(err.to_string())
    }
}

impl From<calamine::XlsxError> for InputError {
    fn from(err: calamine::XlsxError) -> Self {
        InputError::Unreadable(err.to_string())
    }
}

// =============================================================================
// Schema Errors
// =============================================================================

/// An embedded validation schema is malformed.
#[derive(Debug, Error)]
#[error("Invalid {name} schema: {message}")]
pub struct SchemaError {
    pub name: &'static str,
    pub message: String,
}

// =============================================================================
// Submission Errors
// =============================================================================

/// Errors returned by a [`crate::api::ManifestSubmitter`].
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// No API id or key configured for the environment.
    #[error("API ID or Key are not set for the environment")]
    MissingCredentials,

    /// The API refused the credentials or the session.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The API could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The API rejected this manifest with a structured validation report.
    #[error("Manifest rejected by the e-Manifest API")]
    Rejected(Value),

    /// The API answered with a status this client does not understand.
    #[error("Unexpected response status {status}")]
    UnexpectedStatus { status: u16, body: String },

    /// The payload could not be encoded for transport.
    #[error("Unable to encode manifest: {0}")]
    Encoding(String),
}

impl SubmitError {
    /// Whether this error must abort the remaining submissions of the batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MissingCredentials | Self::Authentication(_) | Self::Network(_)
        )
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown target environment.
    #[error("Invalid environment: {0} (expected dev, preprod or prod)")]
    InvalidEnvironment(String),

    /// A value that should be numeric is not.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level errors of a batch run that stop it before submission.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Workbook or sheet problem.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Embedded schema problem.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// One or more validation gates failed.
    #[error("Spreadsheet validation failed with {} error group(s)", .0.len())]
    Validation(Vec<ErrorGroup>),

    /// A validated row could not be converted into its domain record.
    #[error("Row {row} on sheet '{sheet}' could not be read: {message}")]
    Record {
        sheet: &'static str,
        row: usize,
        message: String,
    },

    /// A manifest payload could not be assembled from validated records.
    #[error("Unable to build manifestId {manifest_id}: {message}")]
    Build { manifest_id: i64, message: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for workbook operations.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for submission operations.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
