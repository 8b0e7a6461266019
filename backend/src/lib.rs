//! # manifest-bulk - spreadsheet to e-Manifest bulk submission
//!
//! Reads a bulk workbook (`manifest`, `handlers` and `wastes` sheets),
//! validates every row, assembles one nested manifest per `manifestId`
//! and saves each to the EPA e-Manifest API.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ XLSX Upload │────▶│   Parser    │────▶│ Validation  │────▶│  Transform  │────▶│ e-Manifest  │
//! │  (3 sheets) │     │ (normalize) │     │ (5 stages)  │     │  (payloads) │     │  (save API) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use manifest_bulk::{process_file, EManifestClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = EManifestClient::from_env().unwrap();
//!     let response = process_file("bulk.xlsx", &client).await;
//!     println!("{}", serde_json::to_string_pretty(&response).unwrap());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Sheet records and the manifest payload
//! - [`parser`] - Workbook reading and row normalization
//! - [`validation`] - Schema and cross-sheet validation
//! - [`transform`] - Grouping, payload building and the batch pipeline
//! - [`api`] - e-Manifest client, result objects and HTTP server
//! - [`config`] - Client configuration
//! - [`logging`] - tracing setup

// Core modules
pub mod config;
pub mod error;
pub mod logging;
pub mod models;

// Reading
pub mod parser;

// Validation
pub mod validation;

// Transformation
pub mod transform;

// e-Manifest API and HTTP
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, InputError, PipelineError, SchemaError, SubmitError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{HandlerType, Manifest, ManifestPayload, ManifestRecord, WasteLineRecord};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{Cell, RawRow, Workbook, HANDLERS_SHEET, MANIFEST_SHEET, WASTES_SHEET};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{ErrorGroup, FieldError, RowError, Schemas, ValidationStage};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    check_bytes, check_file, prepare_batch, process_bytes, process_file, process_workbook,
    submit_payloads, BatchStage,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::{
    BatchOutcome, BatchResponse, CheckResponse, EManifestClient, ManifestSubmitter,
    SaveResponse, SubmissionResults,
};
pub use config::{ClientConfig, Environment};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
