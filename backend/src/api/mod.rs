//! e-Manifest API access and the HTTP surface.
//!
//! - [`client`] - authenticated REST client for RCRAInfo
//! - [`submit`] - the submission seam and the sequential batch loop
//! - [`types`] - batch result objects
//! - [`logs`] - progress broadcasting
//! - [`server`] - axum server

pub mod client;
pub mod logs;
pub mod server;
pub mod submit;
pub mod types;

pub use client::{auth_error_message, classify_save_response, EManifestClient};
pub use logs::*;
pub use server::start_server;
pub use submit::{submit_all, BatchAborted, ItemFailure, ManifestSubmitter, SaveResponse, SubmissionItem};
pub use types::*;
