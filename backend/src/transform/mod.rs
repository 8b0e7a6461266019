//! Transformation module.
//!
//! This module turns validated sheet rows into submission payloads:
//! - Handlers: flat handler rows to nested handler objects
//! - Grouper: handlers and waste lines grouped by manifest
//! - Payload: nested manifest payloads
//! - Pipeline: the batch run, from workbook to result object

pub mod grouper;
pub mod handlers;
pub mod payload;
pub mod pipeline;

pub use grouper::{group_handlers, group_wastes, HandlerGroup};
pub use handlers::{map_handler_row, map_handler_rows, MappedHandler};
pub use payload::{build_manifest, build_manifests, build_waste_line, ship_date_instant};
pub use pipeline::*;
