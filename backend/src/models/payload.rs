//! Submission payload shapes.
//!
//! These mirror the nested manifest object of the e-Manifest `save` endpoint.
//! Optional parts are omitted from the JSON when absent, never sent as `null`.

use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::{Code, Comment, Handler};

/// The unit handed to submission: a batch-local id plus the API payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPayload {
    pub manifest_id: i64,
    pub payload: Manifest,
}

/// Nested manifest object accepted by the e-Manifest API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub submission_type: String,
    pub status: String,
    /// ISO-8601 instant pinned to 12:00 UTC of the ship date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_ship_date: Option<String>,
    pub generator: Handler,
    pub transporters: Vec<Handler>,
    pub designated_facility: Handler,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<Handler>,
    pub wastes: Vec<WasteLine>,
    pub additional_info: AdditionalInfo,
    pub import: bool,
    pub contains_previous_reject_or_residue: bool,
}

/// Comments and handling instructions; each key only when non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handling_instructions: Option<String>,
}

impl AdditionalInfo {
    pub fn new(comments: &[Comment], handling_instructions: Option<&str>) -> Self {
        Self {
            comments: comments.to_vec(),
            handling_instructions: handling_instructions
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }
}

/// One waste line of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteLine {
    pub line_number: i64,
    pub dot_hazardous: bool,
    pub epa_waste: bool,
    pub pcb: bool,
    pub br: bool,
    /// Present only on DOT-hazardous lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dot_information: Option<DotInformation>,
    /// Present only on non-hazardous lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_description: Option<String>,
    pub quantity: Quantity,
    pub hazardous_waste: HazardousWaste,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_method: Option<Code>,
    pub additional_info: AdditionalInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub br_info: Option<BrInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DotInformation {
    pub printed_dot_information: String,
    pub id_number: Code,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    pub container_number: i64,
    pub container_type: Code,
    pub quantity: Number,
    pub unit_of_measurement: Code,
}

/// Waste code lists. Federal codes are always sent; state and Texas
/// codes only when the sheet supplied some.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HazardousWaste {
    pub federal_waste_codes: Vec<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_state_waste_codes: Option<Vec<Code>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsdf_state_waste_codes: Option<Vec<Code>>,
    /// Texas codes are plain strings in the API schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_waste_codes: Option<Vec<String>>,
}

/// Biennial-report density information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrInfo {
    pub density: Number,
    pub density_unit_of_measurement: Code,
}
