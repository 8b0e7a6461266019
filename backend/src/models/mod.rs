//! Domain models for the bulk manifest pipeline.
//!
//! - [`ManifestRecord`] - one row of the `manifest` sheet
//! - [`WasteLineRecord`] - one row of the `wastes` sheet
//! - [`HandlerType`] - closed set of handler roles on a manifest
//! - [`Handler`] - a handler site in the nested shape the e-Manifest API expects
//! - [`Comment`] - one entry of the `handlerId:label:description` mini-language
//!
//! Submission payload types live in [`payload`].

pub mod payload;

use serde::{Deserialize, Serialize};
use serde_json::Number;

pub use payload::{
    AdditionalInfo, BrInfo, DotInformation, HazardousWaste, Manifest, ManifestPayload, Quantity,
    WasteLine,
};

// =============================================================================
// Handler Role
// =============================================================================

/// Role of a handler on a manifest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerType {
    /// Site that produced the waste. Exactly one per manifest.
    Generator,
    /// Carrier; one or more per manifest, ordered.
    Transporter,
    /// Receiving facility (TSDF). Exactly one per manifest.
    DesignatedFacility,
    /// Optional broker. At most one per manifest.
    Broker,
}

impl HandlerType {
    /// Roles every manifest must carry.
    pub const REQUIRED: [HandlerType; 3] = [
        HandlerType::Generator,
        HandlerType::Transporter,
        HandlerType::DesignatedFacility,
    ];

    /// Parse the value of the `type` column.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Generator" => Some(Self::Generator),
            "Transporter" => Some(Self::Transporter),
            "DesignatedFacility" => Some(Self::DesignatedFacility),
            "Broker" => Some(Self::Broker),
            _ => None,
        }
    }

    /// Spreadsheet label of the role.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generator => "Generator",
            Self::Transporter => "Transporter",
            Self::DesignatedFacility => "DesignatedFacility",
            Self::Broker => "Broker",
        }
    }

    /// Whether a manifest may carry more than one handler of this role.
    pub fn allows_many(&self) -> bool {
        matches!(self, Self::Transporter)
    }
}

impl std::fmt::Display for HandlerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Comments
// =============================================================================

/// A free-text comment addressed to a handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub handler_id: String,
    pub label: String,
    pub description: String,
}

// =============================================================================
// Sheet Records
// =============================================================================

/// A validated row of the `manifest` sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    /// Batch-local key linking waste and handler rows to this manifest.
    pub manifest_id: i64,
    pub submission_type: String,
    pub status: String,
    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_ship_date: Option<String>,
    pub emergency_response_phone: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handling_instructions: Option<String>,
}

/// A validated row of the `wastes` sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteLineRecord {
    pub manifest_id: i64,
    pub line_number: i64,
    pub dot_hazardous: bool,
    pub epa_waste: bool,
    pub description: String,
    /// DOT id number; required when `dot_hazardous` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    pub container_number: i64,
    pub container_type: String,
    pub quantity: Number,
    pub unit_of_measurement: String,
    #[serde(default)]
    pub federal_waste_codes: Vec<String>,
    #[serde(default)]
    pub generator_waste_codes: Vec<String>,
    #[serde(default)]
    pub tsdf_waste_codes: Vec<String>,
    #[serde(default)]
    pub tx_waste_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_method_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_unit_of_measurement: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handling_instructions: Option<String>,
}

impl WasteLineRecord {
    /// Density and its unit, when both were supplied.
    pub fn density_info(&self) -> Option<(&Number, &str)> {
        match (&self.density, &self.density_unit_of_measurement) {
            (Some(density), Some(unit)) => Some((density, unit.as_str())),
            _ => None,
        }
    }
}

// =============================================================================
// Handlers (nested API shape)
// =============================================================================

/// `{ "code": ... }` wrapper used throughout the e-Manifest schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Code {
    pub code: String,
}

impl Code {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Phone number wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Phone {
    pub number: String,
}

/// Site or mailing address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street_number: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Code>,
}

/// Handler contact details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A handler site as submitted to the API.
///
/// Bookkeeping columns (`manifestId`, `type`, `rowNumber`) are never part of
/// this shape; they travel beside it in [`crate::transform::MappedHandler`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Handler {
    pub epa_site_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailing_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_phone: Option<Phone>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handler_type_from_label() {
        assert_eq!(HandlerType::from_label("Generator"), Some(HandlerType::Generator));
        assert_eq!(
            HandlerType::from_label(" DesignatedFacility "),
            Some(HandlerType::DesignatedFacility)
        );
        assert_eq!(HandlerType::from_label("generator"), None);
        assert_eq!(HandlerType::from_label("Shipper"), None);
    }

    #[test]
    fn test_handler_type_roundtrip() {
        for role in [
            HandlerType::Generator,
            HandlerType::Transporter,
            HandlerType::DesignatedFacility,
            HandlerType::Broker,
        ] {
            assert_eq!(HandlerType::from_label(role.label()), Some(role));
        }
        assert!(HandlerType::Transporter.allows_many());
        assert!(!HandlerType::Broker.allows_many());
    }

    #[test]
    fn test_handler_omits_absent_fields() {
        let handler: Handler = serde_json::from_value(json!({
            "epaSiteId": "VATESTGEN001",
            "siteAddress": { "city": "Arlington", "state": { "code": "VA" } }
        }))
        .unwrap();

        let out = serde_json::to_value(&handler).unwrap();
        assert_eq!(out["siteAddress"]["state"]["code"], "VA");
        assert!(out.get("order").is_none());
        assert!(out.get("mailingAddress").is_none());
        assert!(out["siteAddress"].get("zip").is_none());
    }

    #[test]
    fn test_waste_record_density_pair() {
        let mut record: WasteLineRecord = serde_json::from_value(json!({
            "manifestId": 1,
            "lineNumber": 1,
            "dotHazardous": false,
            "epaWaste": false,
            "description": "Used oil",
            "containerNumber": 2,
            "containerType": "DM",
            "quantity": 110,
            "unitOfMeasurement": "G",
            "density": 1.2,
            "densityUnitOfMeasurement": "2"
        }))
        .unwrap();
        assert!(record.density_info().is_some());

        record.density_unit_of_measurement = None;
        assert!(record.density_info().is_none());
    }
}
