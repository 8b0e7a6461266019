//! Flat handler rows to nested handler objects.
//!
//! ```text
//! siteAddressCity   = "Arlington"   →  { "siteAddress": { "city": "Arlington",
//! siteAddressState  = "VA"          →                     "state": { "code": "VA" } },
//! contactPhone      = "555-..."     →    "contact": { "phone": { "number": "555-..." } } }
//! ```
//!
//! Blank cells are omitted, never sent as `null`.

use serde_json::{Map, Value};

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Handler, HandlerType};
use crate::parser::{NormalizedRow, HANDLERS_SHEET};

/// Spreadsheet column → dotted path in the nested handler object.
const HANDLER_MAPPING: &[(&str, &str)] = &[
    ("epaSiteId", "epaSiteId"),
    ("order", "order"),
    ("name", "name"),
    ("siteAddressStreetNumber", "siteAddress.streetNumber"),
    ("siteAddress1", "siteAddress.address1"),
    ("siteAddress2", "siteAddress.address2"),
    ("siteAddressCity", "siteAddress.city"),
    ("siteAddressState", "siteAddress.state.code"),
    ("siteAddressZip", "siteAddress.zip"),
    ("siteAddressCountry", "siteAddress.country.code"),
    ("mailAddressStreetNumber", "mailingAddress.streetNumber"),
    ("mailAddress1", "mailingAddress.address1"),
    ("mailAddress2", "mailingAddress.address2"),
    ("mailAddressCity", "mailingAddress.city"),
    ("mailAddressState", "mailingAddress.state.code"),
    ("mailAddressZip", "mailingAddress.zip"),
    ("mailAddressCountry", "mailingAddress.country.code"),
    ("contactPhone", "contact.phone.number"),
    ("contactEmail", "contact.email"),
];

/// A handler row reshaped for the API, with its bookkeeping kept beside it.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedHandler {
    /// Sheet row the handler came from.
    pub row_number: usize,
    pub manifest_id: i64,
    pub role: HandlerType,
    /// Nested handler object (see [`Handler`]).
    pub body: Map<String, Value>,
}

impl MappedHandler {
    pub fn order(&self) -> Option<i64> {
        self.body.get("order").and_then(Value::as_i64)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.body.clone())
    }

    pub fn to_handler(&self) -> PipelineResult<Handler> {
        serde_json::from_value(self.to_value()).map_err(|e| PipelineError::Record {
            sheet: HANDLERS_SHEET,
            row: self.row_number,
            message: e.to_string(),
        })
    }
}

/// Map one handler row. Rows without an integer `manifestId` or a known
/// `type` yield `None`; basic validation reports those.
pub fn map_handler_row(row: &NormalizedRow) -> Option<MappedHandler> {
    let manifest_id = row.manifest_id()?;
    let role = row.str_field("type").and_then(HandlerType::from_label)?;

    let mut body = Map::new();
    for (column, path) in HANDLER_MAPPING {
        match row.data.get(*column) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.trim().is_empty() => {}
            Some(value) => set_deep(&mut body, path, value.clone()),
        }
    }

    Some(MappedHandler {
        row_number: row.row,
        manifest_id,
        role,
        body,
    })
}

pub fn map_handler_rows(rows: &[NormalizedRow]) -> Vec<MappedHandler> {
    rows.iter().filter_map(map_handler_row).collect()
}

/// Insert `value` at a dotted path, creating intermediate objects.
fn set_deep(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_deep(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{normalize_handler_rows, RawRow};
    use serde_json::json;

    #[test]
    fn test_set_deep() {
        let mut obj = Map::new();
        set_deep(&mut obj, "siteAddress.state.code", json!("VA"));
        set_deep(&mut obj, "siteAddress.city", json!("Arlington"));
        set_deep(&mut obj, "name", json!("Site"));
        assert_eq!(
            Value::Object(obj),
            json!({
                "siteAddress": { "state": { "code": "VA" }, "city": "Arlington" },
                "name": "Site"
            })
        );
    }

    #[test]
    fn test_map_handler_row() {
        let raw = RawRow::new(2)
            .with("manifestId", 1)
            .with("type", "Transporter")
            .with("epaSiteId", "VATESTTRN001")
            .with("order", 1)
            .with("siteAddressCountry", "US")
            .with("contactPhone", 5555551234_i64)
            .with("contactEmail", "ops@example.com");
        let sheet = normalize_handler_rows(&[raw]);

        let mapped = map_handler_row(&sheet.rows[0]).unwrap();
        assert_eq!(mapped.row_number, 2);
        assert_eq!(mapped.role, HandlerType::Transporter);
        assert_eq!(mapped.order(), Some(1));
        assert_eq!(
            mapped.to_value(),
            json!({
                "epaSiteId": "VATESTTRN001",
                "order": 1,
                "siteAddress": { "country": { "code": "US" } },
                "contact": { "phone": { "number": "555-555-1234" }, "email": "ops@example.com" }
            })
        );

        let handler = mapped.to_handler().unwrap();
        assert_eq!(handler.epa_site_id, "VATESTTRN001");
    }

    #[test]
    fn test_bookkeeping_columns_dropped() {
        let raw = RawRow::new(1)
            .with("manifestId", 1)
            .with("type", "Generator")
            .with("epaSiteId", "VATESTGEN001");
        let sheet = normalize_handler_rows(&[raw]);
        let mapped = map_handler_row(&sheet.rows[0]).unwrap();
        assert!(!mapped.body.contains_key("manifestId"));
        assert!(!mapped.body.contains_key("type"));
    }

    #[test]
    fn test_unknown_role_skipped() {
        let raw = RawRow::new(1).with("manifestId", 1).with("type", "Shipper");
        let sheet = normalize_handler_rows(&[raw]);
        assert!(map_handler_row(&sheet.rows[0]).is_none());
    }
}
