//! Handler sheet checks, in three passes.
//!
//! 1. basic: flat schema, manifestId links, every manifest has handlers
//! 2. types: role cardinality per manifest
//! 3. full: each mapped handler against the nested API shape
//!
//! The later passes assume the earlier ones came back clean.

use std::collections::{BTreeMap, BTreeSet};

use super::report::{FieldError, RowError};
use super::schema::SchemaValidator;
use super::{missing_ids, reference_error};
use crate::models::HandlerType;
use crate::parser::NormalizedRow;
use crate::transform::HandlerGroup;

pub fn validate_handlers_basic(
    rows: &[NormalizedRow],
    valid_ids: &BTreeSet<i64>,
    schema: &SchemaValidator,
) -> Vec<RowError> {
    let mut errors = Vec::new();

    for row in rows {
        let mut row_errors = schema.row_errors(&row.to_value());
        row_errors.extend(reference_error(row, valid_ids));

        if row.str_field("type").and_then(HandlerType::from_label) == Some(HandlerType::Transporter)
            && !row.has("order")
        {
            row_errors.push(FieldError::new(
                "order",
                "order is required for Transporter handlers",
            ));
        }

        if !row_errors.is_empty() {
            errors.push(RowError::at_row(row.row, row_errors));
        }
    }

    for id in missing_ids(valid_ids, rows) {
        errors.push(RowError::batch(FieldError::new(
            "manifestId",
            format!("at least one handler row is required for manifestId {id}"),
        )));
    }

    errors
}

/// Role cardinality: one Generator, one DesignatedFacility, at least one
/// Transporter, at most one Broker, distinct transporter orders.
pub fn validate_handler_types(rows: &[NormalizedRow]) -> Vec<RowError> {
    let mut by_manifest: BTreeMap<i64, Vec<(&NormalizedRow, HandlerType)>> = BTreeMap::new();
    for row in rows {
        let role = row.str_field("type").and_then(HandlerType::from_label);
        if let (Some(id), Some(role)) = (row.manifest_id(), role) {
            by_manifest.entry(id).or_default().push((row, role));
        }
    }

    by_manifest
        .into_iter()
        .filter_map(|(id, handlers)| {
            let errors = role_errors(id, &handlers);
            (!errors.is_empty()).then(|| RowError::for_manifest(id, errors))
        })
        .collect()
}

fn role_errors(id: i64, handlers: &[(&NormalizedRow, HandlerType)]) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for required in HandlerType::REQUIRED {
        if !handlers.iter().any(|(_, role)| *role == required) {
            errors.push(FieldError::new(
                "type",
                format!("at least one handler row required for manifestId {id} with type: {required}"),
            ));
        }
    }

    let mut seen: BTreeSet<HandlerType> = BTreeSet::new();
    let mut orders: BTreeSet<i64> = BTreeSet::new();
    for (row, role) in handlers {
        if !role.allows_many() && !seen.insert(*role) {
            errors.push(FieldError::new(
                "type",
                format!(
                    "cannot have more than one row for manifestId {id} with type: {role} (extra row {})",
                    row.row
                ),
            ));
        }

        if *role == HandlerType::Transporter {
            if let Some(order) = row.data.get("order").and_then(|v| v.as_i64()) {
                if !orders.insert(order) {
                    errors.push(FieldError::new(
                        "order",
                        format!(
                            "transporter order {order} is used more than once for manifestId {id} (row {})",
                            row.row
                        ),
                    ));
                }
            }
        }
    }

    errors
}

/// Nested-shape validation of every handler in every group.
pub fn validate_handlers_full(groups: &[HandlerGroup], schema: &SchemaValidator) -> Vec<RowError> {
    groups
        .iter()
        .flat_map(HandlerGroup::handlers)
        .filter_map(|handler| {
            let errors = schema.nested_errors(&handler.to_value());
            (!errors.is_empty()).then(|| RowError::at_row(handler.row_number, errors))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{normalize_handler_rows, Cell, RawRow};
    use crate::transform::{group_handlers, map_handler_rows};
    use crate::validation::Schemas;

    fn handler_row(row: usize, id: i64, role: &str, site: &str) -> RawRow {
        RawRow::new(row)
            .with("manifestId", id)
            .with("type", role)
            .with("epaSiteId", site)
            .with("name", "Test Site")
            .with("siteAddress1", "1 Main St")
            .with("siteAddressCity", "Arlington")
            .with("siteAddressState", "VA")
    }

    fn complete_set(id: i64, first_row: usize) -> Vec<RawRow> {
        vec![
            handler_row(first_row, id, "Generator", "VATESTGEN001"),
            handler_row(first_row + 1, id, "Transporter", "VATESTTRN001").with("order", 1),
            handler_row(first_row + 2, id, "DesignatedFacility", "VATESTTSD001"),
        ]
    }

    fn ids(values: &[i64]) -> BTreeSet<i64> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_basic_valid() {
        let schemas = Schemas::embedded().unwrap();
        let sheet = normalize_handler_rows(&complete_set(1, 1));
        let errors = validate_handlers_basic(&sheet.rows, &ids(&[1]), &schemas.handler_basic);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_basic_missing_handlers_and_order() {
        let schemas = Schemas::embedded().unwrap();
        let sheet = normalize_handler_rows(&[handler_row(1, 1, "Transporter", "VATESTTRN001")]);
        let errors = validate_handlers_basic(&sheet.rows, &ids(&[1, 2]), &schemas.handler_basic);

        assert_eq!(errors[0].row, Some(1));
        assert_eq!(errors[0].errors[0].field, "order");
        assert_eq!(
            errors[1].errors[0].message,
            "at least one handler row is required for manifestId 2"
        );
    }

    #[test]
    fn test_types_missing_role() {
        let mut raws = complete_set(1, 1);
        raws.retain(|r| !matches!(r.get("type"), Some(Cell::Text(t)) if t == "DesignatedFacility"));
        let sheet = normalize_handler_rows(&raws);

        let errors = validate_handler_types(&sheet.rows);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].manifest_id, Some(1));
        assert_eq!(
            errors[0].errors[0].message,
            "at least one handler row required for manifestId 1 with type: DesignatedFacility"
        );
    }

    #[test]
    fn test_types_extra_generators_each_reported() {
        let mut raws = complete_set(1, 1);
        raws.push(handler_row(4, 1, "Generator", "VATESTGEN002"));
        raws.push(handler_row(5, 1, "Generator", "VATESTGEN003"));
        let sheet = normalize_handler_rows(&raws);

        let errors = validate_handler_types(&sheet.rows);
        assert_eq!(errors[0].errors.len(), 2);
        assert!(errors[0].errors[0].message.contains("(extra row 4)"));
        assert!(errors[0].errors[1].message.contains("(extra row 5)"));
    }

    #[test]
    fn test_types_many_transporters_ok() {
        let mut raws = complete_set(1, 1);
        raws.push(handler_row(4, 1, "Transporter", "VATESTTRN002").with("order", 2));
        raws.push(handler_row(5, 1, "Broker", "VATESTBRK001"));
        let sheet = normalize_handler_rows(&raws);
        assert!(validate_handler_types(&sheet.rows).is_empty());
    }

    #[test]
    fn test_full_reports_dotted_paths() {
        let schemas = Schemas::embedded().unwrap();
        let mut raws = complete_set(1, 1);
        raws[0] = raws[0].clone().with("siteAddressState", "Virginia");
        let sheet = normalize_handler_rows(&raws);
        let groups = group_handlers(map_handler_rows(&sheet.rows));

        let errors = validate_handlers_full(&groups, &schemas.handler_full);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, Some(1));
        assert_eq!(errors[0].errors[0].field, "siteAddress.state.code");
    }
}
