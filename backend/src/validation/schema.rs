//! JSON Schema validation of normalized rows.
//!
//! Schemas are JSON Schema Draft 7, embedded at compile time from `schemas/`
//! and compiled once per batch run.

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::Value;

use super::report::FieldError;
use crate::error::SchemaError;

/// Code-list columns whose per-item length errors get a delimiter hint.
const CODE_LIST_FIELDS: [&str; 4] = [
    "federalWasteCodes",
    "generatorWasteCodes",
    "tsdfWasteCodes",
    "txWasteCodes",
];

/// Which keyword a violation came from, where the message depends on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// A required property is absent.
    Required(String),
    /// A property not declared by the schema.
    AdditionalProperty(String),
    /// `minLength` / `maxLength`.
    Length,
    Other,
}

/// One schema violation, decoupled from the validator's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Instance path segments; empty for the record itself.
    pub path: Vec<String>,
    pub rule: Rule,
    pub message: String,
}

/// A compiled schema plus the name it is reported under.
pub struct SchemaValidator {
    name: &'static str,
    validator: Validator,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("name", &self.name)
            .finish()
    }
}

impl SchemaValidator {
    /// Compile a parsed schema.
    pub fn compile(name: &'static str, schema: &Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::draft7::new(schema).map_err(|e| SchemaError {
            name,
            message: e.to_string(),
        })?;
        Ok(Self { name, validator })
    }

    /// Parse and compile schema source text.
    pub fn from_source(name: &'static str, source: &str) -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(source).map_err(|e| SchemaError {
            name,
            message: e.to_string(),
        })?;
        Self::compile(name, &schema)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Every violation of the record, in validator order.
    pub fn violations(&self, record: &Value) -> Vec<Violation> {
        self.validator
            .iter_errors(record)
            .flat_map(|error| {
                let path: Vec<String> = error
                    .instance_path
                    .to_string()
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();

                match &error.kind {
                    ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
                        .iter()
                        .map(|column| Violation {
                            path: path.clone(),
                            rule: Rule::AdditionalProperty(column.clone()),
                            message: format!("column '{column}' is not allowed"),
                        })
                        .collect(),
                    ValidationErrorKind::Required { property } => {
                        let property = property
                            .as_str()
                            .map(String::from)
                            .unwrap_or_else(|| property.to_string());
                        vec![Violation {
                            path,
                            message: format!("must have required property '{property}'"),
                            rule: Rule::Required(property),
                        }]
                    }
                    ValidationErrorKind::MinLength { limit } => vec![Violation {
                        path,
                        rule: Rule::Length,
                        message: format!("must NOT have fewer than {limit} characters"),
                    }],
                    ValidationErrorKind::MaxLength { limit } => vec![Violation {
                        path,
                        rule: Rule::Length,
                        message: format!("must NOT have more than {limit} characters"),
                    }],
                    _ => vec![Violation {
                        path,
                        rule: Rule::Other,
                        message: error.to_string(),
                    }],
                }
            })
            .collect()
    }

    /// Violations of a flat sheet row, keyed by column.
    ///
    /// Per-item length errors on code lists point the user at the `|`
    /// delimiter, since a wrong separator is the usual cause.
    pub fn row_errors(&self, record: &Value) -> Vec<FieldError> {
        self.violations(record)
            .into_iter()
            .map(|violation| match violation.rule {
                Rule::AdditionalProperty(column) => FieldError::new(column, violation.message),
                Rule::Required(property) => FieldError::new(property, violation.message),
                Rule::Length
                    if violation
                        .path
                        .first()
                        .is_some_and(|f| CODE_LIST_FIELDS.contains(&f.as_str())) =>
                {
                    FieldError::new(
                        violation.path[0].clone(),
                        format!(
                            "each code {}. make sure codes are split by '|' character",
                            violation.message
                        ),
                    )
                }
                Rule::Length | Rule::Other => FieldError::new(
                    violation.path.first().cloned().unwrap_or_default(),
                    violation.message,
                ),
            })
            .collect()
    }

    /// Violations of a nested object, keyed by dotted path
    /// (`siteAddress.state.code`).
    pub fn nested_errors(&self, record: &Value) -> Vec<FieldError> {
        self.violations(record)
            .into_iter()
            .map(|violation| {
                let mut path = violation.path;
                match violation.rule {
                    Rule::Required(property) | Rule::AdditionalProperty(property) => {
                        path.push(property)
                    }
                    Rule::Length | Rule::Other => {}
                }
                FieldError::new(path.join("."), violation.message)
            })
            .collect()
    }
}
