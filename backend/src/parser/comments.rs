//! Multi-value fields.
//!
//! Code lists and comments share one delimiter: `D001|D002`. Each comment
//! is itself `handlerId:label:description`.

use crate::models::Comment;
use crate::validation::FieldError;

/// Separator between values of a multi-value cell.
pub const MULTI_VALUE_DELIMITER: char = '|';

/// Separator between the parts of one comment.
pub const COMMENT_DELIMITER: char = ':';

/// Number of parts in a well-formed comment.
pub const COMMENT_PARTS: usize = 3;

/// Field name used for comment format errors.
pub const COMMENT_FIELD: &str = "comment";

/// Split a code list cell into its codes.
///
/// Codes are trimmed; empty segments and repeated codes are dropped while
/// keeping first-seen order.
pub fn parse_codes(raw: Option<&str>) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for code in raw.unwrap_or_default().split(MULTI_VALUE_DELIMITER) {
        let code = code.trim();
        if !code.is_empty() && !codes.iter().any(|seen| seen == code) {
            codes.push(code.to_string());
        }
    }
    codes
}

/// Comments parsed from one cell, plus errors for the ones that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedComments {
    pub comments: Vec<Comment>,
    pub errors: Vec<FieldError>,
}

/// Parse a comments cell.
///
/// A malformed comment never reaches the output; it becomes an error on
/// the `comment` field instead. Numbering in messages is 1-based.
pub fn parse_comments(raw: Option<&str>) -> ParsedComments {
    let mut parsed = ParsedComments::default();
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return parsed;
    };

    for (index, text) in raw.split(MULTI_VALUE_DELIMITER).enumerate() {
        let number = index + 1;
        match parse_comment(text) {
            Ok(comment) => parsed.comments.push(comment),
            Err(message) => parsed.errors.push(FieldError::new(
                COMMENT_FIELD,
                format!("Comment {number} {message}"),
            )),
        }
    }
    parsed
}

fn parse_comment(text: &str) -> Result<Comment, String> {
    if text.trim().is_empty() {
        return Err("is empty.".to_string());
    }

    let parts: Vec<&str> = text.split(COMMENT_DELIMITER).map(str::trim).collect();
    if parts.len() != COMMENT_PARTS {
        return Err(format!(
            "is invalid. Expected format 'handlerId{d}label{d}description' ({COMMENT_PARTS} parts); received {} parts: '{}'",
            parts.len(),
            text.trim(),
            d = COMMENT_DELIMITER,
        ));
    }

    let (handler_id, label, description) = (parts[0], parts[1], parts[2]);
    if handler_id.is_empty() || label.is_empty() || description.is_empty() {
        return Err(format!(
            "is missing one or more values; received handlerId: '{handler_id}', label: '{label}', description: '{description}'."
        ));
    }

    Ok(Comment {
        handler_id: handler_id.to_string(),
        label: label.to_string(),
        description: description.to_string(),
    })
}
