use crate::error::{ParseError, ParseErrorKind};
use crate::types::{ElementState, SpielZettelFileInfo};

/// Parse the JSON sheet description bundled with a sheet image.
///
/// Performs deserialization and type mapping only. Does NOT compile rules
/// or check conformance; see [`crate::validate::validate`].
pub fn parse(input: &str) -> Result<SpielZettelFileInfo, ParseError> {
    let value = parse_json_root(input)?;
    if !value.is_object() {
        return Err(ParseError {
            kind: ParseErrorKind::TypeMismatch,
            message: "sheet root must be a JSON object".to_string(),
            path: None,
            line: None,
            column: None,
        });
    }
    from_value(value)
}

/// Parse a hand-authored sheet written in YAML.
#[cfg(feature = "yaml")]
pub fn parse_yaml(input: &str) -> Result<SpielZettelFileInfo, ParseError> {
    if input.trim().is_empty() {
        return Err(empty_input());
    }
    check_multi_document(input)?;

    let value: serde_json::Value = serde_saphyr::from_str(input).map_err(|e| {
        let msg = e.to_string();
        ParseError {
            kind: classify_error(&msg),
            message: msg,
            path: None,
            line: None,
            column: None,
        }
    })?;

    if !value.is_object() {
        return Err(ParseError {
            kind: ParseErrorKind::TypeMismatch,
            message: "sheet root must be a YAML mapping".to_string(),
            path: None,
            line: None,
            column: None,
        });
    }
    from_value(value)
}

/// Parse a saved state snapshot: a JSON array of `{ id, value?, disabled? }`.
pub fn parse_states(input: &str) -> Result<Vec<ElementState>, ParseError> {
    let value = parse_json_root(input)?;
    if !value.is_array() {
        return Err(ParseError {
            kind: ParseErrorKind::TypeMismatch,
            message: "saved state must be a JSON array".to_string(),
            path: None,
            line: None,
            column: None,
        });
    }
    serde_json::from_value(value).map_err(|e| {
        let msg = e.to_string();
        ParseError {
            kind: classify_error(&msg),
            message: msg,
            path: None,
            line: None,
            column: None,
        }
    })
}

fn parse_json_root(input: &str) -> Result<serde_json::Value, ParseError> {
    if input.trim().is_empty() {
        return Err(empty_input());
    }
    serde_json::from_str(input).map_err(|e| ParseError {
        kind: ParseErrorKind::Syntax,
        message: e.to_string(),
        path: None,
        line: Some(e.line()),
        column: Some(e.column()),
    })
}

fn from_value(value: serde_json::Value) -> Result<SpielZettelFileInfo, ParseError> {
    let path = locate_elements_error(&value);
    serde_json::from_value(value).map_err(|e| {
        let msg = e.to_string();
        ParseError {
            kind: classify_error(&msg),
            message: msg,
            path,
            line: None,
            column: None,
        }
    })
}

/// Points at the first element that fails to deserialize on its own, so
/// errors in large sheets name the offending entry.
fn locate_elements_error(value: &serde_json::Value) -> Option<String> {
    let elements = value.get("elements")?.as_array()?;
    elements.iter().enumerate().find_map(|(i, element)| {
        serde_json::from_value::<crate::types::Element>(element.clone())
            .is_err()
            .then(|| format!("elements[{}]", i))
    })
}

fn empty_input() -> ParseError {
    ParseError {
        kind: ParseErrorKind::Syntax,
        message: "empty input".to_string(),
        path: None,
        line: None,
        column: None,
    }
}

/// Only matches `---` at column 0 to avoid false positives inside block scalars.
#[cfg(feature = "yaml")]
fn check_multi_document(input: &str) -> Result<(), ParseError> {
    let mut doc_count = 0;
    for (line_num, line) in input.lines().enumerate() {
        if line.starts_with("---") && line[3..].trim().is_empty() {
            doc_count += 1;
            if doc_count > 1 {
                return Err(ParseError {
                    kind: ParseErrorKind::Syntax,
                    message: "multi-document YAML is not supported".to_string(),
                    path: None,
                    line: Some(line_num + 1),
                    column: None,
                });
            }
        }
    }
    Ok(())
}

fn classify_error(msg: &str) -> ParseErrorKind {
    let lower = msg.to_lowercase();
    if lower.contains("unknown variant") || lower.contains("unknown field") {
        ParseErrorKind::UnknownVariant
    } else if lower.contains("missing field")
        || lower.contains("invalid type")
        || lower.contains("invalid value")
        || lower.contains("expected")
    {
        ParseErrorKind::TypeMismatch
    } else {
        ParseErrorKind::Syntax
    }
}
