//! Record schema validation.
//!
//! Every log line passes through [`validate_record`] before it becomes a
//! [`MemoryItem`]. Validation is explicit and field-scoped: the reader and
//! the repair tool both get a structured list of what exactly is wrong with a
//! record, rather than a single opaque decode failure.

use serde_json::Value;
use std::fmt;

use super::types::{clamp_importance, MemoryItem, DEFAULT_IMPORTANCE};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Join field errors into one diagnostic message.
pub fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a decoded JSON record and build the item it describes.
///
/// Required non-empty string fields: `id`, `createdAt`, `updatedAt`, `scope`,
/// `content`. `tags` must be an array of strings when present, `deleted` a
/// boolean, `importance` a number, `summary` null-or-string, `metadata`
/// null-or-object. Absent optional fields take their defaults (`tags` empty,
/// `deleted` false, `importance` 0.5, `summary`/`metadata` null).
pub fn validate_record(value: &Value) -> Result<MemoryItem, Vec<FieldError>> {
    let Some(obj) = value.as_object() else {
        return Err(vec![FieldError {
            field: "record",
            message: "not a JSON object".into(),
        }]);
    };

    let mut errors = Vec::new();

    let mut required = |field: &'static str| -> String {
        match obj.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) => {
                errors.push(FieldError {
                    field,
                    message: "must not be empty".into(),
                });
                String::new()
            }
            Some(_) => {
                errors.push(FieldError {
                    field,
                    message: "must be a string".into(),
                });
                String::new()
            }
            None => {
                errors.push(FieldError {
                    field,
                    message: "missing required field".into(),
                });
                String::new()
            }
        }
    };

    let id = required("id");
    let created_at = required("createdAt");
    let updated_at = required("updatedAt");
    let scope = required("scope");
    let content = required("content");

    let tags = match obj.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => {
            let mut tags = Vec::with_capacity(values.len());
            for v in values {
                match v.as_str() {
                    Some(s) => tags.push(s.to_string()),
                    None => {
                        errors.push(FieldError {
                            field: "tags",
                            message: "must contain only strings".into(),
                        });
                        break;
                    }
                }
            }
            tags
        }
        Some(_) => {
            errors.push(FieldError {
                field: "tags",
                message: "must be an array of strings".into(),
            });
            Vec::new()
        }
    };

    let deleted = match obj.get("deleted") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            errors.push(FieldError {
                field: "deleted",
                message: "must be a boolean".into(),
            });
            false
        }
    };

    let importance = match obj.get("importance") {
        None | Some(Value::Null) => DEFAULT_IMPORTANCE,
        Some(v) => match v.as_f64() {
            Some(n) => clamp_importance(n),
            None => {
                errors.push(FieldError {
                    field: "importance",
                    message: "must be a number".into(),
                });
                DEFAULT_IMPORTANCE
            }
        },
    };

    let summary = match obj.get("summary") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError {
                field: "summary",
                message: "must be null or a string".into(),
            });
            None
        }
    };

    let metadata = match obj.get("metadata") {
        None | Some(Value::Null) => None,
        Some(v @ Value::Object(_)) => Some(v.clone()),
        Some(_) => {
            errors.push(FieldError {
                field: "metadata",
                message: "must be null or an object".into(),
            });
            None
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(MemoryItem {
        id,
        created_at,
        updated_at,
        scope,
        tags,
        content,
        summary,
        metadata,
        importance,
        deleted,
    })
}
