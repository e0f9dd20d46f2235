//! Merge strategies for layered YAML documents.
//!
//! Documents are folded left to right, later documents taking precedence.
//! Two strategies exist:
//!
//! - **Simple**: top-level keys of the overlay replace the base's wholesale.
//! - **Deep**: maps merge recursively, lists are unioned. Structural
//!   conflicts (e.g. a map over a list) are reported as [`MergeError`].
//!
//! [`MergeStrategy::DeepWithFallback`] tries the deep strategy first and, on
//! a [`MergeError`] only, redoes the whole fold with the simple strategy.

use crate::error::MergeError;
use serde_json::Value;

/// How a chain of documents is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Shallow, per top-level key.
    #[default]
    Simple,
    /// Recursive; conflicts are fatal.
    Deep,
    /// Recursive; conflicts fall back to [`MergeStrategy::Simple`].
    DeepWithFallback,
}

/// Result of merging a document chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub value: Value,
    /// Set when a deep merge failed and the simple strategy produced `value`.
    pub fallback: Option<MergeError>,
}

/// Merge `documents` in order using `strategy`.
pub fn merge_documents(
    documents: &[Value],
    strategy: MergeStrategy,
) -> Result<MergeOutcome, MergeError> {
    match strategy {
        MergeStrategy::Simple => Ok(MergeOutcome {
            value: simple_merge_all(documents.iter().cloned()),
            fallback: None,
        }),
        MergeStrategy::Deep => Ok(MergeOutcome {
            value: deep_merge_all(documents.iter().cloned())?,
            fallback: None,
        }),
        MergeStrategy::DeepWithFallback => match deep_merge_all(documents.iter().cloned()) {
            Ok(value) => Ok(MergeOutcome {
                value,
                fallback: None,
            }),
            Err(err @ MergeError::Conflict { .. }) => Ok(MergeOutcome {
                value: simple_merge_all(documents.iter().cloned()),
                fallback: Some(err),
            }),
        },
    }
}

/// Shallow merge: `overlay` replaces `base`, per top-level key when both are maps.
///
/// A null overlay means "not specified" and keeps the base.
pub fn simple_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (base, Value::Null) => base,
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                base_map.insert(key, value);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Fold [`simple_merge`] over the documents.
pub fn simple_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, simple_merge)
}

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively
/// - Lists are combined: overlay elements not already in the base are appended
/// - Scalars in the overlay replace whatever the base holds
/// - A null overlay preserves the base; a null base takes the overlay
/// - Any other pairing is a [`MergeError::Conflict`]
///
/// # Example
/// ```
/// use serde_json::json;
/// use stratum::merge::deep_merge;
///
/// let base = json!({
///     "server": { "port": 8080, "host": "localhost" },
///     "features": ["a", "b"]
/// });
/// let overlay = json!({
///     "server": { "port": 9000 },
///     "features": ["b", "c"]
/// });
/// let result = deep_merge(base, overlay).unwrap();
/// assert_eq!(
///     result,
///     json!({
///         "server": { "port": 9000, "host": "localhost" },
///         "features": ["a", "b", "c"]
///     })
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Result<Value, MergeError> {
    deep_merge_at(base, overlay, &mut Vec::new())
}

/// Fold [`deep_merge`] over the documents, stopping at the first conflict.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Result<Value, MergeError> {
    values.into_iter().try_fold(Value::Null, deep_merge)
}

fn deep_merge_at(
    base: Value,
    overlay: Value,
    path: &mut Vec<String>,
) -> Result<Value, MergeError> {
    match (base, overlay) {
        (base, Value::Null) => Ok(base),
        (Value::Null, overlay) => Ok(overlay),
        (_, overlay @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => Ok(overlay),
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.get_mut(&key) {
                    Some(slot) => {
                        path.push(key.clone());
                        let merged = deep_merge_at(slot.take(), overlay_value, path)?;
                        path.pop();
                        merged
                    }
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            Ok(Value::Object(base_map))
        }
        (Value::Array(mut base_items), Value::Array(overlay_items)) => {
            for item in overlay_items {
                if !base_items.contains(&item) {
                    base_items.push(item);
                }
            }
            Ok(Value::Array(base_items))
        }
        (base, overlay) => Err(MergeError::Conflict {
            path: if path.is_empty() {
                "<root>".to_string()
            } else {
                path.join(".")
            },
            base: kind(&base),
            overlay: kind(&overlay),
        }),
    }
}

/// Human-readable name of a value's type, for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
