use std::collections::BTreeMap;

use anyhow::{Result, bail};
use deepdict_config::EmptyFieldAction;
use serde_json::Value;

/// Maps note fields to dotted paths into a serialized entry.
///
/// A path walks object keys and, for numeric segments, array indices:
/// `meanings.1.examples.0.sentence`. Anything that does not resolve to a
/// non-empty value is handed to the field's [`EmptyFieldAction`].
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    mappings: BTreeMap<String, String>,
    empty_fields: BTreeMap<String, EmptyFieldAction>,
}

impl FieldMapper {
    pub fn new(
        mappings: BTreeMap<String, String>,
        empty_fields: BTreeMap<String, EmptyFieldAction>,
    ) -> Self {
        Self {
            mappings,
            empty_fields,
        }
    }

    /// Note fields for `entry`. Skipped fields are absent from the map.
    pub fn map(&self, entry: &Value) -> Result<BTreeMap<String, String>> {
        let mut fields = BTreeMap::new();
        for (field, path) in &self.mappings {
            let value = extract(entry, path);
            if let Some(value) = self.resolve_empty(field, value)? {
                fields.insert(field.clone(), value);
            }
        }
        Ok(fields)
    }

    fn resolve_empty(&self, field: &str, value: Option<String>) -> Result<Option<String>> {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            return Ok(Some(value));
        }

        let action = self.empty_fields.get(field).cloned().unwrap_or_default();
        tracing::debug!(field, ?action, "empty note field");
        match action {
            EmptyFieldAction::Skip => Ok(None),
            EmptyFieldAction::Default { default } => Ok(Some(default)),
            EmptyFieldAction::Placeholder => Ok(Some(format!("[No {field}]"))),
            EmptyFieldAction::Error => bail!("Required field '{field}' is empty"),
        }
    }
}

/// Follow `path` through `value` and render the leaf as note text
pub fn extract(value: &Value, path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
