//! JSON change payloads: `{"changedAttributes":[{"logicalName":..,"oldValue":..,"newValue":..}]}`.

use crate::ChangeDecoder;
use serde::Deserialize;
use trail_types::{field_name_matches, DecodeError, FieldDelta, RawValue};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeSet {
    #[serde(default)]
    changed_attributes: Vec<ChangedAttribute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangedAttribute {
    #[serde(default)]
    logical_name: Option<String>,
    // Missing keys deserialize to Null.
    #[serde(default)]
    old_value: serde_json::Value,
    #[serde(default)]
    new_value: serde_json::Value,
}

fn raw_value(v: serde_json::Value) -> RawValue {
    match v {
        serde_json::Value::Null => RawValue::Null,
        serde_json::Value::String(s) => RawValue::Text(s),
        other => RawValue::Text(other.to_string()),
    }
}

/// Decoder for JSON-encoded change payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonChangeDecoder;

impl ChangeDecoder for JsonChangeDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, payload: &str, field: &str) -> Result<Option<FieldDelta>, DecodeError> {
        let set: ChangeSet = serde_json::from_str(payload)?;
        let found = set.changed_attributes.into_iter().find(|a| {
            a.logical_name
                .as_deref()
                .is_some_and(|n| field_name_matches(n, field))
        });
        Ok(found.map(|a| {
            FieldDelta::changed(field, raw_value(a.old_value), raw_value(a.new_value))
        }))
    }
}
