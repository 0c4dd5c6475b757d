//! Raw audit entries and the per-field delta extracted from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EMPTY_DISPLAY, INITIAL_DISPLAY};

/// Kind of operation recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Other(i64),
}

impl OperationKind {
    /// Map an audit operation code (1 = create, 2 = update).
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => OperationKind::Create,
            2 => OperationKind::Update,
            other => OperationKind::Other(other),
        }
    }

    pub fn is_create(self) -> bool {
        matches!(self, OperationKind::Create)
    }

    /// Label shown to users. Anything that is not a create reads as an update.
    pub fn label(self) -> &'static str {
        match self {
            OperationKind::Create => "Created",
            _ => "Updated",
        }
    }
}

/// One raw audit entry for the owning record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: String,
    pub created_on: DateTime<Utc>,
    pub operation: OperationKind,
    /// Formatted action label, e.g. "Update".
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    /// Change payload; JSON or XML, not declared.
    #[serde(default)]
    pub change_data: Option<String>,
}

/// A raw field value as recorded in a change payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RawValue {
    /// The value was null or absent.
    Null,
    /// Placeholder for the old side of a creation with no explicit delta.
    Initial,
    Text(String),
}

impl RawValue {
    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Text(s.into())
    }

    /// Display form before label resolution.
    pub fn display(&self) -> &str {
        match self {
            RawValue::Null => EMPTY_DISPLAY,
            RawValue::Initial => INITIAL_DISPLAY,
            RawValue::Text(s) => s,
        }
    }
}

/// Old/new values for one field within one audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDelta {
    pub field: String,
    pub old_value: RawValue,
    pub new_value: RawValue,
    /// True when built for a creation entry rather than read from the payload.
    #[serde(default)]
    pub synthesized: bool,
}

impl FieldDelta {
    pub fn changed(field: impl Into<String>, old_value: RawValue, new_value: RawValue) -> Self {
        Self {
            field: field.into(),
            old_value,
            new_value,
            synthesized: false,
        }
    }

    /// Delta for a creation entry whose payload does not mention the field.
    /// An empty current value is recorded as null.
    pub fn synthesized_create(field: impl Into<String>, current_value: &str) -> Self {
        let new_value = if current_value.is_empty() {
            RawValue::Null
        } else {
            RawValue::text(current_value)
        };
        Self {
            field: field.into(),
            old_value: RawValue::Initial,
            new_value,
            synthesized: true,
        }
    }
}

/// Case-insensitive comparison of logical field names.
pub fn field_name_matches(candidate: &str, target: &str) -> bool {
    candidate.to_lowercase() == target.to_lowercase()
}
