//! History records, session state, and request/response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FieldMetadata;

/// One display-ready history line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    /// "Created" or "Updated".
    pub operation: String,
    pub action: String,
    /// Audit entry id; stable list key.
    pub entry_id: String,
    pub old_value: String,
    pub new_value: String,
}

impl HistoryRecord {
    /// One-line description, e.g. "Jane Doe updated this field".
    pub fn summary(&self) -> String {
        format!("{} {} this field", self.actor, self.operation.to_lowercase())
    }
}

/// Observable state of a history session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    pub has_fetched: bool,
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub records: Vec<HistoryRecord>,
}

/// Inputs needed to resolve one field's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldContext {
    #[serde(default = "default_field_name")]
    pub field_name: String,
    #[serde(default)]
    pub current_value: String,
    #[serde(default)]
    pub metadata: FieldMetadata,
    /// Owning record id; may be brace-wrapped.
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn default_field_name() -> String {
    "unknown".to_string()
}

impl FieldContext {
    pub fn new(field_name: impl Into<String>, current_value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            current_value: current_value.into(),
            metadata: FieldMetadata::default(),
            owner_id: None,
        }
    }

    pub fn with_metadata(mut self, metadata: FieldMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Owner id ready for querying: braces stripped, trimmed. `None` when absent or blank.
    pub fn resolved_owner_id(&self) -> Option<String> {
        self.owner_id.as_deref().and_then(normalize_owner_id)
    }

    pub fn apply(&mut self, update: ContextUpdate) {
        if let Some(v) = update.current_value {
            self.current_value = v;
        }
        if let Some(o) = update.owner_id {
            self.owner_id = Some(o);
        }
    }
}

/// Strip braces and whitespace from a record id; `None` if nothing remains.
pub fn normalize_owner_id(raw: &str) -> Option<String> {
    let id: String = raw.chars().filter(|c| *c != '{' && *c != '}').collect();
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Partial context update sent by the host when the bound value changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextUpdate {
    #[serde(default)]
    pub current_value: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Body of a fetch request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchRequest {
    #[serde(default)]
    pub force: bool,
}

/// Returned when a session is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

/// Base response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

fn default_code() -> i32 {
    200
}

impl<T> BaseResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

pub type SessionResponse = BaseResponse<SessionCreated>;
pub type HistoryStateResponse = BaseResponse<HistoryState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_id_braces_are_stripped() {
        assert_eq!(
            normalize_owner_id("{6F9619FF-8B86-D011-B42D-00C04FC964FF}").as_deref(),
            Some("6F9619FF-8B86-D011-B42D-00C04FC964FF")
        );
        assert_eq!(normalize_owner_id(" {} "), None);
        assert_eq!(normalize_owner_id(""), None);
    }

    #[test]
    fn context_defaults_field_name() {
        let ctx: FieldContext = serde_json::from_str(r#"{"current_value":"x"}"#).unwrap();
        assert_eq!(ctx.field_name, "unknown");
        assert_eq!(ctx.resolved_owner_id(), None);
    }

    #[test]
    fn context_update_overrides_only_given_fields() {
        let mut ctx = FieldContext::new("status", "Open").with_owner("abc");
        ctx.apply(ContextUpdate {
            current_value: Some("Closed".to_string()),
            owner_id: None,
        });
        assert_eq!(ctx.current_value, "Closed");
        assert_eq!(ctx.owner_id.as_deref(), Some("abc"));
    }

    #[test]
    fn summary_lowercases_operation() {
        let r = HistoryRecord {
            timestamp: Utc::now(),
            actor: "Jane Doe".to_string(),
            operation: "Updated".to_string(),
            action: "Update".to_string(),
            entry_id: "a1".to_string(),
            old_value: "Open".to_string(),
            new_value: "Closed".to_string(),
        };
        assert_eq!(r.summary(), "Jane Doe updated this field");
    }
}
