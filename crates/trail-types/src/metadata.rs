//! Field metadata: kind and option set used for label resolution.
//!
//! Field names accept the host's casing (`Type`, `Options`, `Value`, `Label`) as well as
//! snake_case, so metadata can be passed through from the host unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of the field whose history is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldKind {
    /// Single-select enumerated field.
    OptionSet,
    /// Two-option (boolean-like) enumerated field.
    TwoOptions,
    /// Anything else; unknown kinds deserialize here.
    #[default]
    #[serde(other)]
    Plain,
}

impl FieldKind {
    pub fn is_enumerated(self) -> bool {
        matches!(self, FieldKind::OptionSet | FieldKind::TwoOptions)
    }
}

/// Option code. Hosts send numbers, strings, or booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionCode {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for OptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionCode::Bool(b) => write!(f, "{}", b),
            OptionCode::Int(i) => write!(f, "{}", i),
            OptionCode::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for OptionCode {
    fn from(v: i64) -> Self {
        OptionCode::Int(v)
    }
}

impl From<i32> for OptionCode {
    fn from(v: i32) -> Self {
        OptionCode::Int(v.into())
    }
}

impl From<&str> for OptionCode {
    fn from(v: &str) -> Self {
        OptionCode::Text(v.to_string())
    }
}

impl From<bool> for OptionCode {
    fn from(v: bool) -> Self {
        OptionCode::Bool(v)
    }
}

/// One (code, label) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    #[serde(alias = "Value")]
    pub value: OptionCode,
    #[serde(alias = "Label")]
    pub label: String,
}

/// Metadata describing the target field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    #[serde(default, alias = "Type")]
    pub kind: FieldKind,
    #[serde(default, alias = "Options")]
    pub options: Vec<FieldOption>,
}

impl FieldMetadata {
    pub fn plain() -> Self {
        Self::default()
    }

    /// Enumerated metadata of the given kind from (code, label) pairs.
    pub fn enumerated<C, L>(kind: FieldKind, options: impl IntoIterator<Item = (C, L)>) -> Self
    where
        C: Into<OptionCode>,
        L: Into<String>,
    {
        Self {
            kind,
            options: options
                .into_iter()
                .map(|(value, label)| FieldOption {
                    value: value.into(),
                    label: label.into(),
                })
                .collect(),
        }
    }
}
