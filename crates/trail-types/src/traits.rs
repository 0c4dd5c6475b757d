//! Audit source trait and error types.

use crate::AuditEntry;
use async_trait::async_trait;

/// Audit query capability.
///
/// Contract: returns at most `top` entries for `owner_id`, ordered by creation time descending.
/// An owner with no audit rows yields `Ok(vec![])`, not an error.
#[async_trait]
pub trait AuditSource: Send + Sync {
    async fn query_audit(
        &self,
        owner_id: &str,
        top: usize,
    ) -> Result<Vec<AuditEntry>, AuditSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditSourceError {
    #[error("audit request failed: {0}")]
    Http(String),
    #[error("audit API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid audit response: {0}")]
    Parse(String),
    #[error("audit source not configured: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("json change payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("xml change payload: {0}")]
    Xml(String),
}
