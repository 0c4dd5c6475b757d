//! HTTP client for an OData audit endpoint (e.g. `GET /api/data/v9.2/audits`).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use trail_types::{AuditEntry, AuditSource, AuditSourceError, OperationKind};

const FORMATTED_VALUE_ANNOTATIONS: &str =
    r#"odata.include-annotations="OData.Community.Display.V1.FormattedValue""#;

#[derive(Debug, Deserialize)]
struct ODataCollection {
    #[serde(default)]
    value: Vec<AuditRow>,
}

#[derive(Debug, Deserialize)]
struct AuditRow {
    auditid: String,
    createdon: DateTime<Utc>,
    #[serde(default)]
    operation: Option<i64>,
    #[serde(default, rename = "action@OData.Community.Display.V1.FormattedValue")]
    action: Option<String>,
    #[serde(default)]
    changedata: Option<String>,
    #[serde(default)]
    userid: Option<UserRef>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    #[serde(default)]
    fullname: Option<String>,
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        AuditEntry {
            entry_id: row.auditid,
            created_on: row.createdon,
            operation: OperationKind::from_code(row.operation.unwrap_or_default()),
            action: row.action,
            actor: row.userid.and_then(|u| u.fullname),
            change_data: row.changedata,
        }
    }
}

/// Audit source that queries an OData audit entity set.
pub struct ODataAuditSource {
    client: reqwest::Client,
    base_url: String,
    entity_set: String,
    token: Option<String>,
}

impl ODataAuditSource {
    pub fn new(base_url: String, token: Option<String>, entity_set: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            entity_set: entity_set.unwrap_or("audits").to_string(),
            token,
        }
    }

    /// Reads `AUDIT_API_URL` (required), `AUDIT_API_TOKEN`, and `AUDIT_ENTITY_SET`.
    pub fn from_env() -> Result<Self, AuditSourceError> {
        let url = std::env::var("AUDIT_API_URL")
            .map_err(|_| AuditSourceError::Config("AUDIT_API_URL is not set".to_string()))?;
        let token = std::env::var("AUDIT_API_TOKEN").ok();
        let entity_set = std::env::var("AUDIT_ENTITY_SET").ok();
        Ok(Self::new(url, token, entity_set.as_deref()))
    }

    fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.entity_set)
    }

    fn query_params(owner_id: &str, top: usize) -> Vec<(&'static str, String)> {
        vec![
            ("$filter", format!("_objectid_value eq {}", owner_id)),
            ("$orderby", "createdon desc".to_string()),
            ("$top", top.to_string()),
            (
                "$select",
                "createdon,operation,action,changedata,auditid".to_string(),
            ),
            ("$expand", "userid($select=fullname)".to_string()),
        ]
    }

    fn parse_body(body: &str) -> Result<Vec<AuditEntry>, AuditSourceError> {
        let parsed: ODataCollection =
            serde_json::from_str(body).map_err(|e| AuditSourceError::Parse(e.to_string()))?;
        Ok(parsed.value.into_iter().map(AuditEntry::from).collect())
    }
}

fn is_record_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

#[async_trait::async_trait]
impl AuditSource for ODataAuditSource {
    async fn query_audit(
        &self,
        owner_id: &str,
        top: usize,
    ) -> Result<Vec<AuditEntry>, AuditSourceError> {
        if !is_record_id(owner_id) {
            return Err(AuditSourceError::Other(format!(
                "invalid record id: {}",
                owner_id
            )));
        }
        let mut req = self
            .client
            .get(self.url())
            .query(&Self::query_params(owner_id, top))
            .header("Accept", "application/json")
            .header("OData-Version", "4.0")
            .header("Prefer", FORMATTED_VALUE_ANNOTATIONS);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        let res = req
            .send()
            .await
            .map_err(|e| AuditSourceError::Http(e.to_string()))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| AuditSourceError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(AuditSourceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let mut entries = Self::parse_body(&body)?;
        entries.truncate(top);
        tracing::debug!(owner_id, count = entries.len(), "audit rows fetched");
        Ok(entries)
    }
}
