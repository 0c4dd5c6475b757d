//! In-memory audit source (process lifetime only). Used by tests and local hosts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use trail_types::{AuditEntry, AuditSource, AuditSourceError};

/// Audit entries keyed by owner id; counts queries and can be switched into a failing mode.
pub struct InMemoryAuditSource {
    entries: RwLock<HashMap<String, Vec<AuditEntry>>>,
    failure: RwLock<Option<String>>,
    queries: AtomicUsize,
}

impl InMemoryAuditSource {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            failure: RwLock::new(None),
            queries: AtomicUsize::new(0),
        }
    }

    pub async fn insert(&self, owner_id: &str, entry: AuditEntry) {
        self.entries
            .write()
            .await
            .entry(owner_id.to_string())
            .or_default()
            .push(entry);
    }

    pub async fn extend(&self, owner_id: &str, entries: impl IntoIterator<Item = AuditEntry>) {
        self.entries
            .write()
            .await
            .entry(owner_id.to_string())
            .or_default()
            .extend(entries);
    }

    /// Subsequent queries fail with `message` until [`clear_failure`](Self::clear_failure).
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Number of `query_audit` calls so far, failed ones included.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryAuditSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuditSource for InMemoryAuditSource {
    async fn query_audit(
        &self,
        owner_id: &str,
        top: usize,
    ) -> Result<Vec<AuditEntry>, AuditSourceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.failure.read().await.clone() {
            return Err(AuditSourceError::Other(msg));
        }
        let guard = self.entries.read().await;
        let mut out: Vec<AuditEntry> = guard.get(owner_id).cloned().unwrap_or_default();
        out.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        out.truncate(top);
        Ok(out)
    }
}
