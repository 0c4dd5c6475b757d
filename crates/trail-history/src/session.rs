//! Fetch coordinator for one field-history session.
//!
//! The `loading` flag is the only exclusion mechanism: a request observed while a fetch
//! is in flight is dropped, not queued. A fetched session stays cached until a forced
//! request.

use crate::assembler::assemble;
use std::sync::Arc;
use tokio::sync::RwLock;
use trail_types::{
    AuditSource, ContextUpdate, FieldContext, HistoryState, AUDIT_QUERY_TOP,
};

const FETCH_ERROR: &str = "Error fetching history";

/// What a call to [`HistorySession::request`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Another fetch was in flight; nothing happened.
    InFlight,
    /// Already fetched and not forced; cached state kept.
    Cached,
    /// No owning record id; attempt ended without an error.
    NoOwner,
    /// Query succeeded; number of records assembled.
    Loaded(usize),
    /// Query failed with this message.
    Failed(String),
}

/// Session state for one field: context plus the loading/error/records state machine.
pub struct HistorySession {
    source: Arc<dyn AuditSource + Send + Sync>,
    context: RwLock<FieldContext>,
    state: RwLock<HistoryState>,
}

impl HistorySession {
    pub fn new(source: Arc<dyn AuditSource + Send + Sync>, context: FieldContext) -> Self {
        Self {
            source,
            context: RwLock::new(context),
            state: RwLock::new(HistoryState::default()),
        }
    }

    pub async fn state(&self) -> HistoryState {
        self.state.read().await.clone()
    }

    pub async fn context(&self) -> FieldContext {
        self.context.read().await.clone()
    }

    /// Apply a host-side change (bound value or owner id). Takes effect on the next fetch.
    pub async fn update_context(&self, update: ContextUpdate) {
        self.context.write().await.apply(update);
    }

    /// Fetch history unless a fetch is in flight, or it was already fetched and `force`
    /// is false.
    pub async fn request(&self, force: bool) -> FetchOutcome {
        {
            let mut st = self.state.write().await;
            if st.loading {
                return FetchOutcome::InFlight;
            }
            if st.has_fetched && !force {
                return FetchOutcome::Cached;
            }
            st.has_fetched = true;
            st.loading = true;
            st.error = None;
        }

        let ctx = self.context.read().await.clone();
        let Some(owner_id) = ctx.resolved_owner_id() else {
            self.state.write().await.loading = false;
            tracing::debug!(field = %ctx.field_name, "no owning record id, history fetch skipped");
            return FetchOutcome::NoOwner;
        };

        tracing::debug!(owner_id = %owner_id, field = %ctx.field_name, force, "fetching field history");
        let result = self.source.query_audit(&owner_id, AUDIT_QUERY_TOP).await;

        let mut st = self.state.write().await;
        st.loading = false;
        match result {
            Ok(entries) => {
                let window = &entries[..entries.len().min(AUDIT_QUERY_TOP)];
                st.records = assemble(window, &ctx.field_name, &ctx.current_value, &ctx.metadata);
                tracing::info!(
                    owner_id = %owner_id,
                    field = %ctx.field_name,
                    entries = window.len(),
                    records = st.records.len(),
                    "field history loaded"
                );
                FetchOutcome::Loaded(st.records.len())
            }
            Err(e) => {
                let msg = Some(e.to_string())
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| FETCH_ERROR.to_string());
                tracing::warn!(owner_id = %owner_id, field = %ctx.field_name, error = %msg, "field history fetch failed");
                st.records.clear();
                st.error = Some(msg.clone());
                FetchOutcome::Failed(msg)
            }
        }
    }
}
