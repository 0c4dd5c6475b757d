//! Axum server and routes.
//!
//! Each session tracks one field on one record. `fetch` starts the request on the runtime
//! and returns immediately; hosts poll the session state, as with any async job.
//!
//! Hosts should `DELETE` a session when done with it. Sessions idle for longer than the
//! configured TTL are evicted whenever a new session is created.

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use trail_history::HistorySession;
use trail_types::{
    AuditSource, BaseResponse, ContextUpdate, FetchRequest, FieldContext, HistoryStateResponse,
    SessionCreated, SessionResponse,
};
use uuid::Uuid;

/// Default idle time after which a session may be evicted.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: Arc<HistorySession>,
    last_used: Instant,
}

pub struct AppState {
    pub source: Arc<dyn AuditSource + Send + Sync>,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_ttl: Duration,
}

impl AppState {
    pub fn new(source: Arc<dyn AuditSource + Send + Sync>) -> Self {
        Self {
            source,
            sessions: RwLock::new(HashMap::new()),
            idle_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    /// Look up a session and mark it used.
    async fn session(&self, id: &str) -> Option<Arc<HistorySession>> {
        let mut guard = self.sessions.write().await;
        let entry = guard.get_mut(id)?;
        entry.last_used = Instant::now();
        Some(Arc::clone(&entry.session))
    }

    async fn insert(&self, id: String, session: Arc<HistorySession>) {
        let mut guard = self.sessions.write().await;
        let before = guard.len();
        guard.retain(|_, e| e.last_used.elapsed() < self.idle_ttl);
        if guard.len() < before {
            tracing::info!(evicted = before - guard.len(), "idle history sessions evicted");
        }
        guard.insert(
            id,
            SessionEntry {
                session,
                last_used: Instant::now(),
            },
        );
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/history/sessions", post(handle_create_session))
        .route(
            "/history/sessions/:id",
            get(handle_get_state).delete(handle_delete_session),
        )
        .route("/history/sessions/:id/fetch", post(handle_fetch))
        .route("/history/sessions/:id/context", put(handle_update_context))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn session_not_found<T>() -> BaseResponse<T> {
    BaseResponse::error(404, "Session not found")
}

async fn handle_create_session(
    State(state): State<Arc<AppState>>,
    Json(ctx): Json<FieldContext>,
) -> Json<SessionResponse> {
    let session_id = Uuid::new_v4().to_string();
    tracing::info!(session_id = %session_id, field = %ctx.field_name, "history session created");
    let session = Arc::new(HistorySession::new(Arc::clone(&state.source), ctx));
    state.insert(session_id.clone(), session).await;
    Json(BaseResponse::ok(SessionCreated { session_id }))
}

async fn handle_get_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<HistoryStateResponse> {
    match state.session(&id).await {
        Some(session) => Json(BaseResponse::ok(session.state().await)),
        None => Json(session_not_found()),
    }
}

async fn handle_fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Json<HistoryStateResponse> {
    let Some(session) = state.session(&id).await else {
        return Json(session_not_found());
    };
    let force = if body.iter().all(u8::is_ascii_whitespace) {
        false
    } else {
        match serde_json::from_slice::<FetchRequest>(&body) {
            Ok(req) => req.force,
            Err(e) => {
                return Json(BaseResponse::error(
                    400,
                    format!("invalid fetch request: {}", e),
                ))
            }
        }
    };
    let task = Arc::clone(&session);
    tokio::spawn(async move {
        let outcome = task.request(force).await;
        tracing::debug!(session_id = %id, ?outcome, "history request finished");
    });
    Json(BaseResponse::ok(session.state().await))
}

async fn handle_update_context(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<ContextUpdate>,
) -> Json<HistoryStateResponse> {
    match state.session(&id).await {
        Some(session) => {
            session.update_context(update).await;
            Json(BaseResponse::ok(session.state().await))
        }
        None => Json(session_not_found()),
    }
}

async fn handle_delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<BaseResponse<()>> {
    match state.sessions.write().await.remove(&id) {
        Some(_) => {
            tracing::info!(session_id = %id, "history session disposed");
            Json(BaseResponse {
                code: 200,
                message: "Session disposed".to_string(),
                data: None,
            })
        }
        None => Json(session_not_found()),
    }
}

async fn handle_health() -> &'static str {
    "ok"
}
