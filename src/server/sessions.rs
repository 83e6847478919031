//! Session lifecycle handlers.

use super::requests::*;
use super::tools;
use super::Gateway;
use crate::error::ToolError;
use crate::session::RegistryError;
use rmcp::model::CallToolResult;
use serde_json::json;
use std::path::Path;
use tracing::debug;

impl Gateway {
    pub async fn open_session(&self, args: OpenSessionRequest) -> CallToolResult {
        const OP: &str = tools::OPEN_SESSION;
        self.log_invocation(OP, "", json!({"path": &args.path}));
        if args.path.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "path is required"));
        }

        let session = match self.registry().create(Path::new(&args.path)).await {
            Ok(session) => session,
            Err(e @ (RegistryError::BinaryNotFound(_) | RegistryError::NotAFile(_))) => {
                return self.fail(ToolError::invalid_input(OP, e.to_string()));
            }
            Err(e) => return self.fail(ToolError::internal(OP, &e)),
        };

        // Workers must outlive the request that caused them to start, so the
        // spawn runs on a detached task; cancelling this handler leaves the
        // worker and its monitor intact.
        let workers = self.workers().clone();
        let spawn_session = session.clone();
        let started =
            tokio::spawn(async move { workers.start(&spawn_session).await }).await;

        match started {
            Ok(Ok(handle)) => self.ok_json(json!({
                "session_id": &session.id,
                "binary_path": &session.binary_path,
                "socket_path": &session.socket_path,
                "worker_pid": handle.pid,
                "created_at": session.created_at,
                "message": "session opened",
            })),
            Ok(Err(e)) => {
                self.registry().remove(&session.id).await;
                self.fail(ToolError::worker_unavailable(OP, &session.id, &e))
            }
            Err(e) => {
                self.registry().remove(&session.id).await;
                self.fail(ToolError::internal(OP, &e))
            }
        }
    }

    pub async fn close_session(&self, args: CloseSessionRequest) -> CallToolResult {
        const OP: &str = tools::CLOSE_SESSION;
        self.log_invocation(OP, &args.session_id, json!({}));
        let Some(session) = self.registry().get(&args.session_id).await else {
            return self.fail(ToolError::session_not_found(OP, &args.session_id));
        };

        if let Err(e) = self.workers().stop(&session.id).await {
            // The worker may already be gone; closing the session record is
            // still valid.
            debug!(session_id = %session.id, error = %e, "No worker to stop");
        }
        self.registry().remove(&session.id).await;
        self.caches().invalidate(&session.id);

        self.ok_json(json!({"closed": true, "session_id": &session.id}))
    }

    pub async fn list_sessions(&self) -> CallToolResult {
        const OP: &str = tools::LIST_SESSIONS;
        self.log_invocation(OP, "", json!({}));
        let sessions = self.registry().list().await;
        let rows: Vec<_> = sessions
            .iter()
            .map(|s| {
                json!({
                    "session_id": &s.id,
                    "binary_path": &s.binary_path,
                    "worker_pid": s.worker_pid(),
                    "created_at": s.created_at,
                    "idle_secs": s.idle_for().as_secs(),
                })
            })
            .collect();
        self.ok_json(json!({"sessions": rows, "count": rows.len()}))
    }

    /// Read-only audit: reports the session without touching it, so
    /// inspection does not defer idle expiry.
    pub async fn session_stat(&self, args: SessionStatRequest) -> CallToolResult {
        const OP: &str = tools::SESSION_STAT;
        self.log_invocation(OP, &args.session_id, json!({}));
        let Some(session) = self.registry().get(&args.session_id).await else {
            return self.fail(ToolError::session_not_found(OP, &args.session_id));
        };
        let worker_running = self.workers().get_client(&session.id).await.is_ok();
        self.ok_json(json!({
            "session_id": &session.id,
            "binary_path": &session.binary_path,
            "socket_path": &session.socket_path,
            "worker_pid": session.worker_pid(),
            "worker_running": worker_running,
            "created_at": session.created_at,
            "idle_secs": session.idle_for().as_secs(),
        }))
    }
}
