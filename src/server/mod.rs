//! The MCP-facing tool dispatcher.
//!
//! Every tool handler follows the same shape: log the invocation, validate
//! inputs, resolve and touch the session, acquire the worker handle, consult
//! the cache or forward to the worker, translate failures into the flat
//! error taxonomy, and marshal a JSON payload.

mod enumerations;
mod read;
mod requests;
mod search;
mod sessions;
mod tools;
mod types;
mod util;
mod write;

pub use requests::*;
pub use util::{DEFAULT_LIMIT, LIMIT_CAP};

use crate::cache::CacheRegistry;
use crate::error::ToolError;
use crate::session::{Session, SessionRegistry};
use crate::worker::{RpcError, WorkerHandle, WorkerSupervisor};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// The gateway dispatcher: stateless glue between the MCP frontend, the
/// session registry, the worker supervisor, and the per-session caches.
#[derive(Clone)]
pub struct Gateway {
    registry: Arc<SessionRegistry>,
    workers: Arc<WorkerSupervisor>,
    caches: Arc<CacheRegistry>,
}

impl Gateway {
    pub fn new(
        registry: Arc<SessionRegistry>,
        workers: Arc<WorkerSupervisor>,
        caches: Arc<CacheRegistry>,
    ) -> Self {
        Self {
            registry,
            workers,
            caches,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn workers(&self) -> &Arc<WorkerSupervisor> {
        &self.workers
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }

    fn instructions(&self) -> String {
        "Reverse-engineering gateway backed by headless IDA analysis workers.\n\n\
         Workflow:\n\
         1. open_session: Open a binary; a dedicated worker process is spawned for it.\n\
         2. Enumerate with get_functions / get_imports / get_exports / get_strings \
         (cached per session, regex filter + offset/limit pagination).\n\
         3. Inspect with get_disasm, get_decompiled, get_xrefs_to/from, get_bytes, \
         get_segments, find_binary, find_text, and the type tools.\n\
         4. Annotate with set_comment, set_name, rename_lvar/global, set_*_type, \
         make_function.\n\
         5. close_session when done. Idle sessions expire automatically.\n\n\
         Errors carry JSON {kind, status, operation, message, context}; branch on \
         `kind` and retry only when `status` is \"temporary\"."
            .to_string()
    }

    fn log_invocation(&self, operation: &str, session_id: &str, details: Value) {
        info!(%operation, %session_id, %details, "Tool invocation");
    }

    /// Log the full error and convert it into an error tool result carrying
    /// the same payload.
    fn fail(&self, err: ToolError) -> CallToolResult {
        warn!(kind = %err.kind, operation = %err.operation, "{err}");
        err.to_tool_result()
    }

    fn ok_json(&self, value: Value) -> CallToolResult {
        let body =
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
        CallToolResult::success(vec![Content::text(body)])
    }

    fn ok_text(&self, text: impl Into<String>) -> CallToolResult {
        CallToolResult::success(vec![Content::text(text.into())])
    }

    /// Steps shared by every session-scoped handler: look up the session,
    /// touch it, and acquire the worker handle. A session restored from disk
    /// gets its worker spawned on demand here, exactly once; a worker that
    /// died after being started is not respawned.
    async fn resolve(
        &self,
        operation: &str,
        session_id: &str,
    ) -> Result<(Arc<Session>, Arc<WorkerHandle>), ToolError> {
        let session = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| ToolError::session_not_found(operation, session_id))?;
        session.touch();
        let worker = match self.workers.get_client(&session.id).await {
            Ok(worker) => worker,
            Err(_) if session.take_restore_pending() => {
                // Detached, like open_session: the worker outlives the
                // request that triggered the spawn.
                let workers = self.workers.clone();
                let spawn_session = session.clone();
                match tokio::spawn(async move { workers.start(&spawn_session).await }).await {
                    Ok(Ok(worker)) => worker,
                    Ok(Err(e)) => {
                        return Err(ToolError::worker_unavailable(operation, &session.id, &e))
                    }
                    Err(e) => return Err(ToolError::internal(operation, &e)),
                }
            }
            Err(e) => {
                return Err(ToolError::worker_unavailable(operation, &session.id, &e));
            }
        };
        Ok((session, worker))
    }

    /// Translate a transport-layer RPC failure.
    fn rpc_failed(&self, operation: &str, session_id: &str, err: RpcError) -> ToolError {
        ToolError::ida_operation_failed(operation, session_id, &err)
    }

    /// Translate an in-band `error` field on a structurally successful
    /// response. Treated identically to a transport failure.
    fn inband(&self, operation: &str, session_id: &str, error: &str) -> Result<(), ToolError> {
        if error.is_empty() {
            Ok(())
        } else {
            Err(ToolError::ida_operation_failed(
                operation, session_id, &error,
            ))
        }
    }
}

fn parse_args<T: DeserializeOwned>(
    operation: &str,
    arguments: Option<Map<String, Value>>,
) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| ToolError::invalid_input(operation, e.to_string()))
}

impl ServerHandler for Gateway {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(self.instructions()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: tools::all(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let name = params.name.as_ref();
        let arguments = params.arguments;

        macro_rules! handle {
            ($method:ident) => {
                match parse_args(name, arguments) {
                    Ok(req) => self.$method(req).await,
                    Err(e) => self.fail(e),
                }
            };
        }

        let result = match name {
            tools::OPEN_SESSION => handle!(open_session),
            tools::CLOSE_SESSION => handle!(close_session),
            tools::LIST_SESSIONS => self.list_sessions().await,
            tools::SESSION_STAT => handle!(session_stat),
            tools::GET_FUNCTIONS => handle!(get_functions),
            tools::GET_IMPORTS => handle!(get_imports),
            tools::GET_EXPORTS => handle!(get_exports),
            tools::GET_STRINGS => handle!(get_strings),
            tools::GET_XREFS_TO => handle!(get_xrefs_to),
            tools::GET_XREFS_FROM => handle!(get_xrefs_from),
            tools::GET_DATA_REFS => handle!(get_data_refs),
            tools::GET_STRING_XREFS => handle!(get_string_xrefs),
            tools::GET_DISASM => handle!(get_disasm),
            tools::GET_FUNCTION_DISASM => handle!(get_function_disasm),
            tools::GET_DECOMPILED => handle!(get_decompiled),
            tools::GET_BYTES => handle!(get_bytes),
            tools::GET_SEGMENTS => handle!(get_segments),
            tools::GET_NAME => handle!(get_name),
            tools::GET_FUNCTION_INFO => handle!(get_function_info),
            tools::GET_FUNCTION_NAME => handle!(get_function_name),
            tools::GET_ENTRY_POINT => handle!(get_entry_point),
            tools::GET_DWORD_AT => handle!(get_dword_at),
            tools::GET_QWORD_AT => handle!(get_qword_at),
            tools::GET_INSTRUCTION_LENGTH => handle!(get_instruction_length),
            tools::FIND_BINARY => handle!(find_binary),
            tools::FIND_TEXT => handle!(find_text),
            tools::DATA_READ_STRING => handle!(data_read_string),
            tools::DATA_READ_BYTE => handle!(data_read_byte),
            tools::LIST_STRUCTS => handle!(list_structs),
            tools::GET_STRUCT => handle!(get_struct),
            tools::LIST_ENUMS => handle!(list_enums),
            tools::GET_ENUM => handle!(get_enum),
            tools::GET_GLOBALS => handle!(get_globals),
            tools::GET_TYPE_AT => handle!(get_type_at),
            tools::SET_COMMENT => handle!(set_comment),
            tools::GET_COMMENT => handle!(get_comment),
            tools::SET_FUNC_COMMENT => handle!(set_func_comment),
            tools::GET_FUNC_COMMENT => handle!(get_func_comment),
            tools::SET_DECOMPILER_COMMENT => handle!(set_decompiler_comment),
            tools::SET_NAME => handle!(set_name),
            tools::DELETE_NAME => handle!(delete_name),
            tools::RENAME_LVAR => handle!(rename_lvar),
            tools::RENAME_GLOBAL => handle!(rename_global),
            tools::SET_FUNCTION_TYPE => handle!(set_function_type),
            tools::SET_LVAR_TYPE => handle!(set_lvar_type),
            tools::SET_GLOBAL_TYPE => handle!(set_global_type),
            tools::MAKE_FUNCTION => handle!(make_function),
            _ => {
                return Err(McpError::invalid_params(
                    format!("Unknown tool: {name}"),
                    None,
                ))
            }
        };
        Ok(result)
    }
}
