//! Handlers for the four cached enumerations.
//!
//! Each one goes through the per-session cache: the full list is fetched
//! from the worker once (single-flighted across concurrent callers), then
//! filtered and paginated in-memory per request. A large binary easily
//! yields tens of thousands of entries, so re-fetching per request would
//! dominate latency.

use super::requests::*;
use super::tools;
use super::util::{compile_regex, module_matches, normalize_pagination, page_bounds};
use super::Gateway;
use crate::cache::{FetchError, Flight};
use crate::error::ToolError;
use rmcp::model::CallToolResult;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// Turn a worker list response into the cache fetch result, folding the
/// in-band error into the failure path.
fn fetch_result<T>(items: Vec<T>, error: String) -> Result<Vec<T>, FetchError> {
    if error.is_empty() {
        Ok(items)
    } else {
        Err(FetchError::new(error))
    }
}

impl Gateway {
    /// Shared tail of every enumeration handler: load via the cache, apply
    /// the filters, paginate, and marshal.
    #[allow(clippy::too_many_arguments)]
    async fn serve_enumeration<T, F, Fut>(
        &self,
        operation: &'static str,
        session_id: &str,
        flight: &Flight<T>,
        fetch: F,
        keep: impl Fn(&T) -> bool,
        offset: Option<usize>,
        limit: Option<usize>,
        payload_key: &str,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> CallToolResult
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<T>, FetchError>>,
    {
        let (items, hit) = match flight.load(fetch).await {
            Ok(loaded) => loaded,
            Err(e) => {
                return self.fail(ToolError::ida_operation_failed(operation, session_id, &e))
            }
        };
        if hit {
            debug!(%operation, %session_id, "Enumeration served from cache");
        } else {
            debug!(%operation, %session_id, "Enumeration served from worker");
        }

        let filtered: Vec<&T> = items.iter().filter(|item| keep(item)).collect();
        let total = filtered.len();
        let (offset, limit) = match normalize_pagination(offset, limit) {
            Ok(normalized) => normalized,
            Err(e) => return self.fail(ToolError::invalid_input(operation, e)),
        };
        let (offset, end) = page_bounds(total, offset, limit);
        let page = &filtered[offset..end];

        let mut body = serde_json::Map::new();
        body.insert(payload_key.to_string(), json!(page));
        body.insert("total".to_string(), json!(total));
        body.insert("offset".to_string(), json!(offset));
        body.insert("count".to_string(), json!(page.len()));
        body.insert("limit".to_string(), json!(limit));
        body.extend(extra);
        self.ok_json(serde_json::Value::Object(body))
    }

    pub async fn get_functions(&self, args: GetFunctionsRequest) -> CallToolResult {
        const OP: &str = tools::GET_FUNCTIONS;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"offset": args.offset, "limit": args.limit, "regex": &args.regex}),
        );
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };

        let regex = if args.regex.is_empty() {
            None
        } else {
            match compile_regex(&args.regex, args.case_sensitive) {
                Ok(regex) => Some(regex),
                Err(e) => return self.fail(ToolError::invalid_input(OP, e)),
            }
        };

        let cache = self.caches().for_session(&session.id);
        let analysis = worker.analysis.clone();
        let mut extra = serde_json::Map::new();
        extra.insert("regex".to_string(), json!(args.regex));
        self.serve_enumeration(
            OP,
            &session.id,
            &cache.functions,
            || async move {
                let resp = analysis
                    .list_functions()
                    .await
                    .map_err(|e| FetchError::new(e.to_string()))?;
                fetch_result(resp.functions, resp.error)
            },
            |f| regex.as_ref().is_none_or(|r| r.is_match(&f.name)),
            args.offset,
            args.limit,
            "functions",
            extra,
        )
        .await
    }

    pub async fn get_imports(&self, args: GetImportsRequest) -> CallToolResult {
        const OP: &str = tools::GET_IMPORTS;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({
                "offset": args.offset,
                "limit": args.limit,
                "module": &args.module,
                "regex": &args.regex,
            }),
        );
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };

        let regex = if args.regex.is_empty() {
            None
        } else {
            match compile_regex(&args.regex, args.case_sensitive) {
                Ok(regex) => Some(regex),
                Err(e) => return self.fail(ToolError::invalid_input(OP, e)),
            }
        };
        let module = args.module.clone();
        let case_sensitive = args.case_sensitive;

        let cache = self.caches().for_session(&session.id);
        let analysis = worker.analysis.clone();
        let mut extra = serde_json::Map::new();
        extra.insert("module".to_string(), json!(args.module));
        extra.insert("regex".to_string(), json!(args.regex));
        self.serve_enumeration(
            OP,
            &session.id,
            &cache.imports,
            || async move {
                let resp = analysis
                    .list_imports()
                    .await
                    .map_err(|e| FetchError::new(e.to_string()))?;
                fetch_result(resp.imports, resp.error)
            },
            |imp| {
                (module.is_empty() || module_matches(&imp.module, &module, case_sensitive))
                    && regex.as_ref().is_none_or(|r| r.is_match(&imp.name))
            },
            args.offset,
            args.limit,
            "imports",
            extra,
        )
        .await
    }

    pub async fn get_exports(&self, args: GetExportsRequest) -> CallToolResult {
        const OP: &str = tools::GET_EXPORTS;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"offset": args.offset, "limit": args.limit, "regex": &args.regex}),
        );
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };

        let regex = if args.regex.is_empty() {
            None
        } else {
            match compile_regex(&args.regex, args.case_sensitive) {
                Ok(regex) => Some(regex),
                Err(e) => return self.fail(ToolError::invalid_input(OP, e)),
            }
        };

        let cache = self.caches().for_session(&session.id);
        let analysis = worker.analysis.clone();
        let mut extra = serde_json::Map::new();
        extra.insert("regex".to_string(), json!(args.regex));
        self.serve_enumeration(
            OP,
            &session.id,
            &cache.exports,
            || async move {
                let resp = analysis
                    .list_exports()
                    .await
                    .map_err(|e| FetchError::new(e.to_string()))?;
                fetch_result(resp.exports, resp.error)
            },
            |exp| regex.as_ref().is_none_or(|r| r.is_match(&exp.name)),
            args.offset,
            args.limit,
            "exports",
            extra,
        )
        .await
    }

    pub async fn get_strings(&self, args: GetStringsRequest) -> CallToolResult {
        const OP: &str = tools::GET_STRINGS;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"offset": args.offset, "limit": args.limit, "regex": &args.regex}),
        );
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };

        let regex = if args.regex.is_empty() {
            None
        } else {
            match compile_regex(&args.regex, args.case_sensitive) {
                Ok(regex) => Some(regex),
                Err(e) => return self.fail(ToolError::invalid_input(OP, e)),
            }
        };

        let cache = self.caches().for_session(&session.id);
        let analysis = worker.analysis.clone();
        let mut extra = serde_json::Map::new();
        extra.insert("regex".to_string(), json!(args.regex));
        self.serve_enumeration(
            OP,
            &session.id,
            &cache.strings,
            || async move {
                let resp = analysis
                    .list_strings()
                    .await
                    .map_err(|e| FetchError::new(e.to_string()))?;
                fetch_result(resp.strings, resp.error)
            },
            |s| regex.as_ref().is_none_or(|r| r.is_match(&s.value)),
            args.offset,
            args.limit,
            "strings",
            extra,
        )
        .await
    }
}
