//! End-to-end dispatcher tests against a fake worker.
//!
//! The subprocess is `sh -c 'exec sleep 30'` (a real PID to supervise); the
//! RPC protocol is served by an in-process fake worker bound at the
//! session's socket path.

#![cfg(unix)]

mod common;

use common::{process_alive, FakeWorker};
use ida_gateway::cache::CacheRegistry;
use ida_gateway::config::{SupervisorConfig, WorkerStdio};
use ida_gateway::server::{
    CloseSessionRequest, DataReadStringRequest, DeleteNameRequest, GetDisasmRequest,
    GetEntryPointRequest, GetFunctionsRequest, GetNameRequest, GetStringsRequest,
    MakeFunctionRequest,
};
use ida_gateway::{Gateway, SessionRegistry, WorkerSupervisor};
use rmcp::model::CallToolResult;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    gateway: Gateway,
    registry: Arc<SessionRegistry>,
    workers: Arc<WorkerSupervisor>,
    _dir: TempDir,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let mut config = SupervisorConfig::new("/bin/sh", dir.path());
    config.worker_args = vec!["-c".into(), "exec sleep 30".into(), "ida-worker".into()];
    config.ready_timeout = Duration::from_secs(2);
    config.stop_timeout = Duration::from_millis(200);
    config.stdio = WorkerStdio::Discard;

    let registry = Arc::new(SessionRegistry::new(
        dir.path().join("sessions.jsonl"),
        dir.path(),
    ));
    let workers = Arc::new(WorkerSupervisor::new(config));
    let caches = Arc::new(CacheRegistry::new());
    let gateway = Gateway::new(registry.clone(), workers.clone(), caches);
    Harness {
        gateway,
        registry,
        workers,
        _dir: dir,
    }
}

/// Open a session with a live fake worker behind it.
async fn open_ready_session(h: &Harness) -> (String, FakeWorker, u32) {
    let session = h.registry.create(Path::new("/bin/ls")).await.unwrap();
    let start = {
        let workers = h.workers.clone();
        let session = session.clone();
        tokio::spawn(async move { workers.start(&session).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    let worker = FakeWorker::serve(&session.socket_path).await.unwrap();
    let handle = start.await.unwrap().unwrap();
    (session.id.clone(), worker, handle.pid)
}

/// Parse the JSON payload out of a tool result's first text content.
fn payload(result: &CallToolResult) -> Value {
    let value = serde_json::to_value(result).unwrap();
    let text = value["content"][0]["text"]
        .as_str()
        .expect("text content")
        .to_string();
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn is_error(result: &CallToolResult) -> bool {
    result.is_error.unwrap_or(false)
}

#[tokio::test]
async fn open_enumerate_filter_paginates() {
    let h = harness();
    let (session_id, worker, _) = open_ready_session(&h).await;

    let result = h
        .gateway
        .get_functions(GetFunctionsRequest {
            session_id: session_id.clone(),
            offset: Some(0),
            limit: Some(10),
            regex: "^main$".into(),
            case_sensitive: false,
        })
        .await;
    assert!(!is_error(&result));
    let body = payload(&result);
    assert_eq!(body["total"], 1);
    assert_eq!(body["count"], 1);
    assert_eq!(body["functions"][0]["name"], "main");
    assert_eq!(worker.count("ListFunctions"), 1);
}

#[tokio::test]
async fn concurrent_get_strings_single_flights_the_fetch() {
    let h = harness();
    let (session_id, worker, _) = open_ready_session(&h).await;

    let first = {
        let gateway = h.gateway.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move {
            gateway
                .get_strings(GetStringsRequest {
                    session_id,
                    offset: None,
                    limit: None,
                    regex: String::new(),
                    case_sensitive: false,
                })
                .await
        })
    };
    let second = {
        let gateway = h.gateway.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move {
            gateway
                .get_strings(GetStringsRequest {
                    session_id,
                    offset: None,
                    limit: None,
                    regex: String::new(),
                    case_sensitive: false,
                })
                .await
        })
    };

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert!(!is_error(&first));
    assert!(!is_error(&second));
    assert_eq!(payload(&first), payload(&second));
    assert_eq!(
        worker.count("ListStrings"),
        1,
        "concurrent misses must collapse into one fetch"
    );
}

#[tokio::test]
async fn mutation_invalidates_cached_enumerations() {
    let h = harness();
    let (session_id, worker, _) = open_ready_session(&h).await;

    let list = |sid: String| GetFunctionsRequest {
        session_id: sid,
        offset: None,
        limit: None,
        regex: String::new(),
        case_sensitive: false,
    };

    let result = h.gateway.get_functions(list(session_id.clone())).await;
    assert!(!is_error(&result));
    // Cached: no second fetch.
    let result = h.gateway.get_functions(list(session_id.clone())).await;
    assert!(!is_error(&result));
    assert_eq!(worker.count("ListFunctions"), 1);

    let result = h
        .gateway
        .make_function(MakeFunctionRequest {
            session_id: session_id.clone(),
            address: 0x401000,
        })
        .await;
    assert!(!is_error(&result));
    assert_eq!(payload(&result)["success"], true);

    let result = h.gateway.get_functions(list(session_id.clone())).await;
    assert!(!is_error(&result));
    assert_eq!(
        worker.count("ListFunctions"),
        2,
        "a successful mutation must force a fresh fetch"
    );
}

#[tokio::test]
async fn delete_name_invalidates_cached_enumerations() {
    let h = harness();
    let (session_id, worker, _) = open_ready_session(&h).await;

    let list = |sid: String| GetFunctionsRequest {
        session_id: sid,
        offset: None,
        limit: None,
        regex: String::new(),
        case_sensitive: false,
    };

    let result = h.gateway.get_functions(list(session_id.clone())).await;
    assert!(!is_error(&result));
    assert_eq!(worker.count("ListFunctions"), 1);

    let result = h
        .gateway
        .delete_name(DeleteNameRequest {
            session_id: session_id.clone(),
            address: 0x401000,
        })
        .await;
    assert!(!is_error(&result));
    assert_eq!(payload(&result)["success"], true);

    let result = h.gateway.get_functions(list(session_id.clone())).await;
    assert!(!is_error(&result));
    assert_eq!(
        worker.count("ListFunctions"),
        2,
        "a successful rename mutation must force a fresh fetch"
    );
}

#[tokio::test]
async fn single_value_reads_forward_to_worker() {
    let h = harness();
    let (session_id, worker, _) = open_ready_session(&h).await;

    let result = h
        .gateway
        .get_name(GetNameRequest {
            session_id: session_id.clone(),
            address: 0x401000,
        })
        .await;
    assert!(!is_error(&result));
    assert_eq!(payload(&result)["name"], "main");

    let result = h
        .gateway
        .get_entry_point(GetEntryPointRequest {
            session_id: session_id.clone(),
        })
        .await;
    assert!(!is_error(&result));
    assert_eq!(payload(&result)["address"], 0x401000);

    let result = h
        .gateway
        .data_read_string(DataReadStringRequest {
            session_id: session_id.clone(),
            address: 0x405000,
            max_length: None,
        })
        .await;
    assert!(!is_error(&result));
    assert_eq!(payload(&result)["value"], "/usr/share/locale");

    assert_eq!(worker.count("GetName"), 1);
    assert_eq!(worker.count("GetEntryPoint"), 1);
    assert_eq!(worker.count("DataReadString"), 1);
}

#[tokio::test]
async fn in_band_worker_error_maps_to_ida_operation_failed() {
    let h = harness();
    let (session_id, _worker, _) = open_ready_session(&h).await;

    let result = h
        .gateway
        .get_disasm(GetDisasmRequest {
            session_id,
            address: 0xdead,
        })
        .await;
    assert!(is_error(&result));
    let body = payload(&result);
    assert_eq!(body["kind"], "ida_operation_failed");
    assert_eq!(body["status"], "permanent");
    assert_eq!(body["operation"], "get_disasm");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("addr out of range"));
}

#[tokio::test]
async fn open_session_rejects_missing_binary() {
    let h = harness();
    let result = h
        .gateway
        .open_session(ida_gateway::server::OpenSessionRequest {
            path: "/no/such/binary".into(),
        })
        .await;
    assert!(is_error(&result));
    assert_eq!(payload(&result)["kind"], "invalid_input");
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn open_session_cleans_up_when_worker_never_becomes_ready() {
    let h = harness();
    // No fake worker binds the socket, so the readiness probe must fail and
    // the freshly created session must be rolled back.
    let result = h
        .gateway
        .open_session(ida_gateway::server::OpenSessionRequest {
            path: "/bin/ls".into(),
        })
        .await;
    assert!(is_error(&result));
    let body = payload(&result);
    assert_eq!(body["kind"], "worker_unavailable");
    assert_eq!(body["status"], "temporary");
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn unknown_session_maps_to_session_not_found() {
    let h = harness();
    let result = h
        .gateway
        .get_disasm(GetDisasmRequest {
            session_id: "missing".into(),
            address: 0x401000,
        })
        .await;
    assert!(is_error(&result));
    let body = payload(&result);
    assert_eq!(body["kind"], "session_not_found");
    assert_eq!(body["status"], "permanent");
}

#[tokio::test]
async fn session_without_worker_maps_to_worker_unavailable() {
    let h = harness();
    let session = h.registry.create(Path::new("/bin/ls")).await.unwrap();

    let result = h
        .gateway
        .get_disasm(GetDisasmRequest {
            session_id: session.id.clone(),
            address: 0x401000,
        })
        .await;
    assert!(is_error(&result));
    let body = payload(&result);
    assert_eq!(body["kind"], "worker_unavailable");
    assert_eq!(body["status"], "temporary");
}

#[tokio::test]
async fn limit_zero_is_invalid_input() {
    let h = harness();
    let (session_id, _worker, _) = open_ready_session(&h).await;

    let result = h
        .gateway
        .get_functions(GetFunctionsRequest {
            session_id,
            offset: None,
            limit: Some(0),
            regex: String::new(),
            case_sensitive: false,
        })
        .await;
    assert!(is_error(&result));
    assert_eq!(payload(&result)["kind"], "invalid_input");
}

#[tokio::test]
async fn offset_beyond_total_returns_empty_page_at_total() {
    let h = harness();
    let (session_id, _worker, _) = open_ready_session(&h).await;

    let result = h
        .gateway
        .get_functions(GetFunctionsRequest {
            session_id,
            offset: Some(100),
            limit: Some(10),
            regex: String::new(),
            case_sensitive: false,
        })
        .await;
    assert!(!is_error(&result));
    let body = payload(&result);
    assert_eq!(body["count"], 0);
    assert_eq!(body["offset"], body["total"]);
}

#[tokio::test]
async fn decompiler_marker_maps_to_decompiler_unavailable() {
    let h = harness();
    let (session_id, _worker, _) = open_ready_session(&h).await;

    let result = h
        .gateway
        .get_decompiled(ida_gateway::server::GetDecompiledRequest {
            session_id,
            address: 0x401000,
        })
        .await;
    assert!(is_error(&result));
    let body = payload(&result);
    assert_eq!(body["kind"], "decompiler_unavailable");
}

#[tokio::test]
async fn close_session_stops_worker_and_removes_record() {
    let h = harness();
    let (session_id, _worker, pid) = open_ready_session(&h).await;
    assert!(process_alive(pid));

    let result = h
        .gateway
        .close_session(CloseSessionRequest {
            session_id: session_id.clone(),
        })
        .await;
    assert!(!is_error(&result));
    assert_eq!(payload(&result)["closed"], true);

    assert!(!process_alive(pid), "worker must be reaped");
    assert!(h.registry.get(&session_id).await.is_none());
}

#[tokio::test]
async fn restored_session_spawns_worker_on_demand() {
    let dir = TempDir::new().unwrap();
    let state_path = dir.path().join("sessions.jsonl");

    // A previous gateway run persisted one session, then died.
    let session_id = {
        let registry = SessionRegistry::new(&state_path, dir.path());
        let session = registry.create(Path::new("/bin/ls")).await.unwrap();
        session.id.clone()
    };

    let mut config = SupervisorConfig::new("/bin/sh", dir.path());
    config.worker_args = vec!["-c".into(), "exec sleep 30".into(), "ida-worker".into()];
    config.ready_timeout = Duration::from_secs(2);
    config.stop_timeout = Duration::from_millis(200);
    config.stdio = WorkerStdio::Discard;

    let registry = Arc::new(SessionRegistry::new(&state_path, dir.path()));
    let workers = Arc::new(WorkerSupervisor::new(config));
    workers.cleanup_orphan_sockets();
    let restored = registry.restore_from_disk().await;
    assert_eq!(restored.len(), 1);
    let socket_path = restored[0].socket_path.clone();

    let gateway = Gateway::new(registry.clone(), workers.clone(), Arc::new(CacheRegistry::new()));

    // The first tool call triggers the lazy spawn; satisfy its readiness
    // probe once the subprocess is up.
    let call = {
        let gateway = gateway.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move {
            gateway
                .get_functions(GetFunctionsRequest {
                    session_id,
                    offset: None,
                    limit: None,
                    regex: String::new(),
                    case_sensitive: false,
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    let _worker = FakeWorker::serve(&socket_path).await.unwrap();

    let result = call.await.unwrap();
    assert!(!is_error(&result), "restored session must serve tool calls");
    assert_eq!(payload(&result)["total"], 3);
    assert!(workers.get_client(&session_id).await.is_ok());

    workers.shutdown_all().await;
}
