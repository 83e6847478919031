//! Shared test fixtures: a fake analysis worker serving the RPC protocol
//! over a Unix socket, and process helpers.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

/// In-process stand-in for an analysis worker. Binds the session's socket,
/// answers the JSON-line RPC protocol, and records every method invocation
/// so tests can assert on fetch counts.
pub struct FakeWorker {
    calls: Arc<Mutex<Vec<String>>>,
    accept_task: JoinHandle<()>,
}

impl FakeWorker {
    pub async fn serve(socket_path: &Path) -> std::io::Result<Self> {
        let listener = UnixListener::bind(socket_path)?;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let conn_calls = calls.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(handle_connection(stream, conn_calls.clone()));
            }
        });
        Ok(Self { calls, accept_task })
    }

    /// How many times `method` was invoked.
    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.as_str() == method)
            .count()
    }
}

impl Drop for FakeWorker {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn handle_connection(stream: UnixStream, calls: Arc<Mutex<Vec<String>>>) {
    let mut stream = BufReader::new(stream);
    let mut line = String::new();
    if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
        return;
    }
    let request: Value = match serde_json::from_str(line.trim_end()) {
        Ok(request) => request,
        Err(_) => return,
    };
    let method = request["method"].as_str().unwrap_or_default().to_string();
    calls.lock().unwrap().push(method.clone());

    let response = respond(&method, &request["params"]).await;
    let mut frame = response.to_string().into_bytes();
    frame.push(b'\n');
    let _ = stream.get_mut().write_all(&frame).await;
}

async fn respond(method: &str, params: &Value) -> Value {
    match method {
        // Enumerations are slowed down slightly so concurrent callers pile
        // onto the same in-flight fetch.
        "ListFunctions" => {
            tokio::time::sleep(Duration::from_millis(100)).await;
            json!({"functions": [
                {"address": 0x401000u64, "name": "main", "size": 64},
                {"address": 0x401100u64, "name": "init", "size": 32},
                {"address": 0x401200u64, "name": "main_loop", "size": 128},
            ]})
        }
        "ListImports" => {
            tokio::time::sleep(Duration::from_millis(100)).await;
            json!({"imports": [
                {"address": 0x404000u64, "name": "malloc", "module": "libc.so.6"},
                {"address": 0x404008u64, "name": "SendMessageW", "module": "USER32.dll"},
            ]})
        }
        "ListExports" => {
            tokio::time::sleep(Duration::from_millis(100)).await;
            json!({"exports": [
                {"address": 0x401000u64, "name": "main", "ordinal": 1},
            ]})
        }
        "ListStrings" => {
            tokio::time::sleep(Duration::from_millis(100)).await;
            json!({"strings": [
                {"address": 0x405000u64, "value": "/usr/share/locale"},
                {"address": 0x405020u64, "value": "invalid option"},
            ]})
        }
        "GetDisasm" => {
            if params["address"].as_u64() == Some(0xdead) {
                json!({"error": "addr out of range"})
            } else {
                json!({"disasm": "mov eax, 1"})
            }
        }
        "GetFunctionDisasm" => json!({"disassembly": ["push rbp", "mov rbp, rsp", "ret"]}),
        "GetDecompiled" => json!({"error": "decompiler unavailable"}),
        "GetSegments" => json!({"segments": [
            {"start": 0x400000u64, "end": 0x406000u64, "name": ".text",
             "class": "CODE", "permissions": "r-x", "bitness": 64},
        ]}),
        "GetName" => json!({"name": "main"}),
        "GetEntryPoint" => json!({"address": 0x401000u64}),
        "DataReadString" => json!({"value": "/usr/share/locale"}),
        "DataReadByte" => json!({"value": 0x55u64}),
        "MakeFunction" => json!({"success": true}),
        "SetComment" => json!({"success": true}),
        "DeleteName" => json!({"success": true}),
        "CloseSession" => json!({"closed": true}),
        "Ping" => json!({"ok": true}),
        _ => json!({"error": format!("unknown method {method}")}),
    }
}

/// Whether a process with this PID exists.
pub fn process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}
