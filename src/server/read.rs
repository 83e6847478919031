//! Read-path handlers forwarded directly to the worker (uncached).

use super::requests::*;
use super::tools;
use super::Gateway;
use crate::error::ToolError;
use crate::worker::rpc::{GetBytesParams, DECOMPILER_UNAVAILABLE_MARKER};
use rmcp::model::CallToolResult;
use serde_json::json;

impl Gateway {
    pub async fn get_xrefs_to(&self, args: XrefRequest) -> CallToolResult {
        const OP: &str = tools::GET_XREFS_TO;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_xrefs_to(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"xrefs": &resp.xrefs, "count": resp.xrefs.len()}))
    }

    pub async fn get_xrefs_from(&self, args: XrefRequest) -> CallToolResult {
        const OP: &str = tools::GET_XREFS_FROM;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_xrefs_from(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"xrefs": &resp.xrefs, "count": resp.xrefs.len()}))
    }

    pub async fn get_data_refs(&self, args: DataRefRequest) -> CallToolResult {
        const OP: &str = tools::GET_DATA_REFS;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_data_refs(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"refs": &resp.refs, "count": resp.refs.len()}))
    }

    pub async fn get_string_xrefs(&self, args: StringXrefRequest) -> CallToolResult {
        const OP: &str = tools::GET_STRING_XREFS;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_string_xrefs(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"refs": &resp.refs, "count": resp.refs.len()}))
    }

    pub async fn get_disasm(&self, args: GetDisasmRequest) -> CallToolResult {
        const OP: &str = tools::GET_DISASM;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_disasm(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_text(resp.disasm)
    }

    pub async fn get_function_disasm(&self, args: GetFunctionDisasmRequest) -> CallToolResult {
        const OP: &str = tools::GET_FUNCTION_DISASM;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_function_disasm(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"disassembly": resp.disassembly}))
    }

    pub async fn get_decompiled(&self, args: GetDecompiledRequest) -> CallToolResult {
        const OP: &str = tools::GET_DECOMPILED;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_decompiled(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if resp.error.starts_with(DECOMPILER_UNAVAILABLE_MARKER) {
            return self.fail(ToolError::decompiler_unavailable(OP, &session.id));
        }
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_text(resp.code)
    }

    pub async fn get_bytes(&self, args: GetBytesRequest) -> CallToolResult {
        const OP: &str = tools::GET_BYTES;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"address": args.address, "size": args.size}),
        );
        if args.size == 0 {
            return self.fail(ToolError::invalid_input(OP, "size must be greater than zero"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .get_bytes(GetBytesParams {
                address: args.address,
                size: args.size,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"data": resp.data}))
    }

    pub async fn get_segments(&self, args: GetSegmentsRequest) -> CallToolResult {
        const OP: &str = tools::GET_SEGMENTS;
        self.log_invocation(OP, &args.session_id, json!({}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_segments().await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"segments": &resp.segments, "count": resp.segments.len()}))
    }

    pub async fn get_name(&self, args: GetNameRequest) -> CallToolResult {
        const OP: &str = tools::GET_NAME;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_name(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"name": resp.name}))
    }

    pub async fn get_function_info(&self, args: GetFunctionInfoRequest) -> CallToolResult {
        const OP: &str = tools::GET_FUNCTION_INFO;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_function_info(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({
            "address": resp.address,
            "name": resp.name,
            "start": resp.start,
            "end": resp.end,
            "size": resp.size,
            "frame_size": resp.frame_size,
            "flags": {
                "is_library": resp.flags.is_library,
                "is_thunk": resp.flags.is_thunk,
                "no_return": resp.flags.no_return,
                "has_farseg": resp.flags.has_farseg,
                "is_static": resp.flags.is_static,
            },
            "calling_convention": resp.calling_convention,
            "return_type": resp.return_type,
            "num_args": resp.num_args,
        }))
    }

    pub async fn get_function_name(&self, args: GetFunctionNameRequest) -> CallToolResult {
        const OP: &str = tools::GET_FUNCTION_NAME;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_function_name(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"name": resp.name}))
    }

    pub async fn get_entry_point(&self, args: GetEntryPointRequest) -> CallToolResult {
        const OP: &str = tools::GET_ENTRY_POINT;
        self.log_invocation(OP, &args.session_id, json!({}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_entry_point().await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"address": resp.address}))
    }

    pub async fn get_dword_at(&self, args: GetDwordAtRequest) -> CallToolResult {
        const OP: &str = tools::GET_DWORD_AT;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_dword_at(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"value": resp.value}))
    }

    pub async fn get_qword_at(&self, args: GetQwordAtRequest) -> CallToolResult {
        const OP: &str = tools::GET_QWORD_AT;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_qword_at(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"value": resp.value}))
    }

    pub async fn get_instruction_length(&self, args: GetInstructionLengthRequest) -> CallToolResult {
        const OP: &str = tools::GET_INSTRUCTION_LENGTH;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_instruction_length(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"length": resp.length}))
    }
}
