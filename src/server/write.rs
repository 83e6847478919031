//! Mutation handlers: comments, renames, type application, make_function.
//!
//! Any successful mutation that could change an enumeration (creating or
//! deleting a function, renaming, retyping) drops the session's cached
//! enumerations before the response is marshalled, so the next read from
//! the same client observes fresh data. Comments do not invalidate: no
//! enumeration carries them.

use super::requests::*;
use super::tools;
use super::Gateway;
use crate::error::ToolError;
use crate::worker::rpc::{
    GetCommentParams, RenameGlobalParams, RenameLvarParams, SetCommentParams,
    SetDecompilerCommentParams, SetFuncCommentParams, SetFunctionTypeParams,
    SetGlobalTypeParams, SetLvarTypeParams, SetNameParams,
};
use rmcp::model::CallToolResult;
use serde_json::json;

impl Gateway {
    pub async fn set_comment(&self, args: SetCommentRequest) -> CallToolResult {
        const OP: &str = tools::SET_COMMENT;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"address": args.address, "repeatable": args.repeatable}),
        );
        if args.address == 0 {
            return self.fail(ToolError::invalid_input(OP, "address is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .set_comment(SetCommentParams {
                address: args.address,
                comment: args.comment,
                repeatable: args.repeatable,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn get_comment(&self, args: GetCommentRequest) -> CallToolResult {
        const OP: &str = tools::GET_COMMENT;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"address": args.address, "repeatable": args.repeatable}),
        );
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .get_comment(GetCommentParams {
                address: args.address,
                repeatable: args.repeatable,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_text(resp.comment)
    }

    pub async fn set_func_comment(&self, args: SetFuncCommentRequest) -> CallToolResult {
        const OP: &str = tools::SET_FUNC_COMMENT;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        if args.address == 0 {
            return self.fail(ToolError::invalid_input(OP, "address is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .set_func_comment(SetFuncCommentParams {
                address: args.address,
                comment: args.comment,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn get_func_comment(&self, args: GetFuncCommentRequest) -> CallToolResult {
        const OP: &str = tools::GET_FUNC_COMMENT;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_func_comment(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_text(resp.comment)
    }

    pub async fn set_decompiler_comment(&self, args: SetDecompilerCommentRequest) -> CallToolResult {
        const OP: &str = tools::SET_DECOMPILER_COMMENT;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"function_address": args.function_address, "address": args.address}),
        );
        if args.comment.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "comment is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .set_decompiler_comment(SetDecompilerCommentParams {
                function_address: args.function_address,
                address: args.address,
                comment: args.comment,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn set_name(&self, args: SetNameRequest) -> CallToolResult {
        const OP: &str = tools::SET_NAME;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"address": args.address, "name": &args.name}),
        );
        if args.address == 0 {
            return self.fail(ToolError::invalid_input(OP, "address is required"));
        }
        if args.name.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "name is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .set_name(SetNameParams {
                address: args.address,
                name: args.name,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        if resp.success {
            self.caches().invalidate(&session.id);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn delete_name(&self, args: DeleteNameRequest) -> CallToolResult {
        const OP: &str = tools::DELETE_NAME;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        if args.address == 0 {
            return self.fail(ToolError::invalid_input(OP, "address is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.delete_name(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        if resp.success {
            self.caches().invalidate(&session.id);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn rename_lvar(&self, args: RenameLvarRequest) -> CallToolResult {
        const OP: &str = tools::RENAME_LVAR;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"function_address": args.function_address, "lvar": &args.lvar_name}),
        );
        if args.function_address == 0 {
            return self.fail(ToolError::invalid_input(OP, "function_address is required"));
        }
        if args.new_name.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "new_name is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .rename_lvar(RenameLvarParams {
                function_address: args.function_address,
                lvar_name: args.lvar_name,
                new_name: args.new_name,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        if resp.success {
            self.caches().invalidate(&session.id);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn rename_global(&self, args: RenameGlobalRequest) -> CallToolResult {
        const OP: &str = tools::RENAME_GLOBAL;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        if args.new_name.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "new_name is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .rename_global(RenameGlobalParams {
                address: args.address,
                new_name: args.new_name,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        if resp.success {
            self.caches().invalidate(&session.id);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn set_function_type(&self, args: SetFunctionTypeRequest) -> CallToolResult {
        const OP: &str = tools::SET_FUNCTION_TYPE;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        if args.prototype.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "prototype is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .set_function_type(SetFunctionTypeParams {
                address: args.address,
                prototype: args.prototype,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        if resp.success {
            self.caches().invalidate(&session.id);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn set_lvar_type(&self, args: SetLvarTypeRequest) -> CallToolResult {
        const OP: &str = tools::SET_LVAR_TYPE;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"function_address": args.function_address, "lvar": &args.lvar_name}),
        );
        if args.function_address == 0 {
            return self.fail(ToolError::invalid_input(OP, "function_address is required"));
        }
        if args.lvar_type.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "lvar_type is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .set_lvar_type(SetLvarTypeParams {
                function_address: args.function_address,
                lvar_name: args.lvar_name,
                lvar_type: args.lvar_type,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        if resp.success {
            self.caches().invalidate(&session.id);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn set_global_type(&self, args: SetGlobalTypeRequest) -> CallToolResult {
        const OP: &str = tools::SET_GLOBAL_TYPE;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        if args.ty.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "type is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .set_global_type(SetGlobalTypeParams {
                address: args.address,
                ty: args.ty,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        if resp.success {
            self.caches().invalidate(&session.id);
        }
        self.ok_json(json!({"success": resp.success}))
    }

    pub async fn make_function(&self, args: MakeFunctionRequest) -> CallToolResult {
        const OP: &str = tools::MAKE_FUNCTION;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        if args.address == 0 {
            return self.fail(ToolError::invalid_input(OP, "address is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.make_function(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }

        if resp.success {
            self.caches().invalidate(&session.id);
        }
        self.ok_json(json!({"success": resp.success}))
    }
}
