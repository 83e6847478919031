//! Type-inspection handlers: structs, enums, globals, type-at-address.

use super::requests::*;
use super::tools;
use super::Gateway;
use crate::error::ToolError;
use crate::worker::rpc::NameFilterParams;
use rmcp::model::CallToolResult;
use serde_json::json;

impl Gateway {
    pub async fn list_structs(&self, args: ListStructsRequest) -> CallToolResult {
        const OP: &str = tools::LIST_STRUCTS;
        self.log_invocation(OP, &args.session_id, json!({"regex": &args.regex}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .list_structs(NameFilterParams {
                regex: args.regex,
                case_sensitive: args.case_sensitive,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"structs": &resp.structs, "count": resp.structs.len()}))
    }

    pub async fn get_struct(&self, args: GetStructRequest) -> CallToolResult {
        const OP: &str = tools::GET_STRUCT;
        self.log_invocation(OP, &args.session_id, json!({"name": &args.name}));
        if args.name.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "name is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_struct(&args.name).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({
            "name": resp.name,
            "id": resp.id,
            "size": resp.size,
            "members": resp.members,
        }))
    }

    pub async fn list_enums(&self, args: ListEnumsRequest) -> CallToolResult {
        const OP: &str = tools::LIST_ENUMS;
        self.log_invocation(OP, &args.session_id, json!({"regex": &args.regex}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .list_enums(NameFilterParams {
                regex: args.regex,
                case_sensitive: args.case_sensitive,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"enums": &resp.enums, "count": resp.enums.len()}))
    }

    pub async fn get_enum(&self, args: GetEnumRequest) -> CallToolResult {
        const OP: &str = tools::GET_ENUM;
        self.log_invocation(OP, &args.session_id, json!({"name": &args.name}));
        if args.name.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "name is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_enum(&args.name).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({
            "name": resp.name,
            "id": resp.id,
            "members": resp.members,
        }))
    }

    pub async fn get_globals(&self, args: GetGlobalsRequest) -> CallToolResult {
        const OP: &str = tools::GET_GLOBALS;
        self.log_invocation(OP, &args.session_id, json!({"regex": &args.regex}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .get_globals(NameFilterParams {
                regex: args.regex,
                case_sensitive: args.case_sensitive,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"globals": &resp.globals, "count": resp.globals.len()}))
    }

    pub async fn get_type_at(&self, args: GetTypeAtRequest) -> CallToolResult {
        const OP: &str = tools::GET_TYPE_AT;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.get_type_at(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({
            "address": resp.address,
            "type": resp.ty,
            "size": resp.size,
            "is_ptr": resp.is_ptr,
            "is_func": resp.is_func,
            "is_array": resp.is_array,
            "is_struct": resp.is_struct,
            "is_union": resp.is_union,
            "is_enum": resp.is_enum,
            "has_type": resp.has_type,
        }))
    }
}
