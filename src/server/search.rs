//! Search handlers: byte patterns and text.

use super::requests::*;
use super::tools;
use super::Gateway;
use crate::error::ToolError;
use crate::worker::rpc::{DataReadStringParams, FindBinaryParams, FindTextParams};
use rmcp::model::CallToolResult;
use serde_json::json;

/// Default cap on `data_read_string` when the caller omits `max_length`.
const DEFAULT_READ_STRING_MAX: u32 = 256;

impl Gateway {
    pub async fn find_binary(&self, args: FindBinaryRequest) -> CallToolResult {
        const OP: &str = tools::FIND_BINARY;
        self.log_invocation(OP, &args.session_id, json!({"pattern": &args.pattern}));
        if args.pattern.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "pattern is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .find_binary(FindBinaryParams {
                start: args.start,
                end: args.end,
                pattern: args.pattern,
                search_up: args.search_up,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"addresses": &resp.addresses, "count": resp.addresses.len()}))
    }

    pub async fn find_text(&self, args: FindTextRequest) -> CallToolResult {
        const OP: &str = tools::FIND_TEXT;
        self.log_invocation(OP, &args.session_id, json!({"needle": &args.needle}));
        if args.needle.trim().is_empty() {
            return self.fail(ToolError::invalid_input(OP, "needle is required"));
        }
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker
            .analysis
            .find_text(FindTextParams {
                start: args.start,
                end: args.end,
                needle: args.needle,
                case_sensitive: args.case_sensitive,
                unicode: args.unicode,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"addresses": &resp.addresses, "count": resp.addresses.len()}))
    }

    pub async fn data_read_string(&self, args: DataReadStringRequest) -> CallToolResult {
        const OP: &str = tools::DATA_READ_STRING;
        self.log_invocation(
            OP,
            &args.session_id,
            json!({"address": args.address, "max_length": args.max_length}),
        );
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let max_length = match args.max_length {
            Some(0) | None => DEFAULT_READ_STRING_MAX,
            Some(max) => max,
        };
        let resp = match worker
            .analysis
            .data_read_string(DataReadStringParams {
                address: args.address,
                max_length,
            })
            .await
        {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"value": resp.value}))
    }

    pub async fn data_read_byte(&self, args: DataReadByteRequest) -> CallToolResult {
        const OP: &str = tools::DATA_READ_BYTE;
        self.log_invocation(OP, &args.session_id, json!({"address": args.address}));
        let (session, worker) = match self.resolve(OP, &args.session_id).await {
            Ok(resolved) => resolved,
            Err(e) => return self.fail(e),
        };
        let resp = match worker.analysis.data_read_byte(args.address).await {
            Ok(resp) => resp,
            Err(e) => return self.fail(self.rpc_failed(OP, &session.id, e)),
        };
        if let Err(e) = self.inband(OP, &session.id, &resp.error) {
            return self.fail(e);
        }
        self.ok_json(json!({"value": resp.value}))
    }
}
