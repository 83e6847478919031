//! Typed RPC client stubs dialed over a worker's Unix-domain socket.
//!
//! Each call opens a fresh connection to the session's socket, writes one
//! JSON request frame, and reads one JSON response frame. Dropping the call
//! future tears the connection down, so inbound request cancellation
//! propagates into the forwarded RPC.

use super::rpc::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Error type for worker RPC calls.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("worker connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker sent an invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("worker closed the connection")]
    ConnectionClosed,
}

/// One-connection-per-call transport bound to a session's socket path.
#[derive(Debug)]
pub struct UnixRpcTransport {
    socket_path: PathBuf,
}

impl UnixRpcTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    async fn call<P, R>(&self, service: &str, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let mut stream = BufReader::new(stream);

        let mut frame = serde_json::to_vec(&RpcEnvelope {
            service: service.to_string(),
            method: method.to_string(),
            params,
        })?;
        frame.push(b'\n');
        stream.get_mut().write_all(&frame).await?;
        stream.get_mut().flush().await?;

        let mut line = String::new();
        let n = stream.read_line(&mut line).await?;
        if n == 0 {
            return Err(RpcError::ConnectionClosed);
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

/// Session-control service: graceful close of the worker's database.
#[derive(Clone)]
pub struct SessionControlClient {
    transport: Arc<UnixRpcTransport>,
}

impl SessionControlClient {
    pub fn new(transport: Arc<UnixRpcTransport>) -> Self {
        Self { transport }
    }

    pub async fn close_session(&self, save: bool) -> Result<CloseSessionResponse, RpcError> {
        self.transport
            .call(SERVICE_SESSION, "CloseSession", CloseSessionParams { save })
            .await
    }
}

/// Healthcheck service.
#[derive(Clone)]
pub struct HealthcheckClient {
    transport: Arc<UnixRpcTransport>,
}

impl HealthcheckClient {
    pub fn new(transport: Arc<UnixRpcTransport>) -> Self {
        Self { transport }
    }

    pub async fn ping(&self) -> Result<PingResponse, RpcError> {
        self.transport.call(SERVICE_HEALTH, "Ping", Empty {}).await
    }
}

/// Analysis service: all read and mutation operations.
#[derive(Clone)]
pub struct AnalysisClient {
    transport: Arc<UnixRpcTransport>,
}

impl AnalysisClient {
    pub fn new(transport: Arc<UnixRpcTransport>) -> Self {
        Self { transport }
    }

    async fn call<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.transport.call(SERVICE_ANALYSIS, method, params).await
    }

    pub async fn list_functions(&self) -> Result<ListFunctionsResponse, RpcError> {
        self.call("ListFunctions", Empty {}).await
    }

    pub async fn list_imports(&self) -> Result<ListImportsResponse, RpcError> {
        self.call("ListImports", Empty {}).await
    }

    pub async fn list_exports(&self) -> Result<ListExportsResponse, RpcError> {
        self.call("ListExports", Empty {}).await
    }

    pub async fn list_strings(&self) -> Result<ListStringsResponse, RpcError> {
        self.call("ListStrings", Empty {}).await
    }

    pub async fn get_disasm(&self, address: u64) -> Result<GetDisasmResponse, RpcError> {
        self.call("GetDisasm", AddressParams { address }).await
    }

    pub async fn get_function_disasm(
        &self,
        address: u64,
    ) -> Result<GetFunctionDisasmResponse, RpcError> {
        self.call("GetFunctionDisasm", AddressParams { address })
            .await
    }

    pub async fn get_decompiled(&self, address: u64) -> Result<GetDecompiledResponse, RpcError> {
        self.call("GetDecompiled", AddressParams { address }).await
    }

    pub async fn get_bytes(&self, params: GetBytesParams) -> Result<GetBytesResponse, RpcError> {
        self.call("GetBytes", params).await
    }

    pub async fn get_segments(&self) -> Result<GetSegmentsResponse, RpcError> {
        self.call("GetSegments", Empty {}).await
    }

    pub async fn get_xrefs_to(&self, address: u64) -> Result<GetXrefsResponse, RpcError> {
        self.call("GetXrefsTo", AddressParams { address }).await
    }

    pub async fn get_xrefs_from(&self, address: u64) -> Result<GetXrefsResponse, RpcError> {
        self.call("GetXrefsFrom", AddressParams { address }).await
    }

    pub async fn get_data_refs(&self, address: u64) -> Result<GetDataRefsResponse, RpcError> {
        self.call("GetDataRefs", AddressParams { address }).await
    }

    pub async fn get_string_xrefs(&self, address: u64) -> Result<GetStringXrefsResponse, RpcError> {
        self.call("GetStringXrefs", AddressParams { address }).await
    }

    pub async fn get_name(&self, address: u64) -> Result<GetNameResponse, RpcError> {
        self.call("GetName", AddressParams { address }).await
    }

    pub async fn get_function_name(&self, address: u64) -> Result<GetNameResponse, RpcError> {
        self.call("GetFunctionName", AddressParams { address }).await
    }

    pub async fn get_function_info(
        &self,
        address: u64,
    ) -> Result<GetFunctionInfoResponse, RpcError> {
        self.call("GetFunctionInfo", AddressParams { address }).await
    }

    pub async fn get_entry_point(&self) -> Result<GetEntryPointResponse, RpcError> {
        self.call("GetEntryPoint", Empty {}).await
    }

    pub async fn get_dword_at(&self, address: u64) -> Result<ValueResponse, RpcError> {
        self.call("GetDwordAt", AddressParams { address }).await
    }

    pub async fn get_qword_at(&self, address: u64) -> Result<ValueResponse, RpcError> {
        self.call("GetQwordAt", AddressParams { address }).await
    }

    pub async fn get_instruction_length(
        &self,
        address: u64,
    ) -> Result<GetInstructionLengthResponse, RpcError> {
        self.call("GetInstructionLength", AddressParams { address })
            .await
    }

    pub async fn data_read_string(
        &self,
        params: DataReadStringParams,
    ) -> Result<DataReadStringResponse, RpcError> {
        self.call("DataReadString", params).await
    }

    pub async fn data_read_byte(&self, address: u64) -> Result<ValueResponse, RpcError> {
        self.call("DataReadByte", AddressParams { address }).await
    }

    pub async fn find_binary(&self, params: FindBinaryParams) -> Result<FindResponse, RpcError> {
        self.call("FindBinary", params).await
    }

    pub async fn find_text(&self, params: FindTextParams) -> Result<FindResponse, RpcError> {
        self.call("FindText", params).await
    }

    pub async fn list_structs(
        &self,
        params: NameFilterParams,
    ) -> Result<ListStructsResponse, RpcError> {
        self.call("ListStructs", params).await
    }

    pub async fn get_struct(&self, name: &str) -> Result<GetStructResponse, RpcError> {
        self.call(
            "GetStruct",
            NameParams {
                name: name.to_string(),
            },
        )
        .await
    }

    pub async fn list_enums(&self, params: NameFilterParams) -> Result<ListEnumsResponse, RpcError> {
        self.call("ListEnums", params).await
    }

    pub async fn get_enum(&self, name: &str) -> Result<GetEnumResponse, RpcError> {
        self.call(
            "GetEnum",
            NameParams {
                name: name.to_string(),
            },
        )
        .await
    }

    pub async fn get_globals(
        &self,
        params: NameFilterParams,
    ) -> Result<GetGlobalsResponse, RpcError> {
        self.call("GetGlobals", params).await
    }

    pub async fn get_type_at(&self, address: u64) -> Result<GetTypeAtResponse, RpcError> {
        self.call("GetTypeAt", AddressParams { address }).await
    }

    pub async fn get_comment(
        &self,
        params: GetCommentParams,
    ) -> Result<GetCommentResponse, RpcError> {
        self.call("GetComment", params).await
    }

    pub async fn set_comment(&self, params: SetCommentParams) -> Result<AckResponse, RpcError> {
        self.call("SetComment", params).await
    }

    pub async fn get_func_comment(&self, address: u64) -> Result<GetCommentResponse, RpcError> {
        self.call("GetFuncComment", AddressParams { address }).await
    }

    pub async fn set_func_comment(
        &self,
        params: SetFuncCommentParams,
    ) -> Result<AckResponse, RpcError> {
        self.call("SetFuncComment", params).await
    }

    pub async fn set_decompiler_comment(
        &self,
        params: SetDecompilerCommentParams,
    ) -> Result<AckResponse, RpcError> {
        self.call("SetDecompilerComment", params).await
    }

    pub async fn set_name(&self, params: SetNameParams) -> Result<AckResponse, RpcError> {
        self.call("SetName", params).await
    }

    pub async fn delete_name(&self, address: u64) -> Result<AckResponse, RpcError> {
        self.call("DeleteName", AddressParams { address }).await
    }

    pub async fn rename_lvar(&self, params: RenameLvarParams) -> Result<AckResponse, RpcError> {
        self.call("RenameLvar", params).await
    }

    pub async fn rename_global(&self, params: RenameGlobalParams) -> Result<AckResponse, RpcError> {
        self.call("RenameGlobal", params).await
    }

    pub async fn set_function_type(
        &self,
        params: SetFunctionTypeParams,
    ) -> Result<AckResponse, RpcError> {
        self.call("SetFunctionType", params).await
    }

    pub async fn set_lvar_type(&self, params: SetLvarTypeParams) -> Result<AckResponse, RpcError> {
        self.call("SetLvarType", params).await
    }

    pub async fn set_global_type(
        &self,
        params: SetGlobalTypeParams,
    ) -> Result<AckResponse, RpcError> {
        self.call("SetGlobalType", params).await
    }

    pub async fn make_function(&self, address: u64) -> Result<AckResponse, RpcError> {
        self.call("MakeFunction", AddressParams { address }).await
    }
}
