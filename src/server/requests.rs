//! Typed argument structs for the MCP tools.
//!
//! Parsed from the tool call's JSON arguments; missing optional fields take
//! their serde defaults. Validation beyond shape (non-empty strings,
//! non-zero addresses) happens in the handlers.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    /// Path to the binary to analyze.
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct CloseSessionRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionStatRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetFunctionsRequest {
    pub session_id: String,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct GetImportsRequest {
    pub session_id: String,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    /// Substring filter on the import's module name.
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct GetExportsRequest {
    pub session_id: String,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct GetStringsRequest {
    pub session_id: String,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct XrefRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct DataRefRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct StringXrefRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetDisasmRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetDecompiledRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetFunctionDisasmRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetNameRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetFunctionInfoRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetFunctionNameRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetEntryPointRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetDwordAtRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetQwordAtRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetInstructionLengthRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct DataReadStringRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    /// Maximum bytes to read; defaults to 256.
    pub max_length: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DataReadByteRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetBytesRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub size: u32,
}

#[derive(Debug, Deserialize)]
pub struct GetSegmentsRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FindBinaryRequest {
    pub session_id: String,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    /// Byte pattern, e.g. "55 8B EC" with "?" wildcards.
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub search_up: bool,
}

#[derive(Debug, Deserialize)]
pub struct FindTextRequest {
    pub session_id: String,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    #[serde(default)]
    pub needle: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub unicode: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListStructsRequest {
    pub session_id: String,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct GetStructRequest {
    pub session_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListEnumsRequest {
    pub session_id: String,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct GetEnumRequest {
    pub session_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GetGlobalsRequest {
    pub session_id: String,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
pub struct GetTypeAtRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetCommentRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub repeatable: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetCommentRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub repeatable: bool,
}

#[derive(Debug, Deserialize)]
pub struct GetFuncCommentRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct SetFuncCommentRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct SetDecompilerCommentRequest {
    pub session_id: String,
    #[serde(default)]
    pub function_address: u64,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct SetNameRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteNameRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}

#[derive(Debug, Deserialize)]
pub struct RenameLvarRequest {
    pub session_id: String,
    #[serde(default)]
    pub function_address: u64,
    #[serde(default)]
    pub lvar_name: String,
    #[serde(default)]
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameGlobalRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetFunctionTypeRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub prototype: String,
}

#[derive(Debug, Deserialize)]
pub struct SetLvarTypeRequest {
    pub session_id: String,
    #[serde(default)]
    pub function_address: u64,
    #[serde(default)]
    pub lvar_name: String,
    #[serde(default)]
    pub lvar_type: String,
}

#[derive(Debug, Deserialize)]
pub struct SetGlobalTypeRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
    #[serde(rename = "type", default)]
    pub ty: String,
}

#[derive(Debug, Deserialize)]
pub struct MakeFunctionRequest {
    pub session_id: String,
    #[serde(default)]
    pub address: u64,
}
