//! Wire types for the worker RPC schema.
//!
//! The worker exposes three services over its Unix socket: session control,
//! analysis tools, and healthcheck. Requests and responses travel as
//! newline-delimited JSON frames. Every analysis response carries an in-band
//! `error` string; an empty string means success. The gateway treats a
//! non-empty `error` exactly like a transport failure.

use serde::{Deserialize, Serialize};

/// Service name for session control RPCs.
pub const SERVICE_SESSION: &str = "session";
/// Service name for analysis RPCs.
pub const SERVICE_ANALYSIS: &str = "analysis";
/// Service name for healthcheck RPCs.
pub const SERVICE_HEALTH: &str = "health";

/// In-band error marker the worker emits when Hex-Rays is missing. The
/// dispatcher maps it to the `decompiler_unavailable` error kind.
pub const DECOMPILER_UNAVAILABLE_MARKER: &str = "decompiler unavailable";

/// One request frame: service, method, and method-specific parameters.
#[derive(Debug, Serialize, Deserialize)]
pub struct RpcEnvelope<P> {
    pub service: String,
    pub method: String,
    pub params: P,
}

/// Parameter struct for methods that take no arguments.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Empty {}

// --- Entry types for the cached enumerations ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub address: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportEntry {
    pub address: u64,
    pub name: String,
    #[serde(default)]
    pub module: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub address: u64,
    pub name: String,
    #[serde(default)]
    pub ordinal: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringEntry {
    pub address: u64,
    pub value: String,
}

// --- Enumeration responses ---

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListFunctionsResponse {
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListImportsResponse {
    #[serde(default)]
    pub imports: Vec<ImportEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListExportsResponse {
    #[serde(default)]
    pub exports: Vec<ExportEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListStringsResponse {
    #[serde(default)]
    pub strings: Vec<StringEntry>,
    #[serde(default)]
    pub error: String,
}

// --- Read operations ---

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressParams {
    pub address: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetDisasmResponse {
    #[serde(default)]
    pub disasm: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetFunctionDisasmResponse {
    /// One line per instruction of the containing function.
    #[serde(default)]
    pub disassembly: Vec<String>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetDecompiledResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetBytesParams {
    pub address: u64,
    pub size: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetBytesResponse {
    /// Hex-encoded bytes.
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub start: u64,
    pub end: u64,
    pub name: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub bitness: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetSegmentsResponse {
    #[serde(default)]
    pub segments: Vec<SegmentEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XrefEntry {
    pub from: u64,
    pub to: u64,
    #[serde(rename = "type", default)]
    pub ty: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetXrefsResponse {
    #[serde(default)]
    pub xrefs: Vec<XrefEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRefEntry {
    pub from: u64,
    #[serde(rename = "type", default)]
    pub ty: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetDataRefsResponse {
    #[serde(default)]
    pub refs: Vec<DataRefEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringXrefEntry {
    pub address: u64,
    #[serde(default)]
    pub function_address: u64,
    #[serde(default)]
    pub function_name: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetStringXrefsResponse {
    #[serde(default)]
    pub refs: Vec<StringXrefEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetNameResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionFlags {
    #[serde(default)]
    pub is_library: bool,
    #[serde(default)]
    pub is_thunk: bool,
    #[serde(default)]
    pub no_return: bool,
    #[serde(default)]
    pub has_farseg: bool,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetFunctionInfoResponse {
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub frame_size: u64,
    #[serde(default)]
    pub flags: FunctionFlags,
    #[serde(default)]
    pub calling_convention: String,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub num_args: u32,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetEntryPointResponse {
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub error: String,
}

/// Shared response shape for single-value integer reads (dword, qword,
/// byte).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ValueResponse {
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetInstructionLengthResponse {
    #[serde(default)]
    pub length: u32,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DataReadStringParams {
    pub address: u64,
    pub max_length: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DataReadStringResponse {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub error: String,
}

// --- Search ---

#[derive(Debug, Serialize, Deserialize)]
pub struct FindBinaryParams {
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    pub pattern: String,
    #[serde(default)]
    pub search_up: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindTextParams {
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    pub needle: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub unicode: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub addresses: Vec<u64>,
    #[serde(default)]
    pub error: String,
}

// --- Type inspection ---

#[derive(Debug, Serialize, Deserialize)]
pub struct NameFilterParams {
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructEntry {
    pub name: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListStructsResponse {
    #[serde(default)]
    pub structs: Vec<StructEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NameParams {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructMember {
    pub name: String,
    pub offset: u64,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub ty: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetStructResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub members: Vec<StructMember>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEntry {
    pub name: String,
    #[serde(default)]
    pub id: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListEnumsResponse {
    #[serde(default)]
    pub enums: Vec<EnumEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetEnumResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub members: Vec<EnumMember>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalEntry {
    pub address: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetGlobalsResponse {
    #[serde(default)]
    pub globals: Vec<GlobalEntry>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetTypeAtResponse {
    #[serde(default)]
    pub address: u64,
    #[serde(rename = "type", default)]
    pub ty: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub is_ptr: bool,
    #[serde(default)]
    pub is_func: bool,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub is_struct: bool,
    #[serde(default)]
    pub is_union: bool,
    #[serde(default)]
    pub is_enum: bool,
    #[serde(default)]
    pub has_type: bool,
    #[serde(default)]
    pub error: String,
}

// --- Annotations and mutations ---

#[derive(Debug, Serialize, Deserialize)]
pub struct GetCommentParams {
    pub address: u64,
    #[serde(default)]
    pub repeatable: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GetCommentResponse {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetCommentParams {
    pub address: u64,
    pub comment: String,
    #[serde(default)]
    pub repeatable: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetFuncCommentParams {
    pub address: u64,
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetDecompilerCommentParams {
    pub function_address: u64,
    pub address: u64,
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetNameParams {
    pub address: u64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenameLvarParams {
    pub function_address: u64,
    pub lvar_name: String,
    pub new_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenameGlobalParams {
    pub address: u64,
    pub new_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetFunctionTypeParams {
    pub address: u64,
    pub prototype: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetLvarTypeParams {
    pub function_address: u64,
    pub lvar_name: String,
    pub lvar_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetGlobalTypeParams {
    pub address: u64,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Shared response shape for mutations: a success flag plus in-band error.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

// --- Session control and healthcheck ---

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseSessionParams {
    pub save: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CloseSessionResponse {
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_flat() {
        let env = RpcEnvelope {
            service: SERVICE_ANALYSIS.to_string(),
            method: "ListFunctions".to_string(),
            params: Empty {},
        };
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["service"], "analysis");
        assert_eq!(value["method"], "ListFunctions");
    }

    #[test]
    fn missing_error_field_defaults_to_empty() {
        let resp: ListFunctionsResponse =
            serde_json::from_str(r#"{"functions":[{"address":4198400,"name":"main","size":64}]}"#)
                .unwrap();
        assert!(resp.error.is_empty());
        assert_eq!(resp.functions[0].name, "main");
        assert_eq!(resp.functions[0].address, 0x401000);
    }

    #[test]
    fn type_fields_round_trip_under_rename() {
        let xref = XrefEntry {
            from: 1,
            to: 2,
            ty: "call".into(),
        };
        let value = serde_json::to_value(&xref).unwrap();
        assert_eq!(value["type"], "call");
        let back: XrefEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, xref);
    }
}
