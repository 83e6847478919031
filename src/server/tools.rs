//! MCP tool definitions: names, descriptions, and input schemas.

use rmcp::model::Tool;
use serde_json::{json, Value};
use std::borrow::Cow;
use std::sync::Arc;

// Session lifecycle.
pub const OPEN_SESSION: &str = "open_session";
pub const CLOSE_SESSION: &str = "close_session";
pub const LIST_SESSIONS: &str = "list_sessions";
pub const SESSION_STAT: &str = "session_stat";

// Cached enumerations.
pub const GET_FUNCTIONS: &str = "get_functions";
pub const GET_IMPORTS: &str = "get_imports";
pub const GET_EXPORTS: &str = "get_exports";
pub const GET_STRINGS: &str = "get_strings";

// Reads.
pub const GET_XREFS_TO: &str = "get_xrefs_to";
pub const GET_XREFS_FROM: &str = "get_xrefs_from";
pub const GET_DATA_REFS: &str = "get_data_refs";
pub const GET_STRING_XREFS: &str = "get_string_xrefs";
pub const GET_DISASM: &str = "get_disasm";
pub const GET_FUNCTION_DISASM: &str = "get_function_disasm";
pub const GET_DECOMPILED: &str = "get_decompiled";
pub const GET_BYTES: &str = "get_bytes";
pub const GET_SEGMENTS: &str = "get_segments";
pub const GET_NAME: &str = "get_name";
pub const GET_FUNCTION_INFO: &str = "get_function_info";
pub const GET_FUNCTION_NAME: &str = "get_function_name";
pub const GET_ENTRY_POINT: &str = "get_entry_point";
pub const GET_DWORD_AT: &str = "get_dword_at";
pub const GET_QWORD_AT: &str = "get_qword_at";
pub const GET_INSTRUCTION_LENGTH: &str = "get_instruction_length";

// Search and data reads.
pub const FIND_BINARY: &str = "find_binary";
pub const FIND_TEXT: &str = "find_text";
pub const DATA_READ_STRING: &str = "data_read_string";
pub const DATA_READ_BYTE: &str = "data_read_byte";

// Type inspection.
pub const LIST_STRUCTS: &str = "list_structs";
pub const GET_STRUCT: &str = "get_struct";
pub const LIST_ENUMS: &str = "list_enums";
pub const GET_ENUM: &str = "get_enum";
pub const GET_GLOBALS: &str = "get_globals";
pub const GET_TYPE_AT: &str = "get_type_at";

// Mutations.
pub const SET_COMMENT: &str = "set_comment";
pub const GET_COMMENT: &str = "get_comment";
pub const SET_FUNC_COMMENT: &str = "set_func_comment";
pub const GET_FUNC_COMMENT: &str = "get_func_comment";
pub const SET_DECOMPILER_COMMENT: &str = "set_decompiler_comment";
pub const SET_NAME: &str = "set_name";
pub const DELETE_NAME: &str = "delete_name";
pub const RENAME_LVAR: &str = "rename_lvar";
pub const RENAME_GLOBAL: &str = "rename_global";
pub const SET_FUNCTION_TYPE: &str = "set_function_type";
pub const SET_LVAR_TYPE: &str = "set_lvar_type";
pub const SET_GLOBAL_TYPE: &str = "set_global_type";
pub const MAKE_FUNCTION: &str = "make_function";

fn make_tool(name: &'static str, description: &'static str, schema: Value) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        description: Some(Cow::Borrowed(description)),
        input_schema: Arc::new(serde_json::from_value(schema).unwrap_or_default()),
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}

fn session_schema(extra: Value) -> Value {
    let mut properties = json!({
        "session_id": {"type": "string", "description": "Session ID returned by open_session"}
    });
    if let (Value::Object(props), Value::Object(extra)) = (&mut properties, extra) {
        props.extend(extra);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["session_id"]
    })
}

fn enumeration_schema(extra: Value) -> Value {
    let mut properties = json!({
        "offset": {"type": "integer", "description": "Pagination offset (default 0)"},
        "limit": {"type": "integer", "description": "Page size (default 200, max 2000)"},
        "regex": {"type": "string", "description": "Optional regex filter on names/values"},
        "case_sensitive": {"type": "boolean", "description": "Case-sensitive filtering (default false)"}
    });
    if let (Value::Object(props), Value::Object(extra)) = (&mut properties, extra) {
        props.extend(extra);
    }
    session_schema(Value::Object(
        properties.as_object().cloned().unwrap_or_default(),
    ))
}

fn address_schema() -> Value {
    session_schema(json!({
        "address": {"type": "integer", "description": "Target address"}
    }))
}

/// The full tool surface exposed over MCP.
pub fn all() -> Vec<Tool> {
    vec![
        make_tool(
            OPEN_SESSION,
            "Open a binary in a new analysis session. Spawns a dedicated worker \
             process and returns the session ID used by every other tool.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Path to the binary to analyze"}
                },
                "required": ["path"]
            }),
        ),
        make_tool(
            CLOSE_SESSION,
            "Close an analysis session: the worker saves and exits, and the session is removed.",
            session_schema(json!({})),
        ),
        make_tool(
            LIST_SESSIONS,
            "List all active analysis sessions.",
            json!({"type": "object", "properties": {}}),
        ),
        make_tool(
            SESSION_STAT,
            "Inspect one session without deferring its idle expiry.",
            session_schema(json!({})),
        ),
        make_tool(
            GET_FUNCTIONS,
            "List functions (cached per session). Supports regex filtering and pagination.",
            enumeration_schema(json!({})),
        ),
        make_tool(
            GET_IMPORTS,
            "List imported symbols (cached per session). Supports module and regex filters.",
            enumeration_schema(json!({
                "module": {"type": "string", "description": "Substring filter on the import module"}
            })),
        ),
        make_tool(
            GET_EXPORTS,
            "List exported symbols (cached per session). Supports regex filtering and pagination.",
            enumeration_schema(json!({})),
        ),
        make_tool(
            GET_STRINGS,
            "List strings found in the binary (cached per session). Supports regex filtering and pagination.",
            enumeration_schema(json!({})),
        ),
        make_tool(
            GET_XREFS_TO,
            "Cross-references to an address.",
            address_schema(),
        ),
        make_tool(
            GET_XREFS_FROM,
            "Cross-references from an address.",
            address_schema(),
        ),
        make_tool(
            GET_DATA_REFS,
            "Data references to an address.",
            address_schema(),
        ),
        make_tool(
            GET_STRING_XREFS,
            "Code locations referencing the string at an address, with their containing functions.",
            address_schema(),
        ),
        make_tool(GET_DISASM, "Disassembly at an address.", address_schema()),
        make_tool(
            GET_FUNCTION_DISASM,
            "Full disassembly of the function containing an address.",
            address_schema(),
        ),
        make_tool(
            GET_DECOMPILED,
            "Decompiled pseudocode for the function at an address (requires Hex-Rays).",
            address_schema(),
        ),
        make_tool(
            GET_BYTES,
            "Read raw bytes at an address.",
            session_schema(json!({
                "address": {"type": "integer", "description": "Start address"},
                "size": {"type": "integer", "description": "Number of bytes to read"}
            })),
        ),
        make_tool(
            GET_SEGMENTS,
            "List all segments with permissions and bitness.",
            session_schema(json!({})),
        ),
        make_tool(
            GET_NAME,
            "Symbol name at an address.",
            address_schema(),
        ),
        make_tool(
            GET_FUNCTION_INFO,
            "Detailed information about the function at an address: bounds, frame, flags, prototype.",
            address_schema(),
        ),
        make_tool(
            GET_FUNCTION_NAME,
            "Name of the function containing an address.",
            address_schema(),
        ),
        make_tool(
            GET_ENTRY_POINT,
            "The binary's entry point address.",
            session_schema(json!({})),
        ),
        make_tool(
            GET_DWORD_AT,
            "Read a 32-bit value at an address.",
            address_schema(),
        ),
        make_tool(
            GET_QWORD_AT,
            "Read a 64-bit value at an address.",
            address_schema(),
        ),
        make_tool(
            GET_INSTRUCTION_LENGTH,
            "Length in bytes of the instruction at an address.",
            address_schema(),
        ),
        make_tool(
            FIND_BINARY,
            "Find a byte pattern (e.g. \"55 8B EC\", \"?\" wildcards allowed).",
            session_schema(json!({
                "pattern": {"type": "string", "description": "Byte pattern to search for"},
                "start": {"type": "integer", "description": "Search range start (default: image start)"},
                "end": {"type": "integer", "description": "Search range end (default: image end)"},
                "search_up": {"type": "boolean", "description": "Search backwards"}
            })),
        ),
        make_tool(
            FIND_TEXT,
            "Find text in the binary.",
            session_schema(json!({
                "needle": {"type": "string", "description": "Text to search for"},
                "start": {"type": "integer"},
                "end": {"type": "integer"},
                "case_sensitive": {"type": "boolean"},
                "unicode": {"type": "boolean", "description": "Also match UTF-16 encodings"}
            })),
        ),
        make_tool(
            DATA_READ_STRING,
            "Read a NUL-terminated string at an address.",
            session_schema(json!({
                "address": {"type": "integer"},
                "max_length": {"type": "integer", "description": "Maximum bytes to read (default 256)"}
            })),
        ),
        make_tool(
            DATA_READ_BYTE,
            "Read a single byte at an address.",
            address_schema(),
        ),
        make_tool(
            LIST_STRUCTS,
            "List structure types, optionally filtered by regex.",
            session_schema(json!({
                "regex": {"type": "string"},
                "case_sensitive": {"type": "boolean"}
            })),
        ),
        make_tool(
            GET_STRUCT,
            "Get a structure's members by name.",
            session_schema(json!({
                "name": {"type": "string", "description": "Structure name"}
            })),
        ),
        make_tool(
            LIST_ENUMS,
            "List enum types, optionally filtered by regex.",
            session_schema(json!({
                "regex": {"type": "string"},
                "case_sensitive": {"type": "boolean"}
            })),
        ),
        make_tool(
            GET_ENUM,
            "Get an enum's members by name.",
            session_schema(json!({
                "name": {"type": "string", "description": "Enum name"}
            })),
        ),
        make_tool(
            GET_GLOBALS,
            "List named globals (non-function symbols), optionally filtered by regex.",
            session_schema(json!({
                "regex": {"type": "string"},
                "case_sensitive": {"type": "boolean"}
            })),
        ),
        make_tool(
            GET_TYPE_AT,
            "Type information applied at an address.",
            address_schema(),
        ),
        make_tool(
            SET_COMMENT,
            "Set a comment at an address.",
            session_schema(json!({
                "address": {"type": "integer"},
                "comment": {"type": "string"},
                "repeatable": {"type": "boolean", "description": "Repeatable comment (shown at every xref)"}
            })),
        ),
        make_tool(
            GET_COMMENT,
            "Get the comment at an address.",
            session_schema(json!({
                "address": {"type": "integer"},
                "repeatable": {"type": "boolean"}
            })),
        ),
        make_tool(
            SET_FUNC_COMMENT,
            "Set a function-level comment.",
            session_schema(json!({
                "address": {"type": "integer", "description": "Address inside the function"},
                "comment": {"type": "string"}
            })),
        ),
        make_tool(
            GET_FUNC_COMMENT,
            "Get the function-level comment.",
            address_schema(),
        ),
        make_tool(
            SET_DECOMPILER_COMMENT,
            "Attach a comment to a pseudocode line in a decompiled function.",
            session_schema(json!({
                "function_address": {"type": "integer", "description": "Address of the decompiled function"},
                "address": {"type": "integer", "description": "Address the comment anchors to"},
                "comment": {"type": "string"}
            })),
        ),
        make_tool(
            SET_NAME,
            "Rename the symbol at an address.",
            session_schema(json!({
                "address": {"type": "integer"},
                "name": {"type": "string", "description": "New name"}
            })),
        ),
        make_tool(
            DELETE_NAME,
            "Remove the user-defined name at an address, reverting to the default.",
            address_schema(),
        ),
        make_tool(
            RENAME_LVAR,
            "Rename a local variable in a decompiled function.",
            session_schema(json!({
                "function_address": {"type": "integer"},
                "lvar_name": {"type": "string", "description": "Current variable name"},
                "new_name": {"type": "string"}
            })),
        ),
        make_tool(
            RENAME_GLOBAL,
            "Rename a global variable.",
            session_schema(json!({
                "address": {"type": "integer"},
                "new_name": {"type": "string"}
            })),
        ),
        make_tool(
            SET_FUNCTION_TYPE,
            "Apply a C prototype to the function at an address.",
            session_schema(json!({
                "address": {"type": "integer"},
                "prototype": {"type": "string", "description": "C prototype, e.g. 'int f(char *s)'"}
            })),
        ),
        make_tool(
            SET_LVAR_TYPE,
            "Set the type of a local variable in a decompiled function.",
            session_schema(json!({
                "function_address": {"type": "integer"},
                "lvar_name": {"type": "string"},
                "lvar_type": {"type": "string", "description": "C type expression"}
            })),
        ),
        make_tool(
            SET_GLOBAL_TYPE,
            "Set the type of a global variable.",
            session_schema(json!({
                "address": {"type": "integer"},
                "type": {"type": "string", "description": "C type expression"}
            })),
        ),
        make_tool(
            MAKE_FUNCTION,
            "Create a function at an address. Invalidates the session's cached enumerations.",
            address_schema(),
        ),
    ]
}
