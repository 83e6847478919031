//! MCP gateway for headless IDA analysis workers.
//!
//! This crate multiplexes tool-invocation requests from an MCP client (an
//! LLM-driven agent) onto a pool of long-lived analysis workers. Each worker
//! is an external subprocess holding one opened binary database and serving
//! RPCs over its own Unix-domain socket; the gateway owns the workers'
//! lifecycle end to end.
//!
//! # Architecture
//!
//! - **[`session::SessionRegistry`]**: the authoritative directory of active
//!   sessions, persisted as one JSON record per line so sessions survive a
//!   gateway restart. Sessions expire after an idle period.
//!
//! - **[`worker::WorkerSupervisor`]**: spawns one worker process per
//!   session, gates readiness on the worker's socket accepting a probe
//!   connection, monitors each process from a dedicated task, and reclaims
//!   orphaned sockets and processes at startup.
//!
//! - **[`cache`]**: per-session memoization of the four expensive
//!   enumerations (functions, imports, exports, strings) with single-flight
//!   loading; invalidated wholesale on mutations.
//!
//! - **[`server::Gateway`]**: the MCP-facing dispatcher. Every tool handler
//!   resolves the session, touches it, forwards to the worker (through the
//!   cache for enumerations), and translates failures into a flat
//!   `{kind, status, operation, message, context}` error payload.
//!
//! Startup order matters: orphan sockets are wiped, orphan worker processes
//! are signalled, then persisted sessions are restored; workers for restored
//! sessions spawn on demand at their first tool call.

pub mod cache;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod sweeper;
pub mod worker;

pub use config::{GatewayConfig, SupervisorConfig, WorkerStdio};
pub use error::{ErrorKind, ErrorStatus, ToolError};
pub use server::Gateway;
pub use session::{Session, SessionRegistry};
pub use worker::{WorkerHandle, WorkerSupervisor};
