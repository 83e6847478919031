//! Worker processes: RPC schema, client stubs, and the supervisor.
//!
//! Each analysis worker is an external subprocess holding one opened binary
//! database and serving RPCs over its own Unix-domain socket. The gateway
//! only dials; workers only listen.

pub mod client;
pub mod rpc;
mod supervisor;

pub use client::{AnalysisClient, HealthcheckClient, RpcError, SessionControlClient};
pub use supervisor::{SupervisorError, WorkerHandle, WorkerSupervisor};
