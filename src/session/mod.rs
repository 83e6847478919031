//! Session records and the session registry.
//!
//! A session binds one opened binary to one analysis worker process. The
//! registry is the authoritative directory of live sessions: the dispatcher
//! resolves and touches sessions here, the sweeper collects idle ones, and
//! the startup path restores persisted records after a crash.

mod registry;
mod types;

pub use registry::{RegistryError, SessionRegistry};
pub use types::{Session, SessionRecord};
