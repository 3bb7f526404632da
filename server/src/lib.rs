//! Reference server for the wire protocol.
//!
//! A [`Server`] owns the per-session object table and executes decoded
//! commands against a [`Procs`] implementation. [`RecordingProcs`] is an
//! in-memory implementation used by the binaries and tests.

pub mod bootstrap;
pub mod config;
pub mod error;
mod handlers;
pub mod objects;
pub mod procs;
pub mod server;

pub use bootstrap::{inject_bootstrap_objects, BootstrapObjects, BOOTSTRAP_HANDLE};
pub use error::{ServerError, ServerResult};
pub use objects::{KnownObjects, ServerObjects};
pub use procs::{ProcCall, ProcError, Procs, RecordingProcs};
pub use server::{Server, SessionStats};
