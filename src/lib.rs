//! Concurrent process supervisor: run a fixed set of commands in parallel,
//! capture and normalize their output as line events, and terminate them
//! gracefully (SIGTERM, then SIGKILL after a timeout) on cancellation.
//!
//! The [`engine`] module is the core and is decoupled from rendering; the
//! [`runner`] module ties engine, state and renderers together for the CLI.

pub mod engine;
pub mod error;
pub mod event;
pub mod render;
pub mod runner;
pub mod shutdown;
pub mod spec;
pub mod state;

pub use engine::{Engine, OsFactory};
pub use error::ProcessFailure;
pub use event::ProcessEvent;
pub use shutdown::ShutdownSignal;
pub use spec::ProcessSpec;
