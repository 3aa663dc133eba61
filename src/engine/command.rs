use std::io;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::{FactoryError, PipeError, StartError};
use crate::spec::ProcessSpec;

/// Captured output stream of a command.
pub type ByteSource = Box<dyn AsyncRead + Send + Unpin>;

/// How a supervised process exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one.
    pub signal: Option<i32>,
}

impl ExitStatus {
    pub const SUCCESS: Self = Self {
        code: Some(0),
        signal: None,
    };

    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn from_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A runnable external command with capturable output streams.
///
/// The production implementation wraps `tokio::process`; test doubles and
/// alternative backends (remote, containerized) implement the same trait.
/// The engine only ever sees this trait.
///
/// Lifecycle: construct → [`start`](Self::start) → take both streams →
/// [`wait`](Self::wait). Each stream is takeable exactly once.
#[async_trait]
pub trait Command: Send {
    /// Spawn the process. Fails if the executable cannot be launched.
    fn start(&mut self) -> Result<(), StartError>;

    /// Take the stdout stream of the started process.
    fn take_stdout(&mut self) -> Result<ByteSource, PipeError>;

    /// Take the stderr stream of the started process.
    fn take_stderr(&mut self) -> Result<ByteSource, PipeError>;

    /// Wait for the process to exit.
    async fn wait(&mut self) -> io::Result<ExitStatus>;

    /// Signalable reference to the running process, or `None` when the
    /// process is not in a signalable state (not started, or already
    /// reaped).
    fn handle(&self) -> Option<Box<dyn ProcessHandle>>;
}

/// Signalable reference to a running process.
///
/// Both operations are best-effort: signaling a process that has already
/// exited is not an error the engine cares about.
pub trait ProcessHandle: Send + Sync {
    /// Request cooperative termination (SIGTERM-equivalent).
    fn terminate(&self) -> io::Result<()>;

    /// Force immediate termination (SIGKILL-equivalent).
    fn kill(&self) -> io::Result<()>;
}

/// Creates [`Command`] instances from specs.
///
/// Swapping the factory is how tests inject doubles and how alternative
/// execution backends plug in without touching engine logic.
pub trait CommandFactory: Send + Sync {
    fn create(&self, spec: &ProcessSpec) -> Result<Box<dyn Command>, FactoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_success_only_for_code_zero() {
        assert!(ExitStatus::SUCCESS.success());
        assert!(ExitStatus::from_code(0).success());
        assert!(!ExitStatus::from_code(1).success());
        assert!(!ExitStatus::from_signal(15).success());
    }
}
