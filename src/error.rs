use std::io;

use thiserror::Error;

/// A command factory could not construct a command for a spec.
#[derive(Debug, Error)]
#[error("create command: {0}")]
pub struct FactoryError(pub String);

/// An executable could not be launched.
#[derive(Debug, Error)]
#[error("start: {0}")]
pub struct StartError(#[from] pub io::Error);

/// A stream could not be acquired from a started command.
#[derive(Debug, Error)]
#[error("{stream} pipe: {message}")]
pub struct PipeError {
    /// Which stream failed, "stdout" or "stderr".
    pub stream: &'static str,
    pub message: String,
}

/// Why a supervised process did not succeed.
///
/// Carried inside the terminal [`ProcessEvent::Exited`] event for its
/// process. `None` in that event means the process exited with status 0.
/// Cloneable so consumers can retain it alongside buffered output.
///
/// [`ProcessEvent::Exited`]: crate::event::ProcessEvent::Exited
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessFailure {
    #[error("create command: {0}")]
    Factory(String),
    #[error("start: {0}")]
    Start(String),
    #[error("{stream} pipe: {message}")]
    Pipe { stream: &'static str, message: String },
    #[error("wait: {0}")]
    Wait(String),
    #[error("exit code {code}")]
    ExitCode { code: i32 },
    #[error("killed by signal {signal}")]
    Signaled { signal: i32 },
}

impl From<FactoryError> for ProcessFailure {
    fn from(err: FactoryError) -> Self {
        Self::Factory(err.0)
    }
}

impl From<StartError> for ProcessFailure {
    fn from(err: StartError) -> Self {
        Self::Start(err.0.to_string())
    }
}

impl From<PipeError> for ProcessFailure {
    fn from(err: PipeError) -> Self {
        Self::Pipe {
            stream: err.stream,
            message: err.message,
        }
    }
}
