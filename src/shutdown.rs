use std::sync::Arc;
use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;

/// Shared cancellation signal governing all supervised processes.
///
/// Cloning is cheap; all clones observe the same signal. The optional cause
/// is set once by the first caller of [`cancel`](Self::cancel) and surfaces
/// in each process's output as a `[cancellation: ...]` diagnostic line.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<String>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown of every supervised process.
    ///
    /// Later calls are no-ops; the first cause wins.
    pub fn cancel(&self, cause: Option<String>) {
        if let Some(cause) = cause {
            let _ = self.cause.set(cause);
        }
        self.token.cancel();
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Human-readable reason for the shutdown, if one was attached.
    pub fn cause(&self) -> Option<&str> {
        self.cause.get().map(String::as_str)
    }
}
