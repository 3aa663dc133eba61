mod incremental;
mod screen;

pub use incremental::{DEFAULT_PREFIX, IncrementalRenderer};
pub use screen::ScreenRenderer;

use std::io;

use crate::error::ProcessFailure;
use crate::state::ProcessState;

/// Format a terminal result for display.
///
/// `ok` for success, `exit code N` / `killed by signal N` for process-level
/// failures, `error: <cause>` for supervision failures (factory, start,
/// pipe, wait).
pub fn format_status(failure: Option<&ProcessFailure>) -> String {
    match failure {
        None => "ok".to_string(),
        Some(f @ (ProcessFailure::ExitCode { .. } | ProcessFailure::Signaled { .. })) => {
            f.to_string()
        }
        Some(other) => format!("error: {other}"),
    }
}

/// Write the per-process result summary.
///
/// The runner sends this to stderr so it stays visible when stdout is
/// redirected.
pub fn write_summary<W: io::Write>(out: &mut W, states: &[ProcessState]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Summary:")?;
    for state in states {
        writeln!(out, "  - {}: {}", state.name(), format_status(state.failure()))?;
    }
    Ok(())
}
