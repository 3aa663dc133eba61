use crate::error::ProcessFailure;

/// Event emitted by the engine for one supervised process.
///
/// For a given index the engine emits zero or more `Line` events followed by
/// exactly one `Exited` event, and nothing after that. Events from different
/// processes interleave arbitrarily on the merged stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One normalized output line (stdout and stderr merged, no trailing
    /// newline). Shutdown narration and stream faults arrive as ordinary
    /// lines in bracketed form, e.g. `[stream error: ...]`.
    Line { index: usize, text: String },
    /// Terminal event for the process. `failure` is `None` when the process
    /// exited with status 0.
    Exited {
        index: usize,
        failure: Option<ProcessFailure>,
    },
}

impl ProcessEvent {
    /// Index of the process this event belongs to.
    pub fn index(&self) -> usize {
        match self {
            Self::Line { index, .. } | Self::Exited { index, .. } => *index,
        }
    }
}
