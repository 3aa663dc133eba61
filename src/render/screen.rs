use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use crate::render::format_status;
use crate::state::ProcessState;

/// Full-screen renderer for interactive terminals.
///
/// Clears and redraws the whole view on every render: one block per process
/// with a status header and its retained output, plus a footer. Skips the
/// redraw entirely when no state is dirty.
pub struct ScreenRenderer<W: Write> {
    out: W,
}

impl<W: Write> ScreenRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Redraw all process blocks and clear their dirty flags.
    pub fn render(&mut self, states: &mut [ProcessState]) -> io::Result<()> {
        if !states.iter().any(ProcessState::dirty) {
            return Ok(());
        }

        queue!(self.out, MoveTo(0, 0), Clear(ClearType::All))?;

        for state in states.iter_mut() {
            let status = if state.done() {
                format_status(state.failure())
            } else {
                "running".to_string()
            };
            writeln!(self.out, "Running {}... [{}]", state.name(), status)?;

            for line in state.lines() {
                if line.trim().is_empty() {
                    writeln!(self.out)?;
                } else {
                    writeln!(self.out, "    {line}")?;
                }
            }

            writeln!(self.out)?;
            state.clear_dirty();
        }

        writeln!(self.out, "Press Ctrl+C to cancel. Output updates in real time.")?;
        self.out.flush()
    }
}
