use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::event::ProcessEvent;
use crate::render::format_status;
use crate::spec::ProcessSpec;

/// Default prefix template; `{}` is replaced with the process name.
pub const DEFAULT_PREFIX: &str = "[{}]";

/// Line-by-line renderer for non-interactive output.
///
/// Prints events as they arrive with a per-process name prefix, no screen
/// control and no buffering, which keeps the output friendly to CI logs,
/// pipes and text tools. Optionally prefixes each line with an RFC3339 UTC
/// timestamp.
pub struct IncrementalRenderer {
    prefix: String,
    timestamps: bool,
}

impl IncrementalRenderer {
    /// `prefix` must contain a `{}` placeholder for the process name;
    /// anything else falls back to [`DEFAULT_PREFIX`].
    pub fn new(prefix: impl Into<String>, timestamps: bool) -> Self {
        let prefix = prefix.into();
        let prefix = if prefix.contains("{}") {
            prefix
        } else {
            DEFAULT_PREFIX.to_string()
        };
        Self { prefix, timestamps }
    }

    /// Print one event to stdout.
    pub fn render(&self, event: &ProcessEvent, specs: &[ProcessSpec]) {
        if let Some(line) = self.format(event, specs, SystemTime::now()) {
            println!("{line}");
        }
    }

    /// Print the initial `starting...` line for every process.
    pub fn render_starting(&self, specs: &[ProcessSpec]) {
        let now = SystemTime::now();
        for (index, spec) in specs.iter().enumerate() {
            println!("{}", self.decorate(&spec.display_name(index), "starting...", now));
        }
    }

    fn format(
        &self,
        event: &ProcessEvent,
        specs: &[ProcessSpec],
        now: SystemTime,
    ) -> Option<String> {
        let index = event.index();
        let spec = specs.get(index)?;
        let name = spec.display_name(index);
        let body = match event {
            ProcessEvent::Line { text, .. } => text.clone(),
            ProcessEvent::Exited { failure, .. } => format_status(failure.as_ref()),
        };
        Some(self.decorate(&name, &body, now))
    }

    fn decorate(&self, name: &str, body: &str, now: SystemTime) -> String {
        let prefix = self.prefix.replace("{}", name);
        if self.timestamps {
            format!("[{}] {prefix} {body}", rfc3339_utc(now))
        } else {
            format!("{prefix} {body}")
        }
    }
}

/// RFC3339 UTC timestamp, second precision.
fn rfc3339_utc(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)
}
