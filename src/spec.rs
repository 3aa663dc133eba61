/// Description of one supervised command.
///
/// A spec is identified by its position in the list handed to the engine;
/// names are display labels only and need not be unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Logical label used in output prefixes and the summary.
    /// An empty name is displayed as `proc-<index>`.
    pub name: String,
    /// Executable to run, resolved via PATH.
    pub command: String,
    /// Arguments passed verbatim, not including the command itself.
    pub args: Vec<String>,
    /// Maximum retained output lines for this process.
    /// 0 means use the runner default.
    pub max_lines: usize,
    /// Maximum retained output bytes for this process.
    /// 0 means no byte limit.
    pub max_bytes: usize,
}

impl ProcessSpec {
    /// Create a spec with no retention overrides.
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            max_lines: 0,
            max_bytes: 0,
        }
    }

    /// Display name for the process at `index`.
    pub fn display_name(&self, index: usize) -> String {
        if self.name.is_empty() {
            format!("proc-{index}")
        } else {
            self.name.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_spec_new_collects_args() {
        let spec = ProcessSpec::new("build", "cargo", ["build", "--release"]);
        assert_eq!(spec.name, "build");
        assert_eq!(spec.command, "cargo");
        assert_eq!(spec.args, vec!["build", "--release"]);
        assert_eq!(spec.max_lines, 0);
        assert_eq!(spec.max_bytes, 0);
    }

    #[test]
    fn process_spec_display_name_falls_back_to_index() {
        let named = ProcessSpec::new("build", "cargo", ["build"]);
        assert_eq!(named.display_name(3), "build");

        let unnamed = ProcessSpec::new("", "cargo", ["build"]);
        assert_eq!(unnamed.display_name(3), "proc-3");
    }
}
