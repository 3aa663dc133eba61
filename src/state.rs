use std::collections::VecDeque;

use crate::error::ProcessFailure;
use crate::event::ProcessEvent;

/// Retained output and status for one supervised process.
///
/// Lines are kept oldest-first under a dual constraint: when either the
/// line cap or the byte cap is exceeded, the oldest lines are evicted until
/// both hold again. Uses VecDeque internally for O(1) removal from the
/// front. A cap of 0 disables that constraint.
pub struct ProcessState {
    name: String,
    lines: VecDeque<String>,
    byte_size: usize,
    max_lines: usize,
    max_bytes: usize,
    running: bool,
    done: bool,
    failure: Option<ProcessFailure>,
    dirty: bool,
}

impl ProcessState {
    pub fn new(name: impl Into<String>, max_lines: usize, max_bytes: usize) -> Self {
        Self {
            name: name.into(),
            lines: VecDeque::new(),
            byte_size: 0,
            max_lines,
            max_bytes,
            running: true,
            done: false,
            failure: None,
            // Initial state should be rendered.
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Retained lines, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total bytes currently retained.
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn failure(&self) -> Option<&ProcessFailure> {
        self.failure.as_ref()
    }

    /// Whether the state changed since the last render.
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    fn push_line(&mut self, line: String) {
        self.byte_size += line.len();
        self.lines.push_back(line);

        // Evict oldest lines until both constraints hold again.
        loop {
            let over_lines = self.max_lines > 0 && self.lines.len() > self.max_lines;
            let over_bytes = self.max_bytes > 0 && self.byte_size > self.max_bytes;
            if !over_lines && !over_bytes {
                break;
            }
            match self.lines.pop_front() {
                Some(oldest) => self.byte_size -= oldest.len(),
                None => break,
            }
        }

        self.dirty = true;
    }

    fn finish(&mut self, failure: Option<ProcessFailure>) {
        self.done = true;
        self.running = false;
        // Overwrites any prior value; a re-delivered terminal event is
        // tolerated, not accumulated.
        self.failure = failure;
        self.dirty = true;
    }
}

/// Apply one engine event to the state set.
///
/// Events whose index falls outside the set are silently ignored.
pub fn apply_event(states: &mut [ProcessState], event: &ProcessEvent) {
    let Some(state) = states.get_mut(event.index()) else {
        return;
    };
    match event {
        ProcessEvent::Line { text, .. } => state.push_line(text.clone()),
        ProcessEvent::Exited { failure, .. } => state.finish(failure.clone()),
    }
}

/// Aggregate exit code: 0 if every process finished without a failure,
/// otherwise 1.
pub fn aggregate_exit_code(states: &[ProcessState]) -> i32 {
    if states.iter().any(|s| s.failure().is_some()) {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn line(index: usize, text: &str) -> ProcessEvent {
        ProcessEvent::Line {
            index,
            text: text.into(),
        }
    }

    fn exited(index: usize, failure: Option<ProcessFailure>) -> ProcessEvent {
        ProcessEvent::Exited { index, failure }
    }

    #[test]
    fn process_state_new_is_running_and_dirty() {
        let state = ProcessState::new("build", 100, 0);
        assert!(state.running());
        assert!(!state.done());
        assert!(state.dirty());
        assert!(state.is_empty());
        assert_eq!(state.byte_size(), 0);
    }

    #[test]
    fn apply_event_line_cap_keeps_most_recent() {
        let mut states = vec![ProcessState::new("a", 3, 0)];
        for text in ["l1", "l2", "l3", "l4", "l5"] {
            apply_event(&mut states, &line(0, text));
            assert!(states[0].len() <= 3, "cap violated after {text}");
        }
        let retained: Vec<&str> = states[0].lines().collect();
        assert_eq!(retained, vec!["l3", "l4", "l5"]);
    }

    #[test]
    fn apply_event_byte_cap_holds_after_every_application() {
        let mut states = vec![ProcessState::new("a", 0, 20)];
        for text in ["aaaaa", "bbbbb", "ccccc", "ddddd"] {
            apply_event(&mut states, &line(0, text));
            assert!(states[0].byte_size() <= 20);
        }
        assert!(states[0].len() <= 4);
        // 4 lines of 5 bytes fit exactly.
        assert_eq!(states[0].byte_size(), 20);

        apply_event(&mut states, &line(0, "eeeee"));
        assert_eq!(states[0].byte_size(), 20);
        let retained: Vec<&str> = states[0].lines().collect();
        assert_eq!(retained, vec!["bbbbb", "ccccc", "ddddd", "eeeee"]);
    }

    #[test]
    fn apply_event_both_caps_hold_simultaneously() {
        let mut states = vec![ProcessState::new("a", 3, 8)];
        for text in ["aaaa", "bbbb", "cccc", "dd"] {
            apply_event(&mut states, &line(0, text));
            assert!(states[0].len() <= 3);
            assert!(states[0].byte_size() <= 8);
        }
        let retained: Vec<&str> = states[0].lines().collect();
        assert_eq!(retained, vec!["cccc", "dd"]);
    }

    #[test]
    fn apply_event_single_oversized_line_empties_buffer() {
        let mut states = vec![ProcessState::new("a", 0, 4)];
        apply_event(&mut states, &line(0, "way too long"));
        assert!(states[0].is_empty());
        assert_eq!(states[0].byte_size(), 0);
    }

    #[rstest]
    #[case(0)]
    #[case(5)]
    fn apply_event_zero_cap_means_unbounded(#[case] max_bytes_cap: usize) {
        // A zero line cap never evicts by count; the byte cap (when set)
        // still applies independently.
        let mut states = vec![ProcessState::new("a", 0, max_bytes_cap)];
        for i in 0..100 {
            apply_event(&mut states, &line(0, &format!("{i}")));
        }
        if max_bytes_cap == 0 {
            assert_eq!(states[0].len(), 100);
        } else {
            assert!(states[0].byte_size() <= max_bytes_cap);
        }
    }

    #[test]
    fn apply_event_out_of_range_index_is_ignored() {
        let mut states = vec![ProcessState::new("a", 10, 0), ProcessState::new("b", 10, 0)];
        apply_event(&mut states, &line(2, "lost"));
        apply_event(&mut states, &exited(99, Some(ProcessFailure::ExitCode { code: 1 })));
        assert!(states[0].is_empty());
        assert!(states[1].is_empty());
        assert!(states.iter().all(|s| !s.done()));
    }

    #[test]
    fn apply_event_exited_marks_done_and_stores_failure() {
        let mut states = vec![ProcessState::new("a", 10, 0)];
        apply_event(
            &mut states,
            &exited(0, Some(ProcessFailure::ExitCode { code: 7 })),
        );
        assert!(states[0].done());
        assert!(!states[0].running());
        assert_eq!(
            states[0].failure(),
            Some(&ProcessFailure::ExitCode { code: 7 })
        );
        assert!(states[0].dirty());
    }

    #[test]
    fn apply_event_redelivered_exited_overwrites_failure() {
        let mut states = vec![ProcessState::new("a", 10, 0)];
        apply_event(
            &mut states,
            &exited(0, Some(ProcessFailure::ExitCode { code: 7 })),
        );
        apply_event(&mut states, &exited(0, None));
        assert!(states[0].done());
        assert_eq!(states[0].failure(), None);
    }

    #[test]
    fn apply_event_marks_dirty_and_clear_dirty_resets() {
        let mut states = vec![ProcessState::new("a", 10, 0)];
        states[0].clear_dirty();
        assert!(!states[0].dirty());

        apply_event(&mut states, &line(0, "hello"));
        assert!(states[0].dirty());
    }

    #[test]
    fn aggregate_exit_code_is_one_if_any_failure() {
        let mut states = vec![ProcessState::new("a", 10, 0), ProcessState::new("b", 10, 0)];
        apply_event(&mut states, &exited(0, None));
        apply_event(
            &mut states,
            &exited(1, Some(ProcessFailure::ExitCode { code: 1 })),
        );
        assert_eq!(aggregate_exit_code(&states), 1);
    }

    #[test]
    fn aggregate_exit_code_is_zero_when_all_succeed() {
        let mut states = vec![ProcessState::new("a", 10, 0)];
        apply_event(&mut states, &exited(0, None));
        assert_eq!(aggregate_exit_code(&states), 0);
    }
}
