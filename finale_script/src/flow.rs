use log::debug;

use crate::command::CommandDescriptor;

/// Skip/goto bookkeeping for one interpreter.
///
/// Free skip, condition skip and goto-skip are independent and may all be
/// active at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowState {
    /// Free skip; cleared by `SKIPHERE`.
    pub skipping: bool,
    /// Condition skip pending for the next command (or DO block).
    pub skip_next: bool,
    /// The previous command was condition-skipped.
    pub last_skipped: bool,
    /// Searching for `goto_target`.
    pub goto_skip: bool,
    pub goto_target: Option<String>,
    /// Stop the script at the next wait-check.
    pub goto_end: bool,
    /// Depth of DO blocks entered under a condition skip.
    pub do_level: u32,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decides whether `descriptor` must be skipped. A skipped command also
    /// consumes the pending condition skip unless a DO block is open.
    pub fn should_skip(&mut self, descriptor: &CommandDescriptor) -> bool {
        let condition_skip = self.skip_next && !descriptor.when_condition_skipping;
        let free_skip = (self.skipping || self.goto_skip) && !descriptor.when_skipping;
        if !(condition_skip || free_skip) {
            return false;
        }
        if self.do_level == 0 {
            if self.skip_next {
                self.last_skipped = true;
            }
            self.skip_next = false;
        }
        true
    }

    pub fn command_executed(&mut self) {
        self.last_skipped = false;
    }

    /// Handles a bare `;`.
    pub fn end_do_block(&mut self) {
        if self.do_level == 0 {
            return;
        }
        self.do_level -= 1;
        if self.do_level == 0 {
            self.skip_next = false;
            self.last_skipped = true;
        }
    }

    /// `DO` only opens a skipped block when a condition skip is pending.
    pub fn begin_do(&mut self) {
        if self.skip_next {
            self.do_level += 1;
        }
    }

    pub fn set_condition(&mut self, value: bool) {
        self.skip_next = !value;
    }

    pub fn else_branch(&mut self) {
        self.skip_next = !self.last_skipped;
    }

    /// Starts a goto search; the caller rewinds the cursor to Script-Begin.
    pub fn goto_marker(&mut self, marker: &str) -> bool {
        if marker.is_empty() {
            return false;
        }
        debug!("goto {marker}");
        self.goto_target = Some(marker.to_string());
        self.goto_skip = true;
        true
    }

    pub fn reach_marker(&mut self, marker: &str) {
        let matches = self
            .goto_target
            .as_deref()
            .is_some_and(|target| target.eq_ignore_ascii_case(marker));
        if matches && self.goto_skip {
            debug!("marker {marker} reached");
            self.goto_skip = false;
        }
    }
}
