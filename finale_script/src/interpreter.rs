mod handlers;

use std::rc::Rc;

use log::{debug, info, warn};

use crate::command::{find_command, Directive};
use crate::error::{Result, ScriptError};
use crate::events::{EventHandlers, InputEvent};
use crate::flow::FlowState;
use crate::host::FinaleHost;
use crate::operand::prepare_command_operands;
use crate::page::{PageId, Pages};
use crate::tokenizer::Tokenizer;
use crate::widget::WidgetKind;

/// Game ticks per second.
pub const TICRATE: u32 = 35;

/// Input is ignored for this many ticks after the script starts so the key
/// press that triggered the finale does not also skip it.
pub const EVENT_GRACE_TICKS: u32 = 20;

pub fn seconds_to_ticks(seconds: f32) -> u32 {
    (seconds * TICRATE as f32).round().max(0.0) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Flags {
    stopped: bool,
    suspended: bool,
    paused: bool,
    can_skip: bool,
    eat_events: bool,
    show_menu: bool,
    cmd_executed: bool,
    pages_shown: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            stopped: false,
            suspended: false,
            paused: false,
            can_skip: true,
            eat_events: false,
            show_menu: true,
            cmd_executed: false,
            pages_shown: false,
        }
    }
}

/// Runs one finale script against a host.
#[derive(Debug)]
pub struct Interpreter {
    id: u32,
    host: Rc<dyn FinaleHost>,
    tokenizer: Tokenizer,
    flow: FlowState,
    flags: Flags,
    timer: u32,
    wait: u32,
    in_time: u32,
    waiting_text: Option<String>,
    waiting_anim: Option<String>,
    handlers: EventHandlers,
    pages: Pages,
}

impl Interpreter {
    /// Copies `script`, runs its leading `OnLoad { ... }` block if present and
    /// leaves the cursor at the first executable token.
    pub fn load(id: u32, script: &str, host: Rc<dyn FinaleHost>) -> Result<Self> {
        let mut interpreter = Interpreter {
            id,
            host,
            tokenizer: Tokenizer::new(script),
            flow: FlowState::new(),
            flags: Flags::default(),
            timer: 0,
            wait: 0,
            in_time: 0,
            waiting_text: None,
            waiting_anim: None,
            handlers: EventHandlers::new(),
            pages: Pages::new(),
        };
        if let Err(err) = interpreter.run_onload_directive() {
            interpreter.stop();
            return Err(err);
        }
        info!(
            "finale {id} loaded ({} bytes, body at {})",
            script.len(),
            interpreter.tokenizer.script_begin()
        );
        Ok(interpreter)
    }

    fn run_onload_directive(&mut self) -> Result<()> {
        let is_onload = self
            .tokenizer
            .next_token()?
            .is_some_and(|token| token.eq_ignore_ascii_case("OnLoad"));
        if !is_onload {
            self.tokenizer.rewind_to_start();
            self.tokenizer.mark_script_begin();
            return Ok(());
        }

        if self.tokenizer.next_token()? != Some("{") {
            warn!("finale {}: expected \"{{\" after OnLoad", self.id);
            self.tokenizer.rewind_to_start();
            self.tokenizer.mark_script_begin();
            return Ok(());
        }

        loop {
            let Some(token) = self.tokenizer.next_token()?.map(str::to_string) else {
                return Err(ScriptError::UnterminatedDirective {
                    directive: Directive::OnLoad,
                });
            };
            if token == "}" {
                break;
            }
            self.execute_command(&token, Directive::OnLoad)?;
        }
        self.tokenizer.mark_script_begin();
        Ok(())
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut Pages {
        &mut self.pages
    }

    pub fn flow(&self) -> &FlowState {
        &self.flow
    }

    pub fn event_handlers(&self) -> &EventHandlers {
        &self.handlers
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn wait_ticks(&self) -> u32 {
        self.wait
    }

    pub fn in_time(&self) -> u32 {
        self.in_time
    }

    pub fn waiting_text(&self) -> Option<&str> {
        self.waiting_text.as_deref()
    }

    pub fn waiting_anim(&self) -> Option<&str> {
        self.waiting_anim.as_deref()
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stopped
    }

    pub fn is_suspended(&self) -> bool {
        self.flags.suspended
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused
    }

    pub fn can_skip(&self) -> bool {
        self.flags.can_skip
    }

    pub fn eats_events(&self) -> bool {
        self.flags.eat_events
    }

    /// Unhandled input should bring up the menu.
    pub fn is_menu_trigger(&self) -> bool {
        self.flags.show_menu
    }

    pub fn command_executed(&self) -> bool {
        self.flags.cmd_executed
    }

    /// Advances the pages and, when allowed, executes commands until the
    /// script waits or ends. Returns `true` once the script has terminated.
    pub fn run_ticks(&mut self, process_commands: bool) -> Result<bool> {
        if self.flags.stopped {
            return Ok(true);
        }
        let sharp = self.host.is_sharp_tick();
        if sharp {
            self.timer += 1;
            self.pages.tick();
            self.flush_frame_sounds();
        }

        if !process_commands || self.flags.suspended || !sharp {
            return Ok(false);
        }

        if self.wait > 0 {
            self.wait -= 1;
            if self.wait > 0 {
                return Ok(false);
            }
        }
        if self.flow.goto_end {
            self.stop();
            return Ok(true);
        }
        if self.flags.paused {
            return Ok(false);
        }
        if !self.widget_wait_resolved(WidgetKind::Text)
            || !self.widget_wait_resolved(WidgetKind::Anim)
        {
            return Ok(false);
        }

        while self.wait == 0
            && self.waiting_text.is_none()
            && self.waiting_anim.is_none()
            && !self.flow.goto_end
            && !self.flags.paused
            && !self.flags.suspended
        {
            match self.execute_next_command() {
                Ok(true) => {}
                Ok(false) => {
                    self.stop();
                    return Ok(true);
                }
                Err(err) => {
                    self.stop();
                    return Err(err);
                }
            }
        }
        Ok(false)
    }

    /// Clears the wait on `kind` once its widget reports completion. A
    /// widget deleted while waited on counts as complete.
    fn widget_wait_resolved(&mut self, kind: WidgetKind) -> bool {
        let slot = match kind {
            WidgetKind::Text => &mut self.waiting_text,
            WidgetKind::Anim => &mut self.waiting_anim,
        };
        let Some(name) = slot.as_deref() else {
            return true;
        };
        let complete = self
            .pages
            .page(PageId::for_kind(kind))
            .find(name)
            .map_or(true, |widget| widget.is_complete());
        if complete {
            *slot = None;
        }
        complete
    }

    fn flush_frame_sounds(&mut self) {
        let mut sounds = Vec::new();
        for widget in &mut self.pages.anims.widgets {
            if let Some(anim) = widget.as_anim_mut() {
                sounds.append(&mut anim.pending_sounds);
            }
        }
        for sound in sounds {
            self.host.play_sound(sound, 1.0);
        }
    }

    /// Reads and runs (or skips) one command. `Ok(false)` at end of script.
    pub fn execute_next_command(&mut self) -> Result<bool> {
        let Some(token) = self.tokenizer.next_token()?.map(str::to_string) else {
            return Ok(false);
        };
        let executed = self.execute_command(&token, Directive::Normal)?;
        if executed && !self.flags.pages_shown && !self.flags.suspended {
            self.flags.pages_shown = true;
            self.pages.set_visible(true);
        }
        Ok(true)
    }

    /// Returns whether the command actually ran.
    fn execute_command(&mut self, token: &str, directive: Directive) -> Result<bool> {
        if token == ";" {
            self.flow.end_do_block();
            return Ok(false);
        }

        let Some(descriptor) = find_command(token) else {
            debug!("finale {}: ignoring unknown command \"{token}\"", self.id);
            return Ok(false);
        };
        if descriptor.exclude.contains(directive) {
            return Err(ScriptError::DirectiveViolation {
                command: descriptor.name,
                directive,
            });
        }

        let operands = prepare_command_operands(descriptor, &mut self.tokenizer)?;
        if self.flow.should_skip(descriptor) {
            return Ok(false);
        }

        self.dispatch(descriptor, &operands);
        self.flags.cmd_executed = true;
        self.flow.command_executed();
        Ok(true)
    }

    /// Starts skipping until `MARKER marker`, rescanning from Script-Begin.
    pub fn skip_to_marker(&mut self, marker: &str) {
        if !self.flow.goto_marker(marker) {
            return;
        }
        self.tokenizer.rewind();
        self.wait = 0;
        self.waiting_text = None;
        self.waiting_anim = None;
    }

    /// Host or user skip request. Returns whether the request was consumed.
    pub fn skip(&mut self) -> bool {
        if self.flags.can_skip && !self.flags.paused {
            if let Some(name) = self.waiting_text.clone() {
                if let Some(text) = self
                    .pages
                    .texts
                    .find_mut(&name)
                    .and_then(|widget| widget.as_text_mut())
                {
                    // Show the rest of the text before skipping anything.
                    text.accelerate();
                    return true;
                }
            }
        }

        if self.flags.paused {
            self.waiting_text = None;
            self.waiting_anim = None;
            self.flags.paused = false;
            self.wait = 0;
            return true;
        }

        if self.flags.can_skip {
            debug!("finale {}: skipping", self.id);
            self.waiting_text = None;
            self.waiting_anim = None;
            self.flow.skipping = true;
            self.wait = 0;
            return true;
        }

        self.flags.eat_events
    }

    /// Delivers an input event. Returns whether it was consumed.
    pub fn handle_event(&mut self, event: &InputEvent) -> bool {
        if self.flags.stopped || self.flags.suspended {
            return false;
        }
        if self.timer < EVENT_GRACE_TICKS {
            return false;
        }

        if self.host.is_client() {
            if !self.flags.can_skip && !self.flags.paused {
                return false;
            }
            if !event.is_toggle_down() {
                return false;
            }
            self.host.request_skip(self.id);
            return true;
        }

        if event.is_toggle_down() {
            if let Some(marker) = self.handlers.find(event).map(|handler| handler.marker.clone()) {
                self.skip_to_marker(&marker);
                return self.flags.eat_events;
            }
        }

        if !self.flags.can_skip && !self.flags.paused {
            return false;
        }
        if !event.is_toggle_down() {
            return false;
        }

        self.host.broadcast_skip(self.id);
        self.skip()
    }

    /// Asks the script to end; takes effect at the next wait-check.
    pub fn request_end(&mut self) {
        self.flow.goto_end = true;
    }

    pub fn suspend(&mut self) {
        if self.flags.suspended {
            return;
        }
        self.flags.suspended = true;
        self.pages.set_visible(false);
    }

    pub fn resume(&mut self) {
        if !self.flags.suspended {
            return;
        }
        self.flags.suspended = false;
        if self.flags.pages_shown {
            self.pages.set_visible(true);
        }
    }

    /// Terminates the script and releases its pages and event handlers.
    pub fn stop(&mut self) {
        if self.flags.stopped {
            return;
        }
        self.flags.stopped = true;
        self.pages.set_visible(false);
        self.pages.clear();
        self.handlers.clear();
        self.waiting_text = None;
        self.waiting_anim = None;
        info!("finale {} stopped after {} ticks", self.id, self.timer);
        self.host.finale_stopped(self.id);
    }
}

#[cfg(test)]
mod tests;
