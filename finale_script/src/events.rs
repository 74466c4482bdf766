use serde::Serialize;

/// Input device an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Keyboard,
    Mouse,
    Joystick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    Down,
    Up,
    Repeat,
}

/// Input event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    Toggle {
        device: Device,
        id: i32,
        state: ToggleState,
    },
    Axis {
        device: Device,
        id: i32,
        position: f32,
    },
    Angle {
        device: Device,
        id: i32,
        position: f32,
    },
}

impl InputEvent {
    pub fn key_down(id: i32) -> Self {
        InputEvent::Toggle {
            device: Device::Keyboard,
            id,
            state: ToggleState::Down,
        }
    }

    pub fn key_up(id: i32) -> Self {
        InputEvent::Toggle {
            device: Device::Keyboard,
            id,
            state: ToggleState::Up,
        }
    }

    pub fn is_toggle_down(&self) -> bool {
        matches!(
            self,
            InputEvent::Toggle {
                state: ToggleState::Down,
                ..
            }
        )
    }

    pub fn template(&self) -> EventTemplate {
        match *self {
            InputEvent::Toggle { device, id, .. } => EventTemplate {
                device,
                control: Control::Toggle(id),
            },
            InputEvent::Axis { device, id, .. } => EventTemplate {
                device,
                control: Control::Axis(id),
            },
            InputEvent::Angle { device, id, .. } => EventTemplate {
                device,
                control: Control::Angle(id),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Control {
    Toggle(i32),
    Axis(i32),
    Angle(i32),
}

/// Device + event kind + control id; the part of an event a handler keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventTemplate {
    pub device: Device,
    pub control: Control,
}

impl EventTemplate {
    pub fn key(id: i32) -> Self {
        EventTemplate {
            device: Device::Keyboard,
            control: Control::Toggle(id),
        }
    }

    pub fn matches(&self, event: &InputEvent) -> bool {
        *self == event.template()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventHandler {
    pub template: EventTemplate,
    pub marker: String,
}

/// Ordered (template, marker) associations set up by `ONKEY`.
#[derive(Debug, Clone, Default)]
pub struct EventHandlers {
    handlers: Vec<EventHandler>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `marker` for `template`; an existing handler for the same
    /// template keeps its place and is left untouched.
    pub fn add(&mut self, template: EventTemplate, marker: &str) -> bool {
        if self.find_template(&template).is_some() {
            return false;
        }
        self.handlers.push(EventHandler {
            template,
            marker: marker.to_string(),
        });
        true
    }

    pub fn remove(&mut self, template: &EventTemplate) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|handler| handler.template != *template);
        self.handlers.len() != before
    }

    pub fn find(&self, event: &InputEvent) -> Option<&EventHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.template.matches(event))
    }

    fn find_template(&self, template: &EventTemplate) -> Option<&EventHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.template == *template)
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

pub const KEY_ESCAPE: i32 = 27;
pub const KEY_ENTER: i32 = 13;
pub const KEY_TAB: i32 = 9;
pub const KEY_BACKSPACE: i32 = 127;
pub const KEY_SPACE: i32 = 32;
pub const KEY_UPARROW: i32 = 0xad;
pub const KEY_DOWNARROW: i32 = 0xaf;
pub const KEY_LEFTARROW: i32 = 0xac;
pub const KEY_RIGHTARROW: i32 = 0xae;
pub const KEY_PAUSE: i32 = 0xff;
pub const KEY_F1: i32 = 0x80 + 0x3b;

/// Maps a key name as written in `ONKEY` to its key code.
pub fn key_code(name: &str) -> Option<i32> {
    let lower = name.to_ascii_lowercase();
    let code = match lower.as_str() {
        "escape" | "esc" => KEY_ESCAPE,
        "enter" | "return" => KEY_ENTER,
        "tab" => KEY_TAB,
        "backspace" | "bkspc" => KEY_BACKSPACE,
        "space" => KEY_SPACE,
        "up" | "uparrow" => KEY_UPARROW,
        "down" | "downarrow" => KEY_DOWNARROW,
        "left" | "leftarrow" => KEY_LEFTARROW,
        "right" | "rightarrow" => KEY_RIGHTARROW,
        "pause" => KEY_PAUSE,
        _ => {
            if let Some(number) = lower.strip_prefix('f').and_then(|n| n.parse::<i32>().ok()) {
                if (1..=10).contains(&number) {
                    return Some(KEY_F1 + number - 1);
                }
                if (11..=12).contains(&number) {
                    return Some(0x80 + 0x57 + number - 11);
                }
                return None;
            }
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_graphic() => c as i32,
                _ => return None,
            }
        }
    };
    Some(code)
}
