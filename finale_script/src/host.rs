use std::fmt;

use crate::operand::ResourceUri;

/// Sounds a map object type plays when it sees a target or dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MobjSounds {
    pub see_sound: i32,
    pub death_sound: i32,
}

/// One entry of the host's state table, enough to step a sprite animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    pub sprite: i32,
    pub frame: i32,
    pub tics: i32,
    /// Zero ends the chain.
    pub next_state: i32,
    pub flip: bool,
}

/// Call-outs the interpreter makes into the engine.
///
/// Every lookup returns `None` for an unknown name; the interpreter logs
/// and degrades instead of failing.
pub trait FinaleHost {
    fn resolve_sound(&self, _name: &str) -> Option<i32> {
        None
    }
    fn resolve_music(&self, _name: &str) -> Option<i32> {
        None
    }
    fn resolve_mobj_type(&self, _name: &str) -> Option<MobjSounds> {
        None
    }
    fn resolve_state(&self, _name: &str) -> Option<i32> {
        None
    }
    fn state_info(&self, _state: i32) -> Option<StateInfo> {
        None
    }
    fn resolve_material(&self, _uri: &ResourceUri) -> Option<i32> {
        None
    }
    fn resolve_font(&self, _uri: &ResourceUri) -> Option<i32> {
        None
    }
    fn resolve_patch(&self, _name: &str) -> Option<i32> {
        None
    }
    fn resolve_raw_image(&self, _lump: &str) -> Option<i32> {
        None
    }
    fn resolve_external_image(&self, _path: &str) -> Option<i32> {
        None
    }
    fn text_definition(&self, _id: &str) -> Option<String> {
        None
    }
    fn lump_text(&self, _lump: &str) -> Option<String> {
        None
    }

    /// Externally registered `IF` conditions. `None` means nobody claimed
    /// the token.
    fn evaluate_condition(&self, _token: &str) -> Option<bool> {
        None
    }
    fn is_netgame(&self) -> bool {
        false
    }
    fn game_mode(&self) -> &str {
        ""
    }
    fn is_client(&self) -> bool {
        false
    }
    /// Whether this call lands on a whole game tick.
    fn is_sharp_tick(&self) -> bool {
        true
    }

    fn play_sound(&self, _sound: i32, _volume: f32) {}
    fn play_music(&self, _music: i32, _looped: bool) {}
    fn stop_music(&self) {}
    fn execute_command(&self, _command: &str) {}
    fn play_demo(&self, _path: &str) {}
    fn broadcast_skip(&self, _finale: u32) {}
    fn request_skip(&self, _finale: u32) {}
    fn finale_stopped(&self, _finale: u32) {}
}

impl fmt::Debug for dyn FinaleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FinaleHost")
    }
}

/// Host that knows no resources and ignores every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl FinaleHost for NullHost {}
