use std::cell::{Cell, RefCell};

use finale_script::{FinaleHost, MobjSounds, ResourceUri, StateInfo};
use serde::Serialize;

use crate::manifest::ResourceManifest;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    PlaySound { name: String, volume: f32 },
    PlayMusic { name: String, looped: bool },
    StopMusic,
    ExecuteCommand { command: String },
    PlayDemo { path: String },
    BroadcastSkip { finale: u32 },
    RequestSkip { finale: u32 },
    FinaleStopped { finale: u32 },
    KeyPress { key: String, consumed: bool },
    SkipRequest { consumed: bool },
    /// A key the script let through while menu triggering is enabled.
    OpenMenu,
    Resumed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoggedHostEvent {
    pub tick: u32,
    #[serde(flatten)]
    pub event: HostEvent,
}

/// Host that answers lookups from a manifest and records every request the
/// script makes, stamped with the tick it happened on.
#[derive(Debug, Default)]
pub struct RecordingHost {
    manifest: ResourceManifest,
    client: bool,
    tick: Cell<u32>,
    events: RefCell<Vec<LoggedHostEvent>>,
}

impl RecordingHost {
    pub fn new(manifest: ResourceManifest, client: bool) -> Self {
        Self {
            manifest,
            client,
            ..Self::default()
        }
    }

    pub fn set_tick(&self, tick: u32) {
        self.tick.set(tick);
    }

    pub fn record(&self, event: HostEvent) {
        self.events.borrow_mut().push(LoggedHostEvent {
            tick: self.tick.get(),
            event,
        });
    }

    pub fn events(&self) -> Vec<LoggedHostEvent> {
        self.events.borrow().clone()
    }
}

impl FinaleHost for RecordingHost {
    fn resolve_sound(&self, name: &str) -> Option<i32> {
        self.manifest.sound_id(name)
    }

    fn resolve_music(&self, name: &str) -> Option<i32> {
        self.manifest.music_id(name)
    }

    fn resolve_mobj_type(&self, name: &str) -> Option<MobjSounds> {
        let entry = self.manifest.mobj(name)?;
        let sound = |name: &Option<String>| {
            name.as_deref()
                .and_then(|name| self.manifest.sound_id(name))
                .unwrap_or(0)
        };
        Some(MobjSounds {
            see_sound: sound(&entry.see_sound),
            death_sound: sound(&entry.death_sound),
        })
    }

    fn resolve_state(&self, name: &str) -> Option<i32> {
        self.manifest.state_id(name)
    }

    fn state_info(&self, state: i32) -> Option<StateInfo> {
        self.manifest.state_info(state)
    }

    fn resolve_material(&self, uri: &ResourceUri) -> Option<i32> {
        self.manifest.material_id(uri)
    }

    fn resolve_font(&self, uri: &ResourceUri) -> Option<i32> {
        self.manifest.font_id(uri)
    }

    fn resolve_patch(&self, name: &str) -> Option<i32> {
        self.manifest.patch_id(name)
    }

    fn resolve_raw_image(&self, lump: &str) -> Option<i32> {
        self.manifest.raw_image_id(lump)
    }

    fn resolve_external_image(&self, path: &str) -> Option<i32> {
        self.manifest.external_image_id(path)
    }

    fn text_definition(&self, id: &str) -> Option<String> {
        self.manifest.text_def(id).map(str::to_string)
    }

    fn lump_text(&self, lump: &str) -> Option<String> {
        self.manifest.lump(lump).map(str::to_string)
    }

    fn evaluate_condition(&self, token: &str) -> Option<bool> {
        self.manifest.condition(token)
    }

    fn is_netgame(&self) -> bool {
        self.manifest.netgame
    }

    fn game_mode(&self) -> &str {
        &self.manifest.game_mode
    }

    fn is_client(&self) -> bool {
        self.client
    }

    fn play_sound(&self, sound: i32, volume: f32) {
        self.record(HostEvent::PlaySound {
            name: self.manifest.sound_name(sound),
            volume,
        });
    }

    fn play_music(&self, music: i32, looped: bool) {
        self.record(HostEvent::PlayMusic {
            name: self.manifest.music_name(music),
            looped,
        });
    }

    fn stop_music(&self) {
        self.record(HostEvent::StopMusic);
    }

    fn execute_command(&self, command: &str) {
        self.record(HostEvent::ExecuteCommand {
            command: command.to_string(),
        });
    }

    fn play_demo(&self, path: &str) {
        self.record(HostEvent::PlayDemo {
            path: path.to_string(),
        });
    }

    fn broadcast_skip(&self, finale: u32) {
        self.record(HostEvent::BroadcastSkip { finale });
    }

    fn request_skip(&self, finale: u32) {
        self.record(HostEvent::RequestSkip { finale });
    }

    fn finale_stopped(&self, finale: u32) {
        self.record(HostEvent::FinaleStopped { finale });
    }
}
