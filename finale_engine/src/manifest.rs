use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use finale_script::{ResourceUri, StateInfo};
use serde::{Deserialize, Serialize};

/// Everything the recording host can resolve, loaded from a JSON file.
///
/// List-valued resources get 1-based handles in file order; lookups are
/// case-insensitive like the game's own lump and definition lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceManifest {
    pub sounds: Vec<String>,
    pub music: Vec<String>,
    pub mobjs: BTreeMap<String, MobjEntry>,
    pub states: Vec<StateEntry>,
    /// Scheme-qualified, e.g. `Flats:FLOOR7_2`.
    pub materials: Vec<String>,
    pub fonts: Vec<String>,
    pub patches: Vec<String>,
    pub raw_images: Vec<String>,
    pub external_images: Vec<String>,
    pub text_defs: BTreeMap<String, String>,
    pub lumps: BTreeMap<String, String>,
    pub conditions: BTreeMap<String, bool>,
    pub netgame: bool,
    pub game_mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobjEntry {
    pub see_sound: Option<String>,
    pub death_sound: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub name: String,
    pub sprite: i32,
    #[serde(default)]
    pub frame: i32,
    pub tics: i32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub flip: bool,
}

impl ResourceManifest {
    /// Reads `path`, or returns an empty manifest when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading resource manifest {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing resource manifest {}", path.display()))
    }

    pub fn sound_id(&self, name: &str) -> Option<i32> {
        handle(&self.sounds, name)
    }

    pub fn sound_name(&self, id: i32) -> String {
        name_of(&self.sounds, id)
    }

    pub fn music_id(&self, name: &str) -> Option<i32> {
        handle(&self.music, name)
    }

    pub fn music_name(&self, id: i32) -> String {
        name_of(&self.music, id)
    }

    pub fn mobj(&self, name: &str) -> Option<&MobjEntry> {
        lookup(&self.mobjs, name)
    }

    pub fn state_id(&self, name: &str) -> Option<i32> {
        self.states
            .iter()
            .position(|state| state.name.eq_ignore_ascii_case(name))
            .map(|index| index as i32 + 1)
    }

    pub fn state_info(&self, id: i32) -> Option<StateInfo> {
        let entry = self.states.get(usize::try_from(id).ok()?.checked_sub(1)?)?;
        let next_state = entry
            .next
            .as_deref()
            .and_then(|next| self.state_id(next))
            .unwrap_or(0);
        Some(StateInfo {
            sprite: entry.sprite,
            frame: entry.frame,
            tics: entry.tics,
            next_state,
            flip: entry.flip,
        })
    }

    pub fn material_id(&self, uri: &ResourceUri) -> Option<i32> {
        uri_handle(&self.materials, uri)
    }

    pub fn font_id(&self, uri: &ResourceUri) -> Option<i32> {
        uri_handle(&self.fonts, uri)
    }

    pub fn patch_id(&self, name: &str) -> Option<i32> {
        handle(&self.patches, name)
    }

    pub fn raw_image_id(&self, name: &str) -> Option<i32> {
        handle(&self.raw_images, name)
    }

    pub fn external_image_id(&self, path: &str) -> Option<i32> {
        handle(&self.external_images, path)
    }

    pub fn text_def(&self, id: &str) -> Option<&str> {
        lookup(&self.text_defs, id).map(String::as_str)
    }

    pub fn lump(&self, name: &str) -> Option<&str> {
        lookup(&self.lumps, name).map(String::as_str)
    }

    pub fn condition(&self, token: &str) -> Option<bool> {
        lookup(&self.conditions, token).copied()
    }
}

fn handle(names: &[String], name: &str) -> Option<i32> {
    names
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(name))
        .map(|index| index as i32 + 1)
}

fn name_of(names: &[String], id: i32) -> String {
    usize::try_from(id)
        .ok()
        .and_then(|id| id.checked_sub(1))
        .and_then(|index| names.get(index))
        .cloned()
        .unwrap_or_else(|| format!("#{id}"))
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, key: &str) -> Option<&'a T> {
    map.iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

/// An entry without a scheme matches a URI with any scheme.
fn uri_handle(entries: &[String], uri: &ResourceUri) -> Option<i32> {
    entries
        .iter()
        .position(|entry| {
            let entry = ResourceUri::parse(entry, None);
            let scheme_matches = match (&entry.scheme, &uri.scheme) {
                (Some(ours), Some(theirs)) => ours.eq_ignore_ascii_case(theirs),
                (None, _) => true,
                (Some(_), None) => false,
            };
            scheme_matches && entry.path.eq_ignore_ascii_case(&uri.path)
        })
        .map(|index| index as i32 + 1)
}
