use log::{debug, warn};

use super::{seconds_to_ticks, Interpreter};
use crate::command::{CommandDescriptor, CommandId};
use crate::events::{key_code, EventTemplate};
use crate::operand::{Operand, ResourceUri};
use crate::page::{PageId, NUM_PREDEFINED_COLORS, NUM_PREDEFINED_FONTS};
use crate::widget::{set_all, AnimWidget, FrameImage, TextWidget, Widget, WidgetBase, WidgetKind};

const UNDEFINED_TEXT: &str = "(undefined)";
const MISSING_LUMP_TEXT: &str = "(not found)";

/// Which end of a rect's gradient a color command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RectEnd {
    Top,
    Bottom,
    Both,
}

impl RectEnd {
    fn parse(text: &str) -> Self {
        if text.eq_ignore_ascii_case("top") {
            RectEnd::Top
        } else if text.eq_ignore_ascii_case("bottom") {
            RectEnd::Bottom
        } else {
            RectEnd::Both
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageSource {
    Patch,
    Raw,
    External,
}

impl Interpreter {
    pub(super) fn dispatch(&mut self, descriptor: &CommandDescriptor, ops: &[Operand]) {
        let steps = self.in_time;
        match descriptor.id {
            CommandId::Do => self.flow.begin_do(),
            CommandId::End => {
                // Terminates at the next tick's wait-check.
                self.flow.goto_end = true;
                self.wait = 1;
            }
            CommandId::If => {
                let value = self.evaluate_condition(ops[0].as_str());
                self.flow.set_condition(value);
            }
            CommandId::IfNot => {
                let value = self.evaluate_condition(ops[0].as_str());
                self.flow.set_condition(!value);
            }
            CommandId::Else => self.flow.else_branch(),
            CommandId::GoTo => self.skip_to_marker(ops[0].as_str()),
            CommandId::Marker => self.flow.reach_marker(ops[0].as_str()),
            CommandId::InTime => self.in_time = seconds_to_ticks(ops[0].as_float()),
            CommandId::Pause => self.flags.paused = true,
            CommandId::Tic => self.wait = 1,
            CommandId::Wait => self.wait = seconds_to_ticks(ops[0].as_float()),
            CommandId::WaitText => {
                let name = ops[0].as_str();
                self.pages.find_or_create(WidgetKind::Text, name);
                self.waiting_text = Some(name.to_string());
            }
            CommandId::WaitAnim => {
                let name = ops[0].as_str();
                self.pages.find_or_create(WidgetKind::Anim, name);
                self.waiting_anim = Some(name.to_string());
            }
            CommandId::CanSkip => self.flags.can_skip = true,
            CommandId::NoSkip => self.flags.can_skip = false,
            CommandId::SkipHere => self.flow.skipping = false,
            CommandId::Events => self.flags.eat_events = true,
            CommandId::NoEvents => self.flags.eat_events = false,
            CommandId::OnKey => match key_code(ops[0].as_str()) {
                Some(code) => {
                    self.handlers.add(EventTemplate::key(code), ops[1].as_str());
                }
                None => warn!("ONKEY: unknown key \"{}\"", ops[0].as_str()),
            },
            CommandId::UnsetKey => match key_code(ops[0].as_str()) {
                Some(code) => {
                    self.handlers.remove(&EventTemplate::key(code));
                }
                None => warn!("UNSETKEY: unknown key \"{}\"", ops[0].as_str()),
            },

            CommandId::Color => {
                let rgb = [ops[0].as_float(), ops[1].as_float(), ops[2].as_float()];
                let page = self.pages.page_mut(PageId::Anims);
                for color in [&mut page.bg_top_color, &mut page.bg_bottom_color] {
                    for (animator, value) in color.iter_mut().zip(rgb) {
                        animator.set(value, steps);
                    }
                }
            }
            CommandId::ColorAlpha => {
                let rgba = floats4(&ops[0..4]);
                let page = self.pages.page_mut(PageId::Anims);
                set_all(&mut page.bg_top_color, rgba, steps);
                set_all(&mut page.bg_bottom_color, rgba, steps);
            }
            CommandId::BgMaterial => {
                let background = ops[0]
                    .as_uri()
                    .filter(|uri| self.host.resolve_material(uri).is_some())
                    .cloned();
                if background.is_none() {
                    warn!(
                        "{}: material \"{}\" not found",
                        descriptor.name,
                        ops[0].as_uri().map(ToString::to_string).unwrap_or_default()
                    );
                }
                self.pages.page_mut(PageId::Anims).background = background;
            }
            CommandId::NoBgMaterial => self.pages.page_mut(PageId::Anims).background = None,
            CommandId::OffsetX => self.pages.anims.offset[0].set(ops[0].as_float(), steps),
            CommandId::OffsetY => self.pages.anims.offset[1].set(ops[0].as_float(), steps),
            CommandId::Filter => {
                let rgba = floats4(&ops[0..4]);
                set_all(&mut self.pages.page_mut(PageId::Texts).filter, rgba, steps);
            }

            CommandId::Sound => self.play_named_sound(ops[0].as_str(), 1.0),
            CommandId::SoundAt => {
                let volume = ops[1].as_float().clamp(0.0, 1.0);
                self.play_named_sound(ops[0].as_str(), volume);
            }
            CommandId::SeeSound | CommandId::DieSound => {
                let name = ops[0].as_str();
                match self.host.resolve_mobj_type(name) {
                    Some(sounds) => {
                        let sound = if descriptor.id == CommandId::SeeSound {
                            sounds.see_sound
                        } else {
                            sounds.death_sound
                        };
                        if sound > 0 {
                            self.host.play_sound(sound, 1.0);
                        }
                    }
                    None => warn!("{}: unknown thing type \"{name}\"", descriptor.name),
                }
            }
            CommandId::Music | CommandId::MusicOnce => {
                let name = ops[0].as_str();
                match self.host.resolve_music(name) {
                    Some(music) => self.host.play_music(music, descriptor.id == CommandId::Music),
                    None => warn!("{}: music \"{name}\" not found", descriptor.name),
                }
            }
            CommandId::NoMusic => self.host.stop_music(),

            CommandId::Delete => {
                let name = ops[0].as_str();
                if !self.pages.delete(name) {
                    debug!("{}: no object named \"{name}\"", descriptor.name);
                }
            }
            CommandId::ObjectOffX => {
                self.with_base(ops, |base| base.pos[0].set(ops[1].as_float(), steps))
            }
            CommandId::ObjectOffY => {
                self.with_base(ops, |base| base.pos[1].set(ops[1].as_float(), steps))
            }
            CommandId::ObjectOffZ => {
                self.with_base(ops, |base| base.pos[2].set(ops[1].as_float(), steps))
            }
            CommandId::ObjectScaleX => {
                self.with_base(ops, |base| base.scale[0].set(ops[1].as_float(), steps))
            }
            CommandId::ObjectScaleY => {
                self.with_base(ops, |base| base.scale[1].set(ops[1].as_float(), steps))
            }
            CommandId::ObjectScaleZ => {
                self.with_base(ops, |base| base.scale[2].set(ops[1].as_float(), steps))
            }
            CommandId::ObjectScale => self.with_base(ops, |base| {
                let factor = ops[1].as_float();
                base.scale[0].set(factor, steps);
                base.scale[1].set(factor, steps);
            }),
            CommandId::ObjectScaleXY => self.with_base(ops, |base| {
                base.scale[0].set(ops[1].as_float(), steps);
                base.scale[1].set(ops[2].as_float(), steps);
            }),
            CommandId::ObjectScaleXYZ => self.with_base(ops, |base| {
                base.scale[0].set(ops[1].as_float(), steps);
                base.scale[1].set(ops[2].as_float(), steps);
                base.scale[2].set(ops[3].as_float(), steps);
            }),
            CommandId::ObjectRgb => {
                let rgb = [ops[1].as_float(), ops[2].as_float(), ops[3].as_float()];
                self.with_widget(ops[0].as_str(), |widget| {
                    for (animator, value) in widget.base_mut().color.iter_mut().zip(rgb) {
                        animator.set(value, steps);
                    }
                    // Rects tint both ends of the gradient.
                    if let Widget::Anim(anim) = widget {
                        if anim.is_rect {
                            for (animator, value) in anim.other_color.iter_mut().zip(rgb) {
                                animator.set(value, steps);
                            }
                        }
                    }
                });
            }
            CommandId::ObjectAlpha => {
                let alpha = ops[1].as_float();
                self.with_widget(ops[0].as_str(), |widget| {
                    widget.base_mut().color[3].set(alpha, steps);
                    if let Widget::Anim(anim) = widget {
                        if anim.is_rect {
                            anim.other_color[3].set(alpha, steps);
                        }
                    }
                });
            }
            CommandId::ObjectAngle => {
                self.with_base(ops, |base| base.angle.set(ops[1].as_float(), steps))
            }

            CommandId::Rect => {
                let anim = self.anim(ops[0].as_str());
                anim.clear_frames();
                anim.is_rect = true;
                anim.base.pos[0].set(ops[1].as_float(), 0);
                anim.base.pos[1].set(ops[2].as_float(), 0);
                anim.size[0].set(ops[3].as_float(), 0);
                anim.size[1].set(ops[4].as_float(), 0);
            }
            CommandId::FillColor | CommandId::EdgeColor => {
                let end = RectEnd::parse(ops[1].as_str());
                let rgba = floats4(&ops[2..6]);
                let fill = descriptor.id == CommandId::FillColor;
                let anim = self.anim(ops[0].as_str());
                let (top, bottom) = if fill {
                    (&mut anim.base.color, &mut anim.other_color)
                } else {
                    (&mut anim.edge_color, &mut anim.other_edge_color)
                };
                if end != RectEnd::Bottom {
                    set_all(top, rgba, steps);
                }
                if end != RectEnd::Top {
                    set_all(bottom, rgba, steps);
                }
            }

            CommandId::Image => {
                let image = self.resolve_image(ops[1].as_str(), ImageSource::Raw);
                self.show_single_frame(ops[0].as_str(), image, None);
            }
            CommandId::ImageAt => {
                let image = self.resolve_image(ops[3].as_str(), ImageSource::Raw);
                let at = (ops[1].as_float(), ops[2].as_float());
                self.show_single_frame(ops[0].as_str(), image, Some(at));
            }
            CommandId::XImage => {
                let image = self.resolve_image(ops[1].as_str(), ImageSource::External);
                self.show_single_frame(ops[0].as_str(), image, None);
            }
            CommandId::Patch => {
                let image = self.resolve_image(ops[3].as_str(), ImageSource::Patch);
                let at = (ops[1].as_float(), ops[2].as_float());
                self.show_single_frame(ops[0].as_str(), image, Some(at));
            }
            CommandId::SetPatch => {
                let image = self.resolve_image(ops[1].as_str(), ImageSource::Patch);
                let anim = self.anim(ops[0].as_str());
                match anim.frames.first_mut() {
                    Some(frame) => frame.image = image,
                    None => {
                        anim.append_frame(image, 0, false);
                    }
                }
            }
            CommandId::ClearAnim => self.anim(ops[0].as_str()).clear_frames(),
            CommandId::Anim | CommandId::AnimImage => {
                let source = if descriptor.id == CommandId::Anim {
                    ImageSource::Patch
                } else {
                    ImageSource::Raw
                };
                let image = self.resolve_image(ops[1].as_str(), source);
                let tics = seconds_to_ticks(ops[2].as_float());
                self.anim(ops[0].as_str()).append_frame(image, tics, false);
            }
            CommandId::PicSound => {
                let name = ops[1].as_str();
                let sound = self.host.resolve_sound(name);
                if sound.is_none() {
                    warn!("PICSOUND: sound \"{name}\" not found");
                }
                if let Some(frame) = self.anim(ops[0].as_str()).frames.last_mut() {
                    frame.sound = sound;
                }
            }
            CommandId::Repeat => self.anim(ops[0].as_str()).looping = true,
            CommandId::StateAnim => {
                self.append_state_frames(ops[0].as_str(), ops[1].as_str(), ops[2].as_int())
            }

            CommandId::Text | CommandId::TextFromDef | CommandId::TextFromLump => {
                let source = ops[3].as_str();
                let content = match descriptor.id {
                    CommandId::TextFromDef => self.definition_text(source),
                    CommandId::TextFromLump => self.lump_text(source),
                    _ => source.to_string(),
                };
                let text = self.text(ops[0].as_str());
                text.base.pos[0].set(ops[1].as_float(), 0);
                text.base.pos[1].set(ops[2].as_float(), 0);
                text.set_text(&content);
                text.cursor_pos = 0;
            }
            CommandId::SetText => {
                let content = ops[1].as_str().to_string();
                self.text(ops[0].as_str()).set_text(&content);
            }
            CommandId::SetTextDef => {
                let content = self.definition_text(ops[1].as_str());
                self.text(ops[0].as_str()).set_text(&content);
            }
            CommandId::PredefinedColor => {
                let Some(index) = slot_index(ops[0].as_int(), NUM_PREDEFINED_COLORS) else {
                    warn!("PRECOLOR: slot {} out of range", ops[0].as_int());
                    return;
                };
                let rgb = [ops[1].as_float(), ops[2].as_float(), ops[3].as_float()];
                for id in [PageId::Anims, PageId::Texts] {
                    set_all(&mut self.pages.page_mut(id).predefined_colors[index], rgb, steps);
                }
            }
            CommandId::PredefinedFont => {
                let Some(index) = slot_index(ops[0].as_int(), NUM_PREDEFINED_FONTS) else {
                    warn!("PREFONT: slot {} out of range", ops[0].as_int());
                    return;
                };
                let Some(font) = self.resolve_font(&ops[1]) else {
                    return;
                };
                for id in [PageId::Anims, PageId::Texts] {
                    self.pages.page_mut(id).predefined_fonts[index] = Some(font.clone());
                }
            }
            CommandId::TextCenter => self.text(ops[0].as_str()).centered = true,
            CommandId::TextNoCenter => self.text(ops[0].as_str()).centered = false,
            CommandId::TextScroll => {
                let text = self.text(ops[0].as_str());
                text.scroll_wait = ops[1].as_float() as i32;
                text.scroll_timer = 0;
            }
            CommandId::TextPos => {
                self.text(ops[0].as_str()).cursor_pos = ops[1].as_int().max(0) as usize
            }
            CommandId::TextRate => self.text(ops[0].as_str()).wait = ops[1].as_int(),
            CommandId::TextFont => {
                if let Some(font) = self.resolve_font(&ops[1]) {
                    let text = self.text(ops[0].as_str());
                    text.font = Some(font);
                    text.page_font = 0;
                }
            }
            CommandId::TextFontA | CommandId::TextFontB => {
                let font = if descriptor.id == CommandId::TextFontA {
                    "Game:Small"
                } else {
                    "Game:Normal"
                };
                let text = self.text(ops[0].as_str());
                text.font = Some(ResourceUri::parse(font, None));
                text.page_font = 0;
            }
            CommandId::TextLineHeight => {
                self.text(ops[0].as_str()).line_height = ops[1].as_float()
            }

            CommandId::PlayDemo => {
                // The host resumes us once the demo ends.
                self.suspend();
                self.host.play_demo(ops[0].as_str());
            }
            CommandId::Command => self.host.execute_command(ops[0].as_str()),
            CommandId::Trigger => self.flags.show_menu = true,
            CommandId::NoTrigger => self.flags.show_menu = false,
        }
    }

    /// Built-in conditions first, then whatever the host registered.
    /// Unknown conditions are false.
    fn evaluate_condition(&self, token: &str) -> bool {
        if token.eq_ignore_ascii_case("netgame") {
            return self.host.is_netgame();
        }
        match token.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("mode:") => {
                return token[5..].eq_ignore_ascii_case(self.host.game_mode());
            }
            _ => {}
        }
        match self.host.evaluate_condition(token) {
            Some(value) => value,
            None => {
                warn!("finale {}: unknown condition \"{token}\"", self.id);
                false
            }
        }
    }

    fn play_named_sound(&self, name: &str, volume: f32) {
        match self.host.resolve_sound(name) {
            Some(sound) => self.host.play_sound(sound, volume),
            None => warn!("finale {}: sound \"{name}\" not found", self.id),
        }
    }

    /// Object commands never create widgets.
    fn with_widget(&mut self, name: &str, apply: impl FnOnce(&mut Widget)) {
        match self.pages.try_find_mut(name) {
            Some(widget) => apply(widget),
            None => debug!("finale {}: no object named \"{name}\"", self.id),
        }
    }

    fn with_base(&mut self, ops: &[Operand], apply: impl FnOnce(&mut WidgetBase)) {
        self.with_widget(ops[0].as_str(), |widget| apply(widget.base_mut()));
    }

    fn anim(&mut self, name: &str) -> &mut AnimWidget {
        match self.pages.find_or_create(WidgetKind::Anim, name) {
            Widget::Anim(anim) => anim,
            Widget::Text(_) => unreachable!("the anims page only holds anims"),
        }
    }

    fn text(&mut self, name: &str) -> &mut TextWidget {
        match self.pages.find_or_create(WidgetKind::Text, name) {
            Widget::Text(text) => text,
            Widget::Anim(_) => unreachable!("the texts page only holds texts"),
        }
    }

    fn resolve_image(&self, name: &str, source: ImageSource) -> FrameImage {
        let resolved = match source {
            ImageSource::Patch => self.host.resolve_patch(name).map(FrameImage::Patch),
            ImageSource::Raw => self.host.resolve_raw_image(name).map(FrameImage::Raw),
            ImageSource::External => {
                self.host.resolve_external_image(name).map(FrameImage::External)
            }
        };
        resolved.unwrap_or_else(|| {
            warn!("finale {}: image \"{name}\" not found", self.id);
            FrameImage::Missing(name.to_string())
        })
    }

    /// Replaces the animation with one still frame, optionally moving it.
    fn show_single_frame(&mut self, name: &str, image: FrameImage, at: Option<(f32, f32)>) {
        let anim = self.anim(name);
        anim.clear_frames();
        if let Some((x, y)) = at {
            anim.base.pos[0].set(x, 0);
            anim.base.pos[1].set(y, 0);
        }
        anim.append_frame(image, 0, false);
    }

    /// Appends up to `count` frames by following the host's state chain.
    fn append_state_frames(&mut self, name: &str, state_name: &str, count: i32) {
        let Some(mut state) = self.host.resolve_state(state_name) else {
            warn!("finale {}: state \"{state_name}\" not found", self.id);
            return;
        };
        let mut frames = Vec::new();
        for _ in 0..count.max(0) {
            let Some(info) = self.host.state_info(state) else {
                break;
            };
            let image = FrameImage::Sprite {
                sprite: info.sprite,
                frame: info.frame,
            };
            frames.push((image, info.tics.max(1) as u32, info.flip));
            state = info.next_state;
            if state == 0 {
                break;
            }
        }
        let anim = self.anim(name);
        for (image, tics, flip) in frames {
            anim.append_frame(image, tics, flip);
        }
    }

    fn definition_text(&self, id: &str) -> String {
        self.host.text_definition(id).unwrap_or_else(|| {
            warn!("finale {}: text definition \"{id}\" not found", self.id);
            UNDEFINED_TEXT.to_string()
        })
    }

    fn lump_text(&self, lump: &str) -> String {
        self.host.lump_text(lump).unwrap_or_else(|| {
            warn!("finale {}: lump \"{lump}\" not found", self.id);
            MISSING_LUMP_TEXT.to_string()
        })
    }

    fn resolve_font(&self, operand: &Operand) -> Option<ResourceUri> {
        let uri = operand.as_uri()?;
        if self.host.resolve_font(uri).is_none() {
            warn!("finale {}: font \"{uri}\" not found", self.id);
            return None;
        }
        Some(uri.clone())
    }
}

fn floats4(ops: &[Operand]) -> [f32; 4] {
    [ops[0].as_float(), ops[1].as_float(), ops[2].as_float(), ops[3].as_float()]
}

/// Converts a 1-based slot number into an index below `count`.
fn slot_index(slot: i32, count: usize) -> Option<usize> {
    let index = usize::try_from(slot).ok()?.checked_sub(1)?;
    (index < count).then_some(index)
}
