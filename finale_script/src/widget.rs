use serde::Serialize;

use crate::operand::ResourceUri;

/// A value that moves linearly toward a target over a number of ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Animator {
    pub value: f32,
    pub target: f32,
    pub steps: u32,
}

impl Animator {
    pub fn new(value: f32) -> Self {
        Animator {
            value,
            target: value,
            steps: 0,
        }
    }

    /// Moves to `target` over `steps` ticks; zero steps snaps immediately.
    pub fn set(&mut self, target: f32, steps: u32) {
        self.target = target;
        self.steps = steps;
        if steps == 0 {
            self.value = target;
        }
    }

    pub fn tick(&mut self) {
        if self.steps == 0 {
            return;
        }
        self.value += (self.target - self.value) / self.steps as f32;
        self.steps -= 1;
        if self.steps == 0 {
            self.value = self.target;
        }
    }

    pub fn is_settled(&self) -> bool {
        self.steps == 0
    }
}

impl Default for Animator {
    fn default() -> Self {
        Animator::new(0.0)
    }
}

pub fn animators<const N: usize>(values: [f32; N]) -> [Animator; N] {
    values.map(Animator::new)
}

pub fn set_all<const N: usize>(animators: &mut [Animator; N], targets: [f32; N], steps: u32) {
    for (animator, target) in animators.iter_mut().zip(targets) {
        animator.set(target, steps);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Anim,
    Text,
}

/// Properties shared by both widget kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetBase {
    pub name: String,
    pub pos: [Animator; 3],
    pub scale: [Animator; 3],
    pub angle: Animator,
    pub color: [Animator; 4],
}

impl WidgetBase {
    fn new(name: &str) -> Self {
        WidgetBase {
            name: name.to_string(),
            pos: animators([0.0; 3]),
            scale: animators([1.0; 3]),
            angle: Animator::new(0.0),
            color: animators([1.0; 4]),
        }
    }

    fn tick(&mut self) {
        self.pos.iter_mut().for_each(Animator::tick);
        self.scale.iter_mut().for_each(Animator::tick);
        self.angle.tick();
        self.color.iter_mut().for_each(Animator::tick);
    }
}

/// Graphic shown by one animation frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "handle", rename_all = "snake_case")]
pub enum FrameImage {
    Patch(i32),
    Raw(i32),
    External(i32),
    Sprite { sprite: i32, frame: i32 },
    /// Name that could not be resolved; drawn as nothing.
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimFrame {
    pub image: FrameImage,
    pub tics: u32,
    pub sound: Option<i32>,
    pub flip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimWidget {
    pub base: WidgetBase,
    pub frames: Vec<AnimFrame>,
    pub cur_frame: usize,
    pub tics_left: u32,
    pub looping: bool,
    pub complete: bool,
    pub is_rect: bool,
    pub size: [Animator; 2],
    /// Bottom color of a rect; `base.color` is the top.
    pub other_color: [Animator; 4],
    pub edge_color: [Animator; 4],
    pub other_edge_color: [Animator; 4],
    /// Sounds the host should start, drained each tick by the interpreter.
    #[serde(skip)]
    pub pending_sounds: Vec<i32>,
}

impl AnimWidget {
    pub fn new(name: &str) -> Self {
        AnimWidget {
            base: WidgetBase::new(name),
            frames: Vec::new(),
            cur_frame: 0,
            tics_left: 0,
            looping: false,
            complete: true,
            is_rect: false,
            size: animators([1.0; 2]),
            other_color: animators([1.0; 4]),
            edge_color: animators([0.0; 4]),
            other_edge_color: animators([0.0; 4]),
            pending_sounds: Vec::new(),
        }
    }

    pub fn clear_frames(&mut self) {
        self.frames.clear();
        self.cur_frame = 0;
        self.tics_left = 0;
        self.complete = true;
        self.looping = false;
    }

    /// Appends a frame; the first frame starts playing immediately.
    pub fn append_frame(&mut self, image: FrameImage, tics: u32, flip: bool) -> usize {
        self.frames.push(AnimFrame {
            image,
            tics,
            sound: None,
            flip,
        });
        if self.frames.len() == 1 {
            self.cur_frame = 0;
            self.tics_left = tics;
        }
        self.complete = self.frames.len() <= 1 && tics == 0;
        self.frames.len() - 1
    }

    pub fn is_animation_complete(&self) -> bool {
        self.complete
    }

    pub fn tick(&mut self) {
        self.base.tick();
        self.size.iter_mut().for_each(Animator::tick);
        self.other_color.iter_mut().for_each(Animator::tick);
        self.edge_color.iter_mut().for_each(Animator::tick);
        self.other_edge_color.iter_mut().for_each(Animator::tick);

        // A looping sequence keeps playing after it first completes.
        if self.frames.is_empty() || (self.complete && !self.looping) {
            return;
        }
        if self.tics_left > 0 {
            self.tics_left -= 1;
            if self.tics_left > 0 {
                return;
            }
        }
        if self.cur_frame + 1 < self.frames.len() {
            self.cur_frame += 1;
        } else if self.looping {
            self.complete = true;
            self.cur_frame = 0;
        } else {
            self.complete = true;
            return;
        }
        let frame = &self.frames[self.cur_frame];
        self.tics_left = frame.tics;
        if let Some(sound) = frame.sound {
            self.pending_sounds.push(sound);
        }
        if self.tics_left == 0 && self.cur_frame + 1 == self.frames.len() && !self.looping {
            self.complete = true;
        }
    }
}

/// Ticks between typed characters for a freshly created text.
pub const DEFAULT_TEXT_RATE: i32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextWidget {
    pub base: WidgetBase,
    pub text: String,
    pub cursor_pos: usize,
    /// Ticks per typed character; zero shows everything, negative types that
    /// many characters every tick.
    pub wait: i32,
    pub timer: i32,
    pub scroll_wait: i32,
    pub scroll_timer: i32,
    pub centered: bool,
    pub line_height: f32,
    pub font: Option<ResourceUri>,
    /// Predefined color slot on the owning page, 1-based; 0 uses `base.color`.
    pub page_color: u32,
    /// Predefined font slot on the owning page, 1-based; 0 uses `font`.
    pub page_font: u32,
}

impl TextWidget {
    pub fn new(name: &str) -> Self {
        TextWidget {
            base: WidgetBase::new(name),
            text: String::new(),
            cursor_pos: 0,
            wait: DEFAULT_TEXT_RATE,
            timer: 0,
            scroll_wait: 0,
            scroll_timer: 0,
            centered: false,
            line_height: 11.0 / 7.0,
            font: None,
            page_color: 1,
            page_font: 1,
        }
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// Number of characters that take part in type-in. `{...}` blocks are
    /// formatting parameters and are never typed.
    pub fn visible_len(&self) -> usize {
        let mut len = 0;
        let mut in_block = false;
        for c in self.text.chars() {
            match c {
                '{' => in_block = true,
                '}' if in_block => in_block = false,
                _ if !in_block => len += 1,
                _ => {}
            }
        }
        len
    }

    pub fn is_complete(&self) -> bool {
        self.cursor_pos >= self.visible_len()
    }

    /// Finishes the type-in quickly instead of one character at a time.
    pub fn accelerate(&mut self) {
        self.wait = -10;
    }

    pub fn tick(&mut self) {
        self.base.tick();

        if self.scroll_wait != 0 {
            self.scroll_timer -= 1;
            if self.scroll_timer <= 0 {
                self.scroll_timer = self.scroll_wait;
                let target = self.base.pos[1].target - 1.0;
                self.base.pos[1].set(target, self.scroll_wait.unsigned_abs());
            }
        }

        let visible = self.visible_len();
        if self.wait == 0 {
            self.cursor_pos = visible;
            return;
        }
        if self.cursor_pos >= visible {
            return;
        }
        if self.wait < 0 {
            self.cursor_pos = (self.cursor_pos + self.wait.unsigned_abs() as usize).min(visible);
            return;
        }
        self.timer -= 1;
        if self.timer <= 0 {
            self.timer = self.wait;
            self.cursor_pos += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Widget {
    Anim(AnimWidget),
    Text(TextWidget),
}

impl Widget {
    pub fn new(kind: WidgetKind, name: &str) -> Self {
        match kind {
            WidgetKind::Anim => Widget::Anim(AnimWidget::new(name)),
            WidgetKind::Text => Widget::Text(TextWidget::new(name)),
        }
    }

    pub fn kind(&self) -> WidgetKind {
        match self {
            Widget::Anim(_) => WidgetKind::Anim,
            Widget::Text(_) => WidgetKind::Text,
        }
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn base(&self) -> &WidgetBase {
        match self {
            Widget::Anim(anim) => &anim.base,
            Widget::Text(text) => &text.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut WidgetBase {
        match self {
            Widget::Anim(anim) => &mut anim.base,
            Widget::Text(text) => &mut text.base,
        }
    }

    pub fn as_anim_mut(&mut self) -> Option<&mut AnimWidget> {
        match self {
            Widget::Anim(anim) => Some(anim),
            Widget::Text(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextWidget> {
        match self {
            Widget::Text(text) => Some(text),
            Widget::Anim(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextWidget> {
        match self {
            Widget::Text(text) => Some(text),
            Widget::Anim(_) => None,
        }
    }

    pub fn as_anim(&self) -> Option<&AnimWidget> {
        match self {
            Widget::Anim(anim) => Some(anim),
            Widget::Text(_) => None,
        }
    }

    /// Text type-in finished, or animation sequence played out.
    pub fn is_complete(&self) -> bool {
        match self {
            Widget::Anim(anim) => anim.is_animation_complete(),
            Widget::Text(text) => text.is_complete(),
        }
    }

    pub fn tick(&mut self) {
        match self {
            Widget::Anim(anim) => anim.tick(),
            Widget::Text(text) => text.tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animator_reaches_target_in_steps() {
        let mut animator = Animator::new(0.0);
        animator.set(10.0, 4);
        for _ in 0..3 {
            animator.tick();
            assert!(!animator.is_settled());
        }
        animator.tick();
        assert_eq!(animator.value, 10.0);
        assert!(animator.is_settled());
    }

    #[test]
    fn text_types_one_character_per_wait() {
        let mut text = TextWidget::new("t");
        text.set_text("abc");
        text.wait = 2;
        let mut ticks = 0;
        while !text.is_complete() {
            text.tick();
            ticks += 1;
            assert!(ticks < 100);
        }
        assert_eq!(text.cursor_pos, 3);
        assert_eq!(ticks, 5);
    }

    #[test]
    fn formatting_blocks_are_not_typed() {
        let mut text = TextWidget::new("t");
        text.set_text("{r=1}Hi");
        assert_eq!(text.visible_len(), 2);
    }

    #[test]
    fn accelerate_finishes_quickly() {
        let mut text = TextWidget::new("t");
        text.set_text("a long line of text to type");
        text.accelerate();
        text.tick();
        text.tick();
        text.tick();
        assert!(text.is_complete());
    }

    #[test]
    fn anim_completes_after_last_frame() {
        let mut anim = AnimWidget::new("a");
        anim.append_frame(FrameImage::Patch(1), 2, false);
        anim.append_frame(FrameImage::Patch(2), 2, false);
        assert!(!anim.is_animation_complete());
        for _ in 0..3 {
            anim.tick();
        }
        assert_eq!(anim.cur_frame, 1);
        assert!(!anim.is_animation_complete());
        anim.tick();
        assert!(anim.is_animation_complete());
    }

    #[test]
    fn looping_anim_completes_after_one_cycle() {
        let mut anim = AnimWidget::new("a");
        anim.append_frame(FrameImage::Patch(1), 1, false);
        anim.append_frame(FrameImage::Patch(2), 1, false);
        anim.looping = true;

        anim.tick();
        assert_eq!(anim.cur_frame, 1);
        assert!(!anim.is_animation_complete());
        anim.tick();
        assert_eq!(anim.cur_frame, 0);
        assert!(anim.is_animation_complete());

        // Still playing after the first cycle.
        anim.tick();
        assert_eq!(anim.cur_frame, 1);

        anim.append_frame(FrameImage::Patch(3), 1, false);
        assert!(!anim.is_animation_complete());
    }
}
