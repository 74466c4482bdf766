use serde::Serialize;

use crate::operand::ResourceUri;
use crate::widget::{animators, Animator, Widget, WidgetKind};

pub const NUM_PREDEFINED_COLORS: usize = 10;
pub const NUM_PREDEFINED_FONTS: usize = 10;

/// The two fixed pages every finale draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageId {
    Anims,
    Texts,
}

impl PageId {
    pub fn for_kind(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::Anim => PageId::Anims,
            WidgetKind::Text => PageId::Texts,
        }
    }
}

/// Ordered collection of named widgets plus the page-wide visual state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub widgets: Vec<Widget>,
    pub visible: bool,
    pub background: Option<ResourceUri>,
    pub bg_top_color: [Animator; 4],
    pub bg_bottom_color: [Animator; 4],
    pub offset: [Animator; 2],
    pub filter: [Animator; 4],
    pub predefined_colors: [[Animator; 3]; NUM_PREDEFINED_COLORS],
    pub predefined_fonts: [Option<ResourceUri>; NUM_PREDEFINED_FONTS],
}

impl Default for Page {
    fn default() -> Self {
        Page {
            widgets: Vec::new(),
            visible: false,
            background: None,
            bg_top_color: animators([1.0, 1.0, 1.0, 0.0]),
            bg_bottom_color: animators([1.0, 1.0, 1.0, 0.0]),
            offset: animators([0.0; 2]),
            filter: animators([0.0; 4]),
            predefined_colors: [animators([1.0; 3]); NUM_PREDEFINED_COLORS],
            predefined_fonts: Default::default(),
        }
    }
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&Widget> {
        self.widgets
            .iter()
            .find(|widget| widget.name().eq_ignore_ascii_case(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Widget> {
        self.widgets
            .iter_mut()
            .find(|widget| widget.name().eq_ignore_ascii_case(name))
    }

    pub fn add(&mut self, widget: Widget) -> &mut Widget {
        self.widgets.push(widget);
        let last = self.widgets.len() - 1;
        &mut self.widgets[last]
    }

    pub fn remove(&mut self, name: &str) -> Option<Widget> {
        let index = self
            .widgets
            .iter()
            .position(|widget| widget.name().eq_ignore_ascii_case(name))?;
        Some(self.widgets.remove(index))
    }

    pub fn clear(&mut self) {
        self.widgets.clear();
    }

    pub fn predefined_color(&self, slot: u32) -> Option<[f32; 3]> {
        let index = (slot as usize).checked_sub(1)?;
        let color = self.predefined_colors.get(index)?;
        Some(color.map(|animator| animator.value))
    }

    pub fn predefined_font(&self, slot: u32) -> Option<&ResourceUri> {
        let index = (slot as usize).checked_sub(1)?;
        self.predefined_fonts.get(index)?.as_ref()
    }

    pub fn tick(&mut self) {
        self.bg_top_color.iter_mut().for_each(Animator::tick);
        self.bg_bottom_color.iter_mut().for_each(Animator::tick);
        self.offset.iter_mut().for_each(Animator::tick);
        self.filter.iter_mut().for_each(Animator::tick);
        for color in &mut self.predefined_colors {
            color.iter_mut().for_each(Animator::tick);
        }
        for widget in &mut self.widgets {
            widget.tick();
        }
    }
}

/// Anims and Texts pages, addressed by widget kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pages {
    pub anims: Page,
    pub texts: Page,
}

impl Pages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, id: PageId) -> &Page {
        match id {
            PageId::Anims => &self.anims,
            PageId::Texts => &self.texts,
        }
    }

    pub fn page_mut(&mut self, id: PageId) -> &mut Page {
        match id {
            PageId::Anims => &mut self.anims,
            PageId::Texts => &mut self.texts,
        }
    }

    /// Looks `name` up on the page for `kind`, creating the widget if absent.
    pub fn find_or_create(&mut self, kind: WidgetKind, name: &str) -> &mut Widget {
        let page = self.page_mut(PageId::for_kind(kind));
        match page
            .widgets
            .iter()
            .position(|widget| widget.name().eq_ignore_ascii_case(name) && widget.kind() == kind)
        {
            Some(index) => &mut page.widgets[index],
            None => page.add(Widget::new(kind, name)),
        }
    }

    /// Searches both pages without creating anything.
    pub fn try_find(&self, name: &str) -> Option<&Widget> {
        self.anims.find(name).or_else(|| self.texts.find(name))
    }

    pub fn try_find_mut(&mut self, name: &str) -> Option<&mut Widget> {
        if self.anims.find(name).is_some() {
            return self.anims.find_mut(name);
        }
        self.texts.find_mut(name)
    }

    /// Removes `name` from whichever page holds it; unknown names are a no-op.
    pub fn delete(&mut self, name: &str) -> bool {
        self.anims.remove(name).is_some() || self.texts.remove(name).is_some()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.anims.visible = visible;
        self.texts.visible = visible;
    }

    pub fn tick(&mut self) {
        self.anims.tick();
        self.texts.tick();
    }

    pub fn clear(&mut self) {
        self.anims.clear();
        self.texts.clear();
    }
}
