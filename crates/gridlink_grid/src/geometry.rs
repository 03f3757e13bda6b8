use crate::model::{CellPos, ResultGrid};
use crate::render::display_text;

pub const DEFAULT_SCROLLBAR_WIDTH: u32 = 14;
pub const DEFAULT_MAX_VISIBLE_ROWS: usize = 10;
pub const DEFAULT_SCREEN_WIDTH: u32 = 1920;

/// Monospace approximation of rendered text width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub char_width: u32,
    pub padding: u32,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 7,
            padding: 12,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> u32 {
        let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        chars.saturating_mul(self.char_width).saturating_add(self.padding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSection {
    pub width: u32,
    pub hidden: bool,
}

/// Geometry of a dropdown's popup list and the container it is shown in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupView {
    sections: Vec<HeaderSection>,
    scrollbar_visible: bool,
    scrollbar_width: u32,
    minimum_width: u32,
    maximum_width: u32,
    container_width: u32,
    container_maximum_width: u32,
}

impl PopupView {
    /// `maximum_width` is the width of the screen hosting the popup.
    pub fn new(maximum_width: u32) -> Self {
        Self {
            sections: Vec::new(),
            scrollbar_visible: false,
            scrollbar_width: DEFAULT_SCROLLBAR_WIDTH,
            minimum_width: 0,
            maximum_width,
            container_width: 0,
            container_maximum_width: u32::MAX,
        }
    }

    pub fn sections(&self) -> &[HeaderSection] {
        &self.sections
    }

    pub fn section_width(&self, section: usize) -> Option<u32> {
        self.sections.get(section).map(|s| s.width)
    }

    /// Resizes a section, returning `false` for unknown sections.
    pub fn resize_section(&mut self, section: usize, width: u32) -> bool {
        match self.sections.get_mut(section) {
            Some(s) => {
                s.width = width;
                true
            }
            None => false,
        }
    }

    pub fn hide_section(&mut self, section: usize) {
        if let Some(s) = self.sections.get_mut(section) {
            s.hidden = true;
        }
    }

    pub fn is_section_hidden(&self, section: usize) -> bool {
        self.sections.get(section).is_some_and(|s| s.hidden)
    }

    /// Combined width of the visible header sections.
    pub fn header_length(&self) -> u32 {
        self.sections
            .iter()
            .filter(|s| !s.hidden)
            .fold(0u32, |acc, s| acc.saturating_add(s.width))
    }

    pub fn header_width(&self, include_scrollbar: bool) -> u32 {
        let mut width = self.header_length();
        if include_scrollbar && self.scrollbar_visible {
            width = width.saturating_add(self.scrollbar_width);
        }
        width
    }

    pub fn is_scrollbar_visible(&self) -> bool {
        self.scrollbar_visible
    }

    pub fn set_scrollbar_visible(&mut self, visible: bool) {
        self.scrollbar_visible = visible;
    }

    pub fn scrollbar_width(&self) -> u32 {
        self.scrollbar_width
    }

    pub fn minimum_width(&self) -> u32 {
        self.minimum_width
    }

    pub fn maximum_width(&self) -> u32 {
        self.maximum_width
    }

    pub fn container_width(&self) -> u32 {
        self.container_width
    }

    pub fn set_container_width(&mut self, width: u32) {
        self.container_width = width.min(self.container_maximum_width);
    }

    pub fn container_maximum_width(&self) -> u32 {
        self.container_maximum_width
    }

    /// Sizes one section per grid column to its widest text, header
    /// included. Hidden flags of existing sections are kept.
    pub fn size_to_contents(&mut self, grid: &ResultGrid, metrics: &TextMetrics) {
        let hidden: Vec<bool> = (0..grid.column_count())
            .map(|col| self.is_section_hidden(col))
            .collect();

        self.sections = grid
            .columns()
            .iter()
            .enumerate()
            .map(|(col, column)| {
                let widest_cell = (0..grid.row_count())
                    .filter_map(|row| grid.value_at(CellPos::new(row, col)))
                    .map(|value| metrics.text_width(&display_text(value)))
                    .max()
                    .unwrap_or(0);

                HeaderSection {
                    width: metrics.text_width(&column.name).max(widest_cell),
                    hidden: hidden[col],
                }
            })
            .collect();

        self.scrollbar_visible = grid.row_count() > DEFAULT_MAX_VISIBLE_ROWS;
    }
}

/// Negotiates the popup width against its anchor column and the screen.
///
/// The popup asks for at least its header width and at least the anchor
/// column width, never more than the screen. On initial show any shortfall
/// widens the value section (section 1), and a container wider than the
/// result is capped to it. Returns the negotiated minimum width.
pub fn fit(view: &mut PopupView, include_scrollbar: bool, anchor_width: u32, initial: bool) -> u32 {
    let header_width = view.header_width(include_scrollbar);
    let target = anchor_width.max(header_width).min(view.maximum_width);
    view.minimum_width = target;

    if initial
        && header_width < target
        && let Some(current) = view.section_width(1)
    {
        view.resize_section(1, current + (target - header_width));
    }

    if view.container_width > target {
        view.container_maximum_width = target;
        view.container_width = target;
    }

    target
}
