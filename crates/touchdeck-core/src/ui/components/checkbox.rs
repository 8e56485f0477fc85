//! Check box with a trailing label

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle};

use crate::callback_queue::Callback;
use crate::error::UiError;
use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::registry::Category;
use crate::ui::components::button::{draw_label, make_label};
use crate::ui::core::{ScreenId, Widget, WidgetState};
use crate::ui::styling::ColorPalette;

/// One-time setup for a [`CheckBox`].
#[derive(Clone, Copy)]
pub struct CheckBoxConfig<'a> {
    /// Square box plus label area; the box side equals the bounds height.
    pub bounds: Rectangle,
    pub label: &'a str,
    pub checked: bool,
    pub callback: Option<Callback>,
}

/// Two-state box toggled by every accepted touch.
pub struct CheckBox {
    state: WidgetState,
    label: heapless::String<32>,
    checked: bool,
}

impl CheckBox {
    pub fn new(screen: ScreenId) -> Self {
        Self {
            state: WidgetState::new(screen),
            label: heapless::String::new(),
            checked: false,
        }
    }

    pub fn setup(&mut self, config: CheckBoxConfig<'_>) -> Result<(), UiError> {
        self.state.configure(config.bounds, config.callback)?;
        self.label = make_label(config.label);
        self.checked = config.checked;
        Ok(())
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// Change the checked state without a touch.
    ///
    /// Returns `true` when the state changed; pass the widget id to
    /// [`WidgetArena::notify`](crate::registry::WidgetArena::notify) to run
    /// the callback.
    pub fn set_checked(&mut self, checked: bool) -> bool {
        if self.checked == checked {
            return false;
        }
        self.checked = checked;
        self.state.mark_dirty();
        true
    }

    fn box_area(&self) -> Rectangle {
        let bounds = self.state.bounds();
        let side = bounds.size.height.min(bounds.size.width);
        Rectangle::new(bounds.top_left, Size::new(side, side))
    }
}

impl Widget for CheckBox {
    fn category(&self) -> Category {
        Category::CheckBox
    }

    fn state(&self) -> &WidgetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WidgetState {
        &mut self.state
    }

    fn detect_touch(&mut self, point: Point) -> bool {
        if !self.state.contains(point) {
            return false;
        }
        self.checked = !self.checked;
        self.state.mark_dirty();
        true
    }

    fn redraw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> DrawResult {
        let bounds = self.state.bounds();
        bounds
            .into_styled(PrimitiveStyle::with_fill(palette.background))
            .draw(fb)?;

        let area = self.box_area();
        let fill = if self.checked { palette.primary } else { palette.surface };
        area.into_styled(
            PrimitiveStyleBuilder::new()
                .fill_color(fill)
                .stroke_color(palette.border)
                .stroke_width(1)
                .build(),
        )
        .draw(fb)?;

        if self.checked {
            let inset = (area.size.width / 4) as i32;
            let left = area.top_left.x + inset;
            let right = area.top_left.x + area.size.width as i32 - inset;
            let top = area.top_left.y + inset;
            let bottom = area.top_left.y + area.size.height as i32 - inset;
            let mid = Point::new(left + (right - left) / 3, bottom);
            let stroke = PrimitiveStyle::with_stroke(palette.background, 2);
            Line::new(Point::new(left, (top + bottom) / 2), mid)
                .into_styled(stroke)
                .draw(fb)?;
            Line::new(mid, Point::new(right, top))
                .into_styled(stroke)
                .draw(fb)?;
        }

        let text_color = if self.state.is_enabled() {
            palette.text_primary
        } else {
            palette.text_secondary
        };
        let label_left = area.top_left.x + area.size.width as i32 + 6;
        let label_width = (self.label.len() as i32) * 6;
        let label_center = Point::new(label_left + label_width / 2, area.center().y);
        draw_label(fb, &self.label, label_center, text_color)
    }
}
