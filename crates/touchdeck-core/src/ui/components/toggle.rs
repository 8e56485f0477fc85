//! On/off pill switch

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle, Rectangle, RoundedRectangle};

use crate::callback_queue::Callback;
use crate::error::UiError;
use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::registry::Category;
use crate::ui::core::{ScreenId, Widget, WidgetState};
use crate::ui::styling::ColorPalette;

#[derive(Debug, Clone, Copy)]
pub struct ToggleSwitchConfig {
    pub bounds: Rectangle,
    pub on: bool,
    pub callback: Option<Callback>,
}

pub struct ToggleSwitch {
    state: WidgetState,
    on: bool,
}

impl ToggleSwitch {
    pub fn new(screen: ScreenId) -> Self {
        Self {
            state: WidgetState::new(screen),
            on: false,
        }
    }

    pub fn setup(&mut self, config: ToggleSwitchConfig) -> Result<(), UiError> {
        self.state.configure(config.bounds, config.callback)?;
        self.on = config.on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Returns `true` when the switch position changed.
    pub fn set_on(&mut self, on: bool) -> bool {
        if self.on == on {
            return false;
        }
        self.on = on;
        self.state.mark_dirty();
        true
    }
}

impl Widget for ToggleSwitch {
    fn category(&self) -> Category {
        Category::Toggle
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
        self.on = !self.on;
        self.state.mark_dirty();
        true
    }

    fn redraw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> DrawResult {
        let bounds = self.state.bounds();
        let height = bounds.size.height;
        let track = if self.on { palette.primary } else { palette.secondary };
        RoundedRectangle::with_equal_corners(bounds, Size::new(height / 2, height / 2))
            .into_styled(PrimitiveStyle::with_fill(track))
            .draw(fb)?;

        let knob = height.saturating_sub(4);
        let left = bounds.top_left.x + 2;
        let x = if self.on {
            left + bounds.size.width as i32 - knob as i32 - 4
        } else {
            left
        };
        let knob_color = if self.state.is_enabled() {
            palette.text_primary
        } else {
            palette.text_secondary
        };
        Circle::new(Point::new(x, bounds.top_left.y + 2), knob)
            .into_styled(PrimitiveStyle::with_fill(knob_color))
            .draw(fb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_flips_switch() {
        let mut widget = ToggleSwitch::new(ScreenId(0));
        widget
            .setup(ToggleSwitchConfig {
                bounds: Rectangle::new(Point::new(10, 10), Size::new(50, 24)),
                on: true,
                callback: None,
            })
            .unwrap();
        assert!(widget.detect_touch(Point::new(30, 20)));
        assert!(!widget.is_on());
        assert!(!widget.detect_touch(Point::new(0, 0)));
        assert!(!widget.is_on());
        assert!(widget.set_on(true));
        assert!(!widget.set_on(true));
    }
}
