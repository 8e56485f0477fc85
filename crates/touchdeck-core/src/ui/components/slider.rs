//! Horizontal slider mapping touch x to an integer value

use embassy_time::Duration;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle, Rectangle, RoundedRectangle};

use crate::callback_queue::Callback;
use crate::error::UiError;
use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::registry::Category;
use crate::ui::core::{ScreenId, Widget, WidgetState};
use crate::ui::styling::ColorPalette;

/// Sliders follow a dragging finger, so they debounce far less than buttons.
const DRAG_DEBOUNCE: Duration = Duration::from_millis(50);
const TRACK_HEIGHT: u32 = 6;

/// One-time setup for a [`Slider`].
#[derive(Debug, Clone, Copy)]
pub struct SliderConfig {
    pub bounds: Rectangle,
    pub min: i32,
    pub max: i32,
    pub value: i32,
    pub callback: Option<Callback>,
}

pub struct Slider {
    state: WidgetState,
    min: i32,
    max: i32,
    value: i32,
}

impl Slider {
    pub fn new(screen: ScreenId) -> Self {
        Self {
            state: WidgetState::new(screen),
            min: 0,
            max: 0,
            value: 0,
        }
    }

    /// Rejects `min >= max` with [`UiError::InvalidDimensions`].
    pub fn setup(&mut self, config: SliderConfig) -> Result<(), UiError> {
        if config.min >= config.max {
            log::warn!("Slider range {}..{} is empty", config.min, config.max);
            return Err(UiError::InvalidDimensions);
        }
        self.state.configure(config.bounds, config.callback)?;
        self.state.set_debounce(DRAG_DEBOUNCE);
        self.min = config.min;
        self.max = config.max;
        self.value = config.value.clamp(config.min, config.max);
        Ok(())
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    /// Set the value without a touch, clamped to the range.
    ///
    /// Returns `true` when the value changed.
    pub fn set_value(&mut self, value: i32) -> bool {
        let value = value.clamp(self.min, self.max);
        if value == self.value {
            return false;
        }
        self.value = value;
        self.state.mark_dirty();
        true
    }

    fn value_at(&self, x: i32) -> i32 {
        let bounds = self.state.bounds();
        let span = bounds.size.width.saturating_sub(1).max(1) as i128;
        let offset = (x as i128 - bounds.top_left.x as i128).clamp(0, span);
        let range = self.max as i128 - self.min as i128;
        (self.min as i128 + (offset * range + span / 2) / span) as i32
    }

    fn knob_x(&self) -> i32 {
        let bounds = self.state.bounds();
        let span = bounds.size.width.saturating_sub(1) as i128;
        let range = (self.max as i128 - self.min as i128).max(1);
        bounds.top_left.x + ((self.value as i128 - self.min as i128) * span / range) as i32
    }
}

impl Widget for Slider {
    fn category(&self) -> Category {
        Category::Slider
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
        let value = self.value_at(point.x);
        if value != self.value {
            self.value = value;
            self.state.mark_dirty();
        }
        true
    }

    fn redraw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> DrawResult {
        let bounds = self.state.bounds();
        bounds
            .into_styled(PrimitiveStyle::with_fill(palette.background))
            .draw(fb)?;

        let center_y = bounds.center().y;
        let track = Rectangle::new(
            Point::new(bounds.top_left.x, center_y - (TRACK_HEIGHT / 2) as i32),
            Size::new(bounds.size.width, TRACK_HEIGHT),
        );
        let radius = Size::new(TRACK_HEIGHT / 2, TRACK_HEIGHT / 2);
        RoundedRectangle::with_equal_corners(track, radius)
            .into_styled(PrimitiveStyle::with_fill(palette.secondary))
            .draw(fb)?;

        let knob_x = self.knob_x();
        let filled = Rectangle::new(
            track.top_left,
            Size::new((knob_x - bounds.top_left.x + 1).max(0) as u32, TRACK_HEIGHT),
        );
        filled
            .into_styled(PrimitiveStyle::with_fill(palette.primary))
            .draw(fb)?;

        let knob_color = if self.state.is_enabled() {
            palette.text_primary
        } else {
            palette.text_secondary
        };
        let diameter = bounds.size.height.min(TRACK_HEIGHT * 3);
        Circle::with_center(Point::new(knob_x, center_y), diameter)
            .into_styled(PrimitiveStyle::with_fill(knob_color))
            .draw(fb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slider() -> Slider {
        let mut widget = Slider::new(ScreenId(0));
        widget
            .setup(SliderConfig {
                bounds: Rectangle::new(Point::new(100, 0), Size::new(101, 20)),
                min: 0,
                max: 100,
                value: 150,
                callback: None,
            })
            .unwrap();
        widget
    }

    #[test]
    fn test_initial_value_is_clamped() {
        assert_eq!(slider().value(), 100);
    }

    #[test]
    fn test_touch_maps_x_to_value() {
        let mut widget = slider();
        assert!(widget.detect_touch(Point::new(100, 10)));
        assert_eq!(widget.value(), 0);
        assert!(widget.detect_touch(Point::new(150, 10)));
        assert_eq!(widget.value(), 50);
        assert!(widget.detect_touch(Point::new(200, 10)));
        assert_eq!(widget.value(), 100);
        assert!(!widget.detect_touch(Point::new(201, 10)));
    }

    #[test]
    fn test_empty_range_rejected() {
        let mut widget = Slider::new(ScreenId(0));
        let result = widget.setup(SliderConfig {
            bounds: Rectangle::new(Point::zero(), Size::new(50, 10)),
            min: 5,
            max: 5,
            value: 5,
            callback: None,
        });
        assert_eq!(result, Err(UiError::InvalidDimensions));
        assert!(!widget.state().is_loaded());
    }

    #[test]
    fn test_set_value_clamps_and_reports_change() {
        let mut widget = slider();
        assert!(widget.set_value(-10));
        assert_eq!(widget.value(), 0);
        assert!(!widget.set_value(-20));
    }

    #[test]
    fn test_full_i32_range() {
        let mut widget = Slider::new(ScreenId(0));
        widget
            .setup(SliderConfig {
                bounds: Rectangle::new(Point::zero(), Size::new(101, 20)),
                min: i32::MIN,
                max: i32::MAX,
                value: 0,
                callback: None,
            })
            .unwrap();

        assert!(widget.detect_touch(Point::new(50, 10)));
        assert_eq!(widget.value(), 0);
        assert!(widget.detect_touch(Point::new(0, 10)));
        assert_eq!(widget.value(), i32::MIN);
        assert!(widget.detect_touch(Point::new(100, 10)));
        assert_eq!(widget.value(), i32::MAX);

        let mut fb = FrameBuffer::new(120, 40);
        let Ok(()) = widget.redraw(&mut fb, &ColorPalette::default());
    }
}
