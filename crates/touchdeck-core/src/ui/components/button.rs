//! Momentary push buttons, rectangular and circular
//!
//! A button claims any eligible touch inside its shape, flashes its pressed
//! colors for one redraw, and queues its callback through the registry.

use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};

use crate::callback_queue::Callback;
use crate::error::UiError;
use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::registry::Category;
use crate::ui::core::{ScreenId, Widget, WidgetState};
use crate::ui::styling::ColorPalette;

const BORDER_RADIUS: u32 = 8;

/// Draw `text` centered on `center` in the built-in 6x10 font.
pub(crate) fn draw_label(fb: &mut FrameBuffer, text: &str, center: Point, color: Rgb565) -> DrawResult {
    if text.is_empty() {
        return Ok(());
    }
    let character_style = MonoTextStyle::new(&FONT_6X10, color);
    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(text, center, character_style, text_style).draw(fb)?;
    Ok(())
}

/// Copy `text`, cut at the last whole char that fits in `N` bytes.
pub(crate) fn make_label<const N: usize>(text: &str) -> heapless::String<N> {
    let mut label = heapless::String::new();
    for c in text.chars() {
        if label.push(c).is_err() {
            break;
        }
    }
    label
}

/// Face and text colors for a button in its current state.
fn face_colors(state: &WidgetState, pressed: bool, palette: &ColorPalette) -> (Rgb565, Rgb565) {
    if !state.is_enabled() {
        (palette.surface, palette.text_secondary)
    } else if pressed {
        (palette.primary, palette.background)
    } else {
        (palette.surface, palette.text_primary)
    }
}

/// One-time setup for a [`RectButton`].
#[derive(Clone, Copy)]
pub struct RectButtonConfig<'a> {
    pub bounds: Rectangle,
    pub label: &'a str,
    pub callback: Option<Callback>,
}

/// Rounded rectangular push button.
///
/// # Examples
/// ```ignore
/// let mut save = RectButton::new(ScreenId(0));
/// save.setup(RectButtonConfig {
///     bounds: Rectangle::new(Point::new(20, 180), Size::new(120, 44)),
///     label: "Save",
///     callback: Some(on_save),
/// })?;
/// let id = arena.insert(save)?;
/// ```
pub struct RectButton {
    state: WidgetState,
    label: heapless::String<32>,
    pressed: bool,
    presses: u32,
}

impl RectButton {
    pub fn new(screen: ScreenId) -> Self {
        Self {
            state: WidgetState::new(screen),
            label: heapless::String::new(),
            pressed: false,
            presses: 0,
        }
    }

    pub fn setup(&mut self, config: RectButtonConfig<'_>) -> Result<(), UiError> {
        self.state.configure(config.bounds, config.callback)?;
        self.label = make_label(config.label);
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace the label, cut at the last whole char within 32 bytes.
    pub fn set_label(&mut self, text: &str) {
        self.label = make_label(text);
        self.state.mark_dirty();
    }

    /// Number of touches this button has claimed.
    pub fn presses(&self) -> u32 {
        self.presses
    }
}

impl Widget for RectButton {
    fn category(&self) -> Category {
        Category::RectButton
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
        self.pressed = true;
        self.presses = self.presses.wrapping_add(1);
        self.state.mark_dirty();
        true
    }

    fn redraw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> DrawResult {
        let bounds = self.state.bounds();
        let (face, text) = face_colors(&self.state, self.pressed, palette);
        let style = PrimitiveStyleBuilder::new()
            .fill_color(face)
            .stroke_color(palette.border)
            .stroke_width(1)
            .build();
        RoundedRectangle::with_equal_corners(bounds, Size::new(BORDER_RADIUS, BORDER_RADIUS))
            .into_styled(style)
            .draw(fb)?;
        draw_label(fb, &self.label, bounds.center(), text)?;

        if self.pressed {
            // Pressed look lasts one frame, then the normal face is drawn again.
            self.pressed = false;
            self.state.mark_dirty();
        }
        Ok(())
    }
}

/// One-time setup for a [`CircleButton`].
#[derive(Clone, Copy)]
pub struct CircleButtonConfig<'a> {
    pub center: Point,
    pub radius: u32,
    pub label: &'a str,
    pub callback: Option<Callback>,
}

/// Round push button; only touches inside the circle count.
pub struct CircleButton {
    state: WidgetState,
    center: Point,
    radius: u32,
    label: heapless::String<32>,
    pressed: bool,
}

impl CircleButton {
    pub fn new(screen: ScreenId) -> Self {
        Self {
            state: WidgetState::new(screen),
            center: Point::zero(),
            radius: 0,
            label: heapless::String::new(),
            pressed: false,
        }
    }

    pub fn setup(&mut self, config: CircleButtonConfig<'_>) -> Result<(), UiError> {
        let diameter = config.radius.saturating_mul(2);
        let radius = config.radius as i32;
        let bounds = Rectangle::new(
            config.center - Point::new(radius, radius),
            Size::new(diameter, diameter),
        );
        self.state.configure(bounds, config.callback)?;
        self.center = config.center;
        self.radius = config.radius;
        self.label = make_label(config.label);
        Ok(())
    }

    fn in_circle(&self, point: Point) -> bool {
        let delta = point - self.center;
        let distance_sq = (delta.x as i64).pow(2) + (delta.y as i64).pow(2);
        distance_sq <= (self.radius as i64).pow(2)
    }
}

impl Widget for CircleButton {
    fn category(&self) -> Category {
        Category::CircleButton
    }

    fn state(&self) -> &WidgetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WidgetState {
        &mut self.state
    }

    fn detect_touch(&mut self, point: Point) -> bool {
        if !self.in_circle(point) {
            return false;
        }
        self.pressed = true;
        self.state.mark_dirty();
        true
    }

    fn redraw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> DrawResult {
        let (face, text) = face_colors(&self.state, self.pressed, palette);
        let style = PrimitiveStyleBuilder::new()
            .fill_color(face)
            .stroke_color(palette.border)
            .stroke_width(1)
            .build();
        Circle::with_center(self.center, self.radius * 2)
            .into_styled(style)
            .draw(fb)?;
        draw_label(fb, &self.label, self.center, text)?;

        if self.pressed {
            self.pressed = false;
            self.state.mark_dirty();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_button() -> RectButton {
        let mut button = RectButton::new(ScreenId(0));
        button.state_mut().attach();
        button
            .setup(RectButtonConfig {
                bounds: Rectangle::new(Point::new(10, 10), Size::new(60, 30)),
                label: "OK",
                callback: None,
            })
            .unwrap();
        button
    }

    #[test]
    fn test_long_label_is_cut_on_char_boundary() {
        let mut button = rect_button();
        // 33 bytes: sixteen two-byte chars and one more.
        button.set_label(&"ü".repeat(17));
        assert_eq!(button.label(), "ü".repeat(16));

        button.set_label(&"x".repeat(40));
        assert_eq!(button.label().len(), 32);
    }

    #[test]
    fn test_rect_button_detects_inside_only() {
        let mut button = rect_button();
        assert!(!button.detect_touch(Point::new(5, 5)));
        assert!(button.detect_touch(Point::new(10, 10)));
        assert!(button.detect_touch(Point::new(69, 39)));
        assert!(!button.detect_touch(Point::new(70, 39)));
        assert_eq!(button.presses(), 2);
    }

    #[test]
    fn test_press_flash_lasts_one_redraw() {
        let mut button = rect_button();
        let palette = ColorPalette::default();
        let mut fb = FrameBuffer::new(100, 60);

        button.detect_touch(Point::new(20, 20));
        button.state_mut().mark_clean();
        button.redraw(&mut fb, &palette).unwrap();
        // Left edge midway down is outside the rounded corners.
        assert_eq!(fb.pixel(Point::new(12, 25)), Some(palette.primary));
        assert!(button.state().is_dirty());

        button.state_mut().mark_clean();
        button.redraw(&mut fb, &palette).unwrap();
        assert_eq!(fb.pixel(Point::new(12, 25)), Some(palette.surface));
        assert!(!button.state().is_dirty());
    }

    #[test]
    fn test_second_setup_keeps_first_label() {
        let mut button = rect_button();
        let result = button.setup(RectButtonConfig {
            bounds: Rectangle::new(Point::zero(), Size::new(10, 10)),
            label: "Other",
            callback: None,
        });
        assert_eq!(result, Err(UiError::AlreadyConfigured));
        assert_eq!(button.label(), "OK");
    }

    #[test]
    fn test_circle_button_ignores_corners() {
        let mut button = CircleButton::new(ScreenId(0));
        button
            .setup(CircleButtonConfig {
                center: Point::new(50, 50),
                radius: 20,
                label: "+",
                callback: None,
            })
            .unwrap();
        assert_eq!(
            button.state().bounds(),
            Rectangle::new(Point::new(30, 30), Size::new(40, 40))
        );
        assert!(button.detect_touch(Point::new(50, 70)));
        assert!(!button.detect_touch(Point::new(32, 32)));
    }
}
