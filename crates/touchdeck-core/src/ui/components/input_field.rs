//! Text box and number box edited through the modal keyboard
//!
//! Touching the field does not change it directly. The DrawTask opens the
//! keyboard (or numpad) seeded with the current text, and the edited value
//! comes back through [`Widget::accept_input`] when RETURN is pressed.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyleBuilder, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};

use crate::callback_queue::Callback;
use crate::error::UiError;
use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::modal::{INPUT_CAPACITY, InputKind};
use crate::registry::Category;
use crate::ui::components::button::make_label;
use crate::ui::core::{ScreenId, Widget, WidgetState};
use crate::ui::styling::ColorPalette;

const TEXT_PADDING: i32 = 6;

#[derive(Clone, Copy)]
pub struct InputFieldConfig<'a> {
    pub bounds: Rectangle,
    /// `Keyboard` makes a text box, `Numpad` a number box.
    pub kind: InputKind,
    pub text: &'a str,
    /// Shown dimmed while the field is empty.
    pub placeholder: &'a str,
    pub callback: Option<Callback>,
}

pub struct InputField {
    state: WidgetState,
    kind: InputKind,
    text: heapless::String<INPUT_CAPACITY>,
    placeholder: heapless::String<32>,
}

impl InputField {
    pub fn new(screen: ScreenId, kind: InputKind) -> Self {
        Self {
            state: WidgetState::new(screen),
            kind,
            text: heapless::String::new(),
            placeholder: heapless::String::new(),
        }
    }

    pub fn setup(&mut self, config: InputFieldConfig<'_>) -> Result<(), UiError> {
        if config.text.len() > INPUT_CAPACITY {
            log::warn!("Initial field text exceeds {} bytes", INPUT_CAPACITY);
            return Err(UiError::InputOverflow);
        }
        self.state.configure(config.bounds, config.callback)?;
        self.kind = config.kind;
        self.text.clear();
        self.text.push_str(config.text).ok();
        self.placeholder = make_label(config.placeholder);
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed value of a number box; `None` if empty or not a number.
    pub fn number(&self) -> Option<i32> {
        self.text.trim().parse().ok()
    }

    /// Replace the text without opening the keyboard.
    ///
    /// Returns `Ok(true)` when the text changed.
    pub fn set_text(&mut self, text: &str) -> Result<bool, UiError> {
        if self.text.as_str() == text {
            return Ok(false);
        }
        let mut next = heapless::String::new();
        if next.push_str(text).is_err() {
            log::warn!("Field text exceeds {} bytes", INPUT_CAPACITY);
            return Err(UiError::InputOverflow);
        }
        self.text = next;
        self.state.mark_dirty();
        Ok(true)
    }
}

impl Widget for InputField {
    fn category(&self) -> Category {
        match self.kind {
            InputKind::Keyboard => Category::TextBox,
            InputKind::Numpad => Category::NumberBox,
        }
    }

    fn state(&self) -> &WidgetState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WidgetState {
        &mut self.state
    }

    fn detect_touch(&mut self, point: Point) -> bool {
        self.state.contains(point)
    }

    fn redraw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> DrawResult {
        let bounds = self.state.bounds();
        bounds
            .into_styled(
                PrimitiveStyleBuilder::new()
                    .fill_color(palette.surface)
                    .stroke_color(palette.border)
                    .stroke_width(1)
                    .build(),
            )
            .draw(fb)?;

        let (shown, color) = if self.text.is_empty() {
            (self.placeholder.as_str(), palette.text_secondary)
        } else {
            (self.text.as_str(), palette.text_primary)
        };
        if shown.is_empty() {
            return Ok(());
        }
        let position = Point::new(bounds.top_left.x + TEXT_PADDING, bounds.center().y);
        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Left)
            .baseline(Baseline::Middle)
            .build();
        Text::with_text_style(shown, position, MonoTextStyle::new(&FONT_6X10, color), text_style)
            .draw(fb)?;
        Ok(())
    }

    fn input_kind(&self) -> Option<InputKind> {
        Some(self.kind)
    }

    fn input_text(&self) -> &str {
        &self.text
    }

    fn accept_input(&mut self, text: &str) {
        // The modal buffer has the same capacity, so this cannot overflow.
        if self.set_text(text).is_err() {
            log::warn!("Dropping edited text for field on screen {:?}", self.state.screen());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_box() -> InputField {
        let mut field = InputField::new(ScreenId(0), InputKind::Numpad);
        field
            .setup(InputFieldConfig {
                bounds: Rectangle::new(Point::new(0, 0), Size::new(80, 24)),
                kind: InputKind::Numpad,
                text: "42",
                placeholder: "value",
                callback: None,
            })
            .unwrap();
        field
    }

    #[test]
    fn test_category_follows_kind() {
        assert_eq!(number_box().category(), Category::NumberBox);
        let text = InputField::new(ScreenId(0), InputKind::Keyboard);
        assert_eq!(text.category(), Category::TextBox);
    }

    #[test]
    fn test_touch_claims_without_editing() {
        let mut field = number_box();
        assert!(field.detect_touch(Point::new(10, 10)));
        assert_eq!(field.text(), "42");
        assert_eq!(field.input_kind(), Some(InputKind::Numpad));
    }

    #[test]
    fn test_accept_input_updates_number() {
        let mut field = number_box();
        field.state_mut().mark_clean();
        field.accept_input("-17");
        assert_eq!(field.number(), Some(-17));
        assert!(field.state().is_dirty());
    }

    #[test]
    fn test_set_text_rejects_overflow() {
        let mut field = number_box();
        let long = "9".repeat(INPUT_CAPACITY + 1);
        assert_eq!(field.set_text(&long), Err(UiError::InputOverflow));
        assert_eq!(field.text(), "42");
    }
}
