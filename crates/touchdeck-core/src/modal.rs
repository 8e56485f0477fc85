//! Modal on-screen keyboard and numpad
//!
//! While open, the controller is the only consumer of touch samples: the
//! DrawTask stops hit-testing widgets and feeds every sample here instead,
//! one per tick. It is a plain OPEN/CLOSED state machine driven by the
//! DrawTask's own loop, so nothing ever blocks waiting for a key.
//!
//! The first few samples after opening are swallowed so the contact that
//! opened the keyboard cannot also press the key that appears under it.

use embedded_graphics::mono_font::{MonoTextStyle, ascii::FONT_6X10};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use heapless::{String, Vec};
use log::{debug, info, warn};

use crate::context::UiContext;
use crate::error::UiError;
use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::registry::{WidgetArena, WidgetId};
use crate::touch::TouchEventType;
use crate::ui::components::button::draw_label;
use crate::ui::styling::ColorPalette;

/// Bytes an input field (and the edit buffer) can hold.
pub const INPUT_CAPACITY: usize = 64;

const MAX_KEYS: usize = 48;
const TEXT_AREA_HEIGHT: u32 = 32;
const KEY_GAP: u32 = 2;

const KEYBOARD_ROWS: [&str; 4] = ["1234567890", "qwertyuiop", "asdfghjkl", "zxcvbnm"];
const KEYBOARD_SPECIAL: [Key; 4] = [Key::Shift, Key::Space, Key::Backspace, Key::Return];
const NUMPAD_ROWS: [&str; 4] = ["123", "456", "789", "-0."];
const NUMPAD_SPECIAL: [Key; 2] = [Key::Backspace, Key::Return];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Full alphanumeric keyboard.
    Keyboard,
    /// Digits, sign and decimal point.
    Numpad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    Backspace,
    Shift,
    Return,
}

impl Key {
    fn label(&self, shift: bool) -> KeyLabel {
        let mut text = String::new();
        match self {
            Key::Char(c) if shift => text.push(c.to_ascii_uppercase()).ok(),
            Key::Char(c) => text.push(*c).ok(),
            Key::Space => text.push_str("Space").ok(),
            Key::Backspace => text.push_str("Del").ok(),
            Key::Shift => text.push_str("Shift").ok(),
            Key::Return => text.push_str("OK").ok(),
        };
        text
    }
}

type KeyLabel = String<8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCap {
    pub key: Key,
    pub bounds: Rectangle,
}

/// Key positions for one input kind on one screen size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeypadLayout {
    kind: InputKind,
    text_area: Rectangle,
    keys: Vec<KeyCap, MAX_KEYS>,
}

impl KeypadLayout {
    /// Lay out the keys as a grid below a text strip at the top of the screen.
    pub fn build(kind: InputKind, width: u16, height: u16) -> Self {
        let (rows, special, columns): (&[&str], &[Key], u32) = match kind {
            InputKind::Keyboard => (&KEYBOARD_ROWS, &KEYBOARD_SPECIAL, 10),
            InputKind::Numpad => (&NUMPAD_ROWS, &NUMPAD_SPECIAL, 3),
        };
        let width = width as u32;
        let height = height as u32;
        let row_count = rows.len() as u32 + 1;
        let row_height = height.saturating_sub(TEXT_AREA_HEIGHT) / row_count;
        let key_width = width / columns;

        let mut keys = Vec::new();
        let mut top = TEXT_AREA_HEIGHT as i32;
        for row in rows {
            let used = row.len() as u32 * key_width;
            let mut left = (width.saturating_sub(used) / 2) as i32;
            for c in row.chars() {
                keys.push(KeyCap {
                    key: Key::Char(c),
                    bounds: Self::cap(left, top, key_width, row_height),
                })
                .ok();
                left += key_width as i32;
            }
            top += row_height as i32;
        }

        let special_width = width / special.len() as u32;
        let mut left = 0;
        for &key in special {
            keys.push(KeyCap {
                key,
                bounds: Self::cap(left, top, special_width, row_height),
            })
            .ok();
            left += special_width as i32;
        }

        Self {
            kind,
            text_area: Rectangle::new(Point::zero(), Size::new(width, TEXT_AREA_HEIGHT)),
            keys,
        }
    }

    fn cap(left: i32, top: i32, width: u32, height: u32) -> Rectangle {
        Rectangle::new(
            Point::new(left + (KEY_GAP / 2) as i32, top + (KEY_GAP / 2) as i32),
            Size::new(width.saturating_sub(KEY_GAP), height.saturating_sub(KEY_GAP)),
        )
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn keys(&self) -> &[KeyCap] {
        &self.keys
    }

    pub fn key_at(&self, point: Point) -> Option<Key> {
        self.keys
            .iter()
            .find(|cap| cap.bounds.contains(point))
            .map(|cap| cap.key)
    }

    /// Center of the first cap carrying `key`.
    pub fn position_of(&self, key: Key) -> Option<Point> {
        self.keys
            .iter()
            .find(|cap| cap.key == key)
            .map(|cap| cap.bounds.center())
    }
}

/// What one sample did to an open controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalOutcome {
    /// Controller closed; sample not consumed.
    Inactive,
    /// Swallowed by ghost-click suppression.
    Suppressed,
    /// Consumed without pressing a key.
    Idle,
    /// A key was applied to the buffer.
    Pressed(Key),
    /// The key did not fit in the buffer.
    Overflow,
    /// RETURN closed the controller; the owner got the text back.
    Closed(WidgetId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModalState {
    Closed,
    Open { owner: WidgetId },
}

pub struct ModalInputController {
    state: ModalState,
    layout: KeypadLayout,
    buffer: String<INPUT_CAPACITY>,
    shift: bool,
    samples_seen: u8,
    ghost_samples: u8,
    width: u16,
    height: u16,
    needs_draw: bool,
}

impl ModalInputController {
    pub fn new(width: u16, height: u16, ghost_samples: u8) -> Self {
        Self {
            state: ModalState::Closed,
            layout: KeypadLayout::build(InputKind::Keyboard, width, height),
            buffer: String::new(),
            shift: false,
            samples_seen: 0,
            ghost_samples,
            width,
            height,
            needs_draw: false,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ModalState::Open { .. })
    }

    pub fn owner(&self) -> Option<WidgetId> {
        match self.state {
            ModalState::Open { owner } => Some(owner),
            ModalState::Closed => None,
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn layout(&self) -> &KeypadLayout {
        &self.layout
    }

    /// Open for `owner`, seeded with its current text, and take over touch input.
    pub fn open(
        &mut self,
        owner: WidgetId,
        kind: InputKind,
        initial: &str,
        ctx: &mut UiContext,
    ) -> Result<(), UiError> {
        if self.is_open() {
            warn!("Keyboard already open, ignoring request from {:?}", owner);
            return Err(UiError::ModalBusy);
        }
        let mut buffer = String::new();
        if buffer.push_str(initial).is_err() {
            warn!("Field text exceeds keyboard buffer");
            return Err(UiError::InputOverflow);
        }

        if self.layout.kind() != kind {
            self.layout = KeypadLayout::build(kind, self.width, self.height);
        }
        self.buffer = buffer;
        self.shift = false;
        self.samples_seen = 0;
        self.state = ModalState::Open { owner };
        self.needs_draw = true;
        ctx.set_using_keyboard(true);
        info!("{:?} opened for widget {:?}", kind, owner);
        Ok(())
    }

    /// Feed one tick's sample in screen coordinates.
    pub fn handle_sample(
        &mut self,
        point: Option<Point>,
        event: TouchEventType,
        ctx: &mut UiContext,
        widgets: &mut WidgetArena,
    ) -> ModalOutcome {
        if !self.is_open() {
            return ModalOutcome::Inactive;
        }
        if self.samples_seen < self.ghost_samples {
            self.samples_seen += 1;
            return ModalOutcome::Suppressed;
        }
        if event != TouchEventType::Down {
            return ModalOutcome::Idle;
        }
        let Some(key) = point.and_then(|p| self.layout.key_at(p)) else {
            return ModalOutcome::Idle;
        };
        self.press(key, ctx, widgets)
    }

    /// Apply `key` as if it had been touched.
    pub fn press(&mut self, key: Key, ctx: &mut UiContext, widgets: &mut WidgetArena) -> ModalOutcome {
        debug!("Key {:?}", key);
        match key {
            Key::Char(c) => {
                let c = if self.shift { c.to_ascii_uppercase() } else { c };
                if self.buffer.push(c).is_err() {
                    warn!("Keyboard buffer full ({} bytes), dropping {:?}", INPUT_CAPACITY, c);
                    return ModalOutcome::Overflow;
                }
                self.shift = false;
            }
            Key::Space => {
                if self.buffer.push(' ').is_err() {
                    warn!("Keyboard buffer full ({} bytes)", INPUT_CAPACITY);
                    return ModalOutcome::Overflow;
                }
            }
            Key::Backspace => {
                self.buffer.pop();
            }
            Key::Shift => self.shift = !self.shift,
            Key::Return => {
                return match self.close(ctx, widgets) {
                    Some(owner) => ModalOutcome::Closed(owner),
                    None => ModalOutcome::Inactive,
                };
            }
        }
        self.needs_draw = true;
        ModalOutcome::Pressed(key)
    }

    /// Close, write the buffer back to the owner, and release touch input.
    ///
    /// Every widget on the active screen is marked dirty since the keyboard
    /// covered them. The owner's callback is queued.
    pub fn close(&mut self, ctx: &mut UiContext, widgets: &mut WidgetArena) -> Option<WidgetId> {
        let ModalState::Open { owner } = self.state else {
            return None;
        };
        self.state = ModalState::Closed;
        self.needs_draw = false;
        ctx.set_using_keyboard(false);

        match widgets.get_mut(owner) {
            Some(widget) => widget.accept_input(&self.buffer),
            None => warn!("Keyboard owner {:?} no longer exists", owner),
        }
        widgets.mark_screen_dirty(ctx.active_screen());
        // The text is written back even when the callback cannot be queued.
        if let Err(e) = widgets.notify(owner, ctx) {
            debug!("Callback for {:?} not queued: {}", owner, e);
        }
        info!("Keyboard closed for widget {:?}", owner);
        Some(owner)
    }

    /// Draw the keyboard if anything changed since the last call.
    pub fn draw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> Result<bool, core::convert::Infallible> {
        if !self.is_open() || !self.needs_draw {
            return Ok(false);
        }
        self.needs_draw = false;
        fb.clear(palette.background)?;
        self.draw_text_area(fb, palette)?;
        for cap in self.layout.keys() {
            cap.bounds
                .into_styled(
                    PrimitiveStyleBuilder::new()
                        .fill_color(palette.surface)
                        .stroke_color(palette.border)
                        .stroke_width(1)
                        .build(),
                )
                .draw(fb)?;
            let label = cap.key.label(self.shift);
            draw_label(fb, &label, cap.bounds.center(), palette.text_primary)?;
        }
        Ok(true)
    }

    fn draw_text_area(&self, fb: &mut FrameBuffer, palette: &ColorPalette) -> DrawResult {
        let area = self.layout.text_area;
        area.into_styled(PrimitiveStyle::with_fill(palette.surface))
            .draw(fb)?;
        let style = TextStyleBuilder::new()
            .alignment(Alignment::Left)
            .baseline(Baseline::Middle)
            .build();
        Text::with_text_style(
            &self.buffer,
            Point::new(area.top_left.x + 6, area.center().y),
            MonoTextStyle::new(&FONT_6X10, palette.text_primary),
            style,
        )
        .draw(fb)?;
        Ok(())
    }
}
