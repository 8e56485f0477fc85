//! Core widget contract for the touchdeck runtime

use core::any::Any;

use embassy_time::{Duration, Instant};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::warn;

use crate::callback_queue::Callback;
use crate::error::UiError;
use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::modal::InputKind;
use crate::registry::Category;
use crate::ui::styling::ColorPalette;

/// Identifier of a screen; exactly one screen is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScreenId(pub u8);

/// Lifecycle and interaction flags common to every widget.
///
/// A widget starts inert. [`WidgetArena::insert`](crate::registry::WidgetArena::insert)
/// marks it `initialized`, and its one-time setup call marks it `loaded`.
/// Only then can it become eligible for hit-testing.
#[derive(Debug, Clone)]
pub struct WidgetState {
    screen: ScreenId,
    bounds: Rectangle,
    visible: bool,
    initialized: bool,
    loaded: bool,
    enabled: bool,
    locked: bool,
    last_touch: Option<Instant>,
    debounce: Option<Duration>,
    dirty: bool,
    callback: Option<Callback>,
}

impl WidgetState {
    pub fn new(screen: ScreenId) -> Self {
        Self {
            screen,
            bounds: Rectangle::zero(),
            visible: true,
            initialized: false,
            loaded: false,
            enabled: true,
            locked: false,
            last_touch: None,
            debounce: None,
            dirty: false,
            callback: None,
        }
    }

    /// One-time setup shared by every widget's `setup` call.
    ///
    /// Validates before mutating: a rejected call leaves the state untouched.
    pub fn configure(&mut self, bounds: Rectangle, callback: Option<Callback>) -> Result<(), UiError> {
        if self.loaded {
            warn!("Widget on screen {:?} configured twice, ignoring", self.screen);
            return Err(UiError::AlreadyConfigured);
        }
        if bounds.size.width == 0 || bounds.size.height == 0 {
            warn!("Rejecting zero-sized widget bounds {:?}", bounds);
            return Err(UiError::InvalidDimensions);
        }
        self.bounds = bounds;
        self.callback = callback;
        self.loaded = true;
        self.dirty = true;
        Ok(())
    }

    pub(crate) fn attach(&mut self) {
        self.initialized = true;
    }

    pub fn screen(&self) -> ScreenId {
        self.screen
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn contains(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }

    pub fn callback(&self) -> Option<Callback> {
        self.callback
    }

    pub fn set_callback(&mut self, callback: Option<Callback>) {
        self.callback = callback;
    }

    /// Override the UI-wide debounce window for this widget.
    pub fn set_debounce(&mut self, window: Duration) {
        self.debounce = Some(window);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn last_touch(&self) -> Option<Instant> {
        self.last_touch
    }

    pub fn show(&mut self) {
        if !self.visible {
            self.visible = true;
            self.dirty = true;
        }
    }

    /// Hidden widgets are erased to the background on the next redraw pass.
    pub fn hide(&mut self) {
        if self.visible {
            self.visible = false;
            self.dirty = true;
        }
    }

    pub fn enable(&mut self) {
        if !self.enabled {
            self.enabled = true;
            self.dirty = true;
        }
    }

    pub fn disable(&mut self) {
        if self.enabled {
            self.enabled = false;
            self.dirty = true;
        }
    }

    /// Locked widgets still draw normally but ignore touches.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Whether a touch at `now` may be offered to this widget.
    pub fn is_hit_eligible(&self, active: ScreenId, now: Instant, default_debounce: Duration) -> bool {
        if !(self.visible && self.initialized && self.loaded && self.enabled && !self.locked) {
            return false;
        }
        if self.screen != active {
            return false;
        }
        match self.last_touch {
            Some(last) => {
                let window = self.debounce.unwrap_or(default_debounce);
                now.checked_duration_since(last)
                    .is_some_and(|elapsed| elapsed >= window)
            }
            None => true,
        }
    }

    /// Stamp an accepted hit for debouncing.
    pub fn record_touch(&mut self, now: Instant) {
        self.last_touch = Some(now);
    }
}

/// Capability contract implemented by every visual control.
///
/// The arena stores widgets as `Box<dyn Widget>`, so every method here is
/// object-safe. Drawing always targets the RAM [`FrameBuffer`]; the DrawTask
/// owns the path to the real display.
pub trait Widget: Any {
    /// Registry category this widget belongs to.
    fn category(&self) -> Category;

    fn state(&self) -> &WidgetState;

    fn state_mut(&mut self) -> &mut WidgetState;

    /// Test whether `point` hits this widget and apply the resulting state
    /// change (toggle, new slider value, ...). Returning `true` claims the
    /// touch and stops dispatch for this sample.
    fn detect_touch(&mut self, point: Point) -> bool;

    /// Draw the widget into the framebuffer.
    fn redraw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> DrawResult;

    /// Widgets that edit text through the modal keyboard report their layout here.
    fn input_kind(&self) -> Option<InputKind> {
        None
    }

    /// Current text for modal editing.
    fn input_text(&self) -> &str {
        ""
    }

    /// Receive the edited value when the modal keyboard closes.
    fn accept_input(&mut self, _text: &str) {}
}
