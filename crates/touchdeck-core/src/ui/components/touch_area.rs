//! Invisible touch region, tested last as a catch-all

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::callback_queue::Callback;
use crate::error::UiError;
use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::registry::Category;
use crate::ui::core::{ScreenId, Widget, WidgetState};
use crate::ui::styling::ColorPalette;

#[derive(Debug, Clone, Copy)]
pub struct TouchAreaConfig {
    pub bounds: Rectangle,
    pub callback: Option<Callback>,
}

/// Claims touches inside its bounds and remembers where the last one landed.
pub struct TouchArea {
    state: WidgetState,
    last_point: Option<Point>,
}

impl TouchArea {
    pub fn new(screen: ScreenId) -> Self {
        Self {
            state: WidgetState::new(screen),
            last_point: None,
        }
    }

    pub fn setup(&mut self, config: TouchAreaConfig) -> Result<(), UiError> {
        self.state.configure(config.bounds, config.callback)
    }

    /// Screen point of the last claimed touch.
    pub fn last_point(&self) -> Option<Point> {
        self.last_point
    }
}

impl Widget for TouchArea {
    fn category(&self) -> Category {
        Category::TouchArea
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
        self.last_point = Some(point);
        true
    }

    fn redraw(&mut self, _fb: &mut FrameBuffer, _palette: &ColorPalette) -> DrawResult {
        Ok(())
    }
}
