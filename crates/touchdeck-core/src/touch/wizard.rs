//! Guided four-corner touch calibration
//!
//! Shows one crosshair at a time at the inset corners. The raw position of
//! the contact is captured while the finger is down and committed when it
//! lifts, so a finger that slides onto the marker is recorded where it came
//! to rest. After the fourth marker the map is solved and handed back to the
//! DrawTask, which persists it.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle};
use log::{info, warn};

use crate::framebuffer::{DrawResult, FrameBuffer};
use crate::touch::calibration::{
    CORNER_POINTS, CalibrationPoint, CalibrationRecord, TouchCalibrationMap, marker_points,
};
use crate::touch::driver::TouchSample;
use crate::touch::state_machine::TouchEventType;
use crate::ui::components::button::draw_label;
use crate::ui::styling::ColorPalette;

const MARKER_ARM: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WizardPhase {
    Closed,
    Marker(usize),
}

/// Outcome of feeding one sample to the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardDispatch {
    /// Wizard not running; dispatch the sample normally.
    Inactive,
    /// Sample belonged to the wizard.
    Consumed,
    /// Last marker recorded and the map solved.
    Finished {
        map: TouchCalibrationMap,
        record: CalibrationRecord,
    },
}

pub struct CalibrationWizard {
    phase: WizardPhase,
    markers: [Point; CORNER_POINTS],
    samples: [CalibrationPoint; CORNER_POINTS],
    pending_raw: Option<(u16, u16)>,
    width: u16,
    height: u16,
    rotation: u8,
    needs_draw: bool,
}

impl CalibrationWizard {
    pub fn new(width: u16, height: u16, inset: u16) -> Self {
        Self {
            phase: WizardPhase::Closed,
            markers: marker_points(width, height, inset),
            samples: [CalibrationPoint::default(); CORNER_POINTS],
            pending_raw: None,
            width,
            height,
            rotation: 0,
            needs_draw: false,
        }
    }

    /// Begin (or restart) the sequence for the given driver rotation.
    pub fn start(&mut self, rotation: u8) {
        info!("Starting touch calibration (rotation {})", rotation);
        self.phase = WizardPhase::Marker(0);
        self.rotation = rotation;
        self.pending_raw = None;
        self.needs_draw = true;
    }

    pub fn is_active(&self) -> bool {
        self.phase != WizardPhase::Closed
    }

    /// Index of the marker currently shown.
    pub fn current_marker(&self) -> Option<usize> {
        match self.phase {
            WizardPhase::Marker(index) => Some(index),
            WizardPhase::Closed => None,
        }
    }

    pub fn marker_position(&self, index: usize) -> Option<Point> {
        self.markers.get(index).copied()
    }

    /// Feed one raw sample together with its classified event.
    pub fn handle(&mut self, sample: &TouchSample, event: TouchEventType) -> WizardDispatch {
        let WizardPhase::Marker(index) = self.phase else {
            return WizardDispatch::Inactive;
        };

        match event {
            TouchEventType::Down | TouchEventType::Hold if sample.has_touch => {
                self.pending_raw = Some((sample.x, sample.y));
                WizardDispatch::Consumed
            }
            TouchEventType::Up => {
                let Some((raw_x, raw_y)) = self.pending_raw.take() else {
                    return WizardDispatch::Consumed;
                };
                let marker = self.markers[index];
                self.samples[index] = CalibrationPoint {
                    raw_x,
                    raw_y,
                    screen_x: marker.x as u16,
                    screen_y: marker.y as u16,
                };
                info!("Marker {} at {:?} -> raw ({}, {})", index, marker, raw_x, raw_y);
                self.needs_draw = true;

                if index + 1 < CORNER_POINTS {
                    self.phase = WizardPhase::Marker(index + 1);
                    return WizardDispatch::Consumed;
                }
                self.finish()
            }
            _ => WizardDispatch::Consumed,
        }
    }

    fn finish(&mut self) -> WizardDispatch {
        match TouchCalibrationMap::from_points(&self.samples, self.width, self.height) {
            Ok(map) => {
                self.phase = WizardPhase::Closed;
                WizardDispatch::Finished {
                    map,
                    record: CalibrationRecord {
                        rotation: self.rotation,
                        points: self.samples,
                    },
                }
            }
            Err(e) => {
                warn!("Calibration failed ({}), starting over", e);
                self.start(self.rotation);
                WizardDispatch::Consumed
            }
        }
    }

    /// Draw the current marker if it changed since the last call.
    ///
    /// Returns `true` when something was drawn.
    pub fn draw(&mut self, fb: &mut FrameBuffer, palette: &ColorPalette) -> Result<bool, core::convert::Infallible> {
        if !self.needs_draw {
            return Ok(false);
        }
        self.needs_draw = false;
        fb.clear(palette.background)?;
        if let WizardPhase::Marker(index) = self.phase {
            self.draw_marker(fb, self.markers[index], palette)?;
            let center = Point::new(self.width as i32 / 2, self.height as i32 / 2);
            draw_label(fb, "Touch the marker", center, palette.text_primary)?;
        }
        Ok(true)
    }

    fn draw_marker(&self, fb: &mut FrameBuffer, at: Point, palette: &ColorPalette) -> DrawResult {
        let stroke = PrimitiveStyle::with_stroke(palette.alert, 1);
        Line::new(at - Point::new(MARKER_ARM, 0), at + Point::new(MARKER_ARM, 0))
            .into_styled(stroke)
            .draw(fb)?;
        Line::new(at - Point::new(0, MARKER_ARM), at + Point::new(0, MARKER_ARM))
            .into_styled(stroke)
            .draw(fb)?;
        Circle::with_center(at, MARKER_ARM as u32)
            .into_styled(stroke)
            .draw(fb)
    }
}
