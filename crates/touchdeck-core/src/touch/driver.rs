//! Touch controller boundary
//!
//! Chip drivers (FT6336U, XPT2046, ...) implement [`TouchDriver`]. The
//! DrawTask only ever talks to a [`TouchInput`], which wraps an optional
//! driver: if the controller failed to come up, the input stays inert and
//! reports "no touch" forever while the rest of the UI keeps running.

extern crate alloc;

use alloc::collections::VecDeque;
use core::fmt::Debug;

use log::{error, info, trace};

use crate::touch::calibration::CalibrationPoint;

/// Hardware gesture reported by controllers with on-chip gesture detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gesture {
    #[default]
    None,
    MoveUp,
    MoveRight,
    MoveDown,
    MoveLeft,
    ZoomIn,
    ZoomOut,
}

impl Gesture {
    /// Decode an FT6x36 gesture id register value.
    pub fn from_register(val: u8) -> Self {
        match val {
            0x10 => Self::MoveUp,
            0x14 => Self::MoveRight,
            0x18 => Self::MoveDown,
            0x1C => Self::MoveLeft,
            0x48 => Self::ZoomIn,
            0x49 => Self::ZoomOut,
            _ => Self::None,
        }
    }
}

/// One contact as reported by the controller, in raw controller units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTouch {
    pub x: u16,
    pub y: u16,
    /// Resistive controllers report pressure; capacitive ones do not.
    pub pressure: Option<u16>,
}

impl RawTouch {
    pub fn at(x: u16, y: u16) -> Self {
        Self {
            x,
            y,
            pressure: None,
        }
    }
}

pub trait TouchDriver {
    /// Current contact, if any.
    fn get_touch(&mut self) -> Option<RawTouch>;

    fn gesture(&mut self) -> Gesture {
        Gesture::None
    }

    /// Display rotation the controller is configured for (0-3).
    fn rotation(&self) -> u8 {
        0
    }

    /// Hand solved calibration points to controllers that map on-chip.
    fn set_calibration(&mut self, _points: &[CalibrationPoint]) {}
}

/// What the DrawTask reads once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchSample {
    pub has_touch: bool,
    pub x: u16,
    pub y: u16,
    pub pressure: Option<u16>,
    pub gesture: Gesture,
}

impl TouchSample {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Touch source owned by the DrawTask.
pub struct TouchInput<T> {
    driver: Option<T>,
    min_pressure: u16,
}

impl<T: TouchDriver> TouchInput<T> {
    pub fn new(driver: T, min_pressure: u16) -> Self {
        info!("Touch input ready (rotation {})", driver.rotation());
        Self {
            driver: Some(driver),
            min_pressure,
        }
    }

    /// Input that never reports a touch.
    pub fn inert() -> Self {
        Self {
            driver: None,
            min_pressure: 0,
        }
    }

    /// Wrap the outcome of a driver's init sequence.
    ///
    /// A failed init is logged once and yields an inert input.
    pub fn from_init<E: Debug>(result: Result<T, E>, min_pressure: u16) -> Self {
        match result {
            Ok(driver) => Self::new(driver, min_pressure),
            Err(e) => {
                error!("Touch controller init failed: {:?}; touch disabled", e);
                Self::inert()
            }
        }
    }

    pub fn is_inert(&self) -> bool {
        self.driver.is_none()
    }

    pub fn rotation(&self) -> u8 {
        self.driver.as_ref().map_or(0, |d| d.rotation())
    }

    pub fn set_calibration(&mut self, points: &[CalibrationPoint]) {
        if let Some(driver) = self.driver.as_mut() {
            driver.set_calibration(points);
        }
    }

    pub fn driver_mut(&mut self) -> Option<&mut T> {
        self.driver.as_mut()
    }

    /// Read one sample, dropping contacts lighter than the minimum pressure.
    pub fn sample(&mut self) -> TouchSample {
        let Some(driver) = self.driver.as_mut() else {
            return TouchSample::none();
        };
        let gesture = driver.gesture();
        match driver.get_touch() {
            Some(touch) if touch.pressure.is_some_and(|p| p < self.min_pressure) => {
                trace!("Ignoring light contact {:?}", touch);
                TouchSample {
                    gesture,
                    ..TouchSample::none()
                }
            }
            Some(touch) => TouchSample {
                has_touch: true,
                x: touch.x,
                y: touch.y,
                pressure: touch.pressure,
                gesture,
            },
            None => TouchSample {
                gesture,
                ..TouchSample::none()
            },
        }
    }
}

/// Driver that replays a fixed list of samples, one per call.
///
/// Used by the simulator and the tests. Once the script runs out it reports
/// no touch.
#[derive(Debug, Default, Clone)]
pub struct ScriptedTouch {
    script: VecDeque<Option<RawTouch>>,
    rotation: u8,
    calibration: Option<[CalibrationPoint; 4]>,
}

impl ScriptedTouch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rotation(mut self, rotation: u8) -> Self {
        self.rotation = rotation;
        self
    }

    /// Queue one sample; `None` means no contact.
    pub fn push(&mut self, sample: Option<RawTouch>) {
        self.script.push_back(sample);
    }

    /// Queue a contact at `(x, y)` held for `samples` ticks, then one release.
    pub fn tap(&mut self, x: u16, y: u16, samples: usize) {
        for _ in 0..samples {
            self.push(Some(RawTouch::at(x, y)));
        }
        self.push(None);
    }

    /// Queue `samples` ticks without contact.
    pub fn idle(&mut self, samples: usize) {
        for _ in 0..samples {
            self.push(None);
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Points last handed over through [`TouchDriver::set_calibration`].
    pub fn calibration(&self) -> Option<&[CalibrationPoint; 4]> {
        self.calibration.as_ref()
    }
}

impl TouchDriver for ScriptedTouch {
    fn get_touch(&mut self) -> Option<RawTouch> {
        self.script.pop_front().flatten()
    }

    fn rotation(&self) -> u8 {
        self.rotation
    }

    fn set_calibration(&mut self, points: &[CalibrationPoint]) {
        if let Ok(points) = <[CalibrationPoint; 4]>::try_from(points) {
            self.calibration = Some(points);
        }
    }
}
