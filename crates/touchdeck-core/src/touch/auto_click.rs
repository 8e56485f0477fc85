//! Periodic synthetic tap
//!
//! When armed, the timer injects a one-tick touch at a fixed screen point
//! every interval. The injected sample replaces the driver read for that
//! tick and skips calibration.

use embassy_time::{Duration, Instant};
use embedded_graphics::prelude::Point;
use log::{debug, info};

use crate::config::AutoClickConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoClickTimer {
    interval: Duration,
    point: Point,
    next_due: Option<Instant>,
}

impl Default for AutoClickTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoClickTimer {
    pub const fn new() -> Self {
        Self {
            interval: Duration::from_ticks(0),
            point: Point::zero(),
            next_due: None,
        }
    }

    /// Timer armed from the UI configuration, if it asks for one.
    pub fn from_config(config: Option<AutoClickConfig>, now: Instant) -> Self {
        let mut timer = Self::new();
        if let Some(cfg) = config {
            timer.arm(
                Duration::from_millis(cfg.interval_ms as u64),
                Point::new(cfg.x as i32, cfg.y as i32),
                now,
            );
        }
        timer
    }

    /// Fire at `point` every `interval`, first one `interval` after `now`.
    pub fn arm(&mut self, interval: Duration, point: Point, now: Instant) {
        info!("Auto-click armed: every {} ms at {:?}", interval.as_millis(), point);
        self.interval = interval;
        self.point = point;
        self.next_due = Some(now + interval);
    }

    pub fn disarm(&mut self) {
        if self.next_due.take().is_some() {
            info!("Auto-click disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Screen point to inject this tick, if the timer is due.
    pub fn poll(&mut self, now: Instant) -> Option<Point> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        self.next_due = Some(now + self.interval);
        debug!("Auto-click at {:?}", self.point);
        Some(self.point)
    }
}
