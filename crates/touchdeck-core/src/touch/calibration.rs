//! Raw-to-screen coordinate mapping and its persisted calibration record
//!
//! The map is two independent linear rescales, one per axis, applied after an
//! optional raw axis swap and raw axis mirroring. Corner calibration solves
//! those rescales from four touched markers and stores the raw samples in the
//! key/value store under the `"touch"` namespace.

use embedded_graphics::prelude::Point;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, UiError};
use crate::storage::{KeyValueStore, StorageError};

pub const NAMESPACE: &str = "touch";
pub const KEY_CALIBRATED: &str = "calibrated";
pub const KEY_POINTS: &str = "points";

/// Number of markers in the guided corner calibration.
pub const CORNER_POINTS: usize = 4;

/// Large enough for a postcard-encoded [`CalibrationRecord`].
const RECORD_BUF_LEN: usize = 64;

/// One marker: where it was drawn and what the controller reported.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationPoint {
    pub raw_x: u16,
    pub raw_y: u16,
    pub screen_x: u16,
    pub screen_y: u16,
}

/// What gets persisted after a successful corner calibration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRecord {
    /// Driver rotation the samples were taken under.
    pub rotation: u8,
    pub points: [CalibrationPoint; CORNER_POINTS],
}

/// Linear rescale from `[in_min, in_max]` onto `[out_min, out_max]`, clamped
/// to the destination range.
///
/// Either range may be descending. A zero-width input range maps everything
/// to `out_min`.
pub fn map_range(value: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_min == in_max {
        return out_min;
    }
    let scaled = out_min as i64
        + (value as i64 - in_min as i64) * (out_max as i64 - out_min as i64)
            / (in_max as i64 - in_min as i64);
    let (lo, hi) = if out_min <= out_max {
        (out_min, out_max)
    } else {
        (out_max, out_min)
    };
    scaled.clamp(lo as i64, hi as i64) as i32
}

/// Marker positions for the guided calibration: top-left, top-right,
/// bottom-right, bottom-left, each `inset` pixels from the edges.
pub fn marker_points(width: u16, height: u16, inset: u16) -> [Point; CORNER_POINTS] {
    let left = inset as i32;
    let top = inset as i32;
    let right = width as i32 - 1 - inset as i32;
    let bottom = height as i32 - 1 - inset as i32;
    [
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchCalibrationMap {
    x0: i32,
    x1: i32,
    y0: i32,
    y1: i32,
    width: u16,
    height: u16,
    invert_x: bool,
    invert_y: bool,
    swap_xy: bool,
    passthrough: bool,
}

/// Raw values that land on screen 0 and on screen `extent` for one axis.
struct AxisFit {
    at_zero: i32,
    at_extent: i32,
}

impl AxisFit {
    /// Fit one axis from the markers at its lowest and highest screen value,
    /// extrapolating from the inset markers out to the physical edges.
    fn solve(
        points: &[CalibrationPoint],
        screen: impl Fn(&CalibrationPoint) -> i32,
        raw: impl Fn(&CalibrationPoint) -> i32,
        extent: u16,
    ) -> Result<Self, CalibrationError> {
        let lo_screen = points.iter().map(&screen).min().unwrap_or(0);
        let hi_screen = points.iter().map(&screen).max().unwrap_or(0);
        if lo_screen == hi_screen {
            return Err(CalibrationError::DegenerateAxis);
        }

        let average = |target: i32| {
            let (sum, count) = points
                .iter()
                .filter(|p| screen(*p) == target)
                .fold((0i64, 0i64), |(sum, count), p| (sum + raw(p) as i64, count + 1));
            sum / count.max(1)
        };
        let lo_raw = average(lo_screen);
        let hi_raw = average(hi_screen);
        if lo_raw == hi_raw {
            return Err(CalibrationError::DegenerateAxis);
        }

        let at = |s: i64| {
            lo_raw + (hi_raw - lo_raw) * (s - lo_screen as i64) / (hi_screen - lo_screen) as i64
        };
        Ok(Self {
            at_zero: at(0) as i32,
            at_extent: at(extent as i64) as i32,
        })
    }

    /// `(min, max, inverted)` in the form the map stores.
    fn bounds(&self) -> (i32, i32, bool) {
        if self.at_zero <= self.at_extent {
            (self.at_zero, self.at_extent, false)
        } else {
            (self.at_extent, self.at_zero, true)
        }
    }
}

impl TouchCalibrationMap {
    /// Two-point linear map: raw `x0` lands on screen 0, raw `x1` on `width`,
    /// and likewise for y.
    pub fn linear(
        x0: i32,
        x1: i32,
        y0: i32,
        y1: i32,
        width: u16,
        height: u16,
    ) -> Result<Self, CalibrationError> {
        if x0 == x1 || y0 == y1 {
            return Err(CalibrationError::DegenerateAxis);
        }
        Ok(Self {
            x0,
            x1,
            y0,
            y1,
            width,
            height,
            invert_x: false,
            invert_y: false,
            swap_xy: false,
            passthrough: false,
        })
    }

    /// Map that returns raw coordinates untouched.
    ///
    /// Used when the stored calibration cannot be read.
    pub fn passthrough(width: u16, height: u16) -> Self {
        Self {
            x0: 0,
            x1: width as i32,
            y0: 0,
            y1: height as i32,
            width,
            height,
            invert_x: false,
            invert_y: false,
            swap_xy: false,
            passthrough: true,
        }
    }

    /// Solve the map from marker samples.
    ///
    /// Needs at least two points spanning both screen axes. Axis swap is
    /// detected from two markers on the same screen row, so it is only
    /// inferred when such a pair exists. Mirrored axes are detected from the
    /// sign of each fit.
    pub fn from_points(
        points: &[CalibrationPoint],
        width: u16,
        height: u16,
    ) -> Result<Self, CalibrationError> {
        if points.len() < 2 {
            return Err(CalibrationError::NotEnoughPoints {
                required: 2,
                got: points.len(),
            });
        }

        let swap_xy = Self::detect_swap(points);
        let (raw_for_x, raw_for_y): (fn(&CalibrationPoint) -> i32, fn(&CalibrationPoint) -> i32) =
            if swap_xy {
                (
                    |p: &CalibrationPoint| p.raw_y as i32,
                    |p: &CalibrationPoint| p.raw_x as i32,
                )
            } else {
                (
                    |p: &CalibrationPoint| p.raw_x as i32,
                    |p: &CalibrationPoint| p.raw_y as i32,
                )
            };

        let fit_x = AxisFit::solve(points, |p| p.screen_x as i32, raw_for_x, width)?;
        let fit_y = AxisFit::solve(points, |p| p.screen_y as i32, raw_for_y, height)?;
        let (x0, x1, invert_x) = fit_x.bounds();
        let (y0, y1, invert_y) = fit_y.bounds();

        debug!(
            "Calibration solved: x {}..{} inv={} y {}..{} inv={} swap={}",
            x0, x1, invert_x, y0, y1, invert_y, swap_xy
        );
        Ok(Self {
            x0,
            x1,
            y0,
            y1,
            width,
            height,
            invert_x,
            invert_y,
            swap_xy,
            passthrough: false,
        })
    }

    fn detect_swap(points: &[CalibrationPoint]) -> bool {
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                if a.screen_y == b.screen_y && a.screen_x != b.screen_x {
                    let dx = (a.raw_x as i32 - b.raw_x as i32).abs();
                    let dy = (a.raw_y as i32 - b.raw_y as i32).abs();
                    return dy > dx;
                }
            }
        }
        false
    }

    pub fn with_invert(mut self, invert_x: bool, invert_y: bool) -> Self {
        self.invert_x = invert_x;
        self.invert_y = invert_y;
        self
    }

    pub fn with_swap(mut self, swap_xy: bool) -> Self {
        self.swap_xy = swap_xy;
        self
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn invert_x(&self) -> bool {
        self.invert_x
    }

    pub fn invert_y(&self) -> bool {
        self.invert_y
    }

    pub fn swap_xy(&self) -> bool {
        self.swap_xy
    }

    /// Convert a raw controller sample to logical screen coordinates.
    pub fn to_screen(&self, raw_x: u16, raw_y: u16) -> Point {
        if self.passthrough {
            return Point::new(raw_x as i32, raw_y as i32);
        }
        let (mut rx, mut ry) = if self.swap_xy {
            (raw_y as i32, raw_x as i32)
        } else {
            (raw_x as i32, raw_y as i32)
        };
        if self.invert_x {
            rx = self.x0 + self.x1 - rx;
        }
        if self.invert_y {
            ry = self.y0 + self.y1 - ry;
        }
        Point::new(
            map_range(rx, self.x0, self.x1, 0, self.width as i32),
            map_range(ry, self.y0, self.y1, 0, self.height as i32),
        )
    }
}

/// Result of reading the persisted calibration at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredCalibration {
    /// A valid record for the current rotation.
    Calibrated {
        map: TouchCalibrationMap,
        record: CalibrationRecord,
    },
    /// Never calibrated, recalibration requested, or rotation changed.
    Required,
    /// The store failed; raw coordinates are used as-is.
    Unreadable(TouchCalibrationMap),
}

/// Read and solve the persisted calibration for `rotation`.
///
/// Store failures come back as [`UiError::Storage`]; a missing, corrupt,
/// stale or unsolvable record as [`UiError::Calibration`].
pub fn restore_calibration<S: KeyValueStore>(
    store: &mut S,
    rotation: u8,
    width: u16,
    height: u16,
) -> Result<(TouchCalibrationMap, CalibrationRecord), UiError> {
    if !store.get_bool(NAMESPACE, KEY_CALIBRATED)?.unwrap_or(false) {
        return Err(CalibrationError::NotCalibrated.into());
    }

    let mut buf = [0u8; RECORD_BUF_LEN];
    let len = store
        .get_bytes(NAMESPACE, KEY_POINTS, &mut buf)?
        .ok_or(CalibrationError::NotCalibrated)?;
    let record: CalibrationRecord =
        postcard::from_bytes(&buf[..len]).map_err(|_| CalibrationError::CorruptRecord)?;
    if record.rotation != rotation {
        return Err(CalibrationError::RotationMismatch {
            stored: record.rotation,
            current: rotation,
        }
        .into());
    }

    let map = TouchCalibrationMap::from_points(&record.points, width, height)?;
    Ok((map, record))
}

/// Start-up view of [`restore_calibration`].
pub fn load_calibration<S: KeyValueStore>(
    store: &mut S,
    rotation: u8,
    width: u16,
    height: u16,
) -> StoredCalibration {
    match restore_calibration(store, rotation, width, height) {
        Ok((map, record)) => {
            info!("Loaded touch calibration for rotation {}", rotation);
            StoredCalibration::Calibrated { map, record }
        }
        Err(UiError::Calibration(CalibrationError::NotCalibrated)) => {
            info!("Touch not calibrated");
            StoredCalibration::Required
        }
        Err(UiError::Calibration(e)) => {
            warn!("Stored calibration unusable: {}", e);
            StoredCalibration::Required
        }
        Err(e) => {
            warn!("Calibration unreadable ({}), using raw coordinates", e);
            StoredCalibration::Unreadable(TouchCalibrationMap::passthrough(width, height))
        }
    }
}

/// Persist `record` and set the calibrated flag.
///
/// Points are written first so a failure in between never leaves the flag
/// pointing at stale points.
pub fn save_calibration<S: KeyValueStore>(
    store: &mut S,
    record: &CalibrationRecord,
) -> Result<(), UiError> {
    let mut buf = [0u8; RECORD_BUF_LEN];
    let bytes = postcard::to_slice(record, &mut buf).map_err(|_| StorageError::Encode)?;
    store.put_bytes(NAMESPACE, KEY_POINTS, bytes)?;
    store.put_bool(NAMESPACE, KEY_CALIBRATED, true)?;
    info!("Saved touch calibration for rotation {}", record.rotation);
    Ok(())
}

/// Clear the calibrated flag so the guided sequence runs again.
///
/// Stored points stay in place until a new calibration overwrites them.
pub fn recalibrate<S: KeyValueStore>(store: &mut S) -> Result<(), UiError> {
    store.put_bool(NAMESPACE, KEY_CALIBRATED, false)?;
    info!("Touch recalibration requested");
    Ok(())
}
