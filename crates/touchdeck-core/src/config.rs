use serde::{Deserialize, Serialize};

/// Runtime tuning for the UI task.
///
/// All values that the touch pipeline treats as empirical constants live here
/// so a board can override them without touching the dispatch code. The
/// struct is `postcard`-serializable so a firmware can persist overrides next
/// to the calibration record.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiConfig {
    /// Logical display width in pixels after rotation.
    pub width: u16,
    /// Logical display height in pixels after rotation.
    pub height: u16,
    /// Sleep between two DrawTask ticks.
    pub tick_ms: u32,
    /// Debounce window applied to widgets that do not set their own.
    pub debounce_ms: u32,
    /// Minimum travel in pixels along one axis for a release to count as a swipe.
    pub swipe_threshold: u16,
    /// Samples swallowed right after the keyboard opens.
    pub ghost_click_samples: u8,
    /// Whether a touch controller is fitted at all.
    pub touch_capable: bool,
    /// Contacts reporting less pressure than this are treated as no touch.
    /// Capacitive drivers report no pressure and are never filtered.
    pub min_pressure: u16,
    /// Distance of the calibration markers from the physical edges.
    pub calibration_inset: u16,
    pub auto_click: Option<AutoClickConfig>,
}

/// Periodic synthetic tap, used for kiosk keep-alive and soak testing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoClickConfig {
    pub interval_ms: u32,
    pub x: u16,
    pub y: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            tick_ms: 10,
            debounce_ms: 300,
            swipe_threshold: 40,
            ghost_click_samples: 3,
            touch_capable: true,
            min_pressure: 0,
            calibration_inset: 20,
            auto_click: None,
        }
    }
}

impl UiConfig {
    /// Reject configurations the pipeline cannot work with.
    pub fn validate(&self) -> bool {
        let inset = self.calibration_inset as u32 * 2;
        self.width > 0
            && self.height > 0
            && self.tick_ms > 0
            && inset < self.width as u32
            && inset < self.height as u32
    }
}
