//! Touch input pipeline: driver boundary, calibration, event classification

pub mod auto_click;
pub mod calibration;
pub mod driver;
pub mod state_machine;
pub mod wizard;

pub use auto_click::AutoClickTimer;
pub use calibration::{
    CORNER_POINTS, CalibrationPoint, CalibrationRecord, StoredCalibration, TouchCalibrationMap,
    load_calibration, marker_points, recalibrate, save_calibration,
};
pub use driver::{Gesture, RawTouch, ScriptedTouch, TouchDriver, TouchInput, TouchSample};
pub use state_machine::{SwipeDirection, TouchEventType, TouchStateMachine};
pub use wizard::{CalibrationWizard, WizardDispatch};
