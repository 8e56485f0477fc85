//! Error types shared across the runtime
//!
//! Every rejected call is logged where it is rejected and then reported with
//! one of these variants. Nothing in the runtime panics on bad input.

use thiserror_no_std::Error;

use crate::registry::Category;
use crate::storage::StorageError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiError {
    #[error("registry category {0:?} is already configured")]
    RegistryAlreadyConfigured(Category),
    #[error("registration for {0:?} is empty")]
    EmptyRegistration(Category),
    #[error("widget id {0} does not exist")]
    UnknownWidget(u16),
    #[error("widget {id} is a {actual:?}, not a {expected:?}")]
    CategoryMismatch {
        id: u16,
        expected: Category,
        actual: Category,
    },
    #[error("registry category {0:?} has no free slots")]
    CategoryFull(Category),
    #[error("widget arena is full")]
    ArenaFull,
    #[error("widget was already configured")]
    AlreadyConfigured,
    #[error("invalid dimensions")]
    InvalidDimensions,
    #[error("callback queue is full")]
    QueueFull,
    #[error("input buffer is full")]
    InputOverflow,
    #[error("modal input is already open")]
    ModalBusy,
    #[error("storage error: {0}")]
    Storage(StorageError),
    #[error("calibration error: {0}")]
    Calibration(CalibrationError),
}

/// Reasons a calibration could not be solved or restored.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("need at least {required} points, got {got}")]
    NotEnoughPoints { required: usize, got: usize },
    #[error("raw samples do not span an axis")]
    DegenerateAxis,
    #[error("stored rotation {stored} does not match current rotation {current}")]
    RotationMismatch { stored: u8, current: u8 },
    #[error("device has not been calibrated")]
    NotCalibrated,
    #[error("stored calibration record is corrupt")]
    CorruptRecord,
}

impl From<StorageError> for UiError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<CalibrationError> for UiError {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}
