//! Hardware-independent core of the touchdeck UI runtime
//!
//! This crate owns everything between a raw touch controller and the pixels
//! on the panel: the widget contract and arena, the per-category hit-test
//! registry, the touch state machine and calibration map, the callback queue,
//! the modal keyboard, and the single [`DrawTask`](draw_task::DrawTask) that
//! serializes all of it onto one display-owning task.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod callback_queue;
pub mod config;
pub mod context;
pub mod draw_task;
pub mod error;
pub mod framebuffer;
pub mod modal;
pub mod registry;
pub mod storage;
pub mod touch;
pub mod ui;

pub use callback_queue::{Callback, CallbackQueue, CallbackScope, QueuedCallback};
pub use config::{AutoClickConfig, UiConfig};
pub use context::UiContext;
pub use draw_task::{
    DrawTask, LogLine, LoopGate, NoWatchdog, TickOutcome, TransactionGuard, UiShared, Watchdog,
};
pub use error::{CalibrationError, UiError};
pub use framebuffer::FrameBuffer;
pub use modal::{InputKind, Key, KeypadLayout, ModalInputController, ModalOutcome};
pub use registry::{Category, DispatchResult, WidgetArena, WidgetId, WidgetRegistry};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
pub use ui::{ColorPalette, ScreenId, Widget, WidgetState};
