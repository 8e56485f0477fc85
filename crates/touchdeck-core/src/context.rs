//! Explicit UI context threaded through the DrawTask.
//!
//! Holds what would otherwise be process-wide mutable state: the active
//! screen, the keyboard exclusivity flag, the callback queue, and the most
//! recent touch classification. Created at start-up, owned by the DrawTask,
//! and lent to callbacks through [`CallbackScope`](crate::CallbackScope).

use embassy_time::{Duration, Instant};
use log::debug;

use crate::callback_queue::{CallbackQueue, QueuedCallback};
use crate::config::UiConfig;
use crate::touch::{SwipeDirection, TouchEventType};
use crate::ui::ScreenId;

/// Handler run on the DrawTask whenever a release is classified as a swipe.
pub type SwipeHandler = fn(&mut UiContext, SwipeDirection);

pub struct UiContext {
    config: UiConfig,
    active_screen: ScreenId,
    pending_screen: Option<ScreenId>,
    using_keyboard: bool,
    callbacks: CallbackQueue,
    last_event: TouchEventType,
    last_swipe: SwipeDirection,
    on_swipe: Option<SwipeHandler>,
    recalibration_requested: bool,
    now: Instant,
}

impl UiContext {
    pub fn new(config: UiConfig) -> Self {
        Self {
            config,
            active_screen: ScreenId::default(),
            pending_screen: None,
            using_keyboard: false,
            callbacks: CallbackQueue::new(),
            last_event: TouchEventType::None,
            last_swipe: SwipeDirection::None,
            on_swipe: None,
            recalibration_requested: false,
            now: Instant::from_ticks(0),
        }
    }

    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    pub fn active_screen(&self) -> ScreenId {
        self.active_screen
    }

    /// Ask the DrawTask to switch screens on its next tick.
    ///
    /// Only the latest request survives if several are made within one tick.
    pub fn load_screen(&mut self, screen: ScreenId) {
        debug!("Screen {:?} requested", screen);
        self.pending_screen = Some(screen);
    }

    pub(crate) fn take_pending_screen(&mut self) -> Option<ScreenId> {
        self.pending_screen.take()
    }

    pub(crate) fn set_active_screen(&mut self, screen: ScreenId) {
        self.active_screen = screen;
    }

    /// True while the modal keyboard owns every touch sample.
    pub fn is_using_keyboard(&self) -> bool {
        self.using_keyboard
    }

    pub(crate) fn set_using_keyboard(&mut self, using: bool) {
        self.using_keyboard = using;
    }

    /// Queue a callback for execution on a later tick.
    pub fn push_callback(&mut self, item: QueuedCallback) -> bool {
        self.callbacks.push(item)
    }

    pub fn callbacks(&self) -> &CallbackQueue {
        &self.callbacks
    }

    pub(crate) fn callbacks_mut(&mut self) -> &mut CallbackQueue {
        &mut self.callbacks
    }

    pub fn last_event(&self) -> TouchEventType {
        self.last_event
    }

    /// Most recent non-`None` swipe since start-up.
    pub fn last_swipe(&self) -> SwipeDirection {
        self.last_swipe
    }

    pub(crate) fn record_touch_event(&mut self, event: TouchEventType, swipe: SwipeDirection) {
        self.last_event = event;
        if swipe != SwipeDirection::None {
            self.last_swipe = swipe;
            if let Some(handler) = self.on_swipe {
                handler(self, swipe);
            }
        }
    }

    pub fn set_swipe_handler(&mut self, handler: Option<SwipeHandler>) {
        self.on_swipe = handler;
    }

    /// Forget the stored calibration and rerun the guided sequence.
    pub fn request_recalibration(&mut self) {
        self.recalibration_requested = true;
    }

    pub(crate) fn take_recalibration_request(&mut self) -> bool {
        core::mem::take(&mut self.recalibration_requested)
    }

    /// Time of the tick currently being processed.
    pub fn now(&self) -> Instant {
        self.now
    }

    pub(crate) fn set_now(&mut self, now: Instant) {
        self.now = now;
    }

    pub fn default_debounce(&self) -> Duration {
        Duration::from_millis(self.config.debounce_ms as u64)
    }
}
