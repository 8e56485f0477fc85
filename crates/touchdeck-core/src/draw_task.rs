//! The single task that owns the display, the widgets and the touch input
//!
//! Every tick runs the same fixed sequence:
//!
//! 1. feed the watchdog
//! 2. skip the whole tick if the loop is blocked or a custom draw is in progress
//! 3. service one screen-load request
//! 4. re-emit log lines queued by other tasks
//! 5. run at most one queued callback
//! 6. sample touch, classify it, and hand it to the calibration wizard, the
//!    keyboard, or the widget registry (first match wins)
//! 7. redraw dirty widgets of the active screen into the framebuffer
//! 8. flush the changed rectangle to the display
//!
//! Other tasks talk to it only through the [`UiShared`] block.

extern crate alloc;

use alloc::boxed::Box;
use core::cell::Cell;
use core::fmt::Debug;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::PrimitiveStyle;
use log::{Level, debug, error, info, warn};

use crate::config::UiConfig;
use crate::context::UiContext;
use crate::error::UiError;
use crate::framebuffer::FrameBuffer;
use crate::modal::{ModalInputController, ModalOutcome};
use crate::registry::{DispatchResult, WidgetArena, WidgetId, WidgetRegistry};
use crate::storage::KeyValueStore;
use crate::touch::{
    AutoClickTimer, CalibrationRecord, CalibrationWizard, StoredCalibration, SwipeDirection,
    TouchCalibrationMap, TouchDriver, TouchEventType, TouchInput, TouchStateMachine,
    WizardDispatch, load_calibration, recalibrate, save_calibration,
};
use crate::ui::{ColorPalette, ScreenId};

/// Pending screen-load requests from other tasks.
pub const SCREEN_QUEUE_CAPACITY: usize = 4;
/// Log lines other tasks may queue between two ticks.
pub const LOG_QUEUE_CAPACITY: usize = 16;
pub const LOG_LINE_LEN: usize = 96;

/// A log record produced off the DrawTask, emitted on its next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: Level,
    pub text: heapless::String<LOG_LINE_LEN>,
}

impl LogLine {
    /// Text longer than [`LOG_LINE_LEN`] bytes is cut at the last whole char.
    pub fn new(level: Level, text: &str) -> Self {
        let mut line = heapless::String::new();
        for c in text.chars() {
            if line.push(c).is_err() {
                break;
            }
        }
        Self { level, text: line }
    }
}

/// Flag that suspends the DrawTask while external code draws.
///
/// The mutex only protects the flag. The DrawTask checks it with `try_lock`
/// and treats a contended lock the same as a set flag.
pub struct TransactionGuard {
    active: Mutex<CriticalSectionRawMutex, bool>,
}

impl Default for TransactionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionGuard {
    pub const fn new() -> Self {
        Self {
            active: Mutex::new(false),
        }
    }

    pub async fn start_custom_draw(&self) {
        *self.active.lock().await = true;
        debug!("Custom draw started");
    }

    pub async fn finish_custom_draw(&self) {
        *self.active.lock().await = false;
        debug!("Custom draw finished");
    }

    /// Non-blocking [`start_custom_draw`](Self::start_custom_draw).
    pub fn try_start_custom_draw(&self) -> bool {
        match self.active.try_lock() {
            Ok(mut active) => {
                *active = true;
                true
            }
            Err(_) => false,
        }
    }

    /// Non-blocking [`finish_custom_draw`](Self::finish_custom_draw).
    pub fn try_finish_custom_draw(&self) -> bool {
        match self.active.try_lock() {
            Ok(mut active) => {
                *active = false;
                true
            }
            Err(_) => false,
        }
    }

    /// Whether the DrawTask must skip this tick.
    pub fn in_progress(&self) -> bool {
        match self.active.try_lock() {
            Ok(active) => *active,
            Err(_) => true,
        }
    }
}

/// Binary gate other tasks close to pause the DrawTask entirely.
pub struct LoopGate {
    blocked: BlockingMutex<CriticalSectionRawMutex, Cell<bool>>,
    reopened: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for LoopGate {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopGate {
    pub const fn new() -> Self {
        Self {
            blocked: BlockingMutex::new(Cell::new(false)),
            reopened: Signal::new(),
        }
    }

    pub fn block_loop_task(&self) {
        self.reopened.reset();
        self.blocked.lock(|blocked| blocked.set(true));
        debug!("Draw loop blocked");
    }

    pub fn free_loop_task(&self) {
        self.blocked.lock(|blocked| blocked.set(false));
        self.reopened.signal(());
        debug!("Draw loop freed");
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.lock(|blocked| blocked.get())
    }

    /// Wait until the gate is open.
    pub async fn wait_open(&self) {
        while self.is_blocked() {
            self.reopened.wait().await;
        }
    }
}

/// Everything other tasks may touch. Lives in a `static`.
///
/// ```ignore
/// static UI: UiShared = UiShared::new();
/// UI.request_screen(ScreenId(1));
/// ```
pub struct UiShared {
    pub screens: Channel<CriticalSectionRawMutex, ScreenId, SCREEN_QUEUE_CAPACITY>,
    pub logs: Channel<CriticalSectionRawMutex, LogLine, LOG_QUEUE_CAPACITY>,
    pub transaction: TransactionGuard,
    pub loop_gate: LoopGate,
}

impl Default for UiShared {
    fn default() -> Self {
        Self::new()
    }
}

impl UiShared {
    pub const fn new() -> Self {
        Self {
            screens: Channel::new(),
            logs: Channel::new(),
            transaction: TransactionGuard::new(),
            loop_gate: LoopGate::new(),
        }
    }

    /// Queue a screen switch. Returns `false` when the queue is full.
    pub fn request_screen(&self, screen: ScreenId) -> bool {
        self.screens.try_send(screen).is_ok()
    }

    /// Queue a log line for the DrawTask. A full queue drops the line.
    pub fn log(&self, level: Level, text: &str) -> bool {
        self.logs.try_send(LogLine::new(level, text)).is_ok()
    }
}

/// Liveness signal refreshed once per tick.
pub trait Watchdog {
    fn feed(&mut self);
}

/// Watchdog for boards that have none configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWatchdog;

impl Watchdog for NoWatchdog {
    fn feed(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop gate is closed.
    Blocked,
    /// A custom draw holds the transaction flag; nothing ran.
    InTransaction,
    /// The full sequence ran; `flushed` tells whether pixels were sent.
    Ran { flushed: bool },
}

pub struct DrawTask<'a, D, T, S> {
    shared: &'a UiShared,
    display: D,
    fb: FrameBuffer,
    palette: ColorPalette,
    ctx: UiContext,
    widgets: WidgetArena,
    registry: WidgetRegistry,
    touch: TouchInput<T>,
    store: S,
    watchdog: Box<dyn Watchdog>,
    state_machine: TouchStateMachine,
    calibration: TouchCalibrationMap,
    wizard: CalibrationWizard,
    modal: ModalInputController,
    auto_click: AutoClickTimer,
    /// The finger currently down already acted; ignore it until it lifts.
    contact_consumed: bool,
    started: bool,
}

impl<'a, D, T, S> DrawTask<'a, D, T, S>
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
    T: TouchDriver,
    S: KeyValueStore,
{
    pub fn new(
        shared: &'a UiShared,
        display: D,
        config: UiConfig,
        widgets: WidgetArena,
        registry: WidgetRegistry,
        touch: TouchInput<T>,
        store: S,
    ) -> Result<Self, UiError> {
        if !config.validate() {
            error!("Rejecting UI config {:?}", config);
            return Err(UiError::InvalidDimensions);
        }
        Ok(Self {
            shared,
            display,
            fb: FrameBuffer::new(config.width, config.height),
            palette: ColorPalette::default(),
            ctx: UiContext::new(config),
            widgets,
            registry,
            touch,
            store,
            watchdog: Box::new(NoWatchdog),
            state_machine: TouchStateMachine::new(config.swipe_threshold),
            calibration: TouchCalibrationMap::passthrough(config.width, config.height),
            wizard: CalibrationWizard::new(config.width, config.height, config.calibration_inset),
            modal: ModalInputController::new(config.width, config.height, config.ghost_click_samples),
            auto_click: AutoClickTimer::new(),
            contact_consumed: false,
            started: false,
        })
    }

    pub fn with_palette(mut self, palette: ColorPalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_watchdog(mut self, watchdog: impl Watchdog + 'static) -> Self {
        self.watchdog = Box::new(watchdog);
        self
    }

    pub fn context(&self) -> &UiContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut UiContext {
        &mut self.ctx
    }

    pub fn widgets(&self) -> &WidgetArena {
        &self.widgets
    }

    pub fn widgets_mut(&mut self) -> &mut WidgetArena {
        &mut self.widgets
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.fb
    }

    pub fn touch_mut(&mut self) -> &mut TouchInput<T> {
        &mut self.touch
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn calibration(&self) -> &TouchCalibrationMap {
        &self.calibration
    }

    pub fn is_calibrating(&self) -> bool {
        self.wizard.is_active()
    }

    pub fn wizard(&self) -> &CalibrationWizard {
        &self.wizard
    }

    pub fn modal(&self) -> &ModalInputController {
        &self.modal
    }

    pub fn auto_click_mut(&mut self) -> &mut AutoClickTimer {
        &mut self.auto_click
    }

    /// Apply a programmatic change to a widget and queue its callback if
    /// `change` reports that something changed.
    ///
    /// The change itself is kept even when the callback is dropped with
    /// [`UiError::QueueFull`].
    pub fn update_widget<W, F>(&mut self, id: WidgetId, change: F) -> Result<bool, UiError>
    where
        W: crate::ui::Widget,
        F: FnOnce(&mut W) -> bool,
    {
        let Some(widget) = self.widgets.get_as_mut::<W>(id) else {
            warn!("No widget {:?} of the requested type", id);
            return Err(UiError::UnknownWidget(id.0));
        };
        let changed = change(widget);
        if changed {
            self.widgets.notify(id, &mut self.ctx)?;
        }
        Ok(changed)
    }

    /// Run one iteration of the draw loop at time `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.watchdog.feed();

        if self.shared.loop_gate.is_blocked() {
            return TickOutcome::Blocked;
        }
        if self.shared.transaction.in_progress() {
            return TickOutcome::InTransaction;
        }

        self.ctx.set_now(now);
        if !self.started {
            self.start(now);
        }

        self.service_recalibration();
        self.service_screen_load();
        self.drain_logs();
        self.drain_callback();
        if self.ctx.config().touch_capable {
            self.process_touch(now);
        }
        self.redraw();

        let flushed = match self.fb.flush(&mut self.display) {
            Ok(flushed) => flushed,
            Err(e) => {
                error!("Display flush failed: {:?}", e);
                false
            }
        };
        TickOutcome::Ran { flushed }
    }

    /// Tick forever with the configured period, waiting while the loop gate
    /// is closed.
    pub async fn run(&mut self) -> ! {
        let period = Duration::from_millis(self.ctx.config().tick_ms as u64);
        info!("Draw task started, tick every {} ms", period.as_millis());
        loop {
            self.shared.loop_gate.wait_open().await;
            self.tick(Instant::now());
            Timer::after(period).await;
        }
    }

    fn start(&mut self, now: Instant) {
        self.started = true;
        self.auto_click = AutoClickTimer::from_config(self.ctx.config().auto_click, now);
        self.clear_screen();

        let config = *self.ctx.config();
        if !config.touch_capable || self.touch.is_inert() {
            info!("Touch unavailable, skipping calibration");
            return;
        }
        let rotation = self.touch.rotation();
        match load_calibration(&mut self.store, rotation, config.width, config.height) {
            StoredCalibration::Calibrated { map, record } => {
                self.calibration = map;
                self.touch.set_calibration(&record.points);
            }
            StoredCalibration::Required => self.wizard.start(rotation),
            StoredCalibration::Unreadable(map) => self.calibration = map,
        }
    }

    fn clear_screen(&mut self) {
        let Ok(()) = self.fb.clear(self.palette.background);
        self.widgets.mark_screen_dirty(self.ctx.active_screen());
    }

    fn service_recalibration(&mut self) {
        if !self.ctx.take_recalibration_request() {
            return;
        }
        if let Err(e) = recalibrate(&mut self.store) {
            warn!("Could not clear calibration flag: {}", e);
        }
        if self.touch.is_inert() {
            warn!("Recalibration requested without a touch controller");
            return;
        }
        if let Some(owner) = self.modal.owner() {
            debug!("Closing keyboard of {:?} for recalibration", owner);
            self.modal.close(&mut self.ctx, &mut self.widgets);
        }
        self.consume_contact();
        self.state_machine.reset();
        self.wizard.start(self.touch.rotation());
    }

    fn service_screen_load(&mut self) {
        let request = match self.ctx.take_pending_screen() {
            Some(screen) => Some(screen),
            None => self.shared.screens.try_receive().ok(),
        };
        let Some(screen) = request else {
            return;
        };

        if self.modal.is_open() {
            self.modal.close(&mut self.ctx, &mut self.widgets);
        }
        info!("Loading screen {:?}", screen);
        self.ctx.set_active_screen(screen);
        self.consume_contact();
        self.clear_screen();
    }

    /// Latch the contact in progress, if any. One touch makes one widget react,
    /// so the rest of it is dropped until the finger lifts.
    fn consume_contact(&mut self) {
        if self.state_machine.is_pressed() {
            debug!("Ignoring the current contact until release");
            self.contact_consumed = true;
        }
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.shared.logs.try_receive() {
            log::log!(line.level, "{}", line.text);
        }
    }

    fn drain_callback(&mut self) {
        if let Some(callback) = self.ctx.callbacks_mut().drain_one() {
            callback.run(&mut self.ctx, &mut self.widgets);
        }
    }

    fn process_touch(&mut self, now: Instant) {
        if !self.wizard.is_active() {
            if let Some(point) = self.auto_click.poll(now) {
                let (event, swipe) = self.state_machine.process(true, point.x, point.y);
                self.handle_event(Some(point), event, swipe);
                return;
            }
        }

        let sample = self.touch.sample();
        if self.wizard.is_active() {
            let (event, _) =
                self.state_machine
                    .process(sample.has_touch, sample.x as i32, sample.y as i32);
            if self.contact_consumed && sample.has_touch {
                return;
            }
            self.contact_consumed = false;
            if let WizardDispatch::Finished { map, record } = self.wizard.handle(&sample, event) {
                self.finish_calibration(map, record);
            }
            return;
        }

        let point = sample
            .has_touch
            .then(|| self.calibration.to_screen(sample.x, sample.y));
        let (x, y) = point.map_or((0, 0), |p| (p.x, p.y));
        let (event, swipe) = self.state_machine.process(sample.has_touch, x, y);
        self.handle_event(point, event, swipe);
    }

    fn handle_event(&mut self, point: Option<Point>, event: TouchEventType, swipe: SwipeDirection) {
        self.ctx.record_touch_event(event, swipe);

        if self.modal.is_open() {
            if let ModalOutcome::Closed(_) =
                self.modal
                    .handle_sample(point, event, &mut self.ctx, &mut self.widgets)
            {
                self.clear_screen();
                self.consume_contact();
            }
            return;
        }

        let Some(point) = point else {
            self.contact_consumed = false;
            return;
        };
        if self.contact_consumed {
            return;
        }
        if let DispatchResult::OpenInput(id) =
            self.registry.dispatch(&mut self.widgets, &mut self.ctx, point)
        {
            self.open_input(id);
        }
    }

    fn open_input(&mut self, id: WidgetId) {
        let Some(widget) = self.widgets.get(id) else {
            return;
        };
        let Some(kind) = widget.input_kind() else {
            return;
        };
        if let Err(e) = self.modal.open(id, kind, widget.input_text(), &mut self.ctx) {
            warn!("Could not open keyboard for {:?}: {}", id, e);
        }
    }

    fn finish_calibration(&mut self, map: TouchCalibrationMap, record: CalibrationRecord) {
        self.calibration = map;
        self.touch.set_calibration(&record.points);
        if let Err(e) = save_calibration(&mut self.store, &record) {
            warn!("Calibration applied but not saved: {}", e);
        }
        self.consume_contact();
        self.state_machine.reset();
        self.clear_screen();
        info!("Touch calibration complete");
    }

    fn redraw(&mut self) {
        if self.wizard.is_active() {
            let Ok(_) = self.wizard.draw(&mut self.fb, &self.palette);
            return;
        }
        if self.modal.is_open() {
            let Ok(_) = self.modal.draw(&mut self.fb, &self.palette);
            return;
        }

        let active = self.ctx.active_screen();
        let background = PrimitiveStyle::with_fill(self.palette.background);
        for (_, widget) in self.widgets.iter_mut() {
            let state = widget.state();
            if state.screen() != active || !state.is_loaded() || !state.is_dirty() {
                continue;
            }
            widget.state_mut().mark_clean();
            if widget.state().is_visible() {
                let Ok(()) = widget.redraw(&mut self.fb, &self.palette);
            } else {
                let Ok(()) = widget.state().bounds().into_styled(background).draw(&mut self.fb);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_truncates_on_char_boundary() {
        let text = "é".repeat(LOG_LINE_LEN);
        let line = LogLine::new(Level::Info, &text);
        assert_eq!(line.text.len(), LOG_LINE_LEN);
        assert!(line.text.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_transaction_flag() {
        let guard = TransactionGuard::new();
        assert!(!guard.in_progress());
        assert!(guard.try_start_custom_draw());
        assert!(guard.in_progress());
        assert!(guard.try_finish_custom_draw());
        assert!(!guard.in_progress());
    }

    #[test]
    fn test_async_transaction() {
        let guard = TransactionGuard::new();
        embassy_futures::block_on(guard.start_custom_draw());
        assert!(guard.in_progress());
        embassy_futures::block_on(guard.finish_custom_draw());
        assert!(!guard.in_progress());
    }

    #[test]
    fn test_loop_gate() {
        let gate = LoopGate::new();
        assert!(!gate.is_blocked());
        gate.block_loop_task();
        assert!(gate.is_blocked());
        gate.free_loop_task();
        assert!(!gate.is_blocked());
        // Open gate resolves immediately.
        embassy_futures::block_on(gate.wait_open());
    }

    #[test]
    fn test_shared_queues_are_bounded() {
        let shared = UiShared::new();
        for i in 0..SCREEN_QUEUE_CAPACITY {
            assert!(shared.request_screen(ScreenId(i as u8)));
        }
        assert!(!shared.request_screen(ScreenId(9)));
        for _ in 0..LOG_QUEUE_CAPACITY {
            assert!(shared.log(Level::Info, "x"));
        }
        assert!(!shared.log(Level::Info, "dropped"));
    }
}
