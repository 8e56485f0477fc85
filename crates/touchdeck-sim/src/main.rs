//! Desktop simulator for the touchdeck UI runtime.
//!
//! Runs the real `DrawTask` against an `embedded-graphics-simulator` display.
//! By default it replays a scripted touch trace headlessly: the four-corner
//! calibration, a few widget taps, a swipe to the settings screen, a numpad
//! edit, and the way back. The final frame is written to `touchdeck-sim.png`.
//!
//! Built with `--features window` and started with `--window`, it opens an
//! SDL2 window instead and forwards the mouse as the touch controller.
//!
//! # Key bindings (window mode)
//!
//! | Key | Action                       |
//! |-----|------------------------------|
//! | 1   | Home screen                  |
//! | 2   | Settings screen              |
//! | C   | Recalibrate touch            |
//! | Q   | Quit                         |

mod demo;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay};
use embassy_time::Instant;
use log::{Level, error, info, warn};

use touchdeck_core::touch::{RawTouch, ScriptedTouch, TouchInput, marker_points};
use touchdeck_core::{
    DrawTask, InputKind, Key, KeypadLayout, MemoryStore, TickOutcome, UiConfig, UiShared, WidgetArena,
    WidgetId,
};

use demo::{DemoIds, SETTINGS};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pixel scale factor for the PNG and the window.
const WINDOW_SCALE: u32 = 2;

/// Samples a scripted finger stays down per tap.
const TAP_SAMPLES: usize = 3;

/// Idle ticks after each scripted gesture, enough for debounce to lapse.
const SETTLE_TICKS: usize = 35;

/// Ticks run after the script is exhausted so queued callbacks drain.
const DRAIN_TICKS: usize = 20;

const SNAPSHOT_PATH: &str = "touchdeck-sim.png";

static UI: UiShared = UiShared::new();

// ---------------------------------------------------------------------------
// Raw controller model
// ---------------------------------------------------------------------------

/// Fake resistive panel: offset and scaled relative to the pixels, the way
/// an uncalibrated XPT2046 reports them.
fn to_raw(point: Point) -> (u16, u16) {
    let x = 180 + point.x.max(0) * 11;
    let y = 240 + point.y.max(0) * 14;
    (x as u16, y as u16)
}

fn tap_at(script: &mut ScriptedTouch, point: Point) {
    let (x, y) = to_raw(point);
    script.tap(x, y, TAP_SAMPLES);
    script.idle(SETTLE_TICKS);
}

fn drag(script: &mut ScriptedTouch, from: Point, to: Point, steps: i32) {
    for step in 0..=steps {
        let at = from + (to - from) * step / steps;
        let (x, y) = to_raw(at);
        script.push(Some(RawTouch::at(x, y)));
    }
    script.idle(SETTLE_TICKS);
}

fn center_of(arena: &WidgetArena, id: WidgetId) -> Point {
    arena
        .get(id)
        .map_or(Point::zero(), |w| w.state().bounds().center())
}

// ---------------------------------------------------------------------------
// Scripted session
// ---------------------------------------------------------------------------

fn build_script(config: &UiConfig, arena: &WidgetArena, ids: &DemoIds) -> ScriptedTouch {
    let mut script = ScriptedTouch::new();
    script.idle(2);

    for marker in marker_points(config.width, config.height, config.calibration_inset) {
        tap_at(&mut script, marker);
    }

    tap_at(&mut script, center_of(arena, ids.backlight));
    tap_at(&mut script, center_of(arena, ids.plus));
    tap_at(&mut script, Point::new(170, 115));
    tap_at(&mut script, center_of(arena, ids.power));
    tap_at(&mut script, center_of(arena, ids.pad));

    // Swipe left across the pad: the pad fires on the press, the release
    // turns into a screen change.
    drag(&mut script, Point::new(280, 200), Point::new(60, 200), 6);

    // Edit the tick rate through the numpad.
    tap_at(&mut script, center_of(arena, ids.tick_rate));
    let numpad = KeypadLayout::build(InputKind::Numpad, config.width, config.height);
    for key in [Key::Backspace, Key::Backspace, Key::Char('2'), Key::Char('5'), Key::Return] {
        if let Some(at) = numpad.position_of(key) {
            let (x, y) = to_raw(at);
            script.tap(x, y, 2);
            script.idle(1);
        }
    }
    script.idle(SETTLE_TICKS);

    tap_at(&mut script, center_of(arena, ids.back));
    script
}

fn tick_time(tick: u64, config: &UiConfig) -> Instant {
    Instant::from_millis(tick * config.tick_ms as u64)
}

fn run_replay(config: UiConfig) -> Result<(), touchdeck_core::UiError> {
    let (arena, registry, ids) = demo::build()?;
    info!(
        "Demo UI: {} widgets ({:?}, {:?}, {:?} on screen 1)",
        arena.len(),
        ids.open_settings,
        ids.device_name,
        ids.recalibrate
    );

    let script = build_script(&config, &arena, &ids);
    let total = script.remaining();
    info!("Replaying {} touch samples", total);

    let display = SimulatorDisplay::<Rgb565>::new(Size::new(config.width as u32, config.height as u32));
    let touch = TouchInput::new(script, config.min_pressure);
    let mut task = DrawTask::new(&UI, display, config, arena, registry, touch, MemoryStore::new())?;
    task.context_mut().set_swipe_handler(Some(demo::on_swipe));

    let mut tick = 0u64;
    let mut flushes = 0usize;
    let mut visited_settings = false;
    let mut remaining = DRAIN_TICKS;
    loop {
        // Another task drawing on the shared bus pauses exactly one tick.
        if tick == 60 && UI.transaction.try_start_custom_draw() {
            UI.log(Level::Info, "Status bar redrawn by another task");
        }
        match task.tick(tick_time(tick, &config)) {
            TickOutcome::Ran { flushed: true } => flushes += 1,
            TickOutcome::Ran { flushed: false } => {}
            TickOutcome::InTransaction => {
                UI.transaction.try_finish_custom_draw();
            }
            TickOutcome::Blocked => warn!("Draw loop unexpectedly blocked"),
        }
        visited_settings |= task.context().active_screen() == SETTINGS;
        tick += 1;

        let exhausted = task
            .touch_mut()
            .driver_mut()
            .is_none_or(|driver| driver.remaining() == 0);
        if exhausted {
            if remaining == 0 {
                break;
            }
            remaining -= 1;
        }
    }

    info!(
        "Replay done after {} ticks: {} flushes, settings visited: {}, calibrated: {}",
        tick,
        flushes,
        visited_settings,
        !task.calibration().is_passthrough()
    );
    if task.context().callbacks().dropped() > 0 {
        warn!("{} callbacks were dropped", task.context().callbacks().dropped());
    }

    let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
    match task
        .display()
        .to_rgb_output_image(&output_settings)
        .save_png(SNAPSHOT_PATH)
    {
        Ok(()) => info!("Final frame written to {}", SNAPSHOT_PATH),
        Err(e) => error!("Could not write {}: {}", SNAPSHOT_PATH, e),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Interactive window
// ---------------------------------------------------------------------------

#[cfg(feature = "window")]
mod window {
    use std::time::{Duration, Instant as StdInstant};

    use embedded_graphics::pixelcolor::Rgb565;
    use embedded_graphics::prelude::*;
    use embedded_graphics_simulator::{
        OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
    };
    use embassy_time::Instant;
    use log::info;

    use touchdeck_core::touch::{RawTouch, TouchDriver, TouchInput};
    use touchdeck_core::{DrawTask, MemoryStore, UiConfig, UiError};

    use crate::demo::{self, HOME, SETTINGS};
    use crate::{UI, WINDOW_SCALE};

    /// Target frame duration (~30 FPS).
    const FRAME_DURATION: Duration = Duration::from_millis(33);

    /// Mouse position while the left button is held, in window pixels.
    #[derive(Default)]
    struct MouseTouch {
        contact: Option<RawTouch>,
    }

    impl TouchDriver for MouseTouch {
        fn get_touch(&mut self) -> Option<RawTouch> {
            self.contact
        }
    }

    fn raw(point: Point) -> RawTouch {
        RawTouch::at(point.x.max(0) as u16, point.y.max(0) as u16)
    }

    pub fn run(config: UiConfig) -> Result<(), UiError> {
        let (arena, registry, _) = demo::build()?;
        let display = SimulatorDisplay::<Rgb565>::new(Size::new(config.width as u32, config.height as u32));
        let touch = TouchInput::new(MouseTouch::default(), config.min_pressure);
        let mut task = DrawTask::new(&UI, display, config, arena, registry, touch, MemoryStore::new())?;
        task.context_mut().set_swipe_handler(Some(demo::on_swipe));

        let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
        let mut window = Window::new("Touchdeck Simulator", &output_settings);
        let started = StdInstant::now();

        // The SDL window is created on the first update; events() panics before that.
        task.tick(Instant::from_ticks(0));
        window.update(task.display());

        'running: loop {
            let frame_start = StdInstant::now();

            for event in window.events() {
                match event {
                    SimulatorEvent::Quit => break 'running,
                    SimulatorEvent::KeyDown { keycode, .. } => match keycode {
                        Keycode::Q | Keycode::Escape => break 'running,
                        Keycode::Num1 | Keycode::Kp1 => task.context_mut().load_screen(HOME),
                        Keycode::Num2 | Keycode::Kp2 => task.context_mut().load_screen(SETTINGS),
                        Keycode::C => task.context_mut().request_recalibration(),
                        _ => {}
                    },
                    SimulatorEvent::MouseButtonDown { point, .. } => {
                        if let Some(mouse) = task.touch_mut().driver_mut() {
                            mouse.contact = Some(raw(point));
                        }
                    }
                    SimulatorEvent::MouseMove { point } => {
                        if let Some(mouse) = task.touch_mut().driver_mut()
                            && mouse.contact.is_some()
                        {
                            mouse.contact = Some(raw(point));
                        }
                    }
                    SimulatorEvent::MouseButtonUp { .. } => {
                        if let Some(mouse) = task.touch_mut().driver_mut() {
                            mouse.contact = None;
                        }
                    }
                    _ => {}
                }
            }

            let elapsed_ms = started.elapsed().as_millis() as u64;
            task.tick(Instant::from_millis(elapsed_ms));
            window.update(task.display());

            let elapsed = frame_start.elapsed();
            if elapsed < FRAME_DURATION {
                std::thread::sleep(FRAME_DURATION - elapsed);
            }
        }

        info!("Simulator exiting");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    let config = UiConfig::default();
    info!("Starting touchdeck simulator");
    info!(
        "Display: {}×{}, tick {} ms, debounce {} ms",
        config.width, config.height, config.tick_ms, config.debounce_ms
    );

    let interactive = std::env::args().any(|arg| arg == "--window");

    #[cfg(feature = "window")]
    let result = if interactive {
        info!("Keys: 1=Home  2=Settings  C=Recalibrate  Q=Quit");
        window::run(config)
    } else {
        run_replay(config)
    };

    #[cfg(not(feature = "window"))]
    let result = {
        if interactive {
            warn!("Built without the `window` feature, falling back to replay");
        }
        run_replay(config)
    };

    if let Err(e) = result {
        error!("Simulator failed: {}", e);
        std::process::exit(1);
    }
}
