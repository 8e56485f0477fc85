//! End-to-end runs of the DrawTask against a RAM display and scripted touch.

use std::sync::atomic::{AtomicU32, Ordering};

use embassy_time::Instant;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use touchdeck_core::touch::{
    CalibrationPoint, CalibrationRecord, RawTouch, ScriptedTouch, SwipeDirection, TouchInput,
    marker_points, save_calibration,
};
use touchdeck_core::ui::{
    CheckBox, CheckBoxConfig, InputField, InputFieldConfig, RectButton, RectButtonConfig,
};
use touchdeck_core::{
    AutoClickConfig, CallbackScope, Category, DrawTask, FrameBuffer, InputKind, Key, KeypadLayout,
    MemoryStore, ScreenId, TickOutcome, UiConfig, UiContext, UiError, UiShared, WidgetArena,
    WidgetId, WidgetRegistry,
};

type Task<'a> = DrawTask<'a, FrameBuffer, ScriptedTouch, MemoryStore>;

fn rect(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
    Rectangle::new(Point::new(x, y), Size::new(w, h))
}

fn at(tick: u64) -> Instant {
    Instant::from_millis(tick * 10)
}

/// Store holding a calibration whose raw units equal screen pixels.
fn identity_store() -> MemoryStore {
    let points = marker_points(320, 240, 20).map(|m| CalibrationPoint {
        raw_x: m.x as u16,
        raw_y: m.y as u16,
        screen_x: m.x as u16,
        screen_y: m.y as u16,
    });
    let mut store = MemoryStore::new();
    save_calibration(&mut store, &CalibrationRecord { rotation: 0, points }).unwrap();
    store
}

fn task<'a>(
    shared: &'a UiShared,
    widgets: WidgetArena,
    registry: WidgetRegistry,
    touch: TouchInput<ScriptedTouch>,
    store: MemoryStore,
    config: UiConfig,
) -> Task<'a> {
    DrawTask::new(
        shared,
        FrameBuffer::new(config.width, config.height),
        config,
        widgets,
        registry,
        touch,
        store,
    )
    .unwrap()
}

/// Run ticks `from..to`, returning the tick after the last one.
fn run(task: &mut Task<'_>, from: u64, to: u64) -> u64 {
    for tick in from..to {
        task.tick(at(tick));
    }
    to
}

fn button(arena: &mut WidgetArena, screen: ScreenId, bounds: Rectangle, callback: fn(&mut CallbackScope<'_>)) -> WidgetId {
    let mut button = RectButton::new(screen);
    button
        .setup(RectButtonConfig {
            bounds,
            label: "OK",
            callback: Some(callback),
        })
        .unwrap();
    arena.insert(button).unwrap()
}

#[test]
fn test_tap_runs_callback_on_next_tick() {
    static RUNS: AtomicU32 = AtomicU32::new(0);
    fn on_press(_: &mut CallbackScope<'_>) {
        RUNS.fetch_add(1, Ordering::SeqCst);
    }

    let mut arena = WidgetArena::new();
    let id = button(&mut arena, ScreenId(0), rect(100, 100, 80, 40), on_press);
    let mut registry = WidgetRegistry::new();
    registry.register_category(Category::RectButton, &[id], &arena).unwrap();

    let mut touch = ScriptedTouch::new();
    touch.tap(140, 120, 3);
    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        registry,
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );

    assert_eq!(task.tick(at(0)), TickOutcome::Ran { flushed: true });
    assert!(!task.is_calibrating());
    assert_eq!(task.context().callbacks().len(), 1);
    assert_eq!(RUNS.load(Ordering::SeqCst), 0);

    run(&mut task, 1, 6);
    // Held samples fall inside the debounce window.
    assert_eq!(RUNS.load(Ordering::SeqCst), 1);
    assert_eq!(task.widgets().get_as::<RectButton>(id).unwrap().presses(), 1);
}

#[test]
fn test_wizard_calibrates_and_persists() {
    static RUNS: AtomicU32 = AtomicU32::new(0);
    fn on_press(_: &mut CallbackScope<'_>) {
        RUNS.fetch_add(1, Ordering::SeqCst);
    }

    // A button under the first marker must not see calibration taps.
    let mut arena = WidgetArena::new();
    let id = button(&mut arena, ScreenId(0), rect(0, 0, 60, 60), on_press);
    let mut registry = WidgetRegistry::new();
    registry.register_category(Category::RectButton, &[id], &arena).unwrap();

    // Controller reports 10 raw units per pixel.
    let mut touch = ScriptedTouch::new();
    for marker in marker_points(320, 240, 20) {
        touch.tap(marker.x as u16 * 10, marker.y as u16 * 10, 2);
        touch.idle(1);
    }
    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        registry,
        TouchInput::new(touch, 0),
        MemoryStore::new(),
        UiConfig::default(),
    );

    task.tick(at(0));
    assert!(task.is_calibrating());
    assert_eq!(task.wizard().current_marker(), Some(0));

    let next = run(&mut task, 1, 16);
    assert!(!task.is_calibrating());
    assert!(task.store().contains("touch", "points"));
    assert!(task.store().contains("touch", "calibrated"));
    assert!(!task.calibration().is_passthrough());
    let center = task.calibration().to_screen(1600, 1200);
    assert!((center.x - 160).abs() <= 1 && (center.y - 120).abs() <= 1);
    assert!(task.touch_mut().driver_mut().unwrap().calibration().is_some());

    run(&mut task, next, next + 5);
    assert_eq!(RUNS.load(Ordering::SeqCst), 0);
}

#[test]
fn test_numpad_edit_writes_back_on_return() {
    static RUNS: AtomicU32 = AtomicU32::new(0);
    fn on_edit(_: &mut CallbackScope<'_>) {
        RUNS.fetch_add(1, Ordering::SeqCst);
    }

    let mut arena = WidgetArena::new();
    let mut field = InputField::new(ScreenId(0), InputKind::Numpad);
    field
        .setup(InputFieldConfig {
            bounds: rect(20, 20, 120, 30),
            kind: InputKind::Numpad,
            text: "10",
            placeholder: "",
            callback: Some(on_edit),
        })
        .unwrap();
    let id = arena.insert(field).unwrap();
    let mut registry = WidgetRegistry::new();
    registry.register_category(Category::NumberBox, &[id], &arena).unwrap();

    let numpad = KeypadLayout::build(InputKind::Numpad, 320, 240);
    let key = |key: Key| numpad.position_of(key).unwrap();
    let mut touch = ScriptedTouch::new();
    touch.tap(80, 35, 1);
    touch.idle(1);
    // Lands inside the ghost window right after opening.
    for k in [Key::Char('9'), Key::Char('1'), Key::Return] {
        let p = key(k);
        touch.tap(p.x as u16, p.y as u16, 1);
        touch.idle(1);
    }

    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        registry,
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );

    task.tick(at(0));
    assert!(task.modal().is_open());
    assert_eq!(task.modal().owner(), Some(id));
    assert!(task.context().is_using_keyboard());
    assert_eq!(task.modal().text(), "10");

    run(&mut task, 1, 12);
    assert!(!task.modal().is_open());
    assert!(!task.context().is_using_keyboard());
    let field = task.widgets().get_as::<InputField>(id).unwrap();
    assert_eq!(field.number(), Some(101));
    assert_eq!(RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_transaction_and_loop_gate_pause_ticks() {
    let mut touch = ScriptedTouch::new();
    touch.tap(10, 10, 2);
    let shared = UiShared::new();
    let mut task = task(
        &shared,
        WidgetArena::new(),
        WidgetRegistry::new(),
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );

    assert!(shared.transaction.try_start_custom_draw());
    assert_eq!(task.tick(at(0)), TickOutcome::InTransaction);
    assert!(shared.transaction.try_finish_custom_draw());

    shared.loop_gate.block_loop_task();
    assert_eq!(task.tick(at(1)), TickOutcome::Blocked);
    shared.loop_gate.free_loop_task();

    // Neither paused tick consumed a sample.
    assert_eq!(task.touch_mut().driver_mut().unwrap().remaining(), 3);
    assert!(matches!(task.tick(at(2)), TickOutcome::Ran { .. }));
    assert_eq!(task.touch_mut().driver_mut().unwrap().remaining(), 2);
}

#[test]
fn test_screen_request_from_other_task() {
    static RUNS: AtomicU32 = AtomicU32::new(0);
    fn on_press(_: &mut CallbackScope<'_>) {
        RUNS.fetch_add(1, Ordering::SeqCst);
    }

    let mut arena = WidgetArena::new();
    let home = button(&mut arena, ScreenId(0), rect(0, 0, 100, 100), on_press);
    let other = button(&mut arena, ScreenId(1), rect(0, 0, 100, 100), on_press);
    let mut registry = WidgetRegistry::new();
    registry
        .register_category(Category::RectButton, &[home, other], &arena)
        .unwrap();

    let mut touch = ScriptedTouch::new();
    touch.idle(1);
    touch.tap(50, 50, 1);
    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        registry,
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );

    task.tick(at(0));
    assert!(shared.request_screen(ScreenId(1)));
    run(&mut task, 1, 4);
    assert_eq!(task.context().active_screen(), ScreenId(1));
    assert_eq!(task.widgets().get_as::<RectButton>(home).unwrap().presses(), 0);
    assert_eq!(task.widgets().get_as::<RectButton>(other).unwrap().presses(), 1);
}

#[test]
fn test_failed_touch_init_keeps_ui_running() {
    let shared = UiShared::new();
    let touch: TouchInput<ScriptedTouch> = TouchInput::from_init(Err("i2c nack"), 0);
    let mut task = task(
        &shared,
        WidgetArena::new(),
        WidgetRegistry::new(),
        touch,
        MemoryStore::new(),
        UiConfig::default(),
    );

    assert_eq!(task.tick(at(0)), TickOutcome::Ran { flushed: true });
    assert!(!task.is_calibrating());
    assert_eq!(task.tick(at(1)), TickOutcome::Ran { flushed: false });
}

#[test]
fn test_swipe_handler_switches_screen() {
    fn on_swipe(ctx: &mut UiContext, direction: SwipeDirection) {
        if direction == SwipeDirection::Left {
            ctx.load_screen(ScreenId(1));
        }
    }

    let mut touch = ScriptedTouch::new();
    for x in [250u16, 200, 150, 100, 50] {
        touch.push(Some(RawTouch::at(x, 120)));
    }
    touch.idle(2);
    let shared = UiShared::new();
    let mut task = task(
        &shared,
        WidgetArena::new(),
        WidgetRegistry::new(),
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );
    task.context_mut().set_swipe_handler(Some(on_swipe));

    // Five contact samples, then the release.
    let next = run(&mut task, 0, 6);
    assert_eq!(task.context().last_swipe(), SwipeDirection::Left);
    assert_eq!(task.context().active_screen(), ScreenId(0));
    run(&mut task, next, next + 1);
    assert_eq!(task.context().active_screen(), ScreenId(1));
}

#[test]
fn test_auto_click_taps_through_debounce() {
    static RUNS: AtomicU32 = AtomicU32::new(0);
    fn on_press(_: &mut CallbackScope<'_>) {
        RUNS.fetch_add(1, Ordering::SeqCst);
    }

    let mut arena = WidgetArena::new();
    let id = button(&mut arena, ScreenId(0), rect(100, 100, 40, 40), on_press);
    let mut registry = WidgetRegistry::new();
    registry.register_category(Category::RectButton, &[id], &arena).unwrap();

    let config = UiConfig {
        auto_click: Some(AutoClickConfig {
            interval_ms: 100,
            x: 120,
            y: 120,
        }),
        ..UiConfig::default()
    };
    let shared = UiShared::new();
    let mut task = task(&shared, arena, registry, TouchInput::inert(), MemoryStore::new(), config);

    // Injections at 100..400 ms; the 300 ms debounce admits 100 and 400.
    run(&mut task, 0, 46);
    assert_eq!(RUNS.load(Ordering::SeqCst), 2);
    assert_eq!(task.widgets().get_as::<RectButton>(id).unwrap().presses(), 2);
}

#[test]
fn test_recalibration_request_restarts_wizard() {
    fn on_press(scope: &mut CallbackScope<'_>) {
        scope.ctx.request_recalibration();
    }

    let mut arena = WidgetArena::new();
    let id = button(&mut arena, ScreenId(0), rect(100, 100, 80, 40), on_press);
    let mut registry = WidgetRegistry::new();
    registry.register_category(Category::RectButton, &[id], &arena).unwrap();

    let mut touch = ScriptedTouch::new();
    touch.tap(140, 120, 1);
    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        registry,
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );

    // Tick 0 queues the callback, tick 1 runs it, tick 2 services it.
    run(&mut task, 0, 3);
    assert!(task.is_calibrating());
    assert_eq!(task.wizard().current_marker(), Some(0));
}

#[test]
fn test_programmatic_change_queues_callback() {
    fn on_toggle(_: &mut CallbackScope<'_>) {}

    let mut arena = WidgetArena::new();
    let mut checkbox = CheckBox::new(ScreenId(0));
    checkbox
        .setup(CheckBoxConfig {
            bounds: rect(10, 10, 100, 20),
            label: "Wi-Fi",
            checked: true,
            callback: Some(on_toggle),
        })
        .unwrap();
    let id = arena.insert(checkbox).unwrap();

    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        WidgetRegistry::new(),
        TouchInput::inert(),
        MemoryStore::new(),
        UiConfig::default(),
    );

    assert_eq!(task.update_widget::<CheckBox, _>(id, |c| c.set_checked(true)), Ok(false));
    assert!(task.context().callbacks().is_empty());
    assert_eq!(task.update_widget::<CheckBox, _>(id, |c| c.set_checked(false)), Ok(true));
    assert_eq!(task.context().callbacks().len(), 1);
    assert_eq!(
        task.update_widget::<RectButton, _>(id, |_| true),
        Err(UiError::UnknownWidget(id.0))
    );
}

#[test]
fn test_held_return_does_not_press_widget_underneath() {
    static PRESSES: AtomicU32 = AtomicU32::new(0);
    fn on_press(_: &mut CallbackScope<'_>) {
        PRESSES.fetch_add(1, Ordering::SeqCst);
    }
    fn on_edit(_: &mut CallbackScope<'_>) {}

    let numpad = KeypadLayout::build(InputKind::Numpad, 320, 240);
    let ok = numpad.position_of(Key::Return).unwrap();

    let mut arena = WidgetArena::new();
    let mut field = InputField::new(ScreenId(0), InputKind::Numpad);
    field
        .setup(InputFieldConfig {
            bounds: rect(20, 20, 120, 30),
            kind: InputKind::Numpad,
            text: "7",
            placeholder: "",
            callback: Some(on_edit),
        })
        .unwrap();
    let field = arena.insert(field).unwrap();
    let under = button(&mut arena, ScreenId(0), rect(ok.x - 10, ok.y - 10, 20, 20), on_press);
    let mut registry = WidgetRegistry::new();
    registry.register_category(Category::RectButton, &[under], &arena).unwrap();
    registry.register_category(Category::NumberBox, &[field], &arena).unwrap();

    let mut touch = ScriptedTouch::new();
    touch.tap(80, 35, 1);
    touch.idle(3);
    touch.tap(ok.x as u16, ok.y as u16, 6);
    touch.idle(1);
    touch.tap(ok.x as u16, ok.y as u16, 1);

    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        registry,
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );

    // Open, let the ghost window pass, then hold RETURN and release.
    let next = run(&mut task, 0, 12);
    assert!(!task.modal().is_open());
    assert_eq!(task.widgets().get_as::<RectButton>(under).unwrap().presses(), 0);

    // A fresh touch at the same spot reaches the button.
    run(&mut task, next, next + 4);
    assert_eq!(task.widgets().get_as::<RectButton>(under).unwrap().presses(), 1);
    assert_eq!(PRESSES.load(Ordering::SeqCst), 1);
}

#[test]
fn test_held_finger_does_not_press_next_screen() {
    static OTHER: AtomicU32 = AtomicU32::new(0);
    fn on_home(scope: &mut CallbackScope<'_>) {
        scope.ctx.load_screen(ScreenId(1));
    }
    fn on_other(_: &mut CallbackScope<'_>) {
        OTHER.fetch_add(1, Ordering::SeqCst);
    }

    let mut arena = WidgetArena::new();
    let home = button(&mut arena, ScreenId(0), rect(0, 0, 100, 100), on_home);
    let other = button(&mut arena, ScreenId(1), rect(0, 0, 100, 100), on_other);
    let mut registry = WidgetRegistry::new();
    registry
        .register_category(Category::RectButton, &[home, other], &arena)
        .unwrap();

    let mut touch = ScriptedTouch::new();
    touch.tap(50, 50, 8);
    touch.idle(1);
    touch.tap(50, 50, 1);
    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        registry,
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );

    // Tick 0 presses, tick 1 runs the callback, tick 2 loads the screen
    // while the finger is still down.
    let next = run(&mut task, 0, 10);
    assert_eq!(task.context().active_screen(), ScreenId(1));
    assert_eq!(task.widgets().get_as::<RectButton>(home).unwrap().presses(), 1);
    assert_eq!(task.widgets().get_as::<RectButton>(other).unwrap().presses(), 0);

    run(&mut task, next, next + 4);
    assert_eq!(task.widgets().get_as::<RectButton>(other).unwrap().presses(), 1);
    assert_eq!(OTHER.load(Ordering::SeqCst), 1);
}

#[test]
fn test_held_finger_is_not_a_calibration_sample() {
    fn on_press(scope: &mut CallbackScope<'_>) {
        scope.ctx.request_recalibration();
    }

    let mut arena = WidgetArena::new();
    let id = button(&mut arena, ScreenId(0), rect(100, 100, 80, 40), on_press);
    let mut registry = WidgetRegistry::new();
    registry.register_category(Category::RectButton, &[id], &arena).unwrap();

    let mut touch = ScriptedTouch::new();
    touch.tap(140, 120, 6);
    touch.idle(2);
    let shared = UiShared::new();
    let mut task = task(
        &shared,
        arena,
        registry,
        TouchInput::new(touch, 0),
        identity_store(),
        UiConfig::default(),
    );

    // The wizard starts on tick 2 under the still-held finger.
    run(&mut task, 0, 9);
    assert!(task.is_calibrating());
    assert_eq!(task.wizard().current_marker(), Some(0));
}
