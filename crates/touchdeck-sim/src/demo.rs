//! Two-screen demo UI exercising every widget kind.

use std::sync::OnceLock;

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::{info, warn};

use touchdeck_core::touch::SwipeDirection;
use touchdeck_core::ui::{
    CheckBox, CheckBoxConfig, CircleButton, CircleButtonConfig, InputField, InputFieldConfig,
    RectButton, RectButtonConfig, Slider, SliderConfig, ToggleSwitch, ToggleSwitchConfig,
    TouchArea, TouchAreaConfig,
};
use touchdeck_core::{
    CallbackScope, Category, InputKind, ScreenId, UiContext, UiError, WidgetArena, WidgetId,
    WidgetRegistry,
};

pub const HOME: ScreenId = ScreenId(0);
pub const SETTINGS: ScreenId = ScreenId(1);

/// Slider step applied by the "+" button.
const BRIGHTNESS_STEP: i32 = 10;

/// Ids the callbacks need to reach other widgets.
#[derive(Debug, Clone, Copy)]
pub struct DemoIds {
    pub open_settings: WidgetId,
    pub plus: WidgetId,
    pub backlight: WidgetId,
    pub brightness: WidgetId,
    pub power: WidgetId,
    pub pad: WidgetId,
    pub device_name: WidgetId,
    pub tick_rate: WidgetId,
    pub back: WidgetId,
    pub recalibrate: WidgetId,
}

static IDS: OnceLock<DemoIds> = OnceLock::new();

fn ids() -> Option<&'static DemoIds> {
    IDS.get()
}

fn rect(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
    Rectangle::new(Point::new(x, y), Size::new(w, h))
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

fn on_open_settings(scope: &mut CallbackScope<'_>) {
    scope.ctx.load_screen(SETTINGS);
}

fn on_back(scope: &mut CallbackScope<'_>) {
    scope.ctx.load_screen(HOME);
}

fn on_recalibrate(scope: &mut CallbackScope<'_>) {
    info!("Recalibration requested from the settings screen");
    scope.ctx.request_recalibration();
}

fn on_plus(scope: &mut CallbackScope<'_>) {
    let Some(ids) = ids() else {
        return;
    };
    let Some(slider) = scope.widgets.get_as_mut::<Slider>(ids.brightness) else {
        return;
    };
    let next = slider.value() + BRIGHTNESS_STEP;
    if slider.set_value(next) && scope.widgets.notify(ids.brightness, scope.ctx).is_err() {
        warn!("Brightness change not announced");
    }
}

fn on_backlight(scope: &mut CallbackScope<'_>) {
    if let Some(checkbox) = scope.widgets.get_as::<CheckBox>(scope.source) {
        info!("Backlight {}", if checkbox.is_checked() { "on" } else { "off" });
    }
}

fn on_brightness(scope: &mut CallbackScope<'_>) {
    if let Some(slider) = scope.widgets.get_as::<Slider>(scope.source) {
        info!("Brightness {}%", slider.value());
    }
}

fn on_power(scope: &mut CallbackScope<'_>) {
    if let Some(toggle) = scope.widgets.get_as::<ToggleSwitch>(scope.source) {
        info!("Power {}", if toggle.is_on() { "on" } else { "off" });
    }
}

fn on_pad(scope: &mut CallbackScope<'_>) {
    if let Some(area) = scope.widgets.get_as::<TouchArea>(scope.source) {
        info!("Pad touched at {:?}", area.last_point());
    }
}

fn on_device_name(scope: &mut CallbackScope<'_>) {
    if let Some(field) = scope.widgets.get_as::<InputField>(scope.source) {
        info!("Device name is now {:?}", field.text());
    }
}

fn on_tick_rate(scope: &mut CallbackScope<'_>) {
    if let Some(field) = scope.widgets.get_as::<InputField>(scope.source) {
        match field.number() {
            Some(ms) => info!("Tick rate set to {} ms", ms),
            None => info!("Tick rate field cleared"),
        }
    }
}

/// Swipe left for settings, right for home.
pub fn on_swipe(ctx: &mut UiContext, direction: SwipeDirection) {
    match direction {
        SwipeDirection::Left => ctx.load_screen(SETTINGS),
        SwipeDirection::Right => ctx.load_screen(HOME),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Build both screens and register every widget for dispatch.
pub fn build() -> Result<(WidgetArena, WidgetRegistry, DemoIds), UiError> {
    let mut arena = WidgetArena::new();

    let mut open_settings = RectButton::new(HOME);
    open_settings.setup(RectButtonConfig {
        bounds: rect(10, 10, 100, 40),
        label: "Settings",
        callback: Some(on_open_settings),
    })?;
    let open_settings = arena.insert(open_settings)?;

    let mut plus = CircleButton::new(HOME);
    plus.setup(CircleButtonConfig {
        center: Point::new(280, 30),
        radius: 20,
        label: "+",
        callback: Some(on_plus),
    })?;
    let plus = arena.insert(plus)?;

    let mut backlight = CheckBox::new(HOME);
    backlight.setup(CheckBoxConfig {
        bounds: rect(10, 60, 140, 30),
        label: "Backlight",
        checked: true,
        callback: Some(on_backlight),
    })?;
    let backlight = arena.insert(backlight)?;

    let mut brightness = Slider::new(HOME);
    brightness.setup(SliderConfig {
        bounds: rect(10, 100, 200, 30),
        min: 0,
        max: 100,
        value: 50,
        callback: Some(on_brightness),
    })?;
    let brightness = arena.insert(brightness)?;

    let mut power = ToggleSwitch::new(HOME);
    power.setup(ToggleSwitchConfig {
        bounds: rect(240, 100, 60, 30),
        on: false,
        callback: Some(on_power),
    })?;
    let power = arena.insert(power)?;

    let mut pad = TouchArea::new(HOME);
    pad.setup(TouchAreaConfig {
        bounds: rect(0, 150, 320, 90),
        callback: Some(on_pad),
    })?;
    let pad = arena.insert(pad)?;

    let mut device_name = InputField::new(SETTINGS, InputKind::Keyboard);
    device_name.setup(InputFieldConfig {
        bounds: rect(10, 10, 200, 30),
        kind: InputKind::Keyboard,
        text: "deck",
        placeholder: "Device name",
        callback: Some(on_device_name),
    })?;
    let device_name = arena.insert(device_name)?;

    let mut tick_rate = InputField::new(SETTINGS, InputKind::Numpad);
    tick_rate.setup(InputFieldConfig {
        bounds: rect(10, 50, 120, 30),
        kind: InputKind::Numpad,
        text: "10",
        placeholder: "Tick ms",
        callback: Some(on_tick_rate),
    })?;
    let tick_rate = arena.insert(tick_rate)?;

    let mut back = RectButton::new(SETTINGS);
    back.setup(RectButtonConfig {
        bounds: rect(10, 190, 100, 40),
        label: "Back",
        callback: Some(on_back),
    })?;
    let back = arena.insert(back)?;

    let mut recalibrate = RectButton::new(SETTINGS);
    recalibrate.setup(RectButtonConfig {
        bounds: rect(210, 190, 100, 40),
        label: "Recalibrate",
        callback: Some(on_recalibrate),
    })?;
    let recalibrate = arena.insert(recalibrate)?;

    let mut registry = WidgetRegistry::new();
    registry.register_category(Category::RectButton, &[open_settings, back, recalibrate], &arena)?;
    registry.register_category(Category::CircleButton, &[plus], &arena)?;
    registry.register_category(Category::CheckBox, &[backlight], &arena)?;
    registry.register_category(Category::Slider, &[brightness], &arena)?;
    registry.register_category(Category::Toggle, &[power], &arena)?;
    registry.register_category(Category::TextBox, &[device_name], &arena)?;
    registry.register_category(Category::NumberBox, &[tick_rate], &arena)?;
    registry.register_category(Category::TouchArea, &[pad], &arena)?;

    let demo = DemoIds {
        open_settings,
        plus,
        backlight,
        brightness,
        power,
        pad,
        device_name,
        tick_rate,
        back,
        recalibrate,
    };
    // A second build (window mode after replay) reuses the first ids, which
    // are identical since insertion order is fixed.
    let _ = IDS.set(demo);
    Ok((arena, registry, demo))
}
