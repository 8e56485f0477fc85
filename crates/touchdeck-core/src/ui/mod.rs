//! Widget system for the touchdeck runtime
//!
//! - [`core`]: the `Widget` contract and the lifecycle flags every widget carries
//! - [`components`]: built-in controls (buttons, checkbox, slider, toggle, input fields)
//! - [`styling`]: RGB565 palette shared by widgets, keyboard and calibration markers

pub mod components;
pub mod core;
pub mod styling;

pub use components::{
    CheckBox, CheckBoxConfig, CircleButton, CircleButtonConfig, InputField, InputFieldConfig,
    RectButton, RectButtonConfig, Slider, SliderConfig, ToggleSwitch, ToggleSwitchConfig,
    TouchArea, TouchAreaConfig,
};
pub use core::{ScreenId, Widget, WidgetState};
pub use styling::ColorPalette;
