//! Built-in widgets

pub mod button;
pub mod checkbox;
pub mod input_field;
pub mod slider;
pub mod toggle;
pub mod touch_area;

pub use button::{CircleButton, CircleButtonConfig, RectButton, RectButtonConfig};
pub use checkbox::{CheckBox, CheckBoxConfig};
pub use input_field::{InputField, InputFieldConfig};
pub use slider::{Slider, SliderConfig};
pub use toggle::{ToggleSwitch, ToggleSwitchConfig};
pub use touch_area::{TouchArea, TouchAreaConfig};
