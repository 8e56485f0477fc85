//! Colors shared by the built-in widgets, the keyboard, and the calibration
//! markers. All values are RGB565; convert from 8-bit RGB with R>>3, G>>2, B>>3.

use embedded_graphics::pixelcolor::Rgb565;

pub const COLOR_BACKGROUND: Rgb565 = Rgb565::new(18 >> 3, 23 >> 2, 24 >> 3);
pub const COLOR_SURFACE: Rgb565 = Rgb565::new(26 >> 3, 32 >> 2, 33 >> 3);
pub const COLOR_STROKE: Rgb565 = Rgb565::new(43 >> 3, 55 >> 2, 57 >> 3);
pub const COLOR_ACCENT: Rgb565 = Rgb565::new(95 >> 3, 185 >> 2, 141 >> 3);
pub const COLOR_ACCENT_DIM: Rgb565 = Rgb565::new(29 >> 3, 47 >> 2, 43 >> 3);
pub const COLOR_ALERT: Rgb565 = Rgb565::new(190 >> 3, 95 >> 2, 95 >> 3);

pub const WHITE: Rgb565 = Rgb565::new(31, 63, 31);
pub const LIGHT_GRAY: Rgb565 = Rgb565::new(21, 42, 21);
pub const GRAY: Rgb565 = Rgb565::new(16, 32, 16);

/// Palette handed to every widget redraw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPalette {
    /// Fill for active/checked/pressed state
    pub primary: Rgb565,
    /// Fill for the inactive part of a control (slider track, toggle off)
    pub secondary: Rgb565,
    /// Screen background, also used to erase hidden widgets
    pub background: Rgb565,
    /// Button and key faces
    pub surface: Rgb565,
    /// Calibration markers and error text
    pub alert: Rgb565,
    pub text_primary: Rgb565,
    /// Text on disabled controls
    pub text_secondary: Rgb565,
    pub border: Rgb565,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::dark()
    }
}

impl ColorPalette {
    pub fn dark() -> Self {
        Self {
            primary: COLOR_ACCENT,
            secondary: COLOR_ACCENT_DIM,
            background: COLOR_BACKGROUND,
            surface: COLOR_SURFACE,
            alert: COLOR_ALERT,
            text_primary: WHITE,
            text_secondary: LIGHT_GRAY,
            border: COLOR_STROKE,
        }
    }

    pub fn light() -> Self {
        Self {
            primary: COLOR_ACCENT,
            secondary: LIGHT_GRAY,
            background: WHITE,
            surface: LIGHT_GRAY,
            alert: COLOR_ALERT,
            text_primary: COLOR_BACKGROUND,
            text_secondary: GRAY,
            border: COLOR_STROKE,
        }
    }
}
