//! CSS colors for emotion runs and marker chips.
//!
//! Catalog colors are packed `0xRRGGBBAA`. Fills are the stroke at 20% alpha.

use std::fmt;

/// A packed `0xRRGGBBAA` color. Displays as CSS `rgba()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub u32);

impl Rgba {
    pub fn channels(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// CSS for the same color at a different opacity.
    pub fn css_with_alpha(self, alpha: f32) -> String {
        let [r, g, b, _] = self.channels();
        format!("rgba({r}, {g}, {b}, {alpha})")
    }

    pub fn css(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.channels();
        write!(f, "rgba({r}, {g}, {b}, {})", f32::from(a) / 255.0)
    }
}

impl From<u32> for Rgba {
    fn from(packed: u32) -> Self {
        Self(packed)
    }
}
