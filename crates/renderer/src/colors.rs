/// Normalised RGB colour (each channel in `[0.0, 1.0]`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLUE:  Self = Self { r: 0.290, g: 0.490, b: 1.000 }; // #4a7dff
    pub const GREEN: Self = Self { r: 0.247, g: 0.749, b: 0.373 }; // #3fbf5f
    pub const RED:   Self = Self { r: 0.898, g: 0.282, b: 0.302 }; // #e5484d

    /// Parse a CSS-style hex color string (`#RRGGBB`).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }

        let byte = |s: &str| -> Option<u8> { u8::from_str_radix(s, 16).ok() };

        Some(Self {
            r: byte(&hex[0..2])? as f32 / 255.0,
            g: byte(&hex[2..4])? as f32 / 255.0,
            b: byte(&hex[4..6])? as f32 / 255.0,
        })
    }

    fn channel(v: f32) -> u8 {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Wrap `text` in a 24-bit ANSI foreground escape.
    pub fn paint(self, text: &str) -> String {
        format!(
            "\x1b[38;2;{};{};{}m{text}\x1b[0m",
            Self::channel(self.r),
            Self::channel(self.g),
            Self::channel(self.b),
        )
    }
}
