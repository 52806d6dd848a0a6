use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 120, g: 190, b: 230 };
pub const SECONDARY: Color = Color::TrueColor { r: 150, g: 150, b: 170 };
pub const ACCENT: Color = Color::TrueColor { r: 235, g: 200, b: 90 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const HOST_ADDR: Color = Color::TrueColor { r: 140, g: 220, b: 160 };
pub const FRESH: Color = Color::Green;
pub const STALE: Color = Color::Red;
