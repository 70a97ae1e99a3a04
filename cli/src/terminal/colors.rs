use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 94, g: 196, b: 182 };
pub const ACCENT: Color = Color::TrueColor { r: 236, g: 178, b: 92 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const PATH: Color = Color::Cyan;
pub const REDACTED: Color = Color::Magenta;
