// Color palette for the terminal interface
use ratatui::style::Color;

pub const ACCENT_HIGHLIGHT: Color = Color::Rgb(97, 175, 239);
/// Errors and failed moves
pub const ACCENT_PRIMARY: Color = Color::Rgb(224, 108, 117);
/// Successful moves, bound keys and the prefetch gauge
pub const ACCENT_SECONDARY: Color = Color::Rgb(152, 195, 121);
pub const TEXT_PRIMARY: Color = Color::Rgb(220, 223, 228);
pub const TEXT_SECONDARY: Color = Color::Rgb(127, 132, 142);
pub const BG_DARK: Color = Color::Rgb(30, 33, 39);
pub const BORDER_COLOR: Color = Color::Rgb(75, 82, 99);
