// Terminal rendering of decoded images with half-block cells

use crate::decode::DecodedImage;
use image::imageops::FilterType;
use image::RgbaImage;
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

/// Calculates new dimensions to fit image within max width and height while preserving aspect ratio
pub fn calculate_resize_dimensions(
    original_width: u32,
    original_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    if original_width == 0 || original_height == 0 {
        return (0, 0);
    }

    let width_ratio = max_width as f64 / original_width as f64;
    let height_ratio = max_height as f64 / original_height as f64;

    let ratio = width_ratio.min(height_ratio);

    if ratio >= 1.0 {
        // Image is smaller than max dimensions, don't upscale
        (original_width, original_height)
    } else {
        let new_width = ((original_width as f64 * ratio) as u32).max(1);
        let new_height = ((original_height as f64 * ratio) as u32).max(1);
        (new_width, new_height)
    }
}

/// Converts an image to styled lines using half-block characters for terminal display.
/// Uses the upper half block character (▀) with foreground color for the upper pixel
/// and background color for the lower pixel, effectively displaying 2 pixels per cell.
pub fn image_to_halfblock_lines(img: &RgbaImage, width: u32, height: u32) -> Vec<Line<'static>> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    // Ensure height is even for proper half-block rendering
    let height = if height % 2 == 0 { height } else { height + 1 };

    // Triangle is fast enough for large photos and looks fine at terminal resolution
    let img = image::imageops::resize(img, width, height, FilterType::Triangle);

    let term_height = height / 2;
    let mut lines = Vec::with_capacity(term_height as usize);

    for y in 0..term_height {
        let upper_y = y * 2;
        let lower_y = upper_y + 1;

        let mut spans = Vec::with_capacity(width as usize);

        for x in 0..width {
            let upper = img.get_pixel(x, upper_y).0;
            let lower = img.get_pixel(x, lower_y).0;

            let style = Style::default()
                .fg(Color::Rgb(upper[0], upper[1], upper[2]))
                .bg(Color::Rgb(lower[0], lower[1], lower[2]));

            spans.push(Span::styled("▀", style));
        }

        lines.push(Line::from(spans));
    }

    lines
}

/// Renders `image` to fit a `cols` x `rows` cell area
pub fn render_to_fit(image: &DecodedImage, cols: u16, rows: u16) -> Vec<Line<'static>> {
    if cols == 0 || rows == 0 {
        return Vec::new();
    }
    let (width, height) = calculate_resize_dimensions(
        image.width(),
        image.height(),
        cols as u32,
        rows as u32 * 2,
    );
    image_to_halfblock_lines(&image.pixels, width, height)
}
