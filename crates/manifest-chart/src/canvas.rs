//! Minimal RGBA raster with clipped drawing primitives and PNG output.

use std::io::Cursor;

use crate::error::ChartError;
use crate::font::{self, ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Opaque 8-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);
    pub const SKY_BLUE: Rgb = Rgb(0x87, 0xCE, 0xEB);
    pub const GRID_GRAY: Rgb = Rgb(0xB0, 0xB0, 0xB0);
}

/// Row-major RGBA pixel buffer.
///
/// Coordinates are signed so callers can compute positions that fall off the
/// edge; every primitive clips to the canvas.
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Create a canvas filled with `background`.
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&[background.0, background.1, background.2, 0xFF]);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Colour at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some(Rgb(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    pub fn set_pixel(&mut self, x: i64, y: i64, color: Rgb) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i] = color.0;
        self.pixels[i + 1] = color.1;
        self.pixels[i + 2] = color.2;
        self.pixels[i + 3] = 0xFF;
    }

    /// Fill the half-open rectangle `[x0, x1) x [y0, y1)`.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb) {
        let (x0, x1) = (x0.max(0), x1.min(i64::from(self.width)));
        let (y0, y1) = (y0.max(0), y1.min(i64::from(self.height)));
        for y in y0..y1 {
            for x in x0..x1 {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// One-pixel outline of the half-open rectangle `[x0, x1) x [y0, y1)`.
    pub fn stroke_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb) {
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        self.hline(x0, x1, y0, color);
        self.hline(x0, x1, y1 - 1, color);
        self.vline(x0, y0, y1, color);
        self.vline(x1 - 1, y0, y1, color);
    }

    /// Horizontal line covering `[x0, x1)` on row `y`.
    pub fn hline(&mut self, x0: i64, x1: i64, y: i64, color: Rgb) {
        self.fill_rect(x0, y, x1, y + 1, color);
    }

    /// Vertical line covering `[y0, y1)` on column `x`.
    pub fn vline(&mut self, x: i64, y0: i64, y1: i64, color: Rgb) {
        self.fill_rect(x, y0, x + 1, y1, color);
    }

    /// Draw `text` left-to-right with its top-left corner at `(x, y)`.
    pub fn draw_text(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgb) {
        self.draw_glyphs(text, scale, |u, v| (x + u, y + v), color);
    }

    /// Draw `text` rotated a quarter turn counter-clockwise, reading upwards,
    /// with the start of the text at the bottom-left corner `(x, y)`.
    pub fn draw_text_vertical(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgb) {
        self.draw_glyphs(text, scale, |u, v| (x + v, y - u), color);
    }

    /// Draw `text` horizontally centred on `cx`.
    pub fn draw_text_centered(&mut self, cx: i64, y: i64, text: &str, scale: u32, color: Rgb) {
        let w = i64::from(font::text_width(text, scale));
        self.draw_text(cx - w / 2, y, text, scale, color);
    }

    /// Rasterise glyphs in text space (`u` along the text, `v` down) and map
    /// each pixel to the canvas through `place`.
    fn draw_glyphs<F>(&mut self, text: &str, scale: u32, place: F, color: Rgb)
    where
        F: Fn(i64, i64) -> (i64, i64),
    {
        let scale = i64::from(scale.max(1));
        for (i, c) in text.chars().enumerate() {
            let origin = i as i64 * i64::from(ADVANCE) * scale;
            for (row, bits) in font::glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    for dy in 0..scale {
                        for dx in 0..scale {
                            let u = origin + i64::from(col) * scale + dx;
                            let v = row as i64 * scale + dy;
                            let (px, py) = place(u, v);
                            self.set_pixel(px, py, color);
                        }
                    }
                }
            }
        }
    }

    /// Height in canvas pixels of one line of text at `scale`.
    pub fn line_height(scale: u32) -> u32 {
        GLYPH_HEIGHT * scale.max(1)
    }

    /// Encode the canvas as an 8-bit RGBA PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, ChartError> {
        let mut buf = Vec::new();
        {
            let mut encoder = png::Encoder::new(Cursor::new(&mut buf), self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_canvas_is_background() {
        let c = Canvas::new(4, 3, Rgb::WHITE);
        assert_eq!(c.width(), 4);
        assert_eq!(c.height(), 3);
        assert_eq!(c.pixel(0, 0), Some(Rgb::WHITE));
        assert_eq!(c.pixel(3, 2), Some(Rgb::WHITE));
        assert_eq!(c.pixel(4, 0), None);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut c = Canvas::new(4, 4, Rgb::WHITE);
        c.fill_rect(-5, -5, 2, 2, Rgb::BLACK);
        assert_eq!(c.pixel(0, 0), Some(Rgb::BLACK));
        assert_eq!(c.pixel(1, 1), Some(Rgb::BLACK));
        assert_eq!(c.pixel(2, 2), Some(Rgb::WHITE));
        c.fill_rect(3, 3, 100, 100, Rgb::SKY_BLUE);
        assert_eq!(c.pixel(3, 3), Some(Rgb::SKY_BLUE));
    }

    #[test]
    fn test_stroke_rect_leaves_interior() {
        let mut c = Canvas::new(5, 5, Rgb::WHITE);
        c.stroke_rect(0, 0, 5, 5, Rgb::BLACK);
        assert_eq!(c.pixel(0, 2), Some(Rgb::BLACK));
        assert_eq!(c.pixel(4, 4), Some(Rgb::BLACK));
        assert_eq!(c.pixel(2, 2), Some(Rgb::WHITE));
    }

    #[test]
    fn test_draw_text_marks_pixels() {
        let mut c = Canvas::new(20, 10, Rgb::WHITE);
        c.draw_text(0, 0, "I", 1, Rgb::BLACK);
        // Top bar of 'I' spans columns 1..=3 on row 0.
        assert_eq!(c.pixel(1, 0), Some(Rgb::BLACK));
        assert_eq!(c.pixel(0, 0), Some(Rgb::WHITE));
        // Stem on column 2.
        assert_eq!(c.pixel(2, 3), Some(Rgb::BLACK));
    }

    #[test]
    fn test_draw_text_vertical_rotates() {
        let mut c = Canvas::new(10, 20, Rgb::WHITE);
        c.draw_text_vertical(0, 19, "-", 1, Rgb::BLACK);
        // '-' is row 3 of the glyph, so it lands on column 3 running upwards.
        assert_eq!(c.pixel(3, 19), Some(Rgb::BLACK));
        assert_eq!(c.pixel(3, 15), Some(Rgb::BLACK));
        assert_eq!(c.pixel(2, 19), Some(Rgb::WHITE));
    }

    #[test]
    fn test_encode_png_signature_and_size() {
        let c = Canvas::new(8, 6, Rgb::SKY_BLUE);
        let bytes = c.encode_png().unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        let decoder = png::Decoder::new(Cursor::new(bytes));
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 8);
        assert_eq!(reader.info().height, 6);
    }
}
