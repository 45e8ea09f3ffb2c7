// src/graphics.rs

//! Paint context handed to the application's paint callback.
//!
//! Only the state model and a handful of primitives live here; the widget
//! layer draws text and images through its own renderer. What matters for the
//! paint pipeline is that [`Graphics::reset`] restores color, font, stroke,
//! clip and translation before every cycle.

use crate::display::geometry::Rect;
use crate::image::Image;

/// Stroke style for outlines and lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dotted,
}

/// Font selection as seen by the application (face, style, size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Font {
    pub face: i32,
    pub style: i32,
    pub size: i32,
}

impl Font {
    /// The system default font.
    pub const DEFAULT: Font = Font {
        face: 0,
        style: 0,
        size: 0,
    };
}

/// Drawing context bound to one target image.
pub struct Graphics<'a> {
    target: &'a mut Image,
    color: u32,
    font: Font,
    stroke: StrokeStyle,
    clip: Rect,
    translate_x: i32,
    translate_y: i32,
}

impl<'a> Graphics<'a> {
    pub fn new(target: &'a mut Image) -> Self {
        let clip = Rect::new(0, 0, target.width(), target.height());
        Self {
            target,
            color: 0xFF00_0000,
            font: Font::DEFAULT,
            stroke: StrokeStyle::Solid,
            clip,
            translate_x: 0,
            translate_y: 0,
        }
    }

    /// Restores black, default font, solid stroke, full clip, no translation.
    pub fn reset(&mut self) {
        self.color = 0xFF00_0000;
        self.font = Font::DEFAULT;
        self.stroke = StrokeStyle::Solid;
        self.clip = Rect::new(0, 0, self.target.width(), self.target.height());
        self.translate_x = 0;
        self.translate_y = 0;
    }

    pub fn width(&self) -> i32 {
        self.target.width()
    }

    pub fn height(&self) -> i32 {
        self.target.height()
    }

    /// Sets the color from 0xRRGGBB. Drawing is always opaque.
    pub fn set_color(&mut self, rgb: u32) {
        self.color = 0xFF00_0000 | (rgb & 0x00FF_FFFF);
    }

    pub fn set_color_rgb(&mut self, r: u8, g: u8, b: u8) {
        self.set_color(((r as u32) << 16) | ((g as u32) << 8) | b as u32);
    }

    /// Current color as 0xRRGGBB.
    pub fn color(&self) -> u32 {
        self.color & 0x00FF_FFFF
    }

    pub fn set_font(&mut self, font: Font) {
        self.font = font;
    }

    pub fn font(&self) -> Font {
        self.font
    }

    pub fn set_stroke_style(&mut self, stroke: StrokeStyle) {
        self.stroke = stroke;
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        self.stroke
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.translate_x += dx;
        self.translate_y += dy;
    }

    pub fn translate_x(&self) -> i32 {
        self.translate_x
    }

    pub fn translate_y(&self) -> i32 {
        self.translate_y
    }

    /// Replaces the clip; coordinates are in the translated space.
    pub fn set_clip(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let bounds = Rect::new(0, 0, self.target.width(), self.target.height());
        self.clip = Rect::new(x + self.translate_x, y + self.translate_y, width, height)
            .intersection(&bounds);
    }

    /// Intersects the clip with the given rectangle.
    pub fn clip_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let rect = Rect::new(x + self.translate_x, y + self.translate_y, width, height);
        self.clip = self.clip.intersection(&rect);
    }

    /// Clip in the translated space.
    pub fn clip(&self) -> Rect {
        Rect::new(
            self.clip.x - self.translate_x,
            self.clip.y - self.translate_y,
            self.clip.width,
            self.clip.height,
        )
    }

    /// Fills the whole target, ignoring clip and translation.
    pub fn clear(&mut self, argb: u32) {
        self.target.fill(argb);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let area = Rect::new(x + self.translate_x, y + self.translate_y, width, height)
            .intersection(&self.clip);
        for py in area.y..area.bottom() {
            for px in area.x..area.right() {
                self.target.set_pixel(px, py, self.color);
            }
        }
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if width < 0 || height < 0 {
            return;
        }
        self.draw_line(x, y, x + width, y);
        self.draw_line(x, y + height, x + width, y + height);
        self.draw_line(x, y, x, y + height);
        self.draw_line(x + width, y, x + width, y + height);
    }

    /// Bresenham line, endpoints included.
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let (mut x, mut y) = (x1 + self.translate_x, y1 + self.translate_y);
        let (end_x, end_y) = (x2 + self.translate_x, y2 + self.translate_y);
        let dx = (end_x - x).abs();
        let dy = -(end_y - y).abs();
        let step_x = if x < end_x { 1 } else { -1 };
        let step_y = if y < end_y { 1 } else { -1 };
        let mut err = dx + dy;
        let mut index = 0u32;

        loop {
            let visible = self.stroke == StrokeStyle::Solid || index % 2 == 0;
            if visible && self.clip.contains(x, y) {
                self.target.set_pixel(x, y, self.color);
            }
            if x == end_x && y == end_y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += step_x;
            }
            if e2 <= dx {
                err += dx;
                y += step_y;
            }
            index += 1;
        }
    }

    /// Draws `image` with its top-left corner at (x, y).
    pub fn draw_image(&mut self, image: &Image, x: i32, y: i32) {
        let dst = Rect::new(x, y, image.width(), image.height());
        self.draw_image_scaled(image, dst, false);
    }

    /// Draws `image` stretched into `dst` (translated space).
    ///
    /// Nearest-neighbour sampling, or bilinear when `filter` is set.
    pub fn draw_image_scaled(&mut self, image: &Image, dst: Rect, filter: bool) {
        if dst.is_empty() {
            return;
        }
        let dst = Rect::new(
            dst.x + self.translate_x,
            dst.y + self.translate_y,
            dst.width,
            dst.height,
        );
        let area = dst.intersection(&self.clip);
        let scale_x = image.width() as f32 / dst.width as f32;
        let scale_y = image.height() as f32 / dst.height as f32;

        for py in area.y..area.bottom() {
            let sy = (py - dst.y) as f32 * scale_y;
            for px in area.x..area.right() {
                let sx = (px - dst.x) as f32 * scale_x;
                let argb = if filter {
                    sample_bilinear(image, sx, sy)
                } else {
                    image.pixel(sx as i32, sy as i32).unwrap_or(0)
                };
                self.target.set_pixel(px, py, argb);
            }
        }
    }
}

fn sample_bilinear(image: &Image, sx: f32, sy: f32) -> u32 {
    let fx = (sx - 0.5).max(0.0);
    let fy = (sy - 0.5).max(0.0);
    let x0 = fx as i32;
    let y0 = fy as i32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let p00 = image.pixel(x0, y0).unwrap_or(0);
    let p10 = image.pixel(x1, y0).unwrap_or(0);
    let p01 = image.pixel(x0, y1).unwrap_or(0);
    let p11 = image.pixel(x1, y1).unwrap_or(0);

    let mut out = 0u32;
    for shift in [0u32, 8, 16, 24] {
        let c = |p: u32| ((p >> shift) & 0xFF) as f32;
        let top = c(p00) + (c(p10) - c(p00)) * tx;
        let bottom = c(p01) + (c(p11) - c(p01)) * tx;
        let value = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u32;
        out |= value << shift;
    }
    out
}
