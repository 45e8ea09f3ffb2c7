// src/image.rs

//! ARGB pixel buffers backing the offscreen pair and the composed screen.

/// Fully opaque white, the initial content of a mutable image.
pub const OPAQUE_WHITE: u32 = 0xFFFF_FFFF;

/// A mutable 32-bit ARGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: i32,
    height: i32,
    pixels: Vec<u32>,
}

impl Image {
    /// Creates a white image. Non-positive dimensions are clamped to 1 px.
    pub fn new(width: i32, height: i32) -> Self {
        Self::filled(width, height, OPAQUE_WHITE)
    }

    pub fn filled(width: i32, height: i32, argb: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![argb; (width as usize) * (height as usize)],
        }
    }

    /// Returns an image of the requested size, reusing `previous`'s allocation
    /// when it already has enough capacity.
    pub fn reallocate(previous: Option<Image>, width: i32, height: i32) -> Self {
        match previous {
            Some(mut image) => {
                image.width = width.max(1);
                image.height = height.max(1);
                let len = (image.width as usize) * (image.height as usize);
                image.pixels.clear();
                image.pixels.resize(len, OPAQUE_WHITE);
                image
            }
            None => Self::new(width, height),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, argb: u32) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        self.pixels[(y * self.width + x) as usize] = argb;
    }

    pub fn fill(&mut self, argb: u32) {
        self.pixels.fill(argb);
    }

    /// Copies this image into `dst`, row by row, over the overlapping area.
    pub fn copy_pixels(&self, dst: &mut Image) {
        if self.width == dst.width && self.height == dst.height {
            dst.pixels.copy_from_slice(&self.pixels);
            return;
        }
        let cols = self.width.min(dst.width) as usize;
        let rows = self.height.min(dst.height) as usize;
        for row in 0..rows {
            let src_start = row * self.width as usize;
            let dst_start = row * dst.width as usize;
            dst.pixels[dst_start..dst_start + cols]
                .copy_from_slice(&self.pixels[src_start..src_start + cols]);
        }
    }
}
