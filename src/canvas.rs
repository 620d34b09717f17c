// Canvas module - the in-memory RGB grid presented to the matrix each frame
use crate::assets::Sprite;
use crate::types::Rgb;

pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas {
            width,
            height,
            pixels: vec![crate::types::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Bounds-checked single pixel write; off-canvas coordinates are dropped.
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.pixels[y as usize * self.width + x as usize] = color;
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width + x as usize])
    }

    /// Fill the rectangle with corners (x0, y0) and (x1, y1), both inclusive.
    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        for y in y0.max(0)..=y1.min(self.height as i32 - 1) {
            for x in x0.max(0)..=x1.min(self.width as i32 - 1) {
                self.pixels[y as usize * self.width + x as usize] = color;
            }
        }
    }

    /// Paste a sprite at (x, y) honoring its alpha mask. Pixels whose mask
    /// value is below 128 are skipped; off-canvas parts are clipped.
    pub fn paste(&mut self, sprite: &Sprite, x: i32, y: i32) {
        for sy in 0..sprite.height {
            for sx in 0..sprite.width {
                let idx = sy * sprite.width + sx;
                if sprite.mask[idx] < 128 {
                    continue;
                }
                self.put_pixel(x + sx as i32, y + sy as i32, sprite.pixels[idx]);
            }
        }
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }
}
