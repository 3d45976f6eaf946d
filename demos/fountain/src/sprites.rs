//! Built-in sprites used when no texture paths are given.

use image::{Rgba, RgbaImage};

pub const SPRITE_SIZE: u32 = 64;

/// Normalised distance from the sprite centre, 0 at the centre, 1 at the
/// edge midpoints.
fn radius(x: u32, y: u32, size: u32) -> f32 {
    let half = size as f32 / 2.0;
    let dx = (x as f32 + 0.5 - half) / half;
    let dy = (y as f32 + 0.5 - half) / half;
    (dx * dx + dy * dy).sqrt()
}

/// A soft white disc fading to transparent.
pub fn glow(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let falloff = (1.0 - radius(x, y, size)).clamp(0.0, 1.0);
        Rgba([255, 255, 255, (falloff * falloff * 255.0) as u8])
    })
}

/// A warm ring with a faint core.
pub fn spark(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let r = radius(x, y, size);
        let ring = (1.0 - ((r - 0.6).abs() / 0.25)).clamp(0.0, 1.0);
        let core = (1.0 - r / 0.3).clamp(0.0, 1.0) * 0.5;
        let alpha = ring.max(core);
        Rgba([255, 180, 60, (alpha * 255.0) as u8])
    })
}
