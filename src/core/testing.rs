//! Synthetic image fixtures shared by the unit tests.

use image::{ImageBuffer, Rgb};
use std::path::Path;

/// Smooth scene defined on normalized coordinates, so renders at different
/// sizes look the same after downscaling. `variant` shifts the pattern.
pub fn render_scene(path: &Path, width: u32, height: u32, variant: u32) {
    let phase = variant as f64 * 0.9;
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let u = x as f64 / width as f64;
        let v = y as f64 / height as f64;
        let tau = std::f64::consts::TAU;
        let value = 128.0
            + 50.0 * (tau * 1.5 * u + phase).sin() * (tau * 2.3 * v).cos()
            + 40.0 * (tau * 1.1 * (u + v) + phase).cos()
            + 25.0 * (tau * 3.0 * u * v).sin();
        let l = value.clamp(0.0, 255.0) as u8;
        Rgb([l, l.saturating_add(10), l.saturating_sub(10)])
    });
    img.save(path).unwrap();
}

/// Blocky pseudo-random texture; each seed gives an unrelated image.
pub fn render_texture(path: &Path, width: u32, height: u32, seed: u64) {
    let blocks = 8u32;
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut cells = Vec::with_capacity((blocks * blocks) as usize);
    for _ in 0..blocks * blocks {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        cells.push((state >> 56) as u8);
    }

    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let bx = (x * blocks / width).min(blocks - 1);
        let by = (y * blocks / height).min(blocks - 1);
        let l = cells[(by * blocks + bx) as usize];
        Rgb([l, l, l])
    });
    img.save(path).unwrap();
}
