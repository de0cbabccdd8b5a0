use image::GrayImage;
use std::path::Path;

/// Sharpness of the image at `path`: variance of the Laplacian of its luma
/// channel. Higher is sharper; 0 when the file cannot be decoded.
pub fn sharpness(path: &Path) -> f64 {
    match image::open(path) {
        Ok(img) => laplacian_variance(&img.to_luma8()),
        Err(e) => {
            log::debug!("Cannot score {}: {}", path.display(), e);
            0.0
        }
    }
}

pub fn dimensions(path: &Path) -> Option<(u32, u32)> {
    image::image_dimensions(path).ok()
}

pub fn laplacian_variance(image: &GrayImage) -> f64 {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| image.get_pixel(x, y)[0] as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0usize;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let laplacian =
                px(x, y - 1) + px(x - 1, y) + px(x + 1, y) + px(x, y + 1) - 4.0 * px(x, y);
            sum += laplacian;
            sum_sq += laplacian * laplacian;
            count += 1;
        }
    }

    let mean = sum / count as f64;
    sum_sq / count as f64 - mean * mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flat_image_has_zero_variance() {
        let flat: GrayImage = ImageBuffer::from_pixel(16, 16, Luma([90u8]));
        assert_eq!(laplacian_variance(&flat), 0.0);
    }

    #[test]
    fn test_edges_are_sharper_than_gradients() {
        let checker: GrayImage =
            ImageBuffer::from_fn(32, 32, |x, y| Luma([if (x + y) % 2 == 0 { 255u8 } else { 0 }]));
        let gradient: GrayImage = ImageBuffer::from_fn(32, 32, |x, _| Luma([(x * 8) as u8]));

        assert!(laplacian_variance(&checker) > laplacian_variance(&gradient));
    }

    #[test]
    fn test_tiny_image() {
        let tiny: GrayImage = ImageBuffer::from_pixel(2, 2, Luma([0u8]));
        assert_eq!(laplacian_variance(&tiny), 0.0);
    }

    #[test]
    fn test_undecodable_file_scores_zero() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        fs::write(&path, b"not an image").unwrap();

        assert_eq!(sharpness(&path), 0.0);
        assert_eq!(dimensions(&path), None);
    }

    #[test]
    fn test_dimensions() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("img.png");
        let img: GrayImage = ImageBuffer::from_pixel(40, 30, Luma([10u8]));
        img.save(&path).unwrap();

        assert_eq!(dimensions(&path), Some((40, 30)));
        assert_eq!(sharpness(&path), 0.0);
    }
}
