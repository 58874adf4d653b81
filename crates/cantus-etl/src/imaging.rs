//! Image preprocessing: grayscale, fixed-size resize, row-major flatten.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageResult, Luma};

/// Default side length of the square images fed to PCA.
pub const DEFAULT_IMAGE_SIZE: u32 = 120;

/// Load `path` and turn it into `size * size` grayscale pixel values in
/// `0.0..=255.0`, row-major.
pub fn load_pixels(path: &Path, size: u32) -> ImageResult<Vec<f64>> {
    let img = image::open(path)?;
    Ok(flatten(&img, size))
}

/// Grayscale, resize and flatten an already decoded image.
pub fn flatten(img: &DynamicImage, size: u32) -> Vec<f64> {
    let gray = to_luminance(img);
    let resized = if gray.dimensions() == (size, size) {
        gray
    } else {
        imageops::resize(&gray, size, size, FilterType::CatmullRom)
    };
    resized.pixels().map(|p| f64::from(p[0])).collect()
}

/// ITU-R 601 luminance; transparent pixels are composited over white.
fn to_luminance(img: &DynamicImage) -> GrayImage {
    let rgba = img.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = f64::from(a) / 255.0;
        let over_white = |c: u8| f64::from(c).mul_add(alpha, 255.0 * (1.0 - alpha));
        let luma = 0.299 * over_white(r) + 0.587 * over_white(g) + 0.114 * over_white(b);
        Luma([to_channel(luma)])
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_flatten_has_expected_length() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(37, 19, Rgb([10, 20, 30])));
        let pixels = flatten(&img, 16);
        assert_eq!(pixels.len(), 256);
        assert!(pixels.iter().all(|&p| (0.0..=255.0).contains(&p)));
    }

    #[test]
    fn test_luminance_weights() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 0])));
        let pixels = flatten(&img, 4);
        // 0.299 * 255 = 76.2
        assert!(pixels.iter().all(|&p| (p - 76.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 0])));
        let pixels = flatten(&img, 3);
        assert!(pixels.iter().all(|&p| (p - 255.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_row_major_order() {
        let mut img = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let pixels = flatten(&DynamicImage::ImageRgb8(img), 2);
        assert_eq!(pixels, vec![0.0, 255.0, 0.0, 0.0]);
    }

    #[test]
    fn test_load_pixels_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.png");
        RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]))
            .save(&path)
            .unwrap();

        let pixels = load_pixels(&path, 4).unwrap();
        assert_eq!(pixels.len(), 16);
        assert!(pixels.iter().all(|&p| (p - 200.0).abs() < 1.0));
    }

    #[test]
    fn test_load_pixels_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(load_pixels(&path, 4).is_err());
    }
}
