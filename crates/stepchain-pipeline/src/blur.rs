//! Smoothing and sharpening filters.
//!
//! Wraps [`imageproc::filter`] kernels. The `imageproc` filters used here
//! only accept `GrayImage`, so color images are filtered one color plane
//! at a time via [`map_color_planes`]; alpha is carried over unchanged.

use image::GrayImage;

use crate::channels::map_color_planes;
use crate::types::Image;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Apply Gaussian blur to each color plane of an RGBA image.
///
/// Non-positive sigma values return the image unchanged.
#[must_use = "returns the blurred RGBA image"]
pub fn gaussian_blur_rgba(image: &Image, sigma: f32) -> Image {
    if sigma <= 0.0 {
        return image.clone();
    }

    map_color_planes(image, |plane| gaussian_blur(plane, sigma))
}

/// Mean filter with a square `kernel_size` window.
///
/// `kernel_size` is expected to be odd; even sizes use the next smaller
/// odd window. A size of 1 or less returns the image unchanged.
#[must_use = "returns the blurred image"]
pub fn box_blur(image: &Image, kernel_size: u32) -> Image {
    let radius = kernel_size.saturating_sub(1) / 2;
    if radius == 0 {
        return image.clone();
    }

    map_color_planes(image, |plane| {
        imageproc::filter::box_filter(plane, radius, radius)
    })
}

/// Median filter with a square `kernel_size` window.
///
/// Same window rules as [`box_blur`].
#[must_use = "returns the filtered image"]
pub fn median_blur(image: &Image, kernel_size: u32) -> Image {
    let radius = kernel_size.saturating_sub(1) / 2;
    if radius == 0 {
        return image.clone();
    }

    map_color_planes(image, |plane| {
        imageproc::filter::median_filter(plane, radius, radius)
    })
}

/// Unsharp masking: `original + amount * (original - blurred)`.
///
/// `sigma` controls the blur used to isolate detail. Zero `amount` or
/// non-positive `sigma` returns the image unchanged.
#[must_use = "returns the sharpened image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sharpen(image: &Image, sigma: f32, amount: f32) -> Image {
    if amount == 0.0 || sigma <= 0.0 {
        return image.clone();
    }

    let blurred = gaussian_blur_rgba(image, sigma);
    let mut out = image.clone();
    for (p, b) in out.pixels_mut().zip(blurred.pixels()) {
        for c in 0..3 {
            let orig = f32::from(p.0[c]);
            let detail = orig - f32::from(b.0[c]);
            p.0[c] = amount.mul_add(detail, orig).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Replace each `block_size` x `block_size` tile with its mean color.
///
/// Partial tiles at the right and bottom edges are averaged over the
/// pixels they actually cover. Alpha is kept per pixel.
#[must_use = "returns the pixelated image"]
#[allow(clippy::cast_possible_truncation)]
pub fn pixelate(image: &Image, block_size: u32) -> Image {
    if block_size <= 1 {
        return image.clone();
    }

    let (w, h) = image.dimensions();
    let mut out = image.clone();
    for by in (0..h).step_by(block_size as usize) {
        for bx in (0..w).step_by(block_size as usize) {
            let x_end = (bx + block_size).min(w);
            let y_end = (by + block_size).min(h);

            let mut sums = [0u64; 3];
            let mut count = 0u64;
            for y in by..y_end {
                for x in bx..x_end {
                    let p = image.get_pixel(x, y).0;
                    for c in 0..3 {
                        sums[c] += u64::from(p[c]);
                    }
                    count += 1;
                }
            }
            let mean = sums.map(|s| ((s + count / 2) / count) as u8);

            for y in by..y_end {
                for x in bx..x_end {
                    let p = out.get_pixel_mut(x, y);
                    p.0[..3].copy_from_slice(&mean);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> Image {
        Image::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur_rgba(&img, 0.0), img);
    }

    #[test]
    fn negative_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur_rgba(&img, -1.0), img);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = Image::new(17, 31);
        let blurred = gaussian_blur_rgba(&img, 1.4);
        assert_eq!(blurred.dimensions(), (17, 31));
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let blurred = gaussian_blur_rgba(&sharp_edge_image(), 2.0);
        let left_of_edge = blurred.get_pixel(4, 5).0[0];
        let right_of_edge = blurred.get_pixel(5, 5).0[0];
        assert!(
            left_of_edge > 0,
            "expected blur to raise left-of-edge above 0, got {left_of_edge}",
        );
        assert!(
            right_of_edge < 255,
            "expected blur to lower right-of-edge below 255, got {right_of_edge}",
        );
    }

    #[test]
    fn blur_keeps_alpha() {
        let img = Image::from_fn(6, 6, |x, _| image::Rgba([(x * 40) as u8, 0, 0, (x * 10) as u8]));
        let blurred = gaussian_blur_rgba(&img, 2.0);
        for (x, y, p) in blurred.enumerate_pixels() {
            assert_eq!(p.0[3], img.get_pixel(x, y).0[3]);
        }
    }

    #[test]
    fn uniform_image_unchanged_by_blur() {
        let img = Image::from_pixel(10, 10, image::Rgba([100, 150, 200, 250]));
        let blurred = gaussian_blur_rgba(&img, 1.4);
        for pixel in blurred.pixels() {
            for (c, exp) in [100i16, 150, 200].into_iter().enumerate() {
                let diff = i16::from(pixel.0[c]) - exp;
                assert!(diff.abs() <= 1, "channel {c}: expected ~{exp}, got {}", pixel.0[c]);
            }
        }
    }

    #[test]
    fn box_blur_size_one_is_identity() {
        let img = sharp_edge_image();
        assert_eq!(box_blur(&img, 1), img);
    }

    #[test]
    fn box_blur_averages_neighbors() {
        let blurred = box_blur(&sharp_edge_image(), 3);
        let v = blurred.get_pixel(4, 5).0[0];
        assert!(v > 0 && v < 255, "expected intermediate value, got {v}");
    }

    #[test]
    fn median_removes_isolated_speck() {
        let mut img = Image::from_pixel(5, 5, image::Rgba([10, 10, 10, 255]));
        img.put_pixel(2, 2, image::Rgba([250, 250, 250, 255]));
        let out = median_blur(&img, 3);
        assert_eq!(out.get_pixel(2, 2).0, [10, 10, 10, 255]);
    }

    #[test]
    fn sharpen_increases_edge_contrast() {
        let img = Image::from_fn(10, 10, |x, _| {
            if x < 5 {
                image::Rgba([60, 60, 60, 255])
            } else {
                image::Rgba([190, 190, 190, 255])
            }
        });
        let out = sharpen(&img, 1.0, 1.0);
        assert!(out.get_pixel(4, 5).0[0] < 60);
        assert!(out.get_pixel(5, 5).0[0] > 190);
    }

    #[test]
    fn sharpen_zero_amount_is_identity() {
        let img = sharp_edge_image();
        assert_eq!(sharpen(&img, 1.0, 0.0), img);
    }

    #[test]
    fn pixelate_averages_blocks() {
        let img = Image::from_fn(4, 2, |x, _| image::Rgba([(x * 10) as u8, 0, 0, 255]));
        let out = pixelate(&img, 2);
        // Block 0 covers x in {0, 1}: mean of 0 and 10 rounds to 5.
        assert_eq!(out.get_pixel(0, 0).0[0], 5);
        assert_eq!(out.get_pixel(1, 1).0[0], 5);
        // Block 1 covers x in {2, 3}: mean of 20 and 30 is 25.
        assert_eq!(out.get_pixel(3, 0).0[0], 25);
    }

    #[test]
    fn pixelate_handles_partial_tiles() {
        let img = Image::from_pixel(5, 3, image::Rgba([40, 50, 60, 70]));
        let out = pixelate(&img, 4);
        assert_eq!(out, img);
    }
}
