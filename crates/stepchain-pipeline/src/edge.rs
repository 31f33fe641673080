//! Canny edge detection.
//!
//! Wraps [`imageproc::edges::canny`]. The edge map is single-channel, so
//! [`edge_detect`] re-expands it to RGBA with the source alpha: white
//! pixels are edges, black pixels are background.

use image::GrayImage;

use crate::grayscale::{expand_luma, luma};
use crate::types::Image;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero treats every pixel with any gradient as a
/// potential edge and produces an extremely dense edge map.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Returns a binary image: 255 for edge pixels, 0 for non-edge.
///
/// Both thresholds are clamped to a minimum of [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}

/// Canny edges of an RGBA image's luminance, as a 4-channel image.
#[must_use = "returns the edge image"]
pub fn edge_detect(image: &Image, low_threshold: f32, high_threshold: f32) -> Image {
    let edges = canny(&luma(image), low_threshold, high_threshold);
    expand_luma(&edges, image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn blank_image_produces_no_edges() {
        let img = GrayImage::from_fn(20, 20, |_, _| image::Luma([128]));
        let edges = canny(&img, 50.0, 150.0);
        assert_eq!(edges.dimensions(), (20, 20));
        let edge_count: u32 = edges.pixels().map(|p| u32::from(p.0[0] > 0)).sum();
        assert_eq!(edge_count, 0, "expected no edges in uniform image");
    }

    #[test]
    fn sharp_edge_detected() {
        let edges = canny(&sharp_edge_image(), 50.0, 150.0);
        let edge_count: u32 = edges.pixels().map(|p| u32::from(p.0[0] > 0)).sum();
        assert!(edge_count > 0, "expected edges at sharp boundary, found none");
    }

    #[test]
    fn zero_low_threshold_is_clamped_to_min() {
        let img = sharp_edge_image();
        assert_eq!(canny(&img, 0.0, 150.0), canny(&img, MIN_THRESHOLD, 150.0));
    }

    #[test]
    fn low_above_high_is_clamped() {
        let img = sharp_edge_image();
        assert_eq!(canny(&img, 200.0, 100.0), canny(&img, 100.0, 100.0));
    }

    #[test]
    fn rgba_edges_keep_alpha_and_size() {
        let img = Image::from_fn(20, 20, |x, _| {
            let v = if x < 10 { 0 } else { 255 };
            image::Rgba([v, v, v, 90])
        });
        let out = edge_detect(&img, 50.0, 150.0);
        assert_eq!(out.dimensions(), (20, 20));
        assert!(out.pixels().all(|p| p.0[3] == 90));
        assert!(out.pixels().any(|p| p.0[0] == 255));
    }
}
