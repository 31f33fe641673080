//! Grayscale conversion and single-channel re-expansion.
//!
//! Several operations (grayscale, threshold, edge detection) compute a
//! single luminance channel. The pipeline only carries 4-channel images,
//! so their results go back through [`expand_luma`], which copies the
//! luminance into R, G and B and keeps the source image's alpha.

use image::GrayImage;

use crate::types::Image;

/// Luminance of an RGBA image, ignoring alpha.
///
/// Uses the `image` crate's weighted luminance conversion.
#[must_use = "returns the luminance channel"]
pub fn luma(image: &Image) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Re-expand a single channel to RGBA, taking alpha from `alpha_source`.
///
/// `gray` and `alpha_source` must have the same dimensions; pixels
/// outside `alpha_source` get full opacity.
#[must_use = "returns the expanded RGBA image"]
pub fn expand_luma(gray: &GrayImage, alpha_source: &Image) -> Image {
    Image::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        let a = if x < alpha_source.width() && y < alpha_source.height() {
            alpha_source.get_pixel(x, y).0[3]
        } else {
            u8::MAX
        };
        image::Rgba([v, v, v, a])
    })
}

/// Convert to gray while staying 4-channel and keeping alpha.
#[must_use = "returns the grayscale image"]
pub fn grayscale(image: &Image) -> Image {
    expand_luma(&luma(image), image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_preserves_alpha() {
        let img = Image::from_fn(3, 2, |x, _| image::Rgba([200, 10, 60, (x * 40) as u8]));
        let gray = grayscale(&img);
        for (x, y, p) in gray.enumerate_pixels() {
            assert_eq!(p.0[3], img.get_pixel(x, y).0[3]);
        }
    }

    #[test]
    fn grayscale_channels_are_equal() {
        let img = Image::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        let gray = grayscale(&img);
        let p = gray.get_pixel(1, 1).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn gray_input_is_unchanged() {
        let img = Image::from_pixel(2, 2, image::Rgba([128, 128, 128, 77]));
        assert_eq!(grayscale(&img), img);
    }

    #[test]
    fn luminance_weights_green_highest() {
        let r = luma(&Image::from_pixel(1, 1, image::Rgba([255, 0, 0, 255]))).get_pixel(0, 0).0[0];
        let g = luma(&Image::from_pixel(1, 1, image::Rgba([0, 255, 0, 255]))).get_pixel(0, 0).0[0];
        let b = luma(&Image::from_pixel(1, 1, image::Rgba([0, 0, 255, 255]))).get_pixel(0, 0).0[0];
        assert!(
            g > r && r > b,
            "expected green > red > blue luminance, got R={r} G={g} B={b}",
        );
    }

    #[test]
    fn expand_luma_dimensions_match_gray() {
        let gray = GrayImage::from_pixel(5, 4, image::Luma([9]));
        let alpha = Image::from_pixel(5, 4, image::Rgba([0, 0, 0, 10]));
        let out = expand_luma(&gray, &alpha);
        assert_eq!(out.dimensions(), (5, 4));
        assert_eq!(out.get_pixel(4, 3).0, [9, 9, 9, 10]);
    }
}
