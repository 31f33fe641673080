//! Point operations on color samples: brightness, contrast, gamma,
//! logarithmic mapping, negative, threshold, histogram equalization.
//!
//! Every function here keeps dimensions and alpha unchanged.

use crate::channels::{lut_from_fn, map_color_lut, map_color_planes};
use crate::grayscale::{expand_luma, luma};
use crate::types::Image;

/// Add `amount` to every color sample, saturating at 0 and 255.
#[must_use = "returns the adjusted image"]
pub fn brightness(image: &Image, amount: i32) -> Image {
    if amount == 0 {
        return image.clone();
    }
    let amount = f64::from(amount);
    map_color_lut(image, &lut_from_fn(|v| v + amount))
}

/// Scale each sample's distance from mid-gray (128) by `factor`.
///
/// `1.0` is the identity, `0.0` flattens to uniform gray.
#[must_use = "returns the adjusted image"]
pub fn contrast(image: &Image, factor: f64) -> Image {
    map_color_lut(image, &lut_from_fn(|v| (v - 128.0).mul_add(factor, 128.0)))
}

/// Power-law transform: `255 * (v / 255) ^ gamma`.
///
/// Values above `1.0` darken midtones, values below brighten them.
/// Non-positive `gamma` returns the image unchanged.
#[must_use = "returns the adjusted image"]
pub fn gamma(image: &Image, gamma: f64) -> Image {
    if gamma <= 0.0 {
        return image.clone();
    }
    map_color_lut(image, &lut_from_fn(|v| 255.0 * (v / 255.0).powf(gamma)))
}

/// Logarithmic transform: `gain * 255 * ln(1 + v) / ln(256)`.
///
/// Expands dark tones and compresses bright ones.
#[must_use = "returns the adjusted image"]
pub fn log_transform(image: &Image, gain: f64) -> Image {
    let scale = gain * 255.0 / 256.0_f64.ln();
    map_color_lut(image, &lut_from_fn(|v| scale * v.ln_1p()))
}

/// Photographic negative of the color samples.
#[must_use = "returns the inverted image"]
pub fn negative(image: &Image) -> Image {
    map_color_lut(image, &lut_from_fn(|v| 255.0 - v))
}

/// Binary threshold on luminance.
///
/// Pixels whose luminance is at least `level` become white, others
/// black; `invert` swaps the two. Alpha is kept.
#[must_use = "returns the thresholded image"]
pub fn threshold(image: &Image, level: u8, invert: bool) -> Image {
    let mut gray = luma(image);
    for p in gray.pixels_mut() {
        let on = (p.0[0] >= level) != invert;
        p.0[0] = if on { u8::MAX } else { 0 };
    }
    expand_luma(&gray, image)
}

/// Histogram equalization of each color channel independently.
#[must_use = "returns the equalized image"]
pub fn equalize(image: &Image) -> Image {
    map_color_planes(image, imageproc::contrast::equalize_histogram)
}
