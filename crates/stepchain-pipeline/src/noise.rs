//! Noise generators.
//!
//! Wraps [`imageproc::noise`]. These are the only operations whose
//! output is intentionally not a function of their inputs alone: a
//! negative seed draws a fresh one on every call, so re-running the
//! pipeline re-rolls the noise. A non-negative seed is reproducible.

use crate::types::Image;

/// Map a user seed to a concrete RNG seed.
///
/// Negative values draw a random seed.
#[must_use]
pub fn resolve_seed(seed: i64) -> u64 {
    u64::try_from(seed).unwrap_or_else(|_| rand::random())
}

/// Add Gaussian noise with the given `mean` and `stddev` to the color
/// channels. Alpha is kept.
#[must_use = "returns the noisy image"]
pub fn gaussian_noise(image: &Image, mean: f64, stddev: f64, seed: u64) -> Image {
    if stddev <= 0.0 && mean == 0.0 {
        return image.clone();
    }
    let noisy = imageproc::noise::gaussian_noise(image, mean, stddev.max(0.0), seed);
    restore_alpha(noisy, image)
}

/// Set a `rate` fraction of pixels to black or white at random.
/// Alpha is kept.
#[must_use = "returns the noisy image"]
pub fn salt_and_pepper(image: &Image, rate: f64, seed: u64) -> Image {
    if rate <= 0.0 {
        return image.clone();
    }
    let noisy = imageproc::noise::salt_and_pepper_noise(image, rate.min(1.0), seed);
    restore_alpha(noisy, image)
}

fn restore_alpha(mut noisy: Image, source: &Image) -> Image {
    for (p, s) in noisy.pixels_mut().zip(source.pixels()) {
        p.0[3] = s.0[3];
    }
    noisy
}
