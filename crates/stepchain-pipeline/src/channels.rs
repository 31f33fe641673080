//! Per-channel helpers.
//!
//! Most `imageproc` filters only accept `GrayImage`, so color operations
//! split the image into R, G and B planes, filter each one, and
//! reassemble. Alpha is carried over from the source untouched.

use image::GrayImage;

use crate::types::Image;

/// Extract channel `c` (0 = R, 1 = G, 2 = B, 3 = A) as a gray image.
#[must_use]
pub fn channel(image: &Image, c: usize) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        image::Luma([image.get_pixel(x, y).0[c]])
    })
}

/// Apply `filter` to each color channel independently, keeping alpha.
///
/// `filter` must preserve dimensions.
#[must_use]
pub fn map_color_planes<F>(image: &Image, filter: F) -> Image
where
    F: Fn(&GrayImage) -> GrayImage,
{
    let planes: [GrayImage; 3] = std::array::from_fn(|c| filter(&channel(image, c)));

    Image::from_fn(image.width(), image.height(), |x, y| {
        image::Rgba([
            planes[0].get_pixel(x, y).0[0],
            planes[1].get_pixel(x, y).0[0],
            planes[2].get_pixel(x, y).0[0],
            image.get_pixel(x, y).0[3],
        ])
    })
}

/// Remap every color sample through a 256-entry lookup table, keeping alpha.
#[must_use]
pub fn map_color_lut(image: &Image, lut: &[u8; 256]) -> Image {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        for v in &mut p.0[..3] {
            *v = lut[usize::from(*v)];
        }
    }
    out
}

/// Build a lookup table from a per-sample function over `0.0..=255.0`.
///
/// Results are rounded and clamped to `u8`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn lut_from_fn<F>(f: F) -> [u8; 256]
where
    F: Fn(f64) -> f64,
{
    std::array::from_fn(|i| {
        let v = f(f64::from(u8::try_from(i).unwrap_or(u8::MAX)));
        if v.is_nan() {
            0
        } else {
            v.round().clamp(0.0, 255.0) as u8
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Image {
        Image::from_fn(4, 3, |x, y| {
            image::Rgba([(x * 50) as u8, (y * 60) as u8, 17, (100 + x) as u8])
        })
    }

    #[test]
    fn channel_extracts_requested_plane() {
        let img = gradient();
        let g = channel(&img, 1);
        assert_eq!(g.get_pixel(2, 2).0[0], 120);
        let a = channel(&img, 3);
        assert_eq!(a.get_pixel(3, 0).0[0], 103);
    }

    #[test]
    fn identity_filter_round_trips() {
        let img = gradient();
        assert_eq!(map_color_planes(&img, Clone::clone), img);
    }

    #[test]
    fn plane_filter_leaves_alpha() {
        let img = gradient();
        let out = map_color_planes(&img, |g| GrayImage::from_pixel(g.width(), g.height(), image::Luma([0])));
        for (x, y, p) in out.enumerate_pixels() {
            assert_eq!(p.0, [0, 0, 0, img.get_pixel(x, y).0[3]]);
        }
    }

    #[test]
    fn lut_clamps_and_rounds() {
        let lut = lut_from_fn(|v| v * 2.0 + 0.4);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[10], 20);
        assert_eq!(lut[200], 255);
    }

    #[test]
    fn lut_maps_nan_to_zero() {
        let lut = lut_from_fn(|_| f64::NAN);
        assert!(lut.iter().all(|&v| v == 0));
    }

    #[test]
    fn map_lut_keeps_alpha() {
        let img = Image::from_pixel(1, 1, image::Rgba([1, 2, 3, 4]));
        let lut = lut_from_fn(|v| 255.0 - v);
        assert_eq!(map_color_lut(&img, &lut).get_pixel(0, 0).0, [254, 253, 252, 4]);
    }
}
