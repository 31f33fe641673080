//! Mask production, composition, and masked blending.
//!
//! A [`Mask`] is a single-channel grid the size of the image; any nonzero
//! value selects the pixel. Mask-producing steps build one with
//! [`color_mask`] or [`rect_mask`] and AND it with any mask they received
//! ([`intersect`]), which allows double masking. The following step then
//! limits its effect to the selection with [`blend`].

use crate::types::{Dimensions, Image, Mask};

/// Value written for selected pixels.
pub const SELECTED: u8 = u8::MAX;

/// Inclusive per-channel bounds for [`color_mask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    /// Lower bounds for R, G, B.
    pub min: [u8; 3],
    /// Upper bounds for R, G, B.
    pub max: [u8; 3],
}

impl Default for ColorRange {
    /// The full range, selecting every pixel.
    fn default() -> Self {
        Self {
            min: [0; 3],
            max: [u8::MAX; 3],
        }
    }
}

impl ColorRange {
    /// Returns `true` if every color channel of `rgb` lies within bounds.
    ///
    /// Bounds given in the wrong order are treated as swapped.
    #[must_use]
    pub fn contains(&self, rgb: [u8; 3]) -> bool {
        (0..3).all(|c| {
            let lo = self.min[c].min(self.max[c]);
            let hi = self.min[c].max(self.max[c]);
            (lo..=hi).contains(&rgb[c])
        })
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// The rectangle covering all of `dimensions`.
    #[must_use]
    pub const fn full(dimensions: Dimensions) -> Self {
        Self {
            x: 0,
            y: 0,
            width: dimensions.width,
            height: dimensions.height,
        }
    }

    /// Returns `true` if (`x`, `y`) lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x
            && y >= self.y
            && x - self.x < self.width
            && y - self.y < self.height
    }
}

/// Select pixels whose color lies within `range`.
///
/// `invert` selects the complement instead.
#[must_use = "returns the mask"]
pub fn color_mask(image: &Image, range: &ColorRange, invert: bool) -> Mask {
    Mask::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y).0;
        let inside = range.contains([p[0], p[1], p[2]]);
        image::Luma([selection(inside != invert)])
    })
}

/// Select pixels inside `rect` (clipped to `dimensions`).
///
/// `invert` selects everything outside the rectangle instead.
#[must_use = "returns the mask"]
pub fn rect_mask(dimensions: Dimensions, rect: Rect, invert: bool) -> Mask {
    Mask::from_fn(dimensions.width, dimensions.height, |x, y| {
        image::Luma([selection(rect.contains(x, y) != invert)])
    })
}

/// Per-pixel AND of two equally sized masks.
#[must_use = "returns the combined mask"]
pub fn intersect(a: &Mask, b: &Mask) -> Mask {
    Mask::from_fn(a.width(), a.height(), |x, y| {
        let both = a.get_pixel(x, y).0[0] != 0 && b.get_pixel(x, y).0[0] != 0;
        image::Luma([selection(both)])
    })
}

/// Take `transformed` where `mask` selects and `original` elsewhere.
///
/// All three must have the same dimensions.
#[must_use = "returns the blended image"]
pub fn blend(original: &Image, transformed: &Image, mask: &Mask) -> Image {
    Image::from_fn(original.width(), original.height(), |x, y| {
        if mask.get_pixel(x, y).0[0] == 0 {
            *original.get_pixel(x, y)
        } else {
            *transformed.get_pixel(x, y)
        }
    })
}

/// Fraction of pixels selected, in `[0, 1]`. An empty mask reports 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coverage(mask: &Mask) -> f64 {
    let total = Dimensions::of(mask).pixel_count();
    if total == 0 {
        return 0.0;
    }
    let selected = mask.pixels().filter(|p| p.0[0] != 0).count();
    selected as f64 / total as f64
}

const fn selection(selected: bool) -> u8 {
    if selected { SELECTED } else { 0 }
}
