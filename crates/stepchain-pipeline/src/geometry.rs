//! Geometric transforms: crop, resize, rotate, flip, pad.
//!
//! Crop, resize and pad change the image dimensions. The pipeline does
//! not apply an incoming mask to such results, since the mask no longer
//! lines up with the output grid.

use std::fmt;
use std::str::FromStr;

use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

use crate::types::Image;

/// Resampling filter used when resizing.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResizeFilter {
    /// Names accepted by [`FromStr`], in quality order.
    pub const NAMES: &'static [&'static str] =
        &["nearest", "triangle", "catmull_rom", "gaussian", "lanczos3"];

    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Triangle => "triangle",
            Self::CatmullRom => "catmull_rom",
            Self::Gaussian => "gaussian",
            Self::Lanczos3 => "lanczos3",
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResizeFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "triangle" => Ok(Self::Triangle),
            "catmull_rom" => Ok(Self::CatmullRom),
            "gaussian" => Ok(Self::Gaussian),
            "lanczos3" => Ok(Self::Lanczos3),
            other => Err(format!("unknown resize filter '{other}'")),
        }
    }
}

/// Mirror axis for [`flip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipAxis {
    /// Mirror left-right.
    #[default]
    Horizontal,
    /// Mirror top-bottom.
    Vertical,
    /// Both, equivalent to a 180 degree rotation.
    Both,
}

impl FlipAxis {
    /// Names accepted by [`FromStr`].
    pub const NAMES: &'static [&'static str] = &["horizontal", "vertical", "both"];
}

impl FromStr for FlipAxis {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown flip axis '{other}'")),
        }
    }
}

/// Cut the rectangle at (`x`, `y`) of size `width` x `height`.
///
/// The rectangle is clamped to the image: the origin is kept inside it
/// and the size shrinks to what remains, never below 1x1.
#[must_use = "returns the cropped image"]
pub fn crop(image: &Image, x: u32, y: u32, width: u32, height: u32) -> Image {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return image.clone();
    }

    let x = x.min(w - 1);
    let y = y.min(h - 1);
    let width = width.clamp(1, w - x);
    let height = height.clamp(1, h - y);

    image::imageops::crop_imm(image, x, y, width, height).to_image()
}

/// Resample to exactly `width` x `height` (aspect ratio is not kept).
///
/// Zero sizes are raised to 1. Same-size requests return a copy.
#[must_use = "returns the resized image"]
pub fn resize(image: &Image, width: u32, height: u32, filter: ResizeFilter) -> Image {
    let (width, height) = (width.max(1), height.max(1));
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, filter.to_image_filter())
}

/// Rotate clockwise about the center by `degrees`, keeping dimensions.
///
/// Corners that leave the frame are cut off and uncovered areas become
/// transparent. Multiples of 360 return a copy; multiples of 180 are
/// exact.
#[must_use = "returns the rotated image"]
#[allow(clippy::cast_possible_truncation)]
pub fn rotate(image: &Image, degrees: f64) -> Image {
    let normalized = degrees.rem_euclid(360.0);
    if normalized == 0.0 || normalized == 360.0 {
        return image.clone();
    }
    if normalized == 180.0 {
        return image::imageops::rotate180(image);
    }
    rotate_about_center(
        image,
        normalized.to_radians() as f32,
        Interpolation::Bilinear,
        image::Rgba([0, 0, 0, 0]),
    )
}

/// Mirror along `axis`.
#[must_use = "returns the flipped image"]
pub fn flip(image: &Image, axis: FlipAxis) -> Image {
    match axis {
        FlipAxis::Horizontal => image::imageops::flip_horizontal(image),
        FlipAxis::Vertical => image::imageops::flip_vertical(image),
        FlipAxis::Both => image::imageops::rotate180(image),
    }
}

/// Border widths for [`pad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    /// Rows added above.
    pub top: u32,
    /// Rows added below.
    pub bottom: u32,
    /// Columns added to the left.
    pub left: u32,
    /// Columns added to the right.
    pub right: u32,
}

/// Surround the image with an opaque gray border of level `value`.
#[must_use = "returns the padded image"]
pub fn pad(image: &Image, padding: Padding, value: u8) -> Image {
    if padding == Padding::default() {
        return image.clone();
    }

    let width = image
        .width()
        .saturating_add(padding.left)
        .saturating_add(padding.right);
    let height = image
        .height()
        .saturating_add(padding.top)
        .saturating_add(padding.bottom);

    let mut out = Image::from_pixel(width, height, image::Rgba([value, value, value, u8::MAX]));
    image::imageops::replace(
        &mut out,
        image,
        i64::from(padding.left),
        i64::from(padding.top),
    );
    out
}
