//! The operation catalog: every image operation a step can wrap.
//!
//! This module defines the [`OperationKind`] enum for selecting an
//! operation at runtime and the [`OperationDescriptor`] each kind resolves
//! to. A descriptor bundles the operation's parameter schema with an
//! [`Apply`] function pointer whose variant says what the operation
//! produces: a new image, a mask, or a combination of two images.
//!
//! # Strategy pattern
//!
//! The enum/descriptor split lets a controller list, name and pick
//! operations from user input while keeping every implementation in this
//! sans-IO crate. A step resolves its descriptor once at construction and
//! never looks the kind up again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combine::{self, ArithmeticOp, LogicOp};
use crate::geometry::{self, FlipAxis, Padding, ResizeFilter};
use crate::mask::{self, ColorRange, Rect};
use crate::params::{ParamSpec, ParamValue, StepParams};
use crate::types::{Dimensions, Image, Mask, PipelineError};
use crate::{blur, edge, grayscale, noise, tone};

/// Largest width or height `resize` accepts.
pub const MAX_RESIZE: i64 = 16_384;

#[allow(clippy::cast_lossless)]
const U32_MAX: i64 = u32::MAX as i64;

/// How an operation is invoked and what it returns.
#[derive(Clone, Copy)]
pub enum Apply {
    /// Produces a new image from the current one.
    Transform(fn(&Image, &StepParams) -> Image),
    /// Produces a mask for the next step, AND-ed with the incoming mask.
    /// The image itself passes through unchanged.
    Mask(fn(&Image, Option<&Mask>, &StepParams) -> Mask),
    /// Combines the current image with the step's second image.
    Combine(fn(&Image, &Image, &StepParams) -> Image),
}

impl fmt::Debug for Apply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transform(_) => "Transform",
            Self::Mask(_) => "Mask",
            Self::Combine(_) => "Combine",
        })
    }
}

/// Static description of one catalog entry.
pub struct OperationDescriptor {
    /// The kind this entry describes.
    pub kind: OperationKind,
    /// Parameter schema, in display order.
    pub params: &'static [ParamSpec],
    /// The operation itself.
    pub apply: Apply,
    /// Re-derives size-dependent parameters for a base image, if any.
    pub fit: Option<fn(&mut StepParams, Dimensions)>,
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("apply", &self.apply)
            .field("fit", &self.fit.is_some())
            .finish()
    }
}

/// Selects which image operation a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Add a constant to every color channel.
    Brightness,
    /// Scale color channels about mid-gray.
    Contrast,
    /// Power-law tone curve.
    Gamma,
    /// Logarithmic tone curve.
    LogTransform,
    /// Invert color channels.
    Negative,
    /// Replace color with luminance.
    Grayscale,
    /// Binarize luminance at a level.
    Threshold,
    /// Histogram equalization per color channel.
    Equalize,
    /// Gaussian smoothing.
    GaussianBlur,
    /// Mean filter.
    BoxBlur,
    /// Median filter.
    MedianBlur,
    /// Unsharp masking.
    Sharpen,
    /// Canny edge map.
    EdgeDetect,
    /// Block averaging.
    Pixelate,
    /// Additive Gaussian noise.
    GaussianNoise,
    /// Random black and white pixels.
    SaltAndPepper,
    /// Cut a rectangle out of the image.
    Crop,
    /// Resample to a new size.
    Resize,
    /// Rotate about the center.
    Rotate,
    /// Mirror along an axis.
    Flip,
    /// Add a solid border.
    Pad,
    /// Select pixels by color range.
    ColorMask,
    /// Select a rectangle.
    RectMask,
    /// Per-channel arithmetic with a second image.
    Arithmetic,
    /// Per-channel bitwise logic with a second image.
    Logic,
}

impl OperationKind {
    /// Every kind, in catalog order.
    pub const ALL: &'static [Self] = &[
        Self::Brightness,
        Self::Contrast,
        Self::Gamma,
        Self::LogTransform,
        Self::Negative,
        Self::Grayscale,
        Self::Threshold,
        Self::Equalize,
        Self::GaussianBlur,
        Self::BoxBlur,
        Self::MedianBlur,
        Self::Sharpen,
        Self::EdgeDetect,
        Self::Pixelate,
        Self::GaussianNoise,
        Self::SaltAndPepper,
        Self::Crop,
        Self::Resize,
        Self::Rotate,
        Self::Flip,
        Self::Pad,
        Self::ColorMask,
        Self::RectMask,
        Self::Arithmetic,
        Self::Logic,
    ];

    /// Stable `snake_case` key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Gamma => "gamma",
            Self::LogTransform => "log_transform",
            Self::Negative => "negative",
            Self::Grayscale => "grayscale",
            Self::Threshold => "threshold",
            Self::Equalize => "equalize",
            Self::GaussianBlur => "gaussian_blur",
            Self::BoxBlur => "box_blur",
            Self::MedianBlur => "median_blur",
            Self::Sharpen => "sharpen",
            Self::EdgeDetect => "edge_detect",
            Self::Pixelate => "pixelate",
            Self::GaussianNoise => "gaussian_noise",
            Self::SaltAndPepper => "salt_and_pepper",
            Self::Crop => "crop",
            Self::Resize => "resize",
            Self::Rotate => "rotate",
            Self::Flip => "flip",
            Self::Pad => "pad",
            Self::ColorMask => "color_mask",
            Self::RectMask => "rect_mask",
            Self::Arithmetic => "arithmetic",
            Self::Logic => "logic",
        }
    }

    /// Human-readable name for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Gamma => "Gamma",
            Self::LogTransform => "Log transform",
            Self::Negative => "Negative",
            Self::Grayscale => "Grayscale",
            Self::Threshold => "Threshold",
            Self::Equalize => "Equalize",
            Self::GaussianBlur => "Gaussian blur",
            Self::BoxBlur => "Box blur",
            Self::MedianBlur => "Median blur",
            Self::Sharpen => "Sharpen",
            Self::EdgeDetect => "Edge detect",
            Self::Pixelate => "Pixelate",
            Self::GaussianNoise => "Gaussian noise",
            Self::SaltAndPepper => "Salt & pepper",
            Self::Crop => "Crop",
            Self::Resize => "Resize",
            Self::Rotate => "Rotate",
            Self::Flip => "Flip",
            Self::Pad => "Pad",
            Self::ColorMask => "Color mask",
            Self::RectMask => "Rectangle mask",
            Self::Arithmetic => "Arithmetic",
            Self::Logic => "Logic",
        }
    }

    /// The catalog entry for this kind.
    #[must_use]
    pub fn descriptor(self) -> &'static OperationDescriptor {
        &CATALOG[self as usize]
    }

    /// Whether this operation produces a mask instead of an image.
    #[must_use]
    pub fn produces_mask(self) -> bool {
        matches!(self.descriptor().apply, Apply::Mask(_))
    }

    /// Whether this operation needs a second image.
    #[must_use]
    pub fn needs_second_image(self) -> bool {
        matches!(self.descriptor().apply, Apply::Combine(_))
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = PipelineError;

    /// Parse a catalog key. Case and `-`/`_` are not significant.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(&key))
            .ok_or_else(|| PipelineError::UnknownOperation(value.to_owned()))
    }
}

// Indexed by `OperationKind as usize`; order must match the enum.
static CATALOG: [OperationDescriptor; 25] = [
    transform(OperationKind::Brightness, BRIGHTNESS, apply_brightness),
    transform(OperationKind::Contrast, CONTRAST, apply_contrast),
    transform(OperationKind::Gamma, GAMMA, apply_gamma),
    transform(OperationKind::LogTransform, LOG_TRANSFORM, apply_log_transform),
    transform(OperationKind::Negative, &[], apply_negative),
    transform(OperationKind::Grayscale, &[], apply_grayscale),
    transform(OperationKind::Threshold, THRESHOLD, apply_threshold),
    transform(OperationKind::Equalize, &[], apply_equalize),
    transform(OperationKind::GaussianBlur, GAUSSIAN_BLUR, apply_gaussian_blur),
    transform(OperationKind::BoxBlur, KERNEL, apply_box_blur),
    transform(OperationKind::MedianBlur, KERNEL, apply_median_blur),
    transform(OperationKind::Sharpen, SHARPEN, apply_sharpen),
    transform(OperationKind::EdgeDetect, EDGE_DETECT, apply_edge_detect),
    transform(OperationKind::Pixelate, PIXELATE, apply_pixelate),
    transform(OperationKind::GaussianNoise, GAUSSIAN_NOISE, apply_gaussian_noise),
    transform(OperationKind::SaltAndPepper, SALT_AND_PEPPER, apply_salt_and_pepper),
    OperationDescriptor {
        fit: Some(fit_region),
        ..transform(OperationKind::Crop, REGION, apply_crop)
    },
    OperationDescriptor {
        fit: Some(fit_resize),
        ..transform(OperationKind::Resize, RESIZE, apply_resize)
    },
    transform(OperationKind::Rotate, ROTATE, apply_rotate),
    transform(OperationKind::Flip, FLIP, apply_flip),
    transform(OperationKind::Pad, PAD, apply_pad),
    OperationDescriptor {
        kind: OperationKind::ColorMask,
        params: COLOR_MASK,
        apply: Apply::Mask(apply_color_mask),
        fit: None,
    },
    OperationDescriptor {
        kind: OperationKind::RectMask,
        params: RECT_MASK,
        apply: Apply::Mask(apply_rect_mask),
        fit: Some(fit_region),
    },
    OperationDescriptor {
        kind: OperationKind::Arithmetic,
        params: ARITHMETIC,
        apply: Apply::Combine(apply_arithmetic),
        fit: None,
    },
    OperationDescriptor {
        kind: OperationKind::Logic,
        params: LOGIC,
        apply: Apply::Combine(apply_logic),
        fit: None,
    },
];

const _: () = assert!(OperationKind::ALL.len() == 25);

const fn transform(
    kind: OperationKind,
    params: &'static [ParamSpec],
    apply: fn(&Image, &StepParams) -> Image,
) -> OperationDescriptor {
    OperationDescriptor {
        kind,
        params,
        apply: Apply::Transform(apply),
        fit: None,
    }
}

// --- Schemas ---

const BRIGHTNESS: &[ParamSpec] = &[ParamSpec::int("amount", -255, 255, 0)];
const CONTRAST: &[ParamSpec] = &[ParamSpec::float("factor", 0.0, 5.0, 1.0)];
const GAMMA: &[ParamSpec] = &[ParamSpec::float("gamma", 0.05, 10.0, 1.0)];
const LOG_TRANSFORM: &[ParamSpec] = &[ParamSpec::float("gain", 0.0, 5.0, 1.0)];
const THRESHOLD: &[ParamSpec] = &[
    ParamSpec::int("level", 0, 255, 128),
    ParamSpec::flag("invert", false),
];
const GAUSSIAN_BLUR: &[ParamSpec] = &[ParamSpec::float("sigma", 0.0, 50.0, 1.0)];
const KERNEL: &[ParamSpec] = &[ParamSpec::odd("kernel_size", 1, 99, 3)];
const SHARPEN: &[ParamSpec] = &[
    ParamSpec::float("sigma", 0.1, 20.0, 1.0),
    ParamSpec::float("amount", 0.0, 10.0, 1.0),
];
const EDGE_DETECT: &[ParamSpec] = &[
    ParamSpec::float("low", 1.0, 1000.0, 50.0),
    ParamSpec::float("high", 1.0, 1000.0, 150.0),
];
const PIXELATE: &[ParamSpec] = &[ParamSpec::even("block_size", 2, 256, 8)];
const GAUSSIAN_NOISE: &[ParamSpec] = &[
    ParamSpec::float("mean", -128.0, 128.0, 0.0),
    ParamSpec::float("stddev", 0.0, 128.0, 10.0),
    ParamSpec::int("seed", -1, U32_MAX, -1),
];
const SALT_AND_PEPPER: &[ParamSpec] = &[
    ParamSpec::float("rate", 0.0, 1.0, 0.05),
    ParamSpec::int("seed", -1, U32_MAX, -1),
];
// Unfitted regions cover the whole image; crop and rect_mask clip.
const REGION: &[ParamSpec] = &[
    ParamSpec::int("x", 0, U32_MAX, 0),
    ParamSpec::int("y", 0, U32_MAX, 0),
    ParamSpec::int("width", 1, U32_MAX, U32_MAX),
    ParamSpec::int("height", 1, U32_MAX, U32_MAX),
];
const RESIZE: &[ParamSpec] = &[
    ParamSpec::int("width", 1, MAX_RESIZE, 256),
    ParamSpec::int("height", 1, MAX_RESIZE, 256),
    ParamSpec::choice("filter", ResizeFilter::NAMES, "triangle"),
];
const ROTATE: &[ParamSpec] = &[ParamSpec::float("degrees", -360.0, 360.0, 0.0)];
const FLIP: &[ParamSpec] = &[ParamSpec::choice("axis", FlipAxis::NAMES, "horizontal")];
const PAD: &[ParamSpec] = &[
    ParamSpec::int("top", 0, 4096, 0),
    ParamSpec::int("bottom", 0, 4096, 0),
    ParamSpec::int("left", 0, 4096, 0),
    ParamSpec::int("right", 0, 4096, 0),
    ParamSpec::int("value", 0, 255, 0),
];
const COLOR_MASK: &[ParamSpec] = &[
    ParamSpec::int("red_min", 0, 255, 0),
    ParamSpec::int("red_max", 0, 255, 255),
    ParamSpec::int("green_min", 0, 255, 0),
    ParamSpec::int("green_max", 0, 255, 255),
    ParamSpec::int("blue_min", 0, 255, 0),
    ParamSpec::int("blue_max", 0, 255, 255),
    ParamSpec::flag("invert", false),
];
const RECT_MASK: &[ParamSpec] = &[
    ParamSpec::int("x", 0, U32_MAX, 0),
    ParamSpec::int("y", 0, U32_MAX, 0),
    ParamSpec::int("width", 1, U32_MAX, U32_MAX),
    ParamSpec::int("height", 1, U32_MAX, U32_MAX),
    ParamSpec::flag("invert", false),
];
const ARITHMETIC: &[ParamSpec] = &[
    ParamSpec::choice("op", ArithmeticOp::NAMES, "add"),
    ParamSpec::float("weight", 0.0, 1.0, 0.5),
];
const LOGIC: &[ParamSpec] = &[ParamSpec::choice("op", LogicOp::NAMES, "and")];

// --- Size fitting ---

fn fit_region(params: &mut StepParams, dimensions: Dimensions) {
    params.set("x", ParamValue::Int(0));
    params.set("y", ParamValue::Int(0));
    params.set("width", ParamValue::Int(i64::from(dimensions.width)));
    params.set("height", ParamValue::Int(i64::from(dimensions.height)));
}

fn fit_resize(params: &mut StepParams, dimensions: Dimensions) {
    params.set("width", ParamValue::Int(i64::from(dimensions.width)));
    params.set("height", ParamValue::Int(i64::from(dimensions.height)));
}

// --- Adapters ---

fn channel_value(p: &StepParams, name: &str) -> u8 {
    u8::try_from(p.int(name).clamp(0, 255)).unwrap_or(u8::MAX)
}

#[allow(clippy::cast_possible_truncation)]
fn float32(p: &StepParams, name: &str) -> f32 {
    p.float(name) as f32
}

fn apply_brightness(image: &Image, p: &StepParams) -> Image {
    tone::brightness(image, i32::try_from(p.int("amount")).unwrap_or(0))
}

fn apply_contrast(image: &Image, p: &StepParams) -> Image {
    tone::contrast(image, p.float("factor"))
}

fn apply_gamma(image: &Image, p: &StepParams) -> Image {
    tone::gamma(image, p.float("gamma"))
}

fn apply_log_transform(image: &Image, p: &StepParams) -> Image {
    tone::log_transform(image, p.float("gain"))
}

fn apply_negative(image: &Image, _: &StepParams) -> Image {
    tone::negative(image)
}

fn apply_grayscale(image: &Image, _: &StepParams) -> Image {
    grayscale::grayscale(image)
}

fn apply_threshold(image: &Image, p: &StepParams) -> Image {
    tone::threshold(image, channel_value(p, "level"), p.flag("invert"))
}

fn apply_equalize(image: &Image, _: &StepParams) -> Image {
    tone::equalize(image)
}

fn apply_gaussian_blur(image: &Image, p: &StepParams) -> Image {
    blur::gaussian_blur_rgba(image, float32(p, "sigma"))
}

fn apply_box_blur(image: &Image, p: &StepParams) -> Image {
    blur::box_blur(image, p.uint("kernel_size"))
}

fn apply_median_blur(image: &Image, p: &StepParams) -> Image {
    blur::median_blur(image, p.uint("kernel_size"))
}

fn apply_sharpen(image: &Image, p: &StepParams) -> Image {
    blur::sharpen(image, float32(p, "sigma"), float32(p, "amount"))
}

fn apply_edge_detect(image: &Image, p: &StepParams) -> Image {
    edge::edge_detect(image, float32(p, "low"), float32(p, "high"))
}

fn apply_pixelate(image: &Image, p: &StepParams) -> Image {
    blur::pixelate(image, p.uint("block_size"))
}

fn apply_gaussian_noise(image: &Image, p: &StepParams) -> Image {
    let seed = noise::resolve_seed(p.int("seed"));
    noise::gaussian_noise(image, p.float("mean"), p.float("stddev"), seed)
}

fn apply_salt_and_pepper(image: &Image, p: &StepParams) -> Image {
    let seed = noise::resolve_seed(p.int("seed"));
    noise::salt_and_pepper(image, p.float("rate"), seed)
}

fn apply_crop(image: &Image, p: &StepParams) -> Image {
    let rect = region(p);
    geometry::crop(image, rect.x, rect.y, rect.width, rect.height)
}

fn apply_resize(image: &Image, p: &StepParams) -> Image {
    let filter = p.choice("filter").parse().unwrap_or_default();
    geometry::resize(image, p.uint("width"), p.uint("height"), filter)
}

fn apply_rotate(image: &Image, p: &StepParams) -> Image {
    geometry::rotate(image, p.float("degrees"))
}

fn apply_flip(image: &Image, p: &StepParams) -> Image {
    geometry::flip(image, p.choice("axis").parse().unwrap_or_default())
}

fn apply_pad(image: &Image, p: &StepParams) -> Image {
    let padding = Padding {
        top: p.uint("top"),
        bottom: p.uint("bottom"),
        left: p.uint("left"),
        right: p.uint("right"),
    };
    geometry::pad(image, padding, channel_value(p, "value"))
}

fn apply_color_mask(image: &Image, incoming: Option<&Mask>, p: &StepParams) -> Mask {
    let range = ColorRange {
        min: [
            channel_value(p, "red_min"),
            channel_value(p, "green_min"),
            channel_value(p, "blue_min"),
        ],
        max: [
            channel_value(p, "red_max"),
            channel_value(p, "green_max"),
            channel_value(p, "blue_max"),
        ],
    };
    and_incoming(mask::color_mask(image, &range, p.flag("invert")), incoming)
}

fn apply_rect_mask(image: &Image, incoming: Option<&Mask>, p: &StepParams) -> Mask {
    let produced = mask::rect_mask(Dimensions::of(image), region(p), p.flag("invert"));
    and_incoming(produced, incoming)
}

fn apply_arithmetic(image: &Image, second: &Image, p: &StepParams) -> Image {
    let op = p.choice("op").parse().unwrap_or_default();
    combine::arithmetic(image, second, op, p.float("weight"))
}

fn apply_logic(image: &Image, second: &Image, p: &StepParams) -> Image {
    combine::logic(image, second, p.choice("op").parse().unwrap_or_default())
}

fn region(p: &StepParams) -> Rect {
    Rect {
        x: p.uint("x"),
        y: p.uint("y"),
        width: p.uint("width"),
        height: p.uint("height"),
    }
}

fn and_incoming(produced: Mask, incoming: Option<&Mask>) -> Mask {
    match incoming {
        Some(incoming) => mask::intersect(&produced, incoming),
        None => produced,
    }
}
