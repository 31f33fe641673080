//! Shared types for the stepchain image pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can hold pipeline images
/// without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` so downstream crates can inspect masks
/// without depending on `image` directly.
pub use image::GrayImage;

/// An image flowing through the pipeline.
///
/// Always 4 channels (R, G, B, A), 8 bits each, row-major. Operations
/// that naturally produce a single channel re-expand to RGBA before
/// returning and leave the alpha channel untouched.
pub type Image = RgbaImage;

/// A per-pixel selector with the same dimensions as the image it
/// accompanies. Nonzero means selected.
pub type Mask = GrayImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of any `image` buffer.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Errors that can occur while editing or running a pipeline.
///
/// Parameter problems (out-of-range or unparsable values) and missing
/// second images are recovered inside the step and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// A mask was handed to a step with an image of different size.
    #[error("mask is {mask} but image is {image}")]
    MaskDimensions {
        /// Dimensions of the offending mask.
        mask: Dimensions,
        /// Dimensions of the image the mask was paired with.
        image: Dimensions,
    },

    /// An operation key did not match any catalog entry.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// A parameter name is not part of the operation's schema.
    #[error("operation {operation} has no parameter named {name:?}")]
    UnknownParameter {
        /// Catalog key of the operation.
        operation: String,
        /// The parameter name that was requested.
        name: String,
    },

    /// The controller was asked to render before an image was opened.
    #[error("no image is open")]
    NoImage,
}
