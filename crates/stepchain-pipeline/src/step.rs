//! One configured operation within a pipeline.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Apply, OperationDescriptor, OperationKind};
use crate::mask;
use crate::params::{ParamValue, StepParams};
use crate::types::{Dimensions, Image, Mask, PipelineError};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a [`Step`], unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(u64);

impl StepId {
    /// Allocate a new identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a step handed back: an image, or an image plus a mask meant for
/// the next step only.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Execution {
    /// A new image; any pending mask is consumed.
    Image(Image),
    /// The (unchanged) image and a freshly produced mask.
    Masked {
        /// The image, passed through.
        image: Image,
        /// The mask for the next step.
        mask: Mask,
    },
}

impl Execution {
    /// The resulting image.
    #[must_use]
    pub const fn image(&self) -> &Image {
        match self {
            Self::Image(image) | Self::Masked { image, .. } => image,
        }
    }

    /// The produced mask, if any.
    #[must_use]
    pub const fn mask(&self) -> Option<&Mask> {
        match self {
            Self::Image(_) => None,
            Self::Masked { mask, .. } => Some(mask),
        }
    }

    /// Split into the image and the optional mask.
    #[must_use]
    pub fn into_parts(self) -> (Image, Option<Mask>) {
        match self {
            Self::Image(image) => (image, None),
            Self::Masked { image, mask } => (image, Some(mask)),
        }
    }
}

/// An operation from the catalog together with its parameters and
/// activation flag.
///
/// The operation is resolved once in [`Step::new`]. Parameters stay
/// mutable for the step's whole lifetime; every setter validates against
/// the operation's schema.
#[derive(Debug, Clone)]
pub struct Step {
    id: StepId,
    enabled: bool,
    descriptor: &'static OperationDescriptor,
    params: StepParams,
}

impl Step {
    /// A new enabled step with default parameters and a fresh identity.
    #[must_use]
    pub fn new(kind: OperationKind) -> Self {
        let descriptor = kind.descriptor();
        Self {
            id: StepId::next(),
            enabled: true,
            descriptor,
            params: StepParams::defaults(descriptor.params),
        }
    }

    /// Builder form of [`set_param`](Self::set_param).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if `name` is not part of
    /// the operation's schema.
    pub fn with_param(mut self, name: &str, value: ParamValue) -> Result<Self, PipelineError> {
        self.set_param(name, value)?;
        Ok(self)
    }

    /// This step's identity.
    #[must_use]
    pub const fn id(&self) -> StepId {
        self.id
    }

    pub(crate) fn reassign_id(&mut self) -> StepId {
        self.id = StepId::next();
        self.id
    }

    /// The wrapped operation.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.descriptor.kind
    }

    /// Human-readable operation name.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.descriptor.kind.label()
    }

    /// Whether the step takes part in a run.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the step.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Current parameter values.
    #[must_use]
    pub const fn params(&self) -> &StepParams {
        &self.params
    }

    /// Set a parameter. Out-of-range or wrong-typed values are clamped or
    /// replaced by the declared default; the stored value is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if `name` is not part of
    /// the operation's schema.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<ParamValue, PipelineError> {
        let kind = self.kind();
        self.params
            .set(name, value)
            .cloned()
            .ok_or_else(|| unknown_parameter(kind, name))
    }

    /// Set a parameter from raw user text. Text that does not parse
    /// yields the declared default; the stored value is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if `name` is not part of
    /// the operation's schema.
    pub fn set_param_str(&mut self, name: &str, raw: &str) -> Result<ParamValue, PipelineError> {
        let kind = self.kind();
        self.params
            .set_str(name, raw)
            .cloned()
            .ok_or_else(|| unknown_parameter(kind, name))
    }

    /// Provide (or remove) the second image for combining operations.
    /// Other operations ignore it.
    pub fn set_second_image(&mut self, image: Option<Arc<Image>>) {
        self.params.set_second_image(image);
    }

    /// Re-derive size-dependent parameter values for a base image of the
    /// given size. Operations without such parameters are unaffected.
    pub fn fit_to(&mut self, dimensions: Dimensions) {
        if let Some(fit) = self.descriptor.fit {
            fit(&mut self.params, dimensions);
        }
    }

    /// Run the operation on `image`, restricted to `mask` if one is given.
    ///
    /// - Transforms return the new image. With a mask, pixels outside the
    ///   selection keep their original value, unless the transform
    ///   changed the image size, in which case the mask is ignored.
    /// - Mask producers return the image unchanged plus a mask AND-ed
    ///   with the incoming one.
    /// - Combining operations without a second image, or with one of a
    ///   different size, return the image unchanged.
    ///
    /// A zero-area image is always passed through.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MaskDimensions`] if `mask` does not have
    /// the same dimensions as `image`.
    pub fn execute(&self, image: &Image, mask: Option<&Mask>) -> Result<Execution, PipelineError> {
        let dimensions = Dimensions::of(image);
        if let Some(mask) = mask {
            let mask_dimensions = Dimensions::of(mask);
            if mask_dimensions != dimensions {
                return Err(PipelineError::MaskDimensions {
                    mask: mask_dimensions,
                    image: dimensions,
                });
            }
        }

        if dimensions.is_empty() {
            debug!(step = %self.id, "empty image, passing through");
            return Ok(Execution::Image(image.clone()));
        }

        match self.descriptor.apply {
            Apply::Transform(apply) => {
                let transformed = apply(image, &self.params);
                Ok(Execution::Image(restrict(image, transformed, mask)))
            }
            Apply::Mask(apply) => Ok(Execution::Masked {
                image: image.clone(),
                mask: apply(image, mask, &self.params),
            }),
            Apply::Combine(apply) => match self.params.second_image() {
                Some(second) if Dimensions::of(second) == dimensions => {
                    let combined = apply(image, second, &self.params);
                    Ok(Execution::Image(restrict(image, combined, mask)))
                }
                Some(second) => {
                    debug!(
                        step = %self.id,
                        second = %Dimensions::of(second),
                        image = %dimensions,
                        "second image size differs, passing through"
                    );
                    Ok(Execution::Image(image.clone()))
                }
                None => {
                    debug!(step = %self.id, "no second image, passing through");
                    Ok(Execution::Image(image.clone()))
                }
            },
        }
    }
}

/// Limit `transformed` to the pixels `mask` selects.
fn restrict(original: &Image, transformed: Image, mask: Option<&Mask>) -> Image {
    match mask {
        Some(mask) if transformed.dimensions() == original.dimensions() => {
            mask::blend(original, &transformed, mask)
        }
        _ => transformed,
    }
}

fn unknown_parameter(kind: OperationKind, name: &str) -> PipelineError {
    PipelineError::UnknownParameter {
        operation: kind.name().to_owned(),
        name: name.to_owned(),
    }
}
