//! stepchain-pipeline: editable image-processing step chains (sans-IO).
//!
//! An image is folded through an ordered list of [`Step`]s, each wrapping
//! one operation from a fixed [catalog](catalog): tone curves, blurs,
//! noise, geometric transforms, masks, two-image arithmetic. The chain is
//! re-run from the base image after every edit:
//!
//! ```text
//! base image -> step 1 -> step 2 -> ... -> step n -> output
//!                  \_ mask _/
//! ```
//!
//! A mask-producing step hands a [`Mask`] to the step right after it,
//! and to no other. Disabled steps pass the image through untouched and
//! drop any pending mask.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! [`Image`] buffers. Decoding, encoding and the command line live in
//! `stepchain-cli`.
//!
//! # Layers
//!
//! - [`catalog`], [`params`]: what operations exist and how their
//!   parameters are validated.
//! - [`step`], [`pipeline`]: one configured operation, and the ordered
//!   chain with its run fold.
//! - [`editor`], [`shared`]: controllers that own a base image and keep
//!   the output current.
//! - [`diagnostics`]: per-step timing and mask hand-off records.
//!
//! The remaining modules are the operation library the catalog calls.

pub mod blur;
pub mod catalog;
pub mod channels;
pub mod combine;
pub mod diagnostics;
pub mod edge;
pub mod editor;
pub mod geometry;
pub mod grayscale;
pub mod mask;
pub mod noise;
pub mod params;
pub mod pipeline;
pub mod shared;
pub mod step;
pub mod tone;
pub mod types;

pub use catalog::{Apply, OperationDescriptor, OperationKind};
pub use diagnostics::{Clock, RunDiagnostics, StepDiagnostics, StepOutcome};
pub use editor::Editor;
pub use params::{ParamKind, ParamSpec, ParamValue, StepParams};
pub use pipeline::Pipeline;
pub use shared::{RenderOutcome, SharedEditor};
pub use step::{Execution, Step, StepId};
pub use types::{Dimensions, GrayImage, Image, Mask, PipelineError, RgbaImage};
