//! The ordered step list and the run fold.
//!
//! A [`Pipeline`] owns its steps; insertion order is execution order.
//! [`Pipeline::run`] re-evaluates the whole chain from the given image on
//! every call. Nothing is cached between calls.
//!
//! # Mask hand-off
//!
//! A single mask slot travels with the image. A mask-producing step fills
//! it, and the slot is emptied after every other step, so a mask is
//! visible to the immediately following step only:
//!
//! ```text
//! mask := none
//! for step in steps:
//!     if step is enabled:
//!         match step.execute(image, mask):
//!             Masked { image', mask' } => image := image'; mask := mask'
//!             Image(image')            => image := image'; mask := none
//!     else:
//!         mask := none
//! ```
//!
//! A disabled step leaves the image untouched but still discards a
//! pending mask, so a mask never reaches further than it would if the
//! step had run.

use tracing::{debug, trace};

use crate::diagnostics::{Clock, Recorder, RunDiagnostics};
use crate::step::{Execution, Step, StepId};
use crate::types::{Dimensions, Image, Mask, PipelineError};

/// Hooks called while [`Pipeline`] folds an image through its steps.
pub(crate) trait RunObserver {
    /// A disabled step was passed over.
    fn skipped(&mut self, step: &Step, pending_mask: bool, dimensions: Dimensions);
    /// An enabled step is about to execute.
    fn started(&mut self, step: &Step);
    /// An enabled step executed successfully.
    fn finished(&mut self, step: &Step, received_mask: bool, execution: &Execution);
}

impl RunObserver for () {
    fn skipped(&mut self, _: &Step, _: bool, _: Dimensions) {}
    fn started(&mut self, _: &Step) {}
    fn finished(&mut self, _: &Step, _: bool, _: &Execution) {}
}

/// An ordered, editable chain of [`Step`]s.
///
/// No two steps share a [`StepId`]. Structural edits that name a step
/// which is not present are no-ops.
///
/// # Example
///
/// ```
/// use stepchain_pipeline::{Image, OperationKind, ParamValue, Pipeline, Step};
///
/// # fn main() -> Result<(), stepchain_pipeline::PipelineError> {
/// let mut pipeline = Pipeline::new();
/// pipeline.add_step(Step::new(OperationKind::Brightness).with_param("amount", ParamValue::Int(20))?);
///
/// let image = Image::from_pixel(2, 2, image::Rgba([128, 128, 128, 255]));
/// let output = pipeline.run(&image)?;
/// assert_eq!(output.get_pixel(0, 0).0, [148, 148, 148, 255]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// An empty pipeline.
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append `step`, returning its identity.
    ///
    /// A step whose identity is already present (for example a clone of
    /// one of this pipeline's steps) is given a fresh one first.
    pub fn add_step(&mut self, mut step: Step) -> StepId {
        if self.position(step.id()).is_some() {
            let old = step.id();
            let new = step.reassign_id();
            debug!(%old, %new, "duplicate step identity, reassigned");
        }
        let id = step.id();
        self.steps.push(step);
        id
    }

    /// Remove the step with identity `id`, returning it. Returns `None`
    /// and leaves the pipeline unchanged if no such step exists.
    pub fn remove_step(&mut self, id: StepId) -> Option<Step> {
        let index = self.position(id)?;
        Some(self.steps.remove(index))
    }

    /// Move the step with identity `id` to `new_index`.
    ///
    /// The step is removed first and reinserted at `new_index` within the
    /// shortened list; an index past the end appends. Returns `false`
    /// and leaves the pipeline unchanged if no such step exists.
    pub fn move_step(&mut self, id: StepId, new_index: usize) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let step = self.steps.remove(index);
        let new_index = new_index.min(self.steps.len());
        self.steps.insert(new_index, step);
        true
    }

    /// Remove every step.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Number of steps.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The step with identity `id`.
    #[must_use]
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id() == id)
    }

    /// Mutable access to the step with identity `id`.
    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id() == id)
    }

    /// Index of the step with identity `id`.
    #[must_use]
    pub fn position(&self, id: StepId) -> Option<usize> {
        self.steps.iter().position(|s| s.id() == id)
    }

    /// Identities in execution order.
    pub fn ids(&self) -> impl Iterator<Item = StepId> + '_ {
        self.steps.iter().map(Step::id)
    }

    /// Fold `image` through every step and return the result.
    ///
    /// An empty pipeline returns a copy of `image`.
    ///
    /// # Errors
    ///
    /// Returns the first error a step reports; no partial output is
    /// produced.
    pub fn run(&self, image: &Image) -> Result<Image, PipelineError> {
        self.fold(image, &mut ())
    }

    /// Like [`run`](Self::run), also recording per-step diagnostics with
    /// times read from `clock`.
    ///
    /// # Errors
    ///
    /// Returns the first error a step reports.
    pub fn run_with_diagnostics<C: Clock>(
        &self,
        image: &Image,
        clock: &C,
    ) -> Result<(Image, RunDiagnostics), PipelineError> {
        let start = clock.now();
        let mut recorder = Recorder::new(clock);
        let output = self.fold(image, &mut recorder)?;
        let diagnostics = recorder.finish(
            clock.elapsed(&start),
            Dimensions::of(image),
            Dimensions::of(&output),
        );
        Ok((output, diagnostics))
    }

    fn fold(&self, image: &Image, observer: &mut impl RunObserver) -> Result<Image, PipelineError> {
        let mut current = image.clone();
        let mut mask: Option<Mask> = None;

        for step in &self.steps {
            if !step.is_enabled() {
                let pending = mask.take().is_some();
                if pending {
                    trace!(step = %step.id(), "disabled step discarded pending mask");
                }
                observer.skipped(step, pending, Dimensions::of(&current));
                continue;
            }

            debug!(
                step = %step.id(),
                operation = %step.kind(),
                masked = mask.is_some(),
                "executing step"
            );
            observer.started(step);
            let execution = step.execute(&current, mask.as_ref())?;
            observer.finished(step, mask.is_some(), &execution);

            let (image, produced) = execution.into_parts();
            if produced.is_some() {
                trace!(step = %step.id(), "mask handed to next step");
            }
            current = image;
            mask = produced;
        }

        Ok(current)
    }
}
