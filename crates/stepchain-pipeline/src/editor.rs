//! Single-threaded controller: a base image, a pipeline, and the output.
//!
//! Every edit goes through [`Editor`], which re-runs the whole pipeline
//! from the base image once per change. A failed run leaves the previous
//! output in place and reports the error to the caller.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::OperationKind;
use crate::params::ParamValue;
use crate::pipeline::Pipeline;
use crate::step::{Step, StepId};
use crate::types::{Dimensions, Image, PipelineError};

/// Owns the base image and pipeline and keeps the output current.
///
/// Edit methods return `Ok(false)` when they name a step that is not in
/// the pipeline; nothing is re-run in that case. Without an open image,
/// edits only change the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Editor {
    base: Option<Arc<Image>>,
    pipeline: Pipeline,
    output: Option<Arc<Image>>,
    last_error: Option<PipelineError>,
}

impl Editor {
    /// An editor with no image and an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a new base image. The pipeline is cleared and the output
    /// becomes the image itself.
    pub fn open_image(&mut self, image: Image) {
        info!(dimensions = %Dimensions::of(&image), "opened image");
        let base = Arc::new(image);
        self.pipeline.clear();
        self.output = Some(Arc::clone(&base));
        self.base = Some(base);
        self.last_error = None;
    }

    /// The base image, if one is open.
    #[must_use]
    pub fn base(&self) -> Option<&Image> {
        self.base.as_deref()
    }

    /// The result of the last successful run.
    #[must_use]
    pub fn output(&self) -> Option<&Image> {
        self.output.as_deref()
    }

    /// The pipeline being edited.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The error from the most recent run, cleared by the next success.
    #[must_use]
    pub const fn last_error(&self) -> Option<&PipelineError> {
        self.last_error.as_ref()
    }

    /// Append a new step for `kind`, fitted to the base image.
    ///
    /// # Errors
    ///
    /// Returns the run error if re-running fails. The step stays in the
    /// pipeline.
    pub fn add_step(&mut self, kind: OperationKind) -> Result<StepId, PipelineError> {
        let mut step = Step::new(kind);
        if let Some(base) = &self.base {
            step.fit_to(Dimensions::of(base.as_ref()));
        }
        let id = self.pipeline.add_step(step);
        self.rerun()?;
        Ok(id)
    }

    /// Remove step `id`.
    ///
    /// # Errors
    ///
    /// Returns the run error if re-running fails.
    pub fn remove_step(&mut self, id: StepId) -> Result<bool, PipelineError> {
        let removed = self.pipeline.remove_step(id).is_some();
        self.rerun_if(removed)
    }

    /// Move step `id` to `new_index`.
    ///
    /// # Errors
    ///
    /// Returns the run error if re-running fails.
    pub fn move_step(&mut self, id: StepId, new_index: usize) -> Result<bool, PipelineError> {
        let moved = self.pipeline.move_step(id, new_index);
        self.rerun_if(moved)
    }

    /// Enable or disable step `id`.
    ///
    /// # Errors
    ///
    /// Returns the run error if re-running fails.
    pub fn set_enabled(&mut self, id: StepId, enabled: bool) -> Result<bool, PipelineError> {
        let Some(step) = self.pipeline.step_mut(id) else {
            return Ok(false);
        };
        step.set_enabled(enabled);
        self.rerun_if(true)
    }

    /// Set a parameter of step `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if the step has no such
    /// parameter, or the run error if re-running fails.
    pub fn set_param(
        &mut self,
        id: StepId,
        name: &str,
        value: ParamValue,
    ) -> Result<bool, PipelineError> {
        let Some(step) = self.pipeline.step_mut(id) else {
            return Ok(false);
        };
        step.set_param(name, value)?;
        self.rerun_if(true)
    }

    /// Set a parameter of step `id` from raw user text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if the step has no such
    /// parameter, or the run error if re-running fails.
    pub fn set_param_str(&mut self, id: StepId, name: &str, raw: &str) -> Result<bool, PipelineError> {
        let Some(step) = self.pipeline.step_mut(id) else {
            return Ok(false);
        };
        step.set_param_str(name, raw)?;
        self.rerun_if(true)
    }

    /// Provide (or remove) the second image of step `id`.
    ///
    /// # Errors
    ///
    /// Returns the run error if re-running fails.
    pub fn set_second_image(
        &mut self,
        id: StepId,
        image: Option<Arc<Image>>,
    ) -> Result<bool, PipelineError> {
        let Some(step) = self.pipeline.step_mut(id) else {
            return Ok(false);
        };
        step.set_second_image(image);
        self.rerun_if(true)
    }

    /// Remove every step. The output returns to the base image.
    ///
    /// # Errors
    ///
    /// Returns the run error if re-running fails.
    pub fn clear(&mut self) -> Result<(), PipelineError> {
        self.pipeline.clear();
        self.rerun()
    }

    /// Re-run the pipeline explicitly and return the new output.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoImage`] if no image is open, or the run
    /// error if the run fails.
    pub fn render(&mut self) -> Result<&Image, PipelineError> {
        let base = self.base.clone().ok_or(PipelineError::NoImage)?;
        let result = self.pipeline.run(&base);
        self.commit(result)?;
        self.output.as_deref().ok_or(PipelineError::NoImage)
    }

    fn rerun_if(&mut self, changed: bool) -> Result<bool, PipelineError> {
        if changed {
            self.rerun()?;
        }
        Ok(changed)
    }

    fn rerun(&mut self) -> Result<(), PipelineError> {
        let Some(base) = self.base.clone() else {
            return Ok(());
        };
        let result = self.pipeline.run(&base);
        self.commit(result)
    }

    fn commit(&mut self, result: Result<Image, PipelineError>) -> Result<(), PipelineError> {
        match result {
            Ok(image) => {
                self.output = Some(Arc::new(image));
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "run failed, keeping previous output");
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }
}
