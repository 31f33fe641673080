//! Thread-safe controller for callers that render off the edit thread.
//!
//! Edits are cheap and happen under a [`Mutex`]. Each one bumps a
//! generation counter. [`SharedEditor::render`] snapshots the pipeline,
//! base image, and generation, runs outside the lock, and commits only if
//! no edit arrived in the meantime. A render that lost the race reports
//! [`RenderOutcome::Stale`]; its result is discarded and the caller starts
//! a fresh render.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::catalog::OperationKind;
use crate::params::ParamValue;
use crate::pipeline::Pipeline;
use crate::step::{Step, StepId};
use crate::types::{Dimensions, Image, PipelineError};

/// Result of [`SharedEditor::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum RenderOutcome {
    /// The run finished and its output is now current.
    Rendered(Arc<Image>),
    /// An edit arrived while the run was in flight; the result was
    /// discarded.
    Stale,
}

#[derive(Debug, Default)]
struct State {
    base: Option<Arc<Image>>,
    pipeline: Pipeline,
    output: Option<Arc<Image>>,
    last_error: Option<PipelineError>,
    generation: u64,
}

impl State {
    const fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// A controller that can be shared between threads.
///
/// Unlike [`Editor`](crate::Editor), edits do not run the pipeline; call
/// [`render`](Self::render) (typically from a worker thread) after
/// editing.
#[derive(Debug, Default)]
pub struct SharedEditor {
    state: Mutex<State>,
}

impl SharedEditor {
    /// An editor with no image and an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a new base image, clearing the pipeline. The output becomes
    /// the image itself.
    pub fn open_image(&self, image: Image) {
        info!(dimensions = %Dimensions::of(&image), "opened image");
        let base = Arc::new(image);
        let mut state = self.lock();
        state.pipeline.clear();
        state.output = Some(Arc::clone(&base));
        state.base = Some(base);
        state.last_error = None;
        state.bump();
    }

    /// The current generation. Every edit increments it.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// The result of the last committed render.
    #[must_use]
    pub fn output(&self) -> Option<Arc<Image>> {
        self.lock().output.clone()
    }

    /// The error from the most recent committed render.
    #[must_use]
    pub fn last_error(&self) -> Option<PipelineError> {
        self.lock().last_error.clone()
    }

    /// A copy of the pipeline as it is now.
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        self.lock().pipeline.clone()
    }

    /// Apply an arbitrary edit to the pipeline.
    ///
    /// The generation is bumped whether or not `edit` changed anything.
    pub fn edit<R>(&self, edit: impl FnOnce(&mut Pipeline) -> R) -> R {
        let mut state = self.lock();
        state.bump();
        edit(&mut state.pipeline)
    }

    /// Append a new step for `kind`, fitted to the base image.
    pub fn add_step(&self, kind: OperationKind) -> StepId {
        let mut step = Step::new(kind);
        let mut state = self.lock();
        if let Some(base) = &state.base {
            step.fit_to(Dimensions::of(base.as_ref()));
        }
        state.bump();
        state.pipeline.add_step(step)
    }

    /// Remove step `id`. Returns `false` if it is not present.
    pub fn remove_step(&self, id: StepId) -> bool {
        let mut state = self.lock();
        let removed = state.pipeline.remove_step(id).is_some();
        if removed {
            state.bump();
        }
        removed
    }

    /// Move step `id` to `new_index`. Returns `false` if it is not present.
    pub fn move_step(&self, id: StepId, new_index: usize) -> bool {
        let mut state = self.lock();
        let moved = state.pipeline.move_step(id, new_index);
        if moved {
            state.bump();
        }
        moved
    }

    /// Enable or disable step `id`. Returns `false` if it is not present.
    pub fn set_enabled(&self, id: StepId, enabled: bool) -> bool {
        self.edit_step(id, |step| step.set_enabled(enabled)).is_some()
    }

    /// Set a parameter of step `id`. Returns `Ok(false)` if the step is
    /// not present.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if the step has no such
    /// parameter.
    pub fn set_param(&self, id: StepId, name: &str, value: ParamValue) -> Result<bool, PipelineError> {
        self.edit_step(id, |step| step.set_param(name, value))
            .transpose()
            .map(|stored| stored.is_some())
    }

    /// Set a parameter of step `id` from raw user text. Returns
    /// `Ok(false)` if the step is not present.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if the step has no such
    /// parameter.
    pub fn set_param_str(&self, id: StepId, name: &str, raw: &str) -> Result<bool, PipelineError> {
        self.edit_step(id, |step| step.set_param_str(name, raw))
            .transpose()
            .map(|stored| stored.is_some())
    }

    /// Provide (or remove) the second image of step `id`. Returns `false`
    /// if the step is not present.
    pub fn set_second_image(&self, id: StepId, image: Option<Arc<Image>>) -> bool {
        self.edit_step(id, |step| step.set_second_image(image)).is_some()
    }

    /// Remove every step.
    pub fn clear(&self) {
        self.edit(Pipeline::clear);
    }

    /// Run the pipeline on a snapshot and commit the result if it is
    /// still current.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoImage`] if no image is open, or the run
    /// error. A failed run that is still current keeps the previous
    /// output and is remembered as [`last_error`](Self::last_error).
    pub fn render(&self) -> Result<RenderOutcome, PipelineError> {
        self.render_with(|| {})
    }

    /// Render until a run commits, restarting after every stale result.
    ///
    /// # Errors
    ///
    /// As for [`render`](Self::render).
    pub fn render_latest(&self) -> Result<Arc<Image>, PipelineError> {
        loop {
            if let RenderOutcome::Rendered(image) = self.render()? {
                return Ok(image);
            }
        }
    }

    /// [`render`](Self::render) with a hook that runs after the snapshot
    /// is taken and before the result is committed.
    fn render_with(&self, in_flight: impl FnOnce()) -> Result<RenderOutcome, PipelineError> {
        let (pipeline, base, generation) = {
            let state = self.lock();
            let base = state.base.clone().ok_or(PipelineError::NoImage)?;
            (state.pipeline.clone(), base, state.generation)
        };

        let result = pipeline.run(&base);
        in_flight();

        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                started = generation,
                current = state.generation,
                "discarding stale render"
            );
            return Ok(RenderOutcome::Stale);
        }

        match result {
            Ok(image) => {
                let image = Arc::new(image);
                state.output = Some(Arc::clone(&image));
                state.last_error = None;
                Ok(RenderOutcome::Rendered(image))
            }
            Err(e) => {
                warn!(error = %e, "run failed, keeping previous output");
                state.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn edit_step<R>(&self, id: StepId, edit: impl FnOnce(&mut Step) -> R) -> Option<R> {
        let mut state = self.lock();
        let step = state.pipeline.step_mut(id)?;
        let result = edit(step);
        state.bump();
        Some(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gray(v: u8) -> Image {
        Image::from_pixel(2, 2, image::Rgba([v, v, v, 255]))
    }

    fn opened(v: u8) -> SharedEditor {
        let editor = SharedEditor::new();
        editor.open_image(gray(v));
        editor
    }

    #[test]
    fn is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedEditor>();
    }

    #[test]
    fn render_without_image_fails() {
        assert_eq!(SharedEditor::new().render(), Err(PipelineError::NoImage));
    }

    #[test]
    fn render_commits_output() {
        let editor = opened(100);
        let id = editor.add_step(OperationKind::Brightness);
        assert!(editor.set_param(id, "amount", ParamValue::Int(20)).unwrap());
        assert_eq!(editor.render(), Ok(RenderOutcome::Rendered(Arc::new(gray(120)))));
        assert_eq!(editor.output().as_deref(), Some(&gray(120)));
    }

    #[test]
    fn edits_bump_generation() {
        let editor = opened(0);
        let g0 = editor.generation();
        let id = editor.add_step(OperationKind::Negative);
        assert!(editor.set_enabled(id, false));
        assert!(editor.move_step(id, 0));
        assert!(editor.remove_step(id));
        assert_eq!(editor.generation(), g0 + 4);
    }

    #[test]
    fn unknown_id_does_not_bump_generation() {
        let editor = opened(0);
        let g0 = editor.generation();
        let stranger = Step::new(OperationKind::Negative).id();
        assert!(!editor.remove_step(stranger));
        assert!(!editor.move_step(stranger, 3));
        assert!(!editor.set_enabled(stranger, true));
        assert!(!editor.set_param(stranger, "amount", ParamValue::Int(1)).unwrap());
        assert!(!editor.set_param_str(stranger, "amount", "1").unwrap());
        assert!(!editor.set_second_image(stranger, None));
        assert_eq!(editor.generation(), g0);
    }

    #[test]
    fn unknown_parameter_is_reported() {
        let editor = opened(0);
        let id = editor.add_step(OperationKind::Negative);
        assert!(editor.set_param_str(id, "amount", "1").is_err());
    }

    #[test]
    fn edit_during_render_is_stale() {
        let editor = opened(100);
        let id = editor.add_step(OperationKind::Brightness);
        assert!(editor.set_param(id, "amount", ParamValue::Int(10)).unwrap());

        let outcome = editor
            .render_with(|| {
                editor.set_param(id, "amount", ParamValue::Int(50)).unwrap();
            })
            .unwrap();
        assert_eq!(outcome, RenderOutcome::Stale);
        assert_eq!(editor.output().as_deref(), Some(&gray(100)));

        let image = editor.render_latest().unwrap();
        assert_eq!(*image, gray(150));
    }

    #[test]
    fn renders_from_another_thread() {
        let editor = opened(10);
        let id = editor.add_step(OperationKind::Brightness);
        editor.set_param(id, "amount", ParamValue::Int(5)).unwrap();

        let rendered = std::thread::scope(|s| s.spawn(|| editor.render_latest()).join().unwrap());
        assert_eq!(*rendered.unwrap(), gray(15));
        assert_eq!(editor.output().as_deref(), Some(&gray(15)));
    }

    #[test]
    fn clear_bumps_generation() {
        let editor = opened(10);
        editor.add_step(OperationKind::Negative);
        let g = editor.generation();
        editor.clear();
        assert!(editor.pipeline().is_empty());
        assert_eq!(editor.generation(), g + 1);
    }
}
