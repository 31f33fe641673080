//! Run diagnostics: timing and mask hand-off for each step.
//!
//! [`Pipeline::run_with_diagnostics`](crate::Pipeline::run_with_diagnostics)
//! folds the image through the steps exactly like
//! [`Pipeline::run`](crate::Pipeline::run) and records one
//! [`StepDiagnostics`] per step, including disabled ones.
//!
//! Time is read through the [`Clock`] trait so the library stays free of
//! platform time sources; callers supply an implementation (the CLI uses
//! `std::time::Instant`, tests use a fake).
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::OperationKind;
use crate::mask::coverage;
use crate::pipeline::RunObserver;
use crate::step::{Execution, Step, StepId};
use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for diagnostics.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// One entry per step, in execution order.
    pub steps: Vec<StepDiagnostics>,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Size of the base image.
    pub input: Dimensions,
    /// Size of the final image.
    pub output: Dimensions,
}

/// Diagnostics for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDiagnostics {
    /// The step's identity.
    pub id: StepId,
    /// The wrapped operation.
    pub operation: OperationKind,
    /// Wall-clock duration of the step (seconds). Zero when skipped.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// What the step did.
    pub outcome: StepOutcome,
    /// Whether a mask from the previous step was pending. For a skipped
    /// step this means the mask was discarded.
    pub received_mask: bool,
    /// Image size after the step.
    pub dimensions: Dimensions,
}

/// What a step did during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The step was disabled.
    Skipped,
    /// The step produced an image.
    Transformed,
    /// The step produced a mask for the next step.
    MaskProduced {
        /// Fraction of pixels selected, in `[0, 1]`.
        coverage: f64,
    },
}

impl RunDiagnostics {
    /// Number of steps that actually executed.
    #[must_use]
    pub fn executed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome != StepOutcome::Skipped)
            .count()
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {} -> {} ({} of {} steps executed)",
            self.input,
            self.output,
            self.executed_count(),
            self.steps.len(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<6} {:<18} {:>10} {:>9}  {}",
            "Step", "Operation", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for step in &self.steps {
            let ms = duration_ms(step.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<6} {:<18} {ms:>8.3}ms {pct:>8.1}%  {}",
                step.id.to_string(),
                step.operation.name(),
                format_details(step),
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_details(step: &StepDiagnostics) -> String {
    let masked = if step.received_mask { " (masked)" } else { "" };
    match step.outcome {
        StepOutcome::Skipped if step.received_mask => "skipped, mask discarded".to_owned(),
        StepOutcome::Skipped => "skipped".to_owned(),
        StepOutcome::Transformed => format!("{}{masked}", step.dimensions),
        StepOutcome::MaskProduced { coverage } => {
            format!("mask {:.1}% selected{masked}", coverage * 100.0)
        }
    }
}

/// Records [`StepDiagnostics`] while a pipeline folds.
pub(crate) struct Recorder<'c, C: Clock> {
    clock: &'c C,
    started: Option<C::Instant>,
    steps: Vec<StepDiagnostics>,
}

impl<'c, C: Clock> Recorder<'c, C> {
    pub(crate) const fn new(clock: &'c C) -> Self {
        Self {
            clock,
            started: None,
            steps: Vec::new(),
        }
    }

    pub(crate) fn finish(
        self,
        total_duration: Duration,
        input: Dimensions,
        output: Dimensions,
    ) -> RunDiagnostics {
        RunDiagnostics {
            steps: self.steps,
            total_duration,
            input,
            output,
        }
    }
}

impl<C: Clock> RunObserver for Recorder<'_, C> {
    fn skipped(&mut self, step: &Step, pending_mask: bool, dimensions: Dimensions) {
        self.steps.push(StepDiagnostics {
            id: step.id(),
            operation: step.kind(),
            duration: Duration::ZERO,
            outcome: StepOutcome::Skipped,
            received_mask: pending_mask,
            dimensions,
        });
    }

    fn started(&mut self, _step: &Step) {
        self.started = Some(self.clock.now());
    }

    fn finished(&mut self, step: &Step, received_mask: bool, execution: &Execution) {
        let duration = self
            .started
            .take()
            .map_or(Duration::ZERO, |t| self.clock.elapsed(&t));
        let outcome = execution
            .mask()
            .map_or(StepOutcome::Transformed, |m| StepOutcome::MaskProduced {
                coverage: coverage(m),
            });
        self.steps.push(StepDiagnostics {
            id: step.id(),
            operation: step.kind(),
            duration,
            outcome,
            received_mask,
            dimensions: Dimensions::of(execution.image()),
        });
    }
}
