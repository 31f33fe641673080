//! stepchain: run an image-processing step chain from the command line.
//!
//! Loads an image, builds a pipeline from `--step` arguments, runs it,
//! optionally writes the result, and prints per-step diagnostics
//! (timing, mask hand-offs, dimensions). Useful for:
//!
//! - Trying out operation chains and parameter values
//! - Checking which step received a mask
//! - Measuring per-step durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin stepchain -- [OPTIONS] <INPUT>
//! ```
//!
//! Steps are given as `key[:name=value[,name=value...]]`, for example
//! `--step brightness:amount=20 --step color_mask:red_min=100`. Two names
//! are handled here rather than by the operation: `enabled=false` adds the
//! step disabled, and `image=PATH` loads the second image of a combine
//! step.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use stepchain_pipeline::params::ParamKind;
use stepchain_pipeline::{
    Clock, Dimensions, Image, OperationKind, Pipeline, RunDiagnostics, Step,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Build and run an image-processing step chain.
///
/// Each `--step` appends one operation. The chain runs from the input
/// image and prints a per-step diagnostics report.
#[derive(Parser)]
#[command(name = "stepchain", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    #[arg(required_unless_present = "list_operations")]
    input: Option<PathBuf>,

    /// Write the final image to this path (format from the extension).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append a step: `key[:name=value[,name=value...]]`.
    #[arg(long = "step", value_name = "SPEC")]
    steps: Vec<StepArg>,

    /// Disable the step at this zero-based position (repeatable).
    #[arg(long = "disable", value_name = "INDEX")]
    disabled: Vec<usize>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Print every operation with its parameters and exit.
    #[arg(long)]
    list_operations: bool,
}

/// One `--step` argument, split but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StepArg {
    kind: OperationKind,
    params: Vec<(String, String)>,
}

impl FromStr for StepArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, rest) = s.split_once(':').unwrap_or((s, ""));
        let kind = key.trim().parse::<OperationKind>().map_err(|e| e.to_string())?;

        let params = rest
            .split(',')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                pair.split_once('=')
                    .map(|(name, value)| (name.trim().to_owned(), value.trim().to_owned()))
                    .ok_or_else(|| format!("expected name=value, got {pair:?}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { kind, params })
    }
}

impl StepArg {
    /// Create the step, fitted to `dimensions`, with every parameter applied.
    fn build(&self, dimensions: Dimensions) -> Result<Step, String> {
        let mut step = Step::new(self.kind);
        step.fit_to(dimensions);

        for (name, value) in &self.params {
            match name.as_str() {
                "enabled" => {
                    let enabled = value
                        .parse::<bool>()
                        .map_err(|e| format!("{}: enabled={value}: {e}", self.kind))?;
                    step.set_enabled(enabled);
                }
                "image" => {
                    let second = load_image(Path::new(value))?;
                    step.set_second_image(Some(Arc::new(second)));
                }
                _ => {
                    let stored = step
                        .set_param_str(name, value)
                        .map_err(|e| e.to_string())?;
                    debug!(operation = %self.kind, name = name.as_str(), %stored, "parameter set");
                }
            }
        }

        Ok(step)
    }
}

/// Build the pipeline described by `--step` and `--disable`.
fn pipeline_from_cli(cli: &Cli, dimensions: Dimensions) -> Result<Pipeline, String> {
    let mut pipeline = Pipeline::new();
    for arg in &cli.steps {
        pipeline.add_step(arg.build(dimensions)?);
    }

    for &index in &cli.disabled {
        let id = pipeline
            .steps()
            .get(index)
            .map(Step::id)
            .ok_or_else(|| {
                format!(
                    "--disable {index}: pipeline has only {} steps",
                    pipeline.len()
                )
            })?;
        if let Some(step) = pipeline.step_mut(id) {
            step.set_enabled(false);
        }
    }

    Ok(pipeline)
}

fn load_image(path: &Path) -> Result<Image, String> {
    image::open(path)
        .map(|decoded| decoded.into_rgba8())
        .map_err(|e| format!("Error reading {}: {e}", path.display()))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_operations {
        print_operations();
        return ExitCode::SUCCESS;
    }

    let Some(input_path) = cli.input.as_deref() else {
        eprintln!("No input image given");
        return ExitCode::FAILURE;
    };

    let input = match load_image(input_path) {
        Ok(image) => image,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let dimensions = Dimensions::of(&input);
    info!(path = %input_path.display(), %dimensions, "loaded input");

    let pipeline = match pipeline_from_cli(&cli, dimensions) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Image: {} ({dimensions})", input_path.display());
    eprintln!("Steps: {}", pipeline.len());
    for (index, step) in pipeline.steps().iter().enumerate() {
        let state = if step.is_enabled() { "" } else { " (disabled)" };
        eprintln!("  {index}: {}{state}", describe(step));
    }
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);
    let mut first_output = None;

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match pipeline.run_with_diagnostics(&input, &StdClock) {
            Ok((output, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                if first_output.is_none() {
                    first_output = Some(output);
                }
                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if let (Some(path), Some(output)) = (&cli.output, &first_output) {
        match output.save(path) {
            Ok(()) => {
                eprintln!(
                    "Output written to {} ({})",
                    path.display(),
                    Dimensions::of(output),
                );
            }
            Err(e) => {
                eprintln!("Error writing {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// `label (name=value, ...)` for one step.
fn describe(step: &Step) -> String {
    let params: Vec<String> = step
        .params()
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    if params.is_empty() {
        step.label().to_owned()
    } else {
        format!("{} ({})", step.label(), params.join(", "))
    }
}

fn print_operations() {
    for kind in OperationKind::ALL {
        let descriptor = kind.descriptor();
        let mut notes = Vec::new();
        if kind.produces_mask() {
            notes.push("produces mask");
        }
        if kind.needs_second_image() {
            notes.push("needs image=PATH");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!("  [{}]", notes.join(", "))
        };
        println!("{:<18} {}{notes}", kind.name(), kind.label());

        for spec in descriptor.params {
            println!("    {:<14} {}", spec.name, describe_kind(&spec.kind));
        }
    }
}

fn describe_kind(kind: &ParamKind) -> String {
    match kind {
        ParamKind::Int { min, max, default, .. } => {
            format!("int    {min}..={max} (default {default})")
        }
        ParamKind::Float { min, max, default } => {
            format!("float  {min}..={max} (default {default})")
        }
        ParamKind::Flag { default } => format!("flag   (default {default})"),
        ParamKind::Choice { options, default } => {
            format!("choice {} (default {default})", options.join("|"))
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RunDiagnostics]) {
    debug_assert!(!all_diagnostics.is_empty(), "no diagnostics to summarize");

    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-step means. Every run executes the same pipeline, so steps line
    // up by position.
    println!();
    println!("{:<4} {:<24} {:>12}", "#", "Step", "Mean (ms)");
    println!("{}", "-".repeat(44));

    for (index, step) in first.steps.iter().enumerate() {
        let step_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.steps.get(index))
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .collect();

        let step_mean = step_durations.iter().sum::<f64>() / step_durations.len() as f64;
        println!(
            "{index:<4} {:<24} {step_mean:>10.3}ms",
            step.operation.label()
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn step_arg_without_params() {
        let arg: StepArg = "negative".parse().unwrap();
        assert_eq!(arg.kind, OperationKind::Negative);
        assert!(arg.params.is_empty());
    }

    #[test]
    fn step_arg_with_params() {
        let arg: StepArg = "Gaussian-Blur: sigma = 2.5 ,".parse().unwrap();
        assert_eq!(arg.kind, OperationKind::GaussianBlur);
        assert_eq!(arg.params, vec![("sigma".to_owned(), "2.5".to_owned())]);
    }

    #[test]
    fn step_arg_rejects_unknown_operation() {
        assert!("sepia".parse::<StepArg>().is_err());
    }

    #[test]
    fn step_arg_rejects_bare_name() {
        assert!("brightness:amount".parse::<StepArg>().is_err());
    }

    #[test]
    fn build_applies_params_and_enabled() {
        let arg: StepArg = "brightness:amount=400,enabled=false".parse().unwrap();
        let step = arg.build(Dimensions::new(4, 4)).unwrap();
        assert_eq!(step.params().int("amount"), 255);
        assert!(!step.is_enabled());
    }

    #[test]
    fn build_fits_region_to_input() {
        let arg: StepArg = "crop:x=2".parse().unwrap();
        let step = arg.build(Dimensions::new(30, 20)).unwrap();
        assert_eq!(step.params().int("x"), 2);
        assert_eq!(step.params().int("width"), 30);
    }

    #[test]
    fn build_rejects_unknown_parameter() {
        let arg: StepArg = "negative:amount=3".parse().unwrap();
        assert!(arg.build(Dimensions::new(4, 4)).is_err());
    }

    #[test]
    fn disable_out_of_range_is_an_error() {
        let cli = Cli::parse_from(["stepchain", "in.png", "--step", "negative", "--disable", "1"]);
        assert!(pipeline_from_cli(&cli, Dimensions::new(2, 2)).is_err());
    }

    #[test]
    fn disable_by_position() {
        let cli = Cli::parse_from([
            "stepchain",
            "in.png",
            "--step",
            "negative",
            "--step",
            "brightness:amount=5",
            "--disable",
            "0",
        ]);
        let pipeline = pipeline_from_cli(&cli, Dimensions::new(2, 2)).unwrap();
        let enabled: Vec<bool> = pipeline.steps().iter().map(Step::is_enabled).collect();
        assert_eq!(enabled, vec![false, true]);
    }

    #[test]
    fn list_operations_needs_no_input() {
        let cli = Cli::parse_from(["stepchain", "--list-operations"]);
        assert!(cli.list_operations);
        assert!(cli.input.is_none());
    }
}
