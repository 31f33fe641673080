//! Integration tests: whole pipelines run through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use stepchain_pipeline::{
    Clock, Dimensions, Editor, Execution, Image, OperationKind, ParamValue, Pipeline, Step,
    StepOutcome,
};

/// Clock that never advances.
struct FrozenClock;

impl Clock for FrozenClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

fn mid_gray() -> Image {
    Image::from_pixel(2, 2, image::Rgba([128, 128, 128, 255]))
}

fn gradient(w: u32, h: u32) -> Image {
    Image::from_fn(w, h, |x, y| {
        image::Rgba([(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 90, 255])
    })
}

fn brighten(amount: i64) -> Step {
    Step::new(OperationKind::Brightness)
        .with_param("amount", ParamValue::Int(amount))
        .unwrap()
}

fn left_half_mask(dimensions: Dimensions) -> Step {
    let mut step = Step::new(OperationKind::RectMask);
    step.fit_to(dimensions);
    step.set_param("width", ParamValue::Int(i64::from(dimensions.width / 2)))
        .unwrap();
    step
}

fn assert_uniform(image: &Image, value: u8) {
    for p in image.pixels() {
        assert_eq!(p.0, [value, value, value, 255]);
    }
}

#[test]
fn brighten_mask_brighten_adds_forty() {
    let mut pipeline = Pipeline::new();
    pipeline.add_step(brighten(20));
    pipeline.add_step(Step::new(OperationKind::ColorMask));
    pipeline.add_step(brighten(20));
    let tail = pipeline.add_step(Step::new(OperationKind::Negative));

    let (_, diagnostics) = pipeline
        .run_with_diagnostics(&mid_gray(), &FrozenClock)
        .unwrap();
    assert_eq!(
        diagnostics.steps[1].outcome,
        StepOutcome::MaskProduced { coverage: 1.0 },
    );
    assert!(diagnostics.steps[2].received_mask);
    assert_eq!(diagnostics.steps[3].id, tail);
    assert!(!diagnostics.steps[3].received_mask);

    pipeline.remove_step(tail);
    assert_uniform(&pipeline.run(&mid_gray()).unwrap(), 168);
}

#[test]
fn disabled_mask_step_still_adds_forty() {
    let mut pipeline = Pipeline::new();
    pipeline.add_step(brighten(20));
    let mask = pipeline.add_step(Step::new(OperationKind::ColorMask));
    pipeline.add_step(brighten(20));
    pipeline.step_mut(mask).unwrap().set_enabled(false);

    let (output, diagnostics) = pipeline
        .run_with_diagnostics(&mid_gray(), &FrozenClock)
        .unwrap();
    assert_uniform(&output, 168);
    assert_eq!(diagnostics.steps[1].outcome, StepOutcome::Skipped);
    assert!(!diagnostics.steps[2].received_mask);
}

#[test]
fn mask_is_gone_two_steps_later() {
    let image = Image::from_pixel(4, 2, image::Rgba([100, 100, 100, 255]));
    let dims = Dimensions::of(&image);

    let mut pipeline = Pipeline::new();
    pipeline.add_step(left_half_mask(dims));
    pipeline.add_step(brighten(10));
    pipeline.add_step(brighten(10));
    let out = pipeline.run(&image).unwrap();
    assert_eq!(out.get_pixel(0, 0).0[0], 120);
    assert_eq!(out.get_pixel(3, 1).0[0], 110);

    // Same, with the consumer disabled: the third step sees no mask.
    let consumer = pipeline.steps()[1].id();
    pipeline.step_mut(consumer).unwrap().set_enabled(false);
    let out = pipeline.run(&image).unwrap();
    assert!(out.pixels().all(|p| p.0[0] == 110));
}

#[test]
fn double_masking_intersects() {
    let image = Image::from_fn(4, 1, |x, _| {
        if x % 2 == 0 {
            image::Rgba([200, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 200, 255])
        }
    });
    let dims = Dimensions::of(&image);

    let mut reds = Step::new(OperationKind::ColorMask);
    reds.set_param("red_min", ParamValue::Int(150)).unwrap();

    let mut pipeline = Pipeline::new();
    pipeline.add_step(left_half_mask(dims));
    pipeline.add_step(reds);
    pipeline.add_step(Step::new(OperationKind::Negative));
    let out = pipeline.run(&image).unwrap();

    // Only x == 0 is both in the left half and red.
    assert_eq!(out.get_pixel(0, 0).0, [55, 255, 255, 255]);
    assert_eq!(out.get_pixel(1, 0).0, [0, 0, 200, 255]);
    assert_eq!(out.get_pixel(2, 0).0, [200, 0, 0, 255]);
}

#[test]
fn disabling_matches_removing() {
    let image = gradient(12, 9);
    let mut steps = vec![
        Step::new(OperationKind::Contrast)
            .with_param("factor", ParamValue::Float(1.5))
            .unwrap(),
        Step::new(OperationKind::GaussianBlur),
        Step::new(OperationKind::Negative),
        brighten(-15),
    ];
    for step in &mut steps {
        step.fit_to(Dimensions::of(&image));
    }

    for k in 0..steps.len() {
        let mut disabled = Pipeline::new();
        let mut removed = Pipeline::new();
        for (i, step) in steps.iter().enumerate() {
            let id = disabled.add_step(step.clone());
            if i == k {
                disabled.step_mut(id).unwrap().set_enabled(false);
            } else {
                removed.add_step(step.clone());
            }
        }
        assert_eq!(
            disabled.run(&image).unwrap(),
            removed.run(&image).unwrap(),
            "disabling step {k} differs from removing it",
        );
    }
}

#[test]
fn reordering_crop_and_resize_changes_output() {
    let image = gradient(8, 8);
    let dims = Dimensions::of(&image);

    let mut crop = Step::new(OperationKind::Crop);
    crop.fit_to(dims);
    crop.set_param("width", ParamValue::Int(4)).unwrap();
    crop.set_param("height", ParamValue::Int(4)).unwrap();

    let mut resize = Step::new(OperationKind::Resize);
    resize.fit_to(dims);

    let mut pipeline = Pipeline::new();
    let crop_id = pipeline.add_step(crop);
    pipeline.add_step(resize);
    let crop_then_resize = pipeline.run(&image).unwrap();
    assert_eq!(crop_then_resize.dimensions(), (8, 8));

    assert!(pipeline.move_step(crop_id, 1));
    let resize_then_crop = pipeline.run(&image).unwrap();
    assert_eq!(resize_then_crop.dimensions(), (4, 4));
    assert_ne!(crop_then_resize, resize_then_crop);
}

#[test]
fn moved_step_runs_exactly_once() {
    let mut pipeline = Pipeline::new();
    let a = pipeline.add_step(brighten(10));
    pipeline.add_step(brighten(1));
    pipeline.add_step(brighten(2));
    assert!(pipeline.move_step(a, 2));
    assert_eq!(pipeline.len(), 3);
    assert_uniform(&pipeline.run(&mid_gray()).unwrap(), 141);
}

#[test]
fn combine_without_second_image_is_bit_identical() {
    let image = gradient(5, 3);
    for kind in [OperationKind::Arithmetic, OperationKind::Logic] {
        let step = Step::new(kind);
        assert_eq!(
            step.execute(&image, None).unwrap(),
            Execution::Image(image.clone()),
        );
    }
}

#[test]
fn structural_noops_leave_order_intact() {
    let mut pipeline = Pipeline::new();
    let ids: Vec<_> = (0..3).map(|i| pipeline.add_step(brighten(i))).collect();
    let stranger = Step::new(OperationKind::Negative).id();

    assert!(pipeline.remove_step(stranger).is_none());
    assert!(!pipeline.move_step(stranger, 0));
    assert_eq!(pipeline.ids().collect::<Vec<_>>(), ids);
}

#[test]
fn empty_pipeline_is_identity() {
    let image = gradient(7, 5);
    assert_eq!(Pipeline::new().run(&image).unwrap(), image);
}

#[test]
fn single_channel_operations_keep_alpha() {
    let image = Image::from_fn(16, 16, |x, y| {
        image::Rgba([(x * 16) as u8, (y * 16) as u8, 40, (x + y) as u8 * 7])
    });
    for kind in [
        OperationKind::Grayscale,
        OperationKind::Threshold,
        OperationKind::EdgeDetect,
    ] {
        let mut pipeline = Pipeline::new();
        pipeline.add_step(Step::new(kind));
        let out = pipeline.run(&image).unwrap();
        for (x, y, p) in out.enumerate_pixels() {
            assert_eq!(p.0[3], image.get_pixel(x, y).0[3], "{kind} changed alpha");
        }
    }
}

#[test]
fn every_operation_runs_with_defaults() {
    let image = gradient(10, 6);
    let dims = Dimensions::of(&image);
    for kind in OperationKind::ALL {
        let mut step = Step::new(*kind);
        step.fit_to(dims);
        let out = step.execute(&image, None).unwrap();
        assert!(
            !Dimensions::of(out.image()).is_empty(),
            "{kind} produced an empty image",
        );
    }
}

#[test]
fn seeded_noise_is_reproducible() {
    let image = Image::from_pixel(16, 16, image::Rgba([128, 128, 128, 255]));
    let mut pipeline = Pipeline::new();
    pipeline.add_step(
        Step::new(OperationKind::GaussianNoise)
            .with_param("seed", ParamValue::Int(17))
            .unwrap(),
    );
    assert_eq!(pipeline.run(&image).unwrap(), pipeline.run(&image).unwrap());
}

#[test]
fn editor_round_trip() {
    let mut editor = Editor::new();
    editor.open_image(mid_gray());

    let first = editor.add_step(OperationKind::Brightness).unwrap();
    editor.set_param(first, "amount", ParamValue::Int(20)).unwrap();
    editor.add_step(OperationKind::ColorMask).unwrap();
    let last = editor.add_step(OperationKind::Brightness).unwrap();
    editor.set_param_str(last, "amount", "20").unwrap();
    assert_uniform(editor.output().unwrap(), 168);

    let combine = editor.add_step(OperationKind::Arithmetic).unwrap();
    editor.set_param_str(combine, "op", "subtract").unwrap();
    assert_uniform(editor.output().unwrap(), 168);

    let other = Image::from_pixel(2, 2, image::Rgba([8, 8, 8, 0]));
    editor.set_second_image(combine, Some(Arc::new(other))).unwrap();
    assert_uniform(editor.output().unwrap(), 160);

    editor.open_image(mid_gray());
    assert!(editor.pipeline().is_empty());
    assert_uniform(editor.output().unwrap(), 128);
}
