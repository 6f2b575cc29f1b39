// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end stroke scenarios through the renderer.

use std::time::Duration;

use sumi::kurbo::Point;
use sumi::{
    BlendMode, HistoryEntry, Layer, Renderer, RendererOptions, StrokePoint, StrokeSettings,
};
use sumi_tests::{gpu_context, pixel, read_pixels, stroke, TestContext};

const CANVAS: u32 = 64;

fn test_renderer(ctx: &TestContext) -> Renderer {
    Renderer::new(
        &ctx.device,
        RendererOptions {
            field_texture_size: 64,
            ..Default::default()
        },
    )
    .expect("renderer")
}

fn test_settings() -> StrokeSettings {
    StrokeSettings {
        // The default feather window is tuned for large canvases; tighten it
        // so a 64 texel field shows a hard-edged mark.
        feather: (0.0, 0.05),
        ..Default::default()
    }
}

fn alpha_at(pixels: &[u8], x: u32, y: u32) -> u8 {
    pixel(pixels, CANVAS, x, y)[3]
}

#[test]
fn single_point_tap_renders_a_dot() {
    let Some(ctx) = gpu_context() else { return };
    let mut renderer = test_renderer(&ctx);
    let layer = Layer::new(&ctx.device, CANVAS, CANVAS);
    let mut history: Vec<HistoryEntry> = Vec::new();
    let drawable = renderer
        .finalize_stroke(
            &ctx.device,
            &ctx.queue,
            &[StrokePoint::new(32.0, 32.0, 1.0)],
            &test_settings(),
            &layer,
            &mut history,
        )
        .expect("a tap renders a dot");

    // The point cloud is a single point, so the bounds are the margin floor.
    assert_eq!(drawable.origin, Point::new(12.0, 12.0));
    assert_eq!(drawable.size.width, 40.0);
    assert_eq!(drawable.size.height, 40.0);
    assert_eq!(layer.drawable_count(), 1);
    assert_eq!(history.len(), 1);

    let pixels = read_pixels(&ctx, layer.texture()).unwrap();
    assert!(alpha_at(&pixels, 32, 32) > 200, "no paint at the dot center");
    assert_eq!(alpha_at(&pixels, 2, 2), 0, "paint outside the dot bounds");
    // The dot has radius 5; 10 units out is well clear of it.
    assert_eq!(alpha_at(&pixels, 32, 10), 0);
}

#[test]
fn history_closures_remove_and_restore_the_drawable() {
    let Some(ctx) = gpu_context() else { return };
    let mut renderer = test_renderer(&ctx);
    let layer = Layer::new(&ctx.device, CANVAS, CANVAS);
    let mut history: Vec<HistoryEntry> = Vec::new();
    renderer
        .finalize_stroke(
            &ctx.device,
            &ctx.queue,
            &stroke(&[(10.0, 32.0), (54.0, 32.0)], 1.0),
            &test_settings(),
            &layer,
            &mut history,
        )
        .expect("stroke renders");
    assert_eq!(layer.drawable_count(), 1);

    let mut entry = history.pop().expect("one history entry");
    (entry.undo)();
    assert_eq!(layer.drawable_count(), 0);
    (entry.redo)();
    assert_eq!(layer.drawable_count(), 1);
    // Redo after redo must not duplicate.
    (entry.redo)();
    assert_eq!(layer.drawable_count(), 1);
}

#[test]
fn degenerate_input_is_dropped_silently() {
    let Some(ctx) = gpu_context() else { return };
    let mut renderer = test_renderer(&ctx);
    let layer = Layer::new(&ctx.device, CANVAS, CANVAS);
    let mut history: Vec<HistoryEntry> = Vec::new();
    let result = renderer.finalize_stroke(
        &ctx.device,
        &ctx.queue,
        &[],
        &test_settings(),
        &layer,
        &mut history,
    );
    assert!(result.is_none());
    assert_eq!(renderer.counters().geometry, 1);
    assert_eq!(layer.drawable_count(), 0);
    assert!(history.is_empty());
}

#[test]
fn eraser_strokes_remove_paint() {
    let Some(ctx) = gpu_context() else { return };
    let mut renderer = test_renderer(&ctx);
    let layer = Layer::new(&ctx.device, CANVAS, CANVAS);
    let mut history: Vec<HistoryEntry> = Vec::new();
    let points = [StrokePoint::new(32.0, 32.0, 1.0)];
    renderer
        .finalize_stroke(
            &ctx.device,
            &ctx.queue,
            &points,
            &test_settings(),
            &layer,
            &mut history,
        )
        .expect("paint stroke renders");
    let painted = read_pixels(&ctx, layer.texture()).unwrap();
    assert!(alpha_at(&painted, 32, 32) > 200);

    let eraser = StrokeSettings {
        blend_mode: BlendMode::Erase,
        ..test_settings()
    };
    renderer
        .finalize_stroke(&ctx.device, &ctx.queue, &points, &eraser, &layer, &mut history)
        .expect("eraser stroke renders");
    let erased = read_pixels(&ctx, layer.texture()).unwrap();
    assert!(
        alpha_at(&erased, 32, 32) < 30,
        "eraser left alpha {}",
        alpha_at(&erased, 32, 32)
    );
}

#[test]
fn preview_is_throttled_and_non_queued() {
    let Some(ctx) = gpu_context() else { return };
    let mut renderer = Renderer::new(
        &ctx.device,
        RendererOptions {
            field_texture_size: 64,
            preview_interval: Duration::from_millis(16),
        },
    )
    .expect("renderer");
    let points = stroke(&[(10.0, 32.0), (54.0, 32.0)], 1.0);
    let settings = test_settings();

    let first = renderer.preview_stroke(&ctx.device, &ctx.queue, &points, &settings);
    assert!(first.is_some());
    // Inside the throttle window (or with the submission still in flight)
    // the request is dropped, not queued.
    let second = renderer.preview_stroke(&ctx.device, &ctx.queue, &points, &settings);
    assert!(second.is_none());

    // Reset returns to "not drawing"; the next preview starts fresh.
    renderer.reset();
    let third = renderer.preview_stroke(&ctx.device, &ctx.queue, &points, &settings);
    assert!(third.is_some());
}
