// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer merge and display presentation.

use sumi::peniko::Color;
use sumi::wgpu;
use sumi::{HistoryEntry, Layer, Renderer, RendererOptions, StrokePoint, StrokeSettings};
use sumi_tests::{gpu_context, pixel, read_pixels, target_texture, TestContext};

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

fn draw_dot(ctx: &TestContext, renderer: &mut Renderer, layer: &Layer, center: (f64, f64), color: Color) {
    let settings = StrokeSettings {
        color,
        feather: (0.0, 0.05),
        ..Default::default()
    };
    let mut history: Vec<HistoryEntry> = Vec::new();
    renderer
        .finalize_stroke(
            &ctx.device,
            &ctx.queue,
            &[StrokePoint::new(center.0, center.1, 1.0)],
            &settings,
            layer,
            &mut history,
        )
        .expect("dot renders");
}

fn views(ctx: &TestContext) -> (wgpu::Texture, wgpu::TextureView, wgpu::Texture, wgpu::TextureView) {
    let composite = target_texture(ctx, CANVAS, CANVAS);
    let display = target_texture(ctx, CANVAS, CANVAS);
    let composite_view = composite.create_view(&wgpu::TextureViewDescriptor::default());
    let display_view = display.create_view(&wgpu::TextureViewDescriptor::default());
    (composite, composite_view, display, display_view)
}

#[test]
fn merges_visible_layers_and_skips_hidden_ones() {
    let Some(ctx) = gpu_context() else { return };
    let mut renderer = test_renderer(&ctx);
    let red = Layer::new(&ctx.device, CANVAS, CANVAS);
    let blue = Layer::new(&ctx.device, CANVAS, CANVAS);
    draw_dot(&ctx, &mut renderer, &red, (20.0, 20.0), Color::rgb8(255, 0, 0));
    draw_dot(&ctx, &mut renderer, &blue, (44.0, 44.0), Color::rgb8(0, 0, 255));
    let mut layers = [red, blue];
    layers[1].visible = false;

    let (_composite, composite_view, display, display_view) = views(&ctx);
    renderer.composite_layers(
        &ctx.device,
        &ctx.queue,
        &layers,
        &composite_view,
        &display_view,
        false,
    );
    let pixels = read_pixels(&ctx, &display).unwrap();
    let at_red = pixel(&pixels, CANVAS, 20, 20);
    assert!(at_red[0] > 200 && at_red[3] > 200, "red dot missing: {at_red:?}");
    let at_blue = pixel(&pixels, CANVAS, 44, 44);
    assert_eq!(at_blue[3], 0, "hidden layer leaked into the display");

    // Make the hidden layer visible and fade the red one out completely.
    layers[1].visible = true;
    layers[0].opacity = 0.0;
    renderer.composite_layers(
        &ctx.device,
        &ctx.queue,
        &layers,
        &composite_view,
        &display_view,
        false,
    );
    let pixels = read_pixels(&ctx, &display).unwrap();
    assert_eq!(pixel(&pixels, CANVAS, 20, 20)[3], 0);
    let at_blue = pixel(&pixels, CANVAS, 44, 44);
    assert!(at_blue[2] > 200 && at_blue[3] > 200, "blue dot missing: {at_blue:?}");
}

#[test]
fn layer_opacity_scales_the_output() {
    let Some(ctx) = gpu_context() else { return };
    let mut renderer = test_renderer(&ctx);
    let mut layer = Layer::new(&ctx.device, CANVAS, CANVAS);
    draw_dot(&ctx, &mut renderer, &layer, (32.0, 32.0), Color::rgb8(255, 0, 0));
    layer.opacity = 0.5;

    let (_composite, composite_view, display, display_view) = views(&ctx);
    renderer.composite_layers(
        &ctx.device,
        &ctx.queue,
        &[layer],
        &composite_view,
        &display_view,
        false,
    );
    let pixels = read_pixels(&ctx, &display).unwrap();
    let at_dot = pixel(&pixels, CANVAS, 32, 32);
    // Premultiplied half opacity: both red and alpha land near 128.
    assert!((100..160).contains(&at_dot[0]), "red channel {at_dot:?}");
    assert!((100..160).contains(&at_dot[3]), "alpha channel {at_dot:?}");
}

#[test]
fn present_can_flip_the_row_order() {
    let Some(ctx) = gpu_context() else { return };
    let mut renderer = test_renderer(&ctx);
    let layer = Layer::new(&ctx.device, CANVAS, CANVAS);
    draw_dot(&ctx, &mut renderer, &layer, (20.0, 20.0), Color::rgb8(255, 0, 0));

    let (_composite, composite_view, display, display_view) = views(&ctx);
    renderer.composite_layers(
        &ctx.device,
        &ctx.queue,
        &[layer],
        &composite_view,
        &display_view,
        true,
    );
    let pixels = read_pixels(&ctx, &display).unwrap();
    assert_eq!(pixel(&pixels, CANVAS, 20, 20)[3], 0, "dot was not flipped");
    let flipped = pixel(&pixels, CANVAS, 20, 43);
    assert!(flipped[3] > 200, "dot missing at the flipped row: {flipped:?}");
}
