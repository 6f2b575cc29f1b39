// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Properties of the encoded distance field.

use sumi::kurbo::{Point, Rect, Vec2};
use sumi::{
    build_edge_buffer, build_ribbon_polygon, calculate_bounds, triangulate, vertex_data, Bounds,
    EdgeBuffer, EdgeRecord, FieldPipeline, StrokeSettings,
};
use sumi_tests::{gpu_context, read_distances, read_pixels, stroke};

const FIELD_SIZE: u32 = 64;

/// A single degenerate edge seeds one point of the field.
fn point_seed(center: Point) -> EdgeBuffer {
    EdgeBuffer::from_records(vec![EdgeRecord {
        p0: center,
        p1: center,
        normal: Vec2::new(0.0, -1.0),
        index: 0,
    }])
}

/// One triangle covering the whole bounds; these tests only read the
/// distance texture, the mesh just has to exist for the render stage.
fn covering_mesh(bounds: &Bounds) -> Vec<f32> {
    let (x0, y0) = (bounds.min_x() as f32, bounds.min_y() as f32);
    let (w, h) = (bounds.width() as f32, bounds.height() as f32);
    vec![x0, y0, x0 + 2.0 * w, y0, x0, y0 + 2.0 * h]
}

#[test]
fn seed_texel_encodes_near_zero_distance() {
    let Some(ctx) = gpu_context() else { return };
    let pipeline = FieldPipeline::new(&ctx.device, FIELD_SIZE);
    // 64 canvas units over 64 texels: one texel per unit.
    let bounds = Bounds::new(Rect::new(0.0, 0.0, 64.0, 64.0));
    let edges = point_seed(Point::new(32.0, 32.0));
    let output = pipeline
        .generate(
            &ctx.device,
            &ctx.queue,
            &edges,
            &bounds,
            &covering_mesh(&bounds),
            &StrokeSettings::default(),
        )
        .expect("field generated");
    let distances = read_distances(&ctx, &output.distance).unwrap();
    let at_seed = distances[(32 * FIELD_SIZE + 32) as usize];
    assert!(
        at_seed < 2.0 / FIELD_SIZE as f32,
        "distance at the seed texel is {at_seed}"
    );
}

#[test]
fn distance_grows_with_propagation_length() {
    let Some(ctx) = gpu_context() else { return };
    let pipeline = FieldPipeline::new(&ctx.device, FIELD_SIZE);
    let bounds = Bounds::new(Rect::new(0.0, 0.0, 64.0, 64.0));
    let edges = point_seed(Point::new(32.0, 32.0));
    let output = pipeline
        .generate(
            &ctx.device,
            &ctx.queue,
            &edges,
            &bounds,
            &covering_mesh(&bounds),
            &StrokeSettings::default(),
        )
        .expect("field generated");
    let distances = read_distances(&ctx, &output.distance).unwrap();
    let row = &distances[(32 * FIELD_SIZE) as usize..][..FIELD_SIZE as usize];
    // Walking away from the seed column, distance never decreases and does
    // grow overall.
    let mut prev = row[32];
    for (x, &d) in row.iter().enumerate().skip(33) {
        assert!(d >= prev - 1e-4, "distance shrank at texel {x}: {d} < {prev}");
        prev = d;
    }
    assert!(row[63] > row[33]);
    // No texel was left at the sentinel-derived far value on this row's
    // near half.
    assert!(row[33] < 1.0);
}

#[test]
fn identical_inputs_yield_identical_buffers() {
    let Some(ctx) = gpu_context() else { return };
    let settings = StrokeSettings::default();
    let points = stroke(&[(0.0, 0.0), (20.0, 4.0), (45.0, 10.0)], 0.8);
    let polygon = build_ribbon_polygon(&points, &settings).expect("ribbon");
    let indices = triangulate(&polygon).expect("triangulated");
    let mesh = vertex_data(&polygon, &indices);
    let edges = EdgeBuffer::from_polygon(&polygon).expect("edges");
    let bounds = calculate_bounds(&points, None).expect("bounds");
    let pipeline = FieldPipeline::new(&ctx.device, FIELD_SIZE);

    let render = || {
        let output = pipeline
            .generate(&ctx.device, &ctx.queue, &edges, &bounds, &mesh, &settings)
            .expect("field generated");
        (
            read_pixels(&ctx, &output.texture).unwrap(),
            read_pixels(&ctx, &output.distance).unwrap(),
        )
    };
    let (stroke_a, field_a) = render();
    let (stroke_b, field_b) = render();
    assert_eq!(field_a, field_b);
    assert_eq!(stroke_a, stroke_b);
}

#[test]
fn degenerate_bounds_generate_nothing() {
    let Some(ctx) = gpu_context() else { return };
    let pipeline = FieldPipeline::new(&ctx.device, FIELD_SIZE);
    let settings = StrokeSettings::default();
    // All points share x; with an explicit zero margin the bounds collapse.
    let points = stroke(&[(3.0, 0.0), (3.0, 50.0)], 1.0);
    let bounds = calculate_bounds(&points, Some(0.0)).expect("bounds");
    assert!(!bounds.is_renderable());
    let polygon = build_ribbon_polygon(&points, &settings).expect("ribbon");
    let indices = triangulate(&polygon).expect("triangulated");
    let mesh = vertex_data(&polygon, &indices);
    let edges = build_edge_buffer(&points, &settings).expect("edges");
    assert!(pipeline
        .generate(&ctx.device, &ctx.queue, &edges, &bounds, &mesh, &settings)
        .is_none());
}

#[test]
fn empty_edge_buffer_generates_nothing() {
    let Some(ctx) = gpu_context() else { return };
    let pipeline = FieldPipeline::new(&ctx.device, FIELD_SIZE);
    let bounds = Bounds::new(Rect::new(0.0, 0.0, 64.0, 64.0));
    let edges = EdgeBuffer::from_records(Vec::new());
    assert!(pipeline
        .generate(
            &ctx.device,
            &ctx.queue,
            &edges,
            &bounds,
            &covering_mesh(&bounds),
            &StrokeSettings::default(),
        )
        .is_none());
}
