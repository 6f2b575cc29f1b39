// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ribbon construction: turns a stream of pressure-tagged pointer samples
//! into a closed offset polygon around the stroke's centerline.
//!
//! The builder runs in three phases: speed-adaptive resampling of the raw
//! samples, per-point offsetting with the bevel join policy, and outline
//! assembly (caps for open strokes, directly connected rings for closed
//! ones) followed by cleanup.

use peniko::kurbo::{Point, Vec2};

use crate::stroke::{StrokePoint, StrokeSettings};

/// Segments closer together than this are merged during resampling.
const MIN_SAMPLE_DIST: f64 = 2.0;
/// Segment length at or below which a stroke counts as fully "slow".
const SLOW_SPEED: f64 = 4.0;
/// Segment length at or above which a stroke counts as fully "fast".
const FAST_SPEED: f64 = 30.0;
/// Maximum resampled segment length for slow strokes.
const MAX_STEP_SLOW: f64 = 8.0;
/// Maximum resampled segment length for fast strokes. Fast input is sparse,
/// so it is subdivided more aggressively.
const MAX_STEP_FAST: f64 = 3.0;
/// Consecutive outline vertices closer than this collapse to one.
const VERTEX_EPS: f64 = 1e-2;
/// Ring resolution for single-tap dots.
const DOT_SEGMENTS: usize = 16;

/// A closed outline as a flat, ordered vertex list.
///
/// Invariants: CCW winding (positive signed area), no two consecutive
/// vertices closer than the cleanup epsilon, first/last vertex not
/// duplicated.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Builds a polygon from raw outline points, applying the same cleanup
    /// as the ribbon builder. Returns `None` when fewer than 3 distinct
    /// vertices remain.
    pub fn from_points(points: Vec<Point>) -> Option<Self> {
        cleanup(points)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area; positive for CCW winding.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        0.5 * sum
    }
}

/// One offset station along the centerline.
#[derive(Clone, Copy, Debug)]
pub struct RibbonSegment {
    pub center: Point,
    pub tangent: Vec2,
    pub normal: Vec2,
    pub radius: f64,
    pub left: Point,
    pub right: Point,
}

#[derive(Clone, Copy)]
struct Sample {
    pos: Point,
    pressure: f64,
    /// Length of the raw input segment this sample came from, used as the
    /// local speed estimate.
    speed: f64,
}

/// Builds the offset polygon for a stroke.
///
/// Returns `None` when fewer than 2 usable points remain after resampling,
/// or when cleanup leaves fewer than 3 outline vertices; the caller must
/// abort the stroke without drawing anything.
pub fn build_ribbon_polygon(points: &[StrokePoint], settings: &StrokeSettings) -> Option<Polygon> {
    let samples = resample(points);
    if samples.len() < 2 {
        return None;
    }
    let segments = offset_segments(&samples, settings);
    let start = samples.first().expect("length checked above");
    let end = samples.last().expect("length checked above");
    let closed =
        start.pos.distance(end.pos) < settings.base_size * settings.closed_loop_threshold;
    let outline = assemble(&segments, closed, settings.cap_segments);
    cleanup(outline)
}

/// Circle outline used when a stroke collapses to a single usable point.
pub fn dot_polygon(center: Point, radius: f64, segments: usize) -> Polygon {
    let segments = segments.max(8);
    let points = (0..segments)
        .map(|k| {
            let angle = std::f64::consts::TAU * k as f64 / segments as f64;
            center + Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect();
    Polygon { points }
}

/// Fallback for taps: when every input point sits within the resampling
/// minimum of the first one, the stroke is a dot at the first point with the
/// stroke's peak pressure. Returns `None` for genuinely empty or spread-out
/// input.
pub(crate) fn tap_polygon(points: &[StrokePoint], settings: &StrokeSettings) -> Option<Polygon> {
    let first = points.first()?;
    let spread = points
        .iter()
        .map(|p| first.pos.distance(p.pos))
        .fold(0.0, f64::max);
    if spread >= MIN_SAMPLE_DIST {
        return None;
    }
    let pressure = points.iter().map(|p| p.pressure).fold(0.0, f64::max);
    let radius = settings.radius(pressure);
    if radius < VERTEX_EPS {
        return None;
    }
    Some(dot_polygon(first.pos, radius, DOT_SEGMENTS))
}

/// Maximum resampled segment length for a raw segment of the given length.
fn max_step(len: f64) -> f64 {
    let t = ((len - SLOW_SPEED) / (FAST_SPEED - SLOW_SPEED)).clamp(0.0, 1.0);
    MAX_STEP_SLOW + (MAX_STEP_FAST - MAX_STEP_SLOW) * t
}

fn resample(points: &[StrokePoint]) -> Vec<Sample> {
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let mut out = vec![Sample {
        pos: first.pos,
        pressure: first.pressure.clamp(0.0, 1.0),
        speed: 0.0,
    }];
    for (i, p) in points.iter().enumerate().skip(1) {
        let prev = *out.last().expect("seeded with the first point");
        let len = prev.pos.distance(p.pos);
        let is_last = i == points.len() - 1;
        if len < MIN_SAMPLE_DIST {
            // Drop sub-minimum segments, but never lose the stroke's end.
            if is_last && len > VERTEX_EPS {
                out.push(Sample {
                    pos: p.pos,
                    pressure: p.pressure.clamp(0.0, 1.0),
                    speed: len,
                });
            }
            continue;
        }
        let pieces = (len / max_step(len)).ceil().max(1.0) as usize;
        let target = p.pressure.clamp(0.0, 1.0);
        for k in 1..=pieces {
            let f = k as f64 / pieces as f64;
            out.push(Sample {
                pos: prev.pos.lerp(p.pos, f),
                pressure: prev.pressure + (target - prev.pressure) * f,
                speed: len,
            });
        }
    }
    out
}

fn offset_segments(samples: &[Sample], settings: &StrokeSettings) -> Vec<RibbonSegment> {
    let n = samples.len();
    debug_assert!(n >= 2);
    let dirs: Vec<Vec2> = samples
        .windows(2)
        .map(|w| (w[1].pos - w[0].pos).normalize())
        .collect();
    let mut segments = Vec::with_capacity(n);
    for (i, sample) in samples.iter().enumerate() {
        let tangent = if i == 0 {
            dirs[0]
        } else if i == n - 1 {
            dirs[n - 2]
        } else {
            let sum = dirs[i - 1] + dirs[i];
            // A hairpin reversal sums to ~zero; fall back to the incoming
            // direction rather than normalizing noise.
            if sum.hypot() < 1e-6 {
                dirs[i - 1]
            } else {
                sum.normalize()
            }
        };
        let normal = Vec2::new(-tangent.y, tangent.x);
        let radius = settings.radius(sample.pressure);
        segments.push(RibbonSegment {
            center: sample.pos,
            tangent,
            normal,
            radius,
            left: sample.pos + normal * radius,
            right: sample.pos - normal * radius,
        });
    }
    apply_joins(samples, &dirs, &mut segments, settings);
    segments
}

/// Bevel policy: interior joints sharper than the speed-weighted threshold
/// (or the absolute extreme bound) collapse both offsets to the average
/// radius of the three adjacent stations. Radius is preserved, never widened
/// into a miter spike or thinned.
fn apply_joins(
    samples: &[Sample],
    dirs: &[Vec2],
    segments: &mut [RibbonSegment],
    settings: &StrokeSettings,
) {
    let n = segments.len();
    for i in 1..n - 1 {
        let dot = dirs[i - 1].dot(dirs[i]).clamp(-1.0, 1.0);
        let turn = dot.acos().to_degrees();
        let corner = 180.0 - turn;
        let t = ((samples[i].speed - SLOW_SPEED) / (FAST_SPEED - SLOW_SPEED)).clamp(0.0, 1.0);
        let joins = &settings.joins;
        let threshold = joins.slow_angle + (joins.fast_angle - joins.slow_angle) * t;
        if corner < threshold || corner < joins.extreme_angle {
            let radius =
                (segments[i - 1].radius + segments[i].radius + segments[i + 1].radius) / 3.0;
            let seg = &mut segments[i];
            seg.radius = radius;
            seg.left = seg.center + seg.normal * radius;
            seg.right = seg.center - seg.normal * radius;
        }
    }
}

fn assemble(segments: &[RibbonSegment], closed: bool, cap_segments: usize) -> Vec<Point> {
    let n = segments.len();
    let mut outline = Vec::with_capacity(2 * n + 2 * cap_segments);
    outline.extend(segments.iter().map(|s| s.left));
    if !closed {
        let end = &segments[n - 1];
        outline.extend(cap_arc(end.center, end.normal, end.radius, cap_segments));
    }
    outline.extend(segments.iter().rev().map(|s| s.right));
    if !closed {
        let start = &segments[0];
        outline.extend(cap_arc(
            start.center,
            -start.normal,
            start.radius,
            cap_segments,
        ));
    }
    outline
}

/// Sweeps a half circle from `+from` to `-from` through the outward tangent
/// direction, excluding both endpoints (they are already on the outline).
fn cap_arc(
    center: Point,
    from: Vec2,
    radius: f64,
    segments: usize,
) -> impl Iterator<Item = Point> {
    let segments = segments.max(2);
    (1..segments).map(move |k| {
        let phi = -std::f64::consts::PI * k as f64 / segments as f64;
        let (sin, cos) = phi.sin_cos();
        let dir = Vec2::new(from.x * cos - from.y * sin, from.x * sin + from.y * cos);
        center + dir * radius
    })
}

fn cleanup(mut points: Vec<Point>) -> Option<Polygon> {
    points.dedup_by(|cur, prev| cur.distance(*prev) < VERTEX_EPS);
    while points.len() >= 2 {
        let first = points[0];
        let last = *points.last().expect("length checked above");
        if first.distance(last) < VERTEX_EPS {
            points.pop();
        } else {
            break;
        }
    }
    if points.len() < 3 {
        return None;
    }
    let mut polygon = Polygon { points };
    if polygon.signed_area() < 0.0 {
        polygon.points.reverse();
    }
    Some(polygon)
}
