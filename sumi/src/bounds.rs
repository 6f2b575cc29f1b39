// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroke bounds: the canvas-space rectangle the distance-field texture is
//! mapped onto.

use peniko::kurbo::{Point, Rect};

use crate::stroke::StrokePoint;

/// Margin floor in canvas units.
const MIN_MARGIN: f64 = 20.0;
/// Adaptive margin as a fraction of the stroke extent.
const MARGIN_FRACTION: f64 = 0.1;

/// Axis-aligned stroke bounds.
///
/// Must be strictly positive in both axes before any GPU resource is
/// allocated for the stroke; see [`Bounds::is_renderable`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    rect: Rect,
}

impl Bounds {
    pub fn new(rect: Rect) -> Self {
        Self { rect }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn min_x(&self) -> f64 {
        self.rect.x0
    }

    pub fn min_y(&self) -> f64 {
        self.rect.y0
    }

    pub fn width(&self) -> f64 {
        self.rect.width()
    }

    pub fn height(&self) -> f64 {
        self.rect.height()
    }

    pub fn origin(&self) -> Point {
        Point::new(self.rect.x0, self.rect.y0)
    }

    /// Whether the bounds may back a texture allocation.
    pub fn is_renderable(&self) -> bool {
        self.rect.width() > 0.0 && self.rect.height() > 0.0
    }

    /// Clips to the active view/camera frame. Strokes larger than the frame
    /// lose their off-screen extent rather than degrading the field's
    /// resolution over invisible area.
    pub fn clip_to(&self, frame: Rect) -> Self {
        Self {
            rect: self.rect.intersect(frame),
        }
    }
}

/// Bounds of the point cloud plus a margin. With `margin: None` the margin
/// adapts: at least [`MIN_MARGIN`] units, or 10% of the stroke extent when
/// that is larger. Returns `None` for empty input.
pub fn calculate_bounds(points: &[StrokePoint], margin: Option<f64>) -> Option<Bounds> {
    let first = points.first()?;
    let mut rect = Rect::from_points(first.pos, first.pos);
    for p in &points[1..] {
        rect = rect.union_pt(p.pos);
    }
    let margin = margin.unwrap_or_else(|| {
        let extent = rect.width().max(rect.height());
        (extent * MARGIN_FRACTION).max(MIN_MARGIN)
    });
    Some(Bounds::new(rect.inflate(margin, margin)))
}
