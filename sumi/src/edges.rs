// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Boundary edges of the ribbon outline, used to seed the distance field.
//!
//! The edge buffer is built over the outline, not the triangulated mesh:
//! the field propagates from the stroke's silhouette.

use peniko::kurbo::{Point, Vec2};

use crate::ribbon::{build_ribbon_polygon, Polygon};
use crate::stroke::{StrokePoint, StrokeSettings};

/// One boundary edge `(i, i+1 mod n)` of the outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeRecord {
    pub p0: Point,
    pub p1: Point,
    /// Outward normal: `p1 - p0` rotated -90 degrees, normalized.
    pub normal: Vec2,
    pub index: u32,
}

/// Ordered boundary edges of one outline. Length equals the outline vertex
/// count, not the triangle count.
#[derive(Clone, Debug, Default)]
pub struct EdgeBuffer {
    edges: Vec<EdgeRecord>,
}

impl EdgeBuffer {
    /// Wraps explicit records. Useful for synthetic seed geometry (a
    /// degenerate `p0 == p1` record seeds a single point).
    pub fn from_records(edges: Vec<EdgeRecord>) -> Self {
        Self { edges }
    }

    /// Derives the edge buffer from an already-built ribbon outline.
    pub fn from_polygon(polygon: &Polygon) -> Option<Self> {
        let pts = polygon.points();
        let n = pts.len();
        if n < 3 {
            return None;
        }
        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let p0 = pts[i];
            let p1 = pts[(i + 1) % n];
            let d = p1 - p0;
            if d.hypot() < 1e-12 {
                continue;
            }
            let dir = d.normalize();
            edges.push(EdgeRecord {
                p0,
                p1,
                normal: Vec2::new(dir.y, -dir.x),
                index: edges.len() as u32,
            });
        }
        if edges.is_empty() {
            None
        } else {
            Some(Self { edges })
        }
    }

    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Builds the seed-edge buffer for a stroke, re-deriving the ribbon from the
/// same points and settings. Callers that already hold the polygon can use
/// [`EdgeBuffer::from_polygon`] instead and skip the recomputation.
pub fn build_edge_buffer(points: &[StrokePoint], settings: &StrokeSettings) -> Option<EdgeBuffer> {
    let polygon = build_ribbon_polygon(points, settings)?;
    EdgeBuffer::from_polygon(&polygon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_edges_point_outward() {
        let square = Polygon::from_points(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ])
        .expect("square");
        let buffer = EdgeBuffer::from_polygon(&square).expect("edges");
        assert_eq!(buffer.len(), square.len());
        let centroid = Point::new(5.0, 5.0);
        for (i, edge) in buffer.edges().iter().enumerate() {
            assert_eq!(edge.index, i as u32);
            assert!((edge.normal.hypot() - 1.0).abs() < 1e-12);
            let mid = edge.p0.midpoint(edge.p1);
            assert!(edge.normal.dot(mid - centroid) > 0.0, "normal {i} points inward");
        }
    }

    #[test]
    fn edge_count_matches_outline_not_mesh() {
        let settings = StrokeSettings::default();
        let points: Vec<StrokePoint> = [(0.0, 0.0), (20.0, 0.0), (40.0, 10.0)]
            .iter()
            .map(|&(x, y)| StrokePoint::new(x, y, 1.0))
            .collect();
        let polygon = build_ribbon_polygon(&points, &settings).expect("ribbon");
        let buffer = build_edge_buffer(&points, &settings).expect("edges");
        assert_eq!(buffer.len(), polygon.len());
    }

    #[test]
    fn degenerate_polygon_has_no_edges() {
        assert!(build_edge_buffer(&[StrokePoint::new(1.0, 1.0, 1.0)], &StrokeSettings::default())
            .is_none());
    }
}
