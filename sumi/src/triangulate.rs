// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ear-clipping triangulation of ribbon outlines.
//!
//! Plain ear clipping: no Steiner points, no holes. Ribbon outlines are
//! small (tens to a few hundred vertices), so the quadratic scan is fine.

use peniko::kurbo::{Point, Vec2};

use crate::ribbon::Polygon;

const AREA_EPS: f64 = 1e-12;

/// Triangulates a CCW polygon into an index list, three indices per
/// triangle. Returns `None` on failure; the caller must abort the stroke —
/// a partial triangle set is never rendered.
pub fn triangulate(polygon: &Polygon) -> Option<Vec<u32>> {
    let pts = polygon.points();
    let n = pts.len();
    if n < 3 {
        return None;
    }
    let mut ring: Vec<usize> = (0..n).collect();
    let mut indices = Vec::with_capacity((n - 2) * 3);
    while ring.len() > 3 {
        let m = ring.len();
        let mut clipped = false;
        for i in 0..m {
            let prev = ring[(i + m - 1) % m];
            let cur = ring[i];
            let next = ring[(i + 1) % m];
            let area = cross(pts[cur] - pts[prev], pts[next] - pts[cur]);
            if area < -AREA_EPS {
                // Reflex vertex.
                continue;
            }
            // Zero-area ears (collinear runs left by the seam of a closed
            // ribbon) clip immediately; nothing can lie strictly inside.
            if area > AREA_EPS
                && ring.iter().any(|&j| {
                    j != prev
                        && j != cur
                        && j != next
                        && strictly_inside(pts[j], pts[prev], pts[cur], pts[next])
                })
            {
                continue;
            }
            indices.extend([prev as u32, cur as u32, next as u32]);
            ring.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            log::warn!(
                "ear clipping stalled with {} of {} vertices remaining",
                ring.len(),
                n
            );
            return None;
        }
    }
    indices.extend([ring[0] as u32, ring[1] as u32, ring[2] as u32]);
    if indices.is_empty() || indices.len() % 3 != 0 {
        return None;
    }
    Some(indices)
}

/// Flattens polygon + indices into the vertex buffer consumed by the render
/// pass: two floats per vertex, three vertices per triangle.
pub fn vertex_data(polygon: &Polygon, indices: &[u32]) -> Vec<f32> {
    let pts = polygon.points();
    let mut out = Vec::with_capacity(indices.len() * 2);
    for &ix in indices {
        let p = pts[ix as usize];
        out.push(p.x as f32);
        out.push(p.y as f32);
    }
    out
}

fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

fn strictly_inside(p: Point, a: Point, b: Point, c: Point) -> bool {
    let d1 = cross(b - a, p - a);
    let d2 = cross(c - b, p - b);
    let d3 = cross(a - c, p - c);
    (d1 > AREA_EPS && d2 > AREA_EPS && d3 > AREA_EPS)
        || (d1 < -AREA_EPS && d2 < -AREA_EPS && d3 < -AREA_EPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon(points: &[(f64, f64)]) -> Polygon {
        Polygon::from_points(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
            .expect("test polygon")
    }

    fn triangle_area_sum(polygon: &Polygon, indices: &[u32]) -> f64 {
        let pts = polygon.points();
        indices
            .chunks_exact(3)
            .map(|t| {
                let (a, b, c) = (pts[t[0] as usize], pts[t[1] as usize], pts[t[2] as usize]);
                0.5 * cross(b - a, c - a).abs()
            })
            .sum()
    }

    #[test]
    fn square_gives_two_triangles() {
        let square = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let indices = triangulate(&square).expect("square triangulates");
        assert_eq!(indices.len(), 6);
        assert!((triangle_area_sum(&square, &indices) - square.signed_area()).abs() < 1e-9);
    }

    #[test]
    fn concave_outline_triangulates_fully() {
        let ell = polygon(&[
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 8.0),
            (8.0, 8.0),
            (8.0, 20.0),
            (0.0, 20.0),
        ]);
        let indices = triangulate(&ell).expect("L-shape triangulates");
        assert_eq!(indices.len(), (ell.len() - 2) * 3);
        assert!(indices.iter().all(|&ix| (ix as usize) < ell.len()));
        assert!((triangle_area_sum(&ell, &indices) - ell.signed_area()).abs() < 1e-9);
    }

    #[test]
    fn vertex_data_flattens_per_triangle() {
        let square = polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let indices = triangulate(&square).expect("square triangulates");
        let data = vertex_data(&square, &indices);
        assert_eq!(data.len(), indices.len() * 2);
        let first = square.points()[indices[0] as usize];
        assert_eq!(data[0] as f64, first.x);
        assert_eq!(data[1] as f64, first.y);
    }

    #[test]
    fn ribbon_outline_triangulates() {
        use crate::ribbon::build_ribbon_polygon;
        use crate::stroke::{StrokePoint, StrokeSettings};

        let settings = StrokeSettings::default();
        let points: Vec<StrokePoint> = [(0.0, 0.0), (15.0, 5.0), (30.0, 0.0), (40.0, 20.0)]
            .iter()
            .map(|&(x, y)| StrokePoint::new(x, y, 0.8))
            .collect();
        let ribbon = build_ribbon_polygon(&points, &settings).expect("ribbon");
        let indices = triangulate(&ribbon).expect("ribbon triangulates");
        assert_eq!(indices.len() % 3, 0);
        assert!(
            (triangle_area_sum(&ribbon, &indices) - ribbon.signed_area()).abs()
                < ribbon.signed_area() * 1e-6
        );
    }
}
