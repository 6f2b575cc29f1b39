// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroke input samples and per-stroke settings.

use peniko::kurbo::{Point, Rect, Vec2};
use peniko::Color;

/// A single pointer sample, in canvas-local units.
///
/// Points are appended while a stroke is active and are immutable once the
/// stroke is finalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokePoint {
    pub pos: Point,
    /// Pen pressure in `[0, 1]`.
    pub pressure: f64,
    /// Pen tilt, when the device reports one.
    pub tilt: Option<Vec2>,
    /// Barrel rotation, when the device reports one.
    pub twist: Option<f64>,
}

impl StrokePoint {
    pub fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self {
            pos: Point::new(x, y),
            pressure,
            tilt: None,
            twist: None,
        }
    }
}

/// How a finalized stroke combines with the content below it.
///
/// `Erase` is alpha-subtractive: the stroke's color channels are ignored and
/// its alpha removes paint from the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Add,
    Erase,
}

impl BlendMode {
    pub fn is_erase(self) -> bool {
        self == Self::Erase
    }
}

/// Turn-angle bounds (in degrees) deciding when an interior joint is
/// flattened to a bevel.
///
/// The effective threshold interpolates from `slow_angle` to `fast_angle`
/// with the local drawing speed; `extreme_angle` is an absolute bound that
/// always bevels, independent of speed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JoinThresholds {
    pub slow_angle: f64,
    pub fast_angle: f64,
    pub extreme_angle: f64,
}

impl Default for JoinThresholds {
    fn default() -> Self {
        Self {
            slow_angle: 90.0,
            fast_angle: 120.0,
            extreme_angle: 45.0,
        }
    }
}

/// Brush and geometry configuration for one stroke.
#[derive(Clone, Debug)]
pub struct StrokeSettings {
    /// Brush diameter at full pressure, in canvas units.
    pub base_size: f64,
    pub color: Color,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub joins: JoinThresholds,
    /// Arc segments swept per rounded cap.
    pub cap_segments: usize,
    /// A stroke whose endpoints are closer than `base_size` times this is
    /// treated as a closed shape and gets no caps.
    pub closed_loop_threshold: f64,
    /// Pressure is clamped into this range before scaling the radius.
    pub pressure_range: (f64, f64),
    /// `smoothstep` window applied to the normalized distance when shading.
    pub feather: (f32, f32),
    /// Active view frame; stroke bounds are clipped to it when present.
    pub clip_frame: Option<Rect>,
}

impl Default for StrokeSettings {
    fn default() -> Self {
        Self {
            base_size: 10.0,
            color: Color::BLACK,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            joins: JoinThresholds::default(),
            cap_segments: 8,
            closed_loop_threshold: 0.5,
            pressure_range: (0.05, 1.0),
            feather: (0.4, 0.6),
            clip_frame: None,
        }
    }
}

impl StrokeSettings {
    /// Offset radius for a given raw pressure.
    pub fn radius(&self, pressure: f64) -> f64 {
        let (lo, hi) = self.pressure_range;
        self.base_size * 0.5 * pressure.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_clamps_pressure() {
        let settings = StrokeSettings::default();
        assert_eq!(settings.radius(1.0), 5.0);
        assert_eq!(settings.radius(2.0), 5.0);
        assert_eq!(settings.radius(0.0), settings.radius(0.05));
    }

    #[test]
    fn erase_is_only_erase() {
        assert!(BlendMode::Erase.is_erase());
        assert!(!BlendMode::Normal.is_erase());
        assert!(!BlendMode::Add.is_erase());
    }
}
