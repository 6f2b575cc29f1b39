// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dependency-injected orchestrator tying the geometry stages to the
//! field pipeline and the compositors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use peniko::kurbo::Size;
use wgpu::{Device, Queue, TextureView};

use crate::bounds::calculate_bounds;
use crate::composite::{Drawable, Layer, LayerCompositor, StrokeCompositor};
use crate::edges::EdgeBuffer;
use crate::field::{FieldPipeline, DEFAULT_FIELD_SIZE};
use crate::history::History;
use crate::ribbon::{build_ribbon_polygon, tap_polygon};
use crate::stroke::{StrokePoint, StrokeSettings};
use crate::triangulate::{triangulate, vertex_data};
use crate::util::block_on_wgpu;
use crate::Result;

/// Construction-time configuration for [`Renderer`].
#[derive(Clone, Debug)]
pub struct RendererOptions {
    /// Side length of the square distance-field textures.
    pub field_texture_size: u32,
    /// Minimum interval between two preview renders.
    pub preview_interval: Duration,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            field_texture_size: DEFAULT_FIELD_SIZE,
            preview_interval: Duration::from_millis(16),
        }
    }
}

/// Strokes dropped so far, by failure class.
///
/// Nothing here is surfaced to the end user; the host reads the counters for
/// diagnostics and decides what to show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FailureCounters {
    pub geometry: u64,
    pub triangulation: u64,
    pub gpu: u64,
}

/// Orchestrates the full stroke pipeline: geometry, triangulation, seed
/// edges, bounds, the GPU field passes, and compositing.
///
/// Constructed once with its GPU device and passed explicitly to callers;
/// there is no ambient global state.
pub struct Renderer {
    field: FieldPipeline,
    strokes: StrokeCompositor,
    layers: LayerCompositor,
    counters: FailureCounters,
    preview_interval: Duration,
    last_preview: Option<Instant>,
    preview_in_flight: Arc<AtomicBool>,
}

impl Renderer {
    /// Creates the pipeline and compositor objects.
    ///
    /// Shader and pipeline creation failures surface here as an error rather
    /// than at the first stroke.
    pub fn new(device: &Device, options: RendererOptions) -> Result<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let field = FieldPipeline::new(device, options.field_texture_size);
        let strokes = StrokeCompositor::new(device);
        let layers = LayerCompositor::new(device);
        if let Some(error) = block_on_wgpu(device, device.pop_error_scope()) {
            return Err(error.into());
        }
        Ok(Self {
            field,
            strokes,
            layers,
            counters: FailureCounters::default(),
            preview_interval: options.preview_interval,
            last_preview: None,
            preview_in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn counters(&self) -> FailureCounters {
        self.counters
    }

    /// Renders a finished stroke, writes it into `layer`, and registers the
    /// undoable add/remove with `history`.
    ///
    /// Returns `None` when the stroke is dropped: degenerate geometry, a
    /// failed triangulation, unusable bounds, or a GPU failure. Prior canvas
    /// state is untouched in that case and nothing reaches history.
    pub fn finalize_stroke(
        &mut self,
        device: &Device,
        queue: &Queue,
        points: &[StrokePoint],
        settings: &StrokeSettings,
        layer: &Layer,
        history: &mut dyn History,
    ) -> Option<Arc<Drawable>> {
        let drawable = self.render_stroke(device, queue, points, settings)?;
        self.strokes
            .composite(device, queue, &drawable, layer, history);
        Some(drawable)
    }

    /// Renders an in-progress stroke for live display without touching any
    /// layer or history.
    ///
    /// Previews are throttled to the configured interval and are non-queued:
    /// a request arriving while the previous preview submission is still in
    /// flight is dropped (last-completed-wins), so a slow GPU never
    /// accumulates a backlog.
    pub fn preview_stroke(
        &mut self,
        device: &Device,
        queue: &Queue,
        points: &[StrokePoint],
        settings: &StrokeSettings,
    ) -> Option<Arc<Drawable>> {
        if self.preview_in_flight.load(Ordering::Acquire) {
            return None;
        }
        if let Some(last) = self.last_preview {
            if last.elapsed() < self.preview_interval {
                return None;
            }
        }
        let drawable = self.render_stroke(device, queue, points, settings)?;
        self.last_preview = Some(Instant::now());
        self.preview_in_flight.store(true, Ordering::Release);
        let in_flight = self.preview_in_flight.clone();
        queue.on_submitted_work_done(move || in_flight.store(false, Ordering::Release));
        Some(drawable)
    }

    /// Recomposes `layers` into `composite` and presents the result to
    /// `display`.
    pub fn composite_layers(
        &self,
        device: &Device,
        queue: &Queue,
        layers: &[Layer],
        composite: &TextureView,
        display: &TextureView,
        flip_y: bool,
    ) {
        self.layers
            .composite(device, queue, layers, composite, display, flip_y);
    }

    /// Returns the drawing state to "not drawing".
    ///
    /// Called after a device loss cancelled an in-flight stroke. Per-stroke
    /// GPU resources are scoped to the generation call and are already gone;
    /// only the preview state needs clearing. The next stroke starts fresh.
    pub fn reset(&mut self) {
        self.last_preview = None;
        self.preview_in_flight.store(false, Ordering::Release);
    }

    fn render_stroke(
        &mut self,
        device: &Device,
        queue: &Queue,
        points: &[StrokePoint],
        settings: &StrokeSettings,
    ) -> Option<Arc<Drawable>> {
        // A stroke too short for a ribbon may still be a tap.
        let polygon = build_ribbon_polygon(points, settings)
            .or_else(|| tap_polygon(points, settings));
        let Some(polygon) = polygon else {
            self.counters.geometry += 1;
            return None;
        };
        let Some(indices) = triangulate(&polygon) else {
            self.counters.triangulation += 1;
            log::warn!("stroke dropped: triangulation failed");
            return None;
        };
        let Some(edges) = EdgeBuffer::from_polygon(&polygon) else {
            self.counters.geometry += 1;
            return None;
        };
        let Some(mut bounds) = calculate_bounds(points, None) else {
            self.counters.geometry += 1;
            return None;
        };
        if let Some(frame) = settings.clip_frame {
            bounds = bounds.clip_to(frame);
        }
        if !bounds.is_renderable() {
            self.counters.geometry += 1;
            log::debug!("stroke dropped: bounds degenerate after clipping");
            return None;
        }
        let mesh = vertex_data(&polygon, &indices);
        let Some(output) = self
            .field
            .generate(device, queue, &edges, &bounds, &mesh, settings)
        else {
            self.counters.gpu += 1;
            return None;
        };
        Some(Arc::new(Drawable::new(
            output.texture,
            bounds.origin(),
            Size::new(bounds.width(), bounds.height()),
            settings.blend_mode,
        )))
    }
}

static_assertions::assert_impl_all!(Renderer: Send);
