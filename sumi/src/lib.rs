// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sumi turns a stream of pressure-tagged pointer samples into an
//! antialiased, brush-colored mark in a layer's texture.
//!
//! The pipeline has two halves:
//!
//! - CPU geometry: [`build_ribbon_polygon`] offsets the stroke's centerline
//!   into a closed outline, [`triangulate`] ear-clips it into a mesh, and
//!   [`build_edge_buffer`] emits the outline's boundary edges.
//! - GPU passes: [`FieldPipeline`] seeds a texture from the boundary edges,
//!   propagates nearest-seed coordinates with the jump flooding algorithm,
//!   encodes a normalized distance field, and renders the stroke from it.
//!   [`StrokeCompositor`] then places the result in a layer, and
//!   [`LayerCompositor`] merges the layers for display.
//!
//! [`Renderer`] owns the GPU stages and orchestrates a full stroke via
//! [`Renderer::finalize_stroke`]. Everything is constructor-injected; the
//! crate holds no global state. The distance field is single-channel and
//! unsigned.
//!
//! With the `wgpu` feature disabled, only the CPU geometry stages are built.

mod bounds;
mod edges;
mod history;
mod ribbon;
mod stroke;
mod triangulate;

#[cfg(feature = "wgpu")]
mod composite;
#[cfg(feature = "wgpu")]
mod field;
#[cfg(feature = "wgpu")]
mod renderer;
#[cfg(feature = "wgpu")]
mod shaders;
#[cfg(feature = "wgpu")]
pub mod util;

pub use peniko;
pub use peniko::kurbo;
#[cfg(feature = "wgpu")]
pub use wgpu;

pub use bounds::{calculate_bounds, Bounds};
pub use edges::{build_edge_buffer, EdgeBuffer, EdgeRecord};
pub use history::{History, HistoryEntry};
pub use ribbon::{build_ribbon_polygon, dot_polygon, Polygon, RibbonSegment};
pub use stroke::{BlendMode, JoinThresholds, StrokePoint, StrokeSettings};
pub use triangulate::{triangulate, vertex_data};

#[cfg(feature = "wgpu")]
pub use composite::{Drawable, DrawableList, Layer, LayerCompositor, StrokeCompositor};
#[cfg(feature = "wgpu")]
pub use field::{FieldOutput, FieldPipeline, FieldStages, DEFAULT_FIELD_SIZE};
#[cfg(feature = "wgpu")]
pub use renderer::{FailureCounters, Renderer, RendererOptions};

/// Errors from pipeline initialization and explicit synchronization points.
///
/// Per-stroke failures are not errors: a dropped stroke is a `None` at the
/// call that dropped it, counted in [`FailureCounters`].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// There is no available device with the features required by the
    /// pipeline.
    #[cfg(feature = "wgpu")]
    #[error("couldn't find a suitable device")]
    NoCompatibleDevice,
    /// Failed to async map a readback buffer.
    /// See [`wgpu::BufferAsyncError`] for more information.
    #[cfg(feature = "wgpu")]
    #[error("failed to async map a buffer")]
    BufferAsyncError(#[from] wgpu::BufferAsyncError),
    /// A readback was requested for a texture format without a fixed texel
    /// byte width.
    #[cfg(feature = "wgpu")]
    #[error("texture format {0:?} cannot be read back")]
    UnsupportedReadbackFormat(wgpu::TextureFormat),
    /// The readback channel closed before the map callback delivered a
    /// result.
    #[cfg(feature = "wgpu")]
    #[error("readback channel closed")]
    ReadbackChannelClosed,
    #[cfg(feature = "wgpu")]
    #[error("wgpu Error from scope")]
    WgpuErrorFromScope(#[from] wgpu::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
