// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The GPU distance-field pipeline: seed-init, jump-flooding iterations,
//! distance encoding, and the final stroke render.
//!
//! The four stages run strictly in sequence on a single command stream; each
//! one consumes the previous stage's texture. Every GPU resource created for
//! one `generate` call is owned by that call and dropped when it returns —
//! the caller receives only the output textures.

use wgpu::util::DeviceExt;
use wgpu::{Buffer, CommandEncoder, Device, Queue, Texture, TextureView};

use crate::bounds::Bounds;
use crate::edges::EdgeBuffer;
use crate::shaders::{FieldShaders, FIELD_DISTANCE_FORMAT, FIELD_SEED_FORMAT, STROKE_FORMAT};
use crate::stroke::StrokeSettings;
use crate::util::block_on_wgpu;

/// Default side length of the (square) field textures.
pub const DEFAULT_FIELD_SIZE: u32 = 512;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuEdge {
    p0: [f32; 2],
    p1: [f32; 2],
    normal: [f32; 2],
    index: u32,
    pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct FieldUniforms {
    size: [u32; 2],
    edge_count: u32,
    step: u32,
    origin: [f32; 2],
    texel: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RenderUniforms {
    origin: [f32; 2],
    extent: [f32; 2],
    color: [f32; 4],
    feather: [f32; 2],
    erase: u32,
    pad: u32,
}

/// Result of one field generation. The caller owns both textures; dropping
/// `distance` right away is fine for callers that only composite.
pub struct FieldOutput {
    /// The rendered, premultiplied stroke (`Rgba8Unorm`).
    pub texture: Texture,
    /// The encoded single-channel distance field (`R32Float`).
    pub distance: Texture,
    pub width: u32,
    pub height: u32,
}

/// The four sequential stages of the field pipeline.
///
/// The geometry, bounds and edge-buffer layers are backend-neutral; a
/// backend implements these four hooks and [`generate_distance_field`]
/// drives them in order.
pub trait FieldStages {
    /// Side length of the (square) field textures this backend works at.
    fn size(&self) -> u32;
    /// Clears the seed texture to the sentinel and rasterizes edge seeds.
    fn seed_init(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        params: &Buffer,
        edges: &Buffer,
        target: &TextureView,
    );
    /// One jump-flooding pass from `src` to `dst` at the step baked into
    /// `params`.
    fn jfa_pass(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        params: &Buffer,
        src: &TextureView,
        dst: &TextureView,
    );
    /// Collapses propagated seeds into normalized distances.
    fn encode(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        params: &Buffer,
        src: &TextureView,
        dst: &TextureView,
    );
    /// Draws the triangulated ribbon mesh shaded from the encoded field.
    #[allow(clippy::too_many_arguments)]
    fn render(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        params: &Buffer,
        field: &TextureView,
        vertices: &Buffer,
        vertex_count: u32,
        target: &TextureView,
    );
}

/// wgpu implementation of [`FieldStages`] plus the per-stroke orchestration.
pub struct FieldPipeline {
    shaders: FieldShaders,
    texture_size: u32,
}

impl FieldPipeline {
    pub fn new(device: &Device, texture_size: u32) -> Self {
        Self {
            shaders: FieldShaders::new(device),
            texture_size: texture_size.max(16),
        }
    }

    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    /// Generates the distance field and renders the stroke from it.
    ///
    /// Returns `None` without allocating any GPU resource when the input is
    /// unusable (no edges, degenerate bounds, empty mesh), and `None` after
    /// logging when the GPU reports a validation or out-of-memory error; the
    /// caller treats `None` as "stroke dropped".
    pub fn generate(
        &self,
        device: &Device,
        queue: &Queue,
        edges: &EdgeBuffer,
        bounds: &Bounds,
        vertex_data: &[f32],
        settings: &StrokeSettings,
    ) -> Option<FieldOutput> {
        if edges.is_empty() {
            log::debug!("distance field skipped: no seed edges");
            return None;
        }
        if !bounds.is_renderable() {
            log::debug!("distance field skipped: degenerate bounds {bounds:?}");
            return None;
        }
        if vertex_data.is_empty() || vertex_data.len() % 6 != 0 {
            log::debug!("distance field skipped: invalid vertex buffer");
            return None;
        }
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let output = generate_distance_field(self, device, queue, edges, bounds, vertex_data, settings);
        let validation = block_on_wgpu(device, device.pop_error_scope());
        let oom = block_on_wgpu(device, device.pop_error_scope());
        if let Some(error) = validation.or(oom) {
            log::error!("stroke dropped: distance field generation failed: {error}");
            return None;
        }
        Some(output)
    }

    fn workgroups(&self) -> (u32, u32, u32) {
        let groups = self.texture_size.div_ceil(8);
        (groups, groups, 1)
    }
}

/// Runs the four stages over a backend. Intermediate textures and buffers
/// live exactly as long as this call.
fn generate_distance_field(
    stages: &dyn FieldStages,
    device: &Device,
    queue: &Queue,
    edges: &EdgeBuffer,
    bounds: &Bounds,
    vertex_data: &[f32],
    settings: &StrokeSettings,
) -> FieldOutput {
    let size = stages.size();
    let iterations = 32 - (size.max(2) - 1).leading_zeros();

    let gpu_edges: Vec<GpuEdge> = edges
        .edges()
        .iter()
        .map(|e| GpuEdge {
            p0: [e.p0.x as f32, e.p0.y as f32],
            p1: [e.p1.x as f32, e.p1.y as f32],
            normal: [e.normal.x as f32, e.normal.y as f32],
            index: e.index,
            pad: 0,
        })
        .collect();
    let edge_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("sumi.edges"),
        contents: bytemuck::cast_slice(&gpu_edges),
        usage: wgpu::BufferUsages::STORAGE,
    });

    let base = FieldUniforms {
        size: [size, size],
        edge_count: gpu_edges.len() as u32,
        step: 0,
        origin: [bounds.min_x() as f32, bounds.min_y() as f32],
        texel: [
            (bounds.width() / size as f64) as f32,
            (bounds.height() / size as f64) as f32,
        ],
    };
    let field_params = uniform(device, "sumi.field_params", &base);
    let step_params: Vec<Buffer> = (0..iterations)
        .rev()
        .map(|k| uniform(device, "sumi.jfa_params", &FieldUniforms { step: 1 << k, ..base }))
        .collect();

    let ping = field_texture(device, "sumi.jfa_ping", size, FIELD_SEED_FORMAT);
    let pong = field_texture(device, "sumi.jfa_pong", size, FIELD_SEED_FORMAT);
    let distance = field_texture(device, "sumi.distance", size, FIELD_DISTANCE_FORMAT);
    let output = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sumi.stroke"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: STROKE_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let ping_view = ping.create_view(&wgpu::TextureViewDescriptor::default());
    let pong_view = pong.create_view(&wgpu::TextureViewDescriptor::default());
    let distance_view = distance.create_view(&wgpu::TextureViewDescriptor::default());
    let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

    let color = settings.color;
    let render_params = uniform(
        device,
        "sumi.render_params",
        &RenderUniforms {
            origin: base.origin,
            extent: [bounds.width() as f32, bounds.height() as f32],
            color: [
                color.r as f32 / 255.0,
                color.g as f32 / 255.0,
                color.b as f32 / 255.0,
                settings.opacity,
            ],
            feather: [settings.feather.0, settings.feather.1],
            erase: u32::from(settings.blend_mode.is_erase()),
            pad: 0,
        },
    );
    let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("sumi.stroke_mesh"),
        contents: bytemuck::cast_slice(vertex_data),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let vertex_count = (vertex_data.len() / 2) as u32;

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("sumi.field"),
    });
    stages.seed_init(device, &mut encoder, &field_params, &edge_buf, &ping_view);
    let (mut src, mut dst) = (&ping_view, &pong_view);
    for params in &step_params {
        stages.jfa_pass(device, &mut encoder, params, src, dst);
        std::mem::swap(&mut src, &mut dst);
    }
    stages.encode(device, &mut encoder, &field_params, src, &distance_view);
    stages.render(
        device,
        &mut encoder,
        &render_params,
        &distance_view,
        &vertices,
        vertex_count,
        &output_view,
    );
    queue.submit([encoder.finish()]);

    FieldOutput {
        texture: output,
        distance,
        width: size,
        height: size,
    }
}

impl FieldStages for FieldPipeline {
    fn size(&self) -> u32 {
        self.texture_size
    }

    fn seed_init(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        params: &Buffer,
        edges: &Buffer,
        target: &TextureView,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sumi.seed_init"),
            layout: &self.shaders.seed_layout,
            entries: &[
                buffer_entry(0, params),
                buffer_entry(1, edges),
                texture_entry(2, target),
            ],
        });
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("sumi.seed_init"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.shaders.seed_init);
        pass.set_bind_group(0, &bind_group, &[]);
        let (x, y, z) = self.workgroups();
        pass.dispatch_workgroups(x, y, z);
    }

    fn jfa_pass(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        params: &Buffer,
        src: &TextureView,
        dst: &TextureView,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sumi.jfa"),
            layout: &self.shaders.jfa_layout,
            entries: &[
                buffer_entry(0, params),
                texture_entry(1, src),
                texture_entry(2, dst),
            ],
        });
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("sumi.jfa"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.shaders.jfa);
        pass.set_bind_group(0, &bind_group, &[]);
        let (x, y, z) = self.workgroups();
        pass.dispatch_workgroups(x, y, z);
    }

    fn encode(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        params: &Buffer,
        src: &TextureView,
        dst: &TextureView,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sumi.encode"),
            layout: &self.shaders.encode_layout,
            entries: &[
                buffer_entry(0, params),
                texture_entry(1, src),
                texture_entry(2, dst),
            ],
        });
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("sumi.encode"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.shaders.encode);
        pass.set_bind_group(0, &bind_group, &[]);
        let (x, y, z) = self.workgroups();
        pass.dispatch_workgroups(x, y, z);
    }

    fn render(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        params: &Buffer,
        field: &TextureView,
        vertices: &Buffer,
        vertex_count: u32,
        target: &TextureView,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sumi.stroke_render"),
            layout: &self.shaders.stroke_layout,
            entries: &[buffer_entry(0, params), texture_entry(1, field)],
        });
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sumi.stroke_render"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.shaders.stroke_render);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, vertices.slice(..));
        pass.draw(0..vertex_count, 0..1);
    }
}

fn uniform<T: bytemuck::Pod>(device: &Device, label: &str, value: &T) -> Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM,
    })
}

fn field_texture(device: &Device, label: &str, size: u32, format: wgpu::TextureFormat) -> Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn buffer_entry(binding: u32, buffer: &Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    }
}

fn texture_entry(binding: u32, view: &TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }
}
