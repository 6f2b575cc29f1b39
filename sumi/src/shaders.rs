// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shader modules and pipeline objects.
//!
//! All shaders ship as WGSL under `shader/` and are embedded at compile
//! time; pipeline objects are created once and shared by every stroke.

use wgpu::{
    BindGroupLayout, BindGroupLayoutEntry, BindingType, ComputePipeline, Device, RenderPipeline,
    ShaderStages, TextureFormat,
};

const SEED_INIT: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shader", "/seed_init.wgsl"));
const JFA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shader", "/jfa.wgsl"));
const ENCODE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shader", "/encode.wgsl"));
const STROKE_RENDER: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shader", "/stroke_render.wgsl"));
const QUAD: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shader", "/quad.wgsl"));

/// Ping-pong seed texture format (propagated seed coordinates).
pub(crate) const FIELD_SEED_FORMAT: TextureFormat = TextureFormat::Rgba32Float;
/// Encoded single-channel distance field format.
pub(crate) const FIELD_DISTANCE_FORMAT: TextureFormat = TextureFormat::R32Float;
/// Rendered strokes, layer textures and the composite all share this format.
pub(crate) const STROKE_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

const STROKE_VERTEX_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

/// Pipeline objects for the four distance-field stages.
pub(crate) struct FieldShaders {
    pub seed_init: ComputePipeline,
    pub seed_layout: BindGroupLayout,
    pub jfa: ComputePipeline,
    pub jfa_layout: BindGroupLayout,
    pub encode: ComputePipeline,
    pub encode_layout: BindGroupLayout,
    pub stroke_render: RenderPipeline,
    pub stroke_layout: BindGroupLayout,
}

impl FieldShaders {
    pub fn new(device: &Device) -> Self {
        let seed_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sumi.seed_init"),
            entries: &[
                uniform_entry(0, ShaderStages::COMPUTE),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::COMPUTE,
                    ty: BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_texture_entry(2, FIELD_SEED_FORMAT),
            ],
        });
        let jfa_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sumi.jfa"),
            entries: &[
                uniform_entry(0, ShaderStages::COMPUTE),
                texture_entry(1, ShaderStages::COMPUTE),
                storage_texture_entry(2, FIELD_SEED_FORMAT),
            ],
        });
        let encode_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sumi.encode"),
            entries: &[
                uniform_entry(0, ShaderStages::COMPUTE),
                texture_entry(1, ShaderStages::COMPUTE),
                storage_texture_entry(2, FIELD_DISTANCE_FORMAT),
            ],
        });
        let stroke_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sumi.stroke_render"),
            entries: &[
                uniform_entry(0, ShaderStages::VERTEX_FRAGMENT),
                texture_entry(1, ShaderStages::FRAGMENT),
            ],
        });

        let seed_init = compute_pipeline(device, "sumi.seed_init", SEED_INIT, &seed_layout);
        let jfa = compute_pipeline(device, "sumi.jfa", JFA, &jfa_layout);
        let encode = compute_pipeline(device, "sumi.encode", ENCODE, &encode_layout);
        let stroke_render = stroke_render_pipeline(device, &stroke_layout);

        Self {
            seed_init,
            seed_layout,
            jfa,
            jfa_layout,
            encode,
            encode_layout,
            stroke_render,
            stroke_layout,
        }
    }
}

/// Shared resources for the textured-quad draws used by the compositors.
pub(crate) struct QuadShaders {
    pub module: wgpu::ShaderModule,
    pub layout: BindGroupLayout,
    pub sampler: wgpu::Sampler,
}

impl QuadShaders {
    pub fn new(device: &Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sumi.quad"),
            source: wgpu::ShaderSource::Wgsl(QUAD.into()),
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sumi.quad"),
            entries: &[
                uniform_entry(0, ShaderStages::VERTEX_FRAGMENT),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sumi.quad"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            module,
            layout,
            sampler,
        }
    }

    pub fn bind_group(
        &self,
        device: &Device,
        params: &wgpu::Buffer,
        source: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sumi.quad"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// A quad pipeline targeting `format`; `blend: None` overwrites.
    pub fn pipeline(
        &self,
        device: &Device,
        format: TextureFormat,
        blend: Option<wgpu::BlendState>,
    ) -> RenderPipeline {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sumi.quad"),
            bind_group_layouts: &[&self.layout],
            push_constant_ranges: &[],
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sumi.quad"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: "vs_main",
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: "fs_main",
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Non-filterable float texture (the field textures are loaded, not sampled).
fn texture_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn storage_texture_entry(binding: u32, format: TextureFormat) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
        count: None,
    }
}

fn compute_pipeline(
    device: &Device,
    label: &str,
    source: &str,
    layout: &BindGroupLayout,
) -> ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: "main",
        compilation_options: Default::default(),
        cache: None,
    })
}

fn stroke_render_pipeline(device: &Device, layout: &BindGroupLayout) -> RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("sumi.stroke_render"),
        source: wgpu::ShaderSource::Wgsl(STROKE_RENDER.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("sumi.stroke_render"),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("sumi.stroke_render"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: 8,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &STROKE_VERTEX_ATTRS,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: STROKE_FORMAT,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
