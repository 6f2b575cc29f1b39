// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing: placing rendered strokes into layers and merging layers into
//! the display target.
//!
//! Everything downstream of the stroke render works on premultiplied alpha,
//! so each blend mode is a fixed-function [`wgpu::BlendState`] and layer
//! opacity is a single uniform multiplier applied to all channels.

use std::sync::{Arc, Mutex};

use peniko::kurbo::{Affine, Point, Size};
use wgpu::util::DeviceExt;
use wgpu::{CommandEncoder, Device, Queue, RenderPipeline, Texture, TextureView};

use crate::history::{History, HistoryEntry};
use crate::shaders::{QuadShaders, STROKE_FORMAT};
use crate::stroke::BlendMode;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadParams {
    /// Quad placement in normalized target coordinates, y-down.
    rect: [f32; 4],
    opacity: f32,
    flip_y: u32,
    pad: [f32; 2],
}

/// A rendered stroke placed on a layer: the stroke texture plus where its
/// bounds sit in canvas space.
#[derive(Debug)]
pub struct Drawable {
    pub texture: Texture,
    view: TextureView,
    /// Canvas position of the texture's top-left corner.
    pub origin: Point,
    /// Canvas extent the texture is mapped onto.
    pub size: Size,
    pub blend_mode: BlendMode,
}

impl Drawable {
    pub fn new(texture: Texture, origin: Point, size: Size, blend_mode: BlendMode) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            origin,
            size,
            blend_mode,
        }
    }
}

/// Shared handle to a layer's ordered drawable list; history undo/redo
/// closures hold clones of it.
pub type DrawableList = Arc<Mutex<Vec<Arc<Drawable>>>>;

/// One drawing layer: an FBO-style render target plus the state the layer
/// compositor consumes.
///
/// Layers are created and destroyed by the host's layer-management
/// collaborator; [`StrokeCompositor`] writes strokes into the texture and the
/// drawable list is shared with history undo/redo closures.
pub struct Layer {
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub visible: bool,
    /// Carried for the host's coordinate transforms; compositing itself
    /// draws layers as full-canvas quads.
    pub transform: Affine,
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
    drawables: DrawableList,
}

impl Layer {
    /// Creates an empty (transparent) layer target of the given pixel size.
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sumi.layer"),
            size: wgpu::Extent3d {
                width,
                height,
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
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            visible: true,
            transform: Affine::IDENTITY,
            texture,
            view,
            width,
            height,
            drawables: DrawableList::default(),
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Shared handle to the layer's ordered drawable list.
    pub fn drawables(&self) -> DrawableList {
        self.drawables.clone()
    }

    pub fn drawable_count(&self) -> usize {
        self.drawables.lock().expect("drawable list poisoned").len()
    }
}

/// Blend state applied to a premultiplied source under the given mode.
///
/// `Erase` keeps `(Zero, OneMinusSrcAlpha)` on both components: the source
/// color is discarded and its alpha removes paint from the target.
pub(crate) fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    use wgpu::{BlendComponent, BlendFactor, BlendOperation};
    let alpha_over = BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    };
    match mode {
        BlendMode::Normal => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        BlendMode::Multiply => wgpu::BlendState {
            color: BlendComponent {
                src_factor: BlendFactor::Dst,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            alpha: alpha_over,
        },
        BlendMode::Screen => wgpu::BlendState {
            color: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::OneMinusSrc,
                operation: BlendOperation::Add,
            },
            alpha: alpha_over,
        },
        BlendMode::Add => wgpu::BlendState {
            color: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            },
            alpha: alpha_over,
        },
        BlendMode::Erase => {
            let subtractive = BlendComponent {
                src_factor: BlendFactor::Zero,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            };
            wgpu::BlendState {
                color: subtractive,
                alpha: subtractive,
            }
        }
    }
}

/// One quad pipeline per blend mode, all targeting the layer format.
struct BlendPipelines {
    normal: RenderPipeline,
    multiply: RenderPipeline,
    screen: RenderPipeline,
    add: RenderPipeline,
    erase: RenderPipeline,
}

impl BlendPipelines {
    fn new(device: &Device, quad: &QuadShaders) -> Self {
        let build = |mode| quad.pipeline(device, STROKE_FORMAT, Some(blend_state(mode)));
        Self {
            normal: build(BlendMode::Normal),
            multiply: build(BlendMode::Multiply),
            screen: build(BlendMode::Screen),
            add: build(BlendMode::Add),
            erase: build(BlendMode::Erase),
        }
    }

    fn for_mode(&self, mode: BlendMode) -> &RenderPipeline {
        match mode {
            BlendMode::Normal => &self.normal,
            BlendMode::Multiply => &self.multiply,
            BlendMode::Screen => &self.screen,
            BlendMode::Add => &self.add,
            BlendMode::Erase => &self.erase,
        }
    }
}

/// Writes finalized strokes into their layer and registers the undoable
/// add/remove with the history collaborator.
pub struct StrokeCompositor {
    quad: QuadShaders,
    pipelines: BlendPipelines,
}

impl StrokeCompositor {
    pub fn new(device: &Device) -> Self {
        let quad = QuadShaders::new(device);
        let pipelines = BlendPipelines::new(device, &quad);
        Self { quad, pipelines }
    }

    /// Draws `drawable` into the layer texture at its canvas position,
    /// appends it to the layer's drawable list, and pushes the undoable
    /// entry.
    pub fn composite(
        &self,
        device: &Device,
        queue: &Queue,
        drawable: &Arc<Drawable>,
        layer: &Layer,
        history: &mut dyn History,
    ) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sumi.stroke_composite"),
        });
        self.draw(device, &mut encoder, drawable, layer);
        queue.submit([encoder.finish()]);

        let drawables = layer.drawables();
        push_drawable(&drawables, drawable);
        let redo_list = drawables.clone();
        let redo_drawable = drawable.clone();
        let undo_drawable = drawable.clone();
        history.push(HistoryEntry {
            label: "stroke",
            redo: Box::new(move || push_drawable(&redo_list, &redo_drawable)),
            undo: Box::new(move || remove_drawable(&drawables, &undo_drawable)),
        });
    }

    fn draw(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        drawable: &Drawable,
        layer: &Layer,
    ) {
        let (width, height) = layer.size();
        let params = uniform(
            device,
            "sumi.stroke_composite",
            &QuadParams {
                rect: [
                    (drawable.origin.x / f64::from(width)) as f32,
                    (drawable.origin.y / f64::from(height)) as f32,
                    (drawable.size.width / f64::from(width)) as f32,
                    (drawable.size.height / f64::from(height)) as f32,
                ],
                opacity: 1.0,
                flip_y: 0,
                pad: [0.0; 2],
            },
        );
        let bind_group = self.quad.bind_group(device, &params, &drawable.view);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sumi.stroke_composite"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &layer.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(self.pipelines.for_mode(drawable.blend_mode));
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..6, 0..1);
    }
}

fn push_drawable(list: &DrawableList, drawable: &Arc<Drawable>) {
    let mut list = list.lock().expect("drawable list poisoned");
    if !list.iter().any(|d| Arc::ptr_eq(d, drawable)) {
        list.push(drawable.clone());
    }
}

fn remove_drawable(list: &DrawableList, drawable: &Arc<Drawable>) {
    list.lock()
        .expect("drawable list poisoned")
        .retain(|d| !Arc::ptr_eq(d, drawable));
}

/// Merges the visible layers into a composite target and presents the result
/// to the display target.
pub struct LayerCompositor {
    quad: QuadShaders,
    pipelines: BlendPipelines,
    blit: RenderPipeline,
}

impl LayerCompositor {
    pub fn new(device: &Device) -> Self {
        let quad = QuadShaders::new(device);
        let pipelines = BlendPipelines::new(device, &quad);
        let blit = quad.pipeline(device, STROKE_FORMAT, None);
        Self {
            quad,
            pipelines,
            blit,
        }
    }

    /// Recomposes `layers` bottom-to-top into `composite`, then blits the
    /// result to `display`. Invisible and zero-opacity layers are skipped;
    /// `flip_y` flips the final blit for targets with the opposite row
    /// order.
    pub fn composite(
        &self,
        device: &Device,
        queue: &Queue,
        layers: &[Layer],
        composite: &TextureView,
        display: &TextureView,
        flip_y: bool,
    ) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sumi.layer_composite"),
        });
        self.compose(device, &mut encoder, layers, composite);
        self.present(device, &mut encoder, composite, display, flip_y);
        queue.submit([encoder.finish()]);
    }

    fn compose(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        layers: &[Layer],
        target: &TextureView,
    ) {
        let mut draws = Vec::with_capacity(layers.len());
        for layer in layers {
            if !layer.visible || layer.opacity <= 0.0 {
                continue;
            }
            let params = uniform(
                device,
                "sumi.layer_params",
                &QuadParams {
                    rect: [0.0, 0.0, 1.0, 1.0],
                    opacity: layer.opacity.min(1.0),
                    flip_y: 0,
                    pad: [0.0; 2],
                },
            );
            let bind_group = self.quad.bind_group(device, &params, &layer.view);
            draws.push((self.pipelines.for_mode(layer.blend_mode), bind_group));
        }
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sumi.layer_compose"),
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
        for (pipeline, bind_group) in &draws {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
    }

    fn present(
        &self,
        device: &Device,
        encoder: &mut CommandEncoder,
        composite: &TextureView,
        display: &TextureView,
        flip_y: bool,
    ) {
        let params = uniform(
            device,
            "sumi.present",
            &QuadParams {
                rect: [0.0, 0.0, 1.0, 1.0],
                opacity: 1.0,
                flip_y: u32::from(flip_y),
                pad: [0.0; 2],
            },
        );
        let bind_group = self.quad.bind_group(device, &params, composite);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sumi.present"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: display,
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
        pass.set_pipeline(&self.blit);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..6, 0..1);
    }
}

fn uniform<T: bytemuck::Pod>(device: &Device, label: &str, value: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(value),
        usage: wgpu::BufferUsages::UNIFORM,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::BlendFactor;

    #[test]
    fn quad_params_match_shader_layout() {
        assert_eq!(std::mem::size_of::<QuadParams>(), 32);
    }

    #[test]
    fn erase_ignores_source_color() {
        let state = blend_state(BlendMode::Erase);
        assert_eq!(state.color.src_factor, BlendFactor::Zero);
        assert_eq!(state.alpha.src_factor, BlendFactor::Zero);
        assert_eq!(state.alpha.dst_factor, BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn normal_is_premultiplied_over() {
        assert_eq!(
            blend_state(BlendMode::Normal),
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING
        );
    }
}
