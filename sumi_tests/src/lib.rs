// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared harness for Sumi's GPU integration tests.

use anyhow::{anyhow, Result};
use sumi::util::{read_texture, RenderContext};
use sumi::wgpu::{self, Device, Queue};
use sumi::StrokePoint;

/// A usable GPU device for one test.
pub struct TestContext {
    pub device: Device,
    pub queue: Queue,
}

/// Acquires a compute-capable device, or `None` when the machine has no
/// usable adapter; tests return early in that case instead of failing.
pub fn gpu_context() -> Option<TestContext> {
    let mut context = RenderContext::new();
    let id = pollster::block_on(context.device())?;
    let handle = &context.devices[id];
    let flags = handle.adapter().get_downlevel_capabilities().flags;
    if !flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS) {
        return None;
    }
    Some(TestContext {
        device: handle.device.clone(),
        queue: handle.queue.clone(),
    })
}

/// Unpadded texture contents.
pub fn read_pixels(ctx: &TestContext, texture: &wgpu::Texture) -> Result<Vec<u8>> {
    read_texture(&ctx.device, &ctx.queue, texture).map_err(|e| anyhow!("readback failed: {e}"))
}

/// `R32Float` texture contents as `f32` texels.
pub fn read_distances(ctx: &TestContext, texture: &wgpu::Texture) -> Result<Vec<f32>> {
    let bytes = read_pixels(ctx, texture)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Constant-pressure stroke points.
pub fn stroke(points: &[(f64, f64)], pressure: f64) -> Vec<StrokePoint> {
    points
        .iter()
        .map(|&(x, y)| StrokePoint::new(x, y, pressure))
        .collect()
}

/// A render-attachment texture the compositors can also sample and read.
pub fn target_texture(ctx: &TestContext, width: u32, height: u32) -> wgpu::Texture {
    ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// One `Rgba8` pixel of an unpadded readback.
pub fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let start = ((y * width + x) * 4) as usize;
    [
        pixels[start],
        pixels[start + 1],
        pixels[start + 2],
        pixels[start + 3],
    ]
}
