// Copyright 2025 the Sumi Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simple helpers for managing wgpu state, plus the blocking executor and
//! texture readback used at explicit synchronization points.

use std::future::Future;

use wgpu::{Adapter, Device, Instance, Limits, Queue, Texture};

use crate::{Error, Result};

/// Simple render context that maintains wgpu state for the stroke pipeline.
pub struct RenderContext {
    pub instance: Instance,
    pub devices: Vec<DeviceHandle>,
}

pub struct DeviceHandle {
    adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl RenderContext {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::util::backend_bits_from_env().unwrap_or_default(),
            flags: wgpu::InstanceFlags::from_build_config().with_env(),
            ..Default::default()
        });
        Self {
            instance,
            devices: Vec::new(),
        }
    }

    /// Finds or creates a usable device handle id.
    pub async fn device(&mut self) -> Option<usize> {
        if self.devices.is_empty() {
            return self.new_device().await;
        }
        Some(0)
    }

    /// As [`Self::device`], but error-typed for initialization sequences that
    /// treat a missing adapter as fatal.
    pub async fn device_handle(&mut self) -> Result<&DeviceHandle> {
        let id = self.device().await.ok_or(Error::NoCompatibleDevice)?;
        Ok(&self.devices[id])
    }

    async fn new_device(&mut self) -> Option<usize> {
        let adapter =
            wgpu::util::initialize_adapter_from_env_or_default(&self.instance, None).await?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .ok()?;
        self.devices.push(DeviceHandle {
            adapter,
            device,
            queue,
        });
        Some(self.devices.len() - 1)
    }
}

impl DeviceHandle {
    /// Returns the adapter associated with the device.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }
}

struct NullWake;

impl std::task::Wake for NullWake {
    fn wake(self: std::sync::Arc<Self>) {}
}

/// Block on a future, polling the device as needed.
///
/// This will deadlock if the future is awaiting anything other than GPU progress.
pub fn block_on_wgpu<F: Future>(device: &Device, fut: F) -> F::Output {
    if cfg!(target_arch = "wasm32") {
        panic!("Blocking can't work on WASM, so don't try");
    }
    let waker = std::task::Waker::from(std::sync::Arc::new(NullWake));
    let mut context = std::task::Context::from_waker(&waker);
    // Same logic as `pin_mut!` macro from `pin_utils`.
    let mut fut = std::pin::pin!(fut);
    loop {
        match fut.as_mut().poll(&mut context) {
            std::task::Poll::Pending => {
                let _ = device.poll(wgpu::Maintain::Wait);
            }
            std::task::Poll::Ready(item) => break item,
        }
    }
}

/// Reads a texture's contents back to the CPU, with row padding removed.
///
/// This is an explicit synchronization point: the calling thread blocks until
/// every submission touching the texture has completed. It must not run on a
/// thread that handles pointer events.
pub fn read_texture(device: &Device, queue: &Queue, texture: &Texture) -> Result<Vec<u8>> {
    let format = texture.format();
    let Some(bytes_per_texel) = format.block_copy_size(None) else {
        return Err(Error::UnsupportedReadbackFormat(format));
    };
    let (width, height) = (texture.width(), texture.height());
    let padded_byte_width = (width * bytes_per_texel).next_multiple_of(256);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sumi.readback"),
        size: u64::from(padded_byte_width) * u64::from(height),
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("sumi.readback"),
    });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_byte_width),
                rows_per_image: None,
            },
        },
        texture.size(),
    );
    queue.submit([encoder.finish()]);

    let slice = buffer.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    slice.map_async(wgpu::MapMode::Read, move |v| drop(sender.send(v)));
    let received = block_on_wgpu(device, receiver.receive()).ok_or(Error::ReadbackChannelClosed)?;
    received?;

    let data = slice.get_mapped_range();
    let row_bytes = (width * bytes_per_texel) as usize;
    let mut out = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height {
        let start = (row * padded_byte_width) as usize;
        out.extend_from_slice(&data[start..start + row_bytes]);
    }
    drop(data);
    buffer.unmap();
    Ok(out)
}
