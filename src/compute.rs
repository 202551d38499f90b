use std::borrow::Cow;
use std::future::Future;
use std::num::NonZeroU32;

use log::{debug, info, warn};

use crate::{Dispatch, Error, Image, Result, RGBAF};

const SHADER: &str = include_str!("../shader/init.wgsl");
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const BYTES_PER_PIXEL: u32 = 16;

fn block_on<T>(future: impl Future<Output = T>) -> T {
    futures::executor::block_on(future)
}

/// Device, queue and the compiled init pipeline.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

impl GpuContext {
    pub fn new() -> Result<Self> {
        block_on(Self::new_internal())
    }

    async fn new_internal() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or(Error::NoAdapter)?;
        let adapter_info = adapter.get_info();
        info!(
            "Using adapter {} ({:?}, {:?}).",
            adapter_info.name, adapter_info.backend, adapter_info.device_type
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;
        drop(instance);
        drop(adapter);

        let module = device.create_shader_module(&wgpu::ShaderModuleDescriptor {
            label: Some("init"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SHADER)),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Image"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                count: None,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: FORMAT,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("init"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "init",
        });

        Ok(Self {
            device,
            queue,
            bind_group_layout,
            pipeline,
        })
    }

    /// Dispatches the init kernel over a fresh `width`×`height` texture and reads it back.
    pub fn render(&self, width: u32, height: u32) -> Result<Image> {
        block_on(self.render_internal(width, height))
    }

    async fn render_internal(&self, width: u32, height: u32) -> Result<Image> {
        let geometry = Dispatch::covering(width, height);
        if geometry.is_empty() {
            warn!("Skipping dispatch of an empty {}x{} image.", width, height);
            return Ok(Image::new(RGBAF::TRANSPARENT, width, height));
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(Error::TooLarge { width, height, max });
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Image"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            }],
        });

        // Texture to buffer copies need rows padded to the copy alignment.
        let unpadded_row = width * BYTES_PER_PIXEL;
        let padded_row = align_to(unpadded_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback"),
            size: padded_row as wgpu::BufferAddress * height as wgpu::BufferAddress,
            // Can be read to the CPU, and can be copied from the storage texture
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        debug!(
            "Dispatching {}x{} tiles ({} work-items) over {}x{}.",
            geometry.tiles_x,
            geometry.tiles_y,
            geometry.invocations(),
            width,
            height
        );
        {
            let mut cpass =
                encoder.begin_compute_pass(&wgpu::ComputePassDescriptor { label: None });
            cpass.set_bind_group(0, &bind_group, &[]);
            cpass.set_pipeline(&self.pipeline);
            cpass.dispatch(geometry.tiles_x, geometry.tiles_y, 1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: NonZeroU32::new(padded_row),
                    rows_per_image: None,
                },
            },
            size,
        );

        self.queue.submit(Some(encoder.finish()));
        let buffer_slice = readback_buffer.slice(..);
        let buffer_future = buffer_slice.map_async(wgpu::MapMode::Read);
        self.device.poll(wgpu::Maintain::Wait);
        buffer_future.await?;

        let contents = {
            let data = buffer_slice.get_mapped_range();
            unpad(&data, padded_row as usize, unpadded_row as usize)
        };
        readback_buffer.unmap();

        let len = contents.len();
        Image::from_vec(contents, width, height).ok_or(Error::Readback(len))
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) / alignment * alignment
}

/// Strips row padding and decodes native-endian `rgba32float` texels.
fn unpad(data: &[u8], padded_row: usize, unpadded_row: usize) -> Vec<RGBAF> {
    data.chunks_exact(padded_row)
        .flat_map(|row| row[..unpadded_row].chunks_exact(BYTES_PER_PIXEL as usize))
        .map(|texel| {
            let mut channels = [0.0; 4];
            for (channel, bytes) in channels.iter_mut().zip(texel.chunks_exact(4)) {
                *channel = f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            RGBAF::from_array(channels)
        })
        .collect()
}
