//! [`GpuProvider`] on top of wgpu.
//!
//! The backend renders off-screen: the frame is a texture of the configured
//! target size. Clears and draws are recorded into one command encoder that
//! [`GpuProvider::present`] submits.

use std::any::Any;
use std::collections::HashMap;

use derivative::Derivative;
use wgpu::util::DeviceExt;

use crate::providers::{
        DrawCall, DrawTarget, GpuProvider, ProgramDesc, ProgramHandle, SamplerDesc, SamplerHandle, TextureDesc,
        TextureFormat, TextureHandle,
};
use crate::renderer::pipeline::PipelineManager;
use crate::texture::{GpuTexture, wgpu_format};

#[derive(Derivative)]
#[derivative(Debug)]
pub struct WgpuBackend
{
        pub device: wgpu::Device,

        pub queue: wgpu::Queue,

        pipelines: PipelineManager,

        frame: GpuTexture,

        #[derivative(Debug = "ignore")]
        textures: HashMap<TextureHandle, GpuTexture>,

        #[derivative(Debug = "ignore")]
        samplers: HashMap<SamplerHandle, wgpu::Sampler>,

        #[derivative(Debug = "ignore")]
        programs: HashMap<ProgramHandle, wgpu::RenderPipeline>,

        #[derivative(Debug = "ignore")]
        encoder: Option<wgpu::CommandEncoder>,

        next_handle: u64,
}

impl WgpuBackend
{
        /// Picks an adapter and opens a device without a surface.
        pub fn new(target_size: (u32, u32)) -> anyhow::Result<Self>
        {
                let instance = Self::instance();

                let adapter = pollster::block_on(Self::adapter(&instance))?;

                log::info!("Using adapter {:?}", adapter.get_info().name);

                let (device, queue) = pollster::block_on(Self::device_queue(&adapter))?;

                let pipelines = PipelineManager::new(&device);

                let frame_desc = TextureDesc {
                        label: "frame",
                        width: target_size.0,
                        height: target_size.1,
                        format: TextureFormat::Rgba8Srgb,
                        data: None,
                        render_target: true,
                };

                frame_desc.validate(device.limits().max_texture_dimension_2d)?;

                let frame = GpuTexture::from_desc(&device, &queue, &frame_desc);

                Ok(Self {
                        device,
                        queue,
                        pipelines,
                        frame,
                        textures: HashMap::new(),
                        samplers: HashMap::new(),
                        programs: HashMap::new(),
                        encoder: None,
                        next_handle: 0,
                })
        }

        fn instance() -> wgpu::Instance
        {
                wgpu::Instance::new(&wgpu::InstanceDescriptor {
                        backends: wgpu::Backends::PRIMARY,
                        ..Default::default()
                })
        }

        async fn adapter(instance: &wgpu::Instance) -> anyhow::Result<wgpu::Adapter>
        {
                let adapter = instance
                        .request_adapter(&wgpu::RequestAdapterOptions {
                                power_preference: wgpu::PowerPreference::HighPerformance,
                                compatible_surface: None,
                                force_fallback_adapter: false,
                        })
                        .await
                        .map_err(|e| anyhow::anyhow!(e))?;

                Ok(adapter)
        }

        async fn device_queue(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)>
        {
                let pair = adapter
                        .request_device(&wgpu::DeviceDescriptor {
                                label: Some("device_queue"),
                                required_features: wgpu::Features::default(),
                                required_limits: wgpu::Limits::default(),
                                memory_hints: wgpu::MemoryHints::Performance,
                                trace: wgpu::Trace::Off,
                        })
                        .await?;

                Ok(pair)
        }

        pub fn frame(&self) -> &GpuTexture
        {
                &self.frame
        }

        fn next(&mut self) -> u64
        {
                self.next_handle += 1;
                self.next_handle
        }

        fn encoder(&mut self) -> &mut wgpu::CommandEncoder
        {
                let device = &self.device;

                self.encoder.get_or_insert_with(|| {
                        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                                label: Some("Frame Encoder"),
                        })
                })
        }

        fn target_view(
                &self,
                target: DrawTarget,
        ) -> anyhow::Result<wgpu::TextureView>
        {
                match target
                {
                        DrawTarget::Frame => Ok(self.frame.view.clone()),
                        DrawTarget::Texture(handle) => self
                                .textures
                                .get(&handle)
                                .map(|t| t.view.clone())
                                .ok_or_else(|| anyhow::anyhow!("unknown target texture {:?}", handle)),
                }
        }
}

impl GpuProvider for WgpuBackend
{
        fn name(&self) -> &str
        {
                "wgpu"
        }

        fn as_any(&self) -> &dyn Any
        {
                self
        }

        fn create_texture(
                &mut self,
                desc: &TextureDesc<'_>,
        ) -> anyhow::Result<TextureHandle>
        {
                desc.validate(self.device.limits().max_texture_dimension_2d)?;

                self.device.push_error_scope(wgpu::ErrorFilter::Validation);

                let texture = GpuTexture::from_desc(&self.device, &self.queue, desc);

                if let Some(error) = pollster::block_on(self.device.pop_error_scope())
                {
                        texture.texture.destroy();

                        anyhow::bail!("texture '{}' failed to build: {}", desc.label, error);
                }

                let handle = TextureHandle(self.next());

                self.textures.insert(handle, texture);

                Ok(handle)
        }

        fn destroy_texture(
                &mut self,
                texture: TextureHandle,
        )
        {
                if let Some(texture) = self.textures.remove(&texture)
                {
                        texture.texture.destroy();
                }
        }

        fn create_sampler(
                &mut self,
                desc: &SamplerDesc,
        ) -> anyhow::Result<SamplerHandle>
        {
                let sampler = GpuTexture::create_sampler(&self.device, desc.filter);
                let handle = SamplerHandle(self.next());

                self.samplers.insert(handle, sampler);

                Ok(handle)
        }

        fn destroy_sampler(
                &mut self,
                sampler: SamplerHandle,
        )
        {
                self.samplers.remove(&sampler);
        }

        fn create_program(
                &mut self,
                desc: &ProgramDesc<'_>,
        ) -> anyhow::Result<ProgramHandle>
        {
                self.device.push_error_scope(wgpu::ErrorFilter::Validation);

                let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some(desc.label),
                        source: wgpu::ShaderSource::Wgsl(desc.wgsl.into()),
                });

                let pipeline =
                        self.pipelines
                                .render_pipeline(&self.device, &module, desc.label, wgpu_format(desc.format));

                if let Some(error) = pollster::block_on(self.device.pop_error_scope())
                {
                        anyhow::bail!("program '{}' failed to build: {}", desc.label, error);
                }

                let handle = ProgramHandle(self.next());

                self.programs.insert(handle, pipeline);

                Ok(handle)
        }

        fn destroy_program(
                &mut self,
                program: ProgramHandle,
        )
        {
                self.programs.remove(&program);
        }

        fn clear(
                &mut self,
                target: DrawTarget,
                color: [f32; 4],
        ) -> anyhow::Result<()>
        {
                let view = self.target_view(target)?;

                let encoder = self.encoder();

                let _render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Clear"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                        load: wgpu::LoadOp::Clear(wgpu::Color {
                                                r: color[0] as f64,
                                                g: color[1] as f64,
                                                b: color[2] as f64,
                                                a: color[3] as f64,
                                        }),
                                        store: wgpu::StoreOp::Store,
                                },
                        })],
                        depth_stencil_attachment: None,
                        occlusion_query_set: None,
                        timestamp_writes: None,
                });

                Ok(())
        }

        fn draw(
                &mut self,
                call: &DrawCall,
        ) -> anyhow::Result<()>
        {
                let view = self.target_view(call.target)?;

                let pipeline = self
                        .programs
                        .get(&call.program)
                        .ok_or_else(|| anyhow::anyhow!("unknown program {:?}", call.program))?
                        .clone();

                let tileset = self
                        .textures
                        .get(&call.tileset)
                        .ok_or_else(|| anyhow::anyhow!("unknown tileset texture {:?}", call.tileset))?;

                let tiles = self
                        .textures
                        .get(&call.tiles)
                        .ok_or_else(|| anyhow::anyhow!("unknown tile texture {:?}", call.tiles))?;

                let sampler = self
                        .samplers
                        .get(&call.sampler)
                        .ok_or_else(|| anyhow::anyhow!("unknown sampler {:?}", call.sampler))?;

                let uniforms = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Draw Uniforms"),
                        contents: bytemuck::cast_slice(&[call.uniforms]),
                        usage: wgpu::BufferUsages::UNIFORM,
                });

                let bind_group =
                        self.pipelines
                                .bind_group(&self.device, &tileset.view, sampler, &uniforms, &tiles.view);

                let encoder = self.encoder();

                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Tilemap"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view: &view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                        load: wgpu::LoadOp::Load,
                                        store: wgpu::StoreOp::Store,
                                },
                        })],
                        depth_stencil_attachment: None,
                        occlusion_query_set: None,
                        timestamp_writes: None,
                });

                render_pass.set_pipeline(&pipeline);
                render_pass.set_bind_group(0, &bind_group, &[]);
                render_pass.draw(0..6, 0..1);

                Ok(())
        }

        fn present(&mut self) -> anyhow::Result<()>
        {
                if let Some(encoder) = self.encoder.take()
                {
                        self.queue.submit(std::iter::once(encoder.finish()));
                }

                self.device.poll(wgpu::PollType::Wait)?;

                Ok(())
        }
}
