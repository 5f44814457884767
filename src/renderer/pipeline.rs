/// The bind group layout every tilemap program shares, and the render
/// pipelines built against it.
///
/// | binding | resource                      |
/// |---------|-------------------------------|
/// | 0       | tileset texture (filterable)  |
/// | 1       | tileset sampler               |
/// | 2       | `DrawUniforms` buffer         |
/// | 3       | tile index texture            |
#[derive(Debug)]
pub struct PipelineManager
{
        pub bind_group_layout: wgpu::BindGroupLayout,

        pub layout: wgpu::PipelineLayout,
}

impl PipelineManager
{
        pub fn new(device: &wgpu::Device) -> Self
        {
                let bind_group_layout = Self::create_bind_group_layout(device);

                let layout = Self::get_render_pipeline_layout(device, &[&bind_group_layout]);

                Self {
                        bind_group_layout,
                        layout,
                }
        }

        pub fn render_pipeline(
                &self,
                device: &wgpu::Device,
                shader: &wgpu::ShaderModule,
                label: &str,
                format: wgpu::TextureFormat,
        ) -> wgpu::RenderPipeline
        {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some(label),
                        layout: Some(&self.layout),
                        vertex: wgpu::VertexState {
                                module: shader,
                                entry_point: Some("vs_main"),
                                // The quad comes from the vertex index.
                                buffers: &[],
                                compilation_options: wgpu::PipelineCompilationOptions::default(),
                        },
                        fragment: Some(wgpu::FragmentState {
                                module: shader,
                                entry_point: Some("fs_main"),
                                targets: &[Some(wgpu::ColorTargetState {
                                        format,
                                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                                        write_mask: wgpu::ColorWrites::ALL,
                                })],
                                compilation_options: wgpu::PipelineCompilationOptions::default(),
                        }),
                        primitive: wgpu::PrimitiveState {
                                topology: wgpu::PrimitiveTopology::TriangleList,
                                strip_index_format: None,
                                front_face: wgpu::FrontFace::Ccw,
                                // Map rows run down the screen, which flips the winding.
                                cull_mode: None,
                                polygon_mode: wgpu::PolygonMode::Fill,
                                conservative: false,
                                unclipped_depth: false,
                        },
                        depth_stencil: None,
                        multisample: wgpu::MultisampleState {
                                count: 1,
                                mask: !0,
                                alpha_to_coverage_enabled: false,
                        },
                        multiview: None,
                        cache: None,
                })
        }

        pub fn bind_group(
                &self,
                device: &wgpu::Device,
                tileset: &wgpu::TextureView,
                sampler: &wgpu::Sampler,
                uniforms: &wgpu::Buffer,
                tiles: &wgpu::TextureView,
        ) -> wgpu::BindGroup
        {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                        layout: &self.bind_group_layout,
                        entries: &[
                                wgpu::BindGroupEntry {
                                        binding: 0,
                                        resource: wgpu::BindingResource::TextureView(tileset),
                                },
                                wgpu::BindGroupEntry {
                                        binding: 1,
                                        resource: wgpu::BindingResource::Sampler(sampler),
                                },
                                wgpu::BindGroupEntry {
                                        binding: 2,
                                        resource: uniforms.as_entire_binding(),
                                },
                                wgpu::BindGroupEntry {
                                        binding: 3,
                                        resource: wgpu::BindingResource::TextureView(tiles),
                                },
                        ],
                        label: Some("tilemap_bind_group"),
                })
        }

        fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout
        {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        entries: &[
                                wgpu::BindGroupLayoutEntry {
                                        binding: 0,
                                        visibility: wgpu::ShaderStages::FRAGMENT,
                                        ty: wgpu::BindingType::Texture {
                                                multisampled: false,
                                                view_dimension: wgpu::TextureViewDimension::D2,
                                                sample_type: wgpu::TextureSampleType::Float {
                                                        filterable: true,
                                                },
                                        },
                                        count: None,
                                },
                                wgpu::BindGroupLayoutEntry {
                                        binding: 1,
                                        visibility: wgpu::ShaderStages::FRAGMENT,
                                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                                        count: None,
                                },
                                wgpu::BindGroupLayoutEntry {
                                        binding: 2,
                                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                                        ty: wgpu::BindingType::Buffer {
                                                ty: wgpu::BufferBindingType::Uniform,
                                                has_dynamic_offset: false,
                                                min_binding_size: None,
                                        },
                                        count: None,
                                },
                                wgpu::BindGroupLayoutEntry {
                                        binding: 3,
                                        visibility: wgpu::ShaderStages::FRAGMENT,
                                        // Read with textureLoad only.
                                        ty: wgpu::BindingType::Texture {
                                                multisampled: false,
                                                view_dimension: wgpu::TextureViewDimension::D2,
                                                sample_type: wgpu::TextureSampleType::Float {
                                                        filterable: false,
                                                },
                                        },
                                        count: None,
                                },
                        ],
                        label: Some("tilemap_bind_group_layout"),
                })
        }

        fn get_render_pipeline_layout(
                device: &wgpu::Device,
                bind_groups: &[&wgpu::BindGroupLayout],
        ) -> wgpu::PipelineLayout
        {
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("Render Pipeline Layout"),
                        bind_group_layouts: bind_groups,
                        push_constant_ranges: &[],
                })
        }
}
