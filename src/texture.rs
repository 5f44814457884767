use crate::providers::{FilterMode, TextureDesc, TextureFormat};

/// A texture living on a wgpu device, with the view passes bind.
#[derive(Debug)]
pub struct GpuTexture
{
        pub texture: wgpu::Texture,
        pub view: wgpu::TextureView,
        pub size: wgpu::Extent3d,
}

pub fn wgpu_format(format: TextureFormat) -> wgpu::TextureFormat
{
        match format
        {
                TextureFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
                TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        }
}

impl GpuTexture
{
        pub fn from_desc(
                device: &wgpu::Device,
                queue: &wgpu::Queue,
                desc: &TextureDesc<'_>,
        ) -> Self
        {
                let size = wgpu::Extent3d {
                        width: desc.width,
                        height: desc.height,
                        depth_or_array_layers: 1,
                };

                let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;

                if desc.render_target
                {
                        usage |= wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
                }

                let texture = Self::create_texture(device, desc.label, size, wgpu_format(desc.format), usage);

                if let Some(rgba) = desc.data
                {
                        Self::write_texture_to_queue(queue, &texture, rgba, size);
                }

                let view = Self::create_view(&texture);

                Self {
                        texture,
                        view,
                        size,
                }
        }

        fn create_texture(
                device: &wgpu::Device,
                label: &str,
                size: wgpu::Extent3d,
                format: wgpu::TextureFormat,
                usage: wgpu::TextureUsages,
        ) -> wgpu::Texture
        {
                device.create_texture(&wgpu::TextureDescriptor {
                        label: Some(label),
                        size,
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D2,
                        format,
                        usage,
                        view_formats: &[],
                })
        }

        fn write_texture_to_queue(
                queue: &wgpu::Queue,
                texture: &wgpu::Texture,
                rgba: &[u8],
                size: wgpu::Extent3d,
        )
        {
                queue.write_texture(
                        wgpu::TexelCopyTextureInfo {
                                aspect: wgpu::TextureAspect::All,
                                texture,
                                mip_level: 0,
                                origin: wgpu::Origin3d::ZERO,
                        },
                        rgba,
                        wgpu::TexelCopyBufferLayout {
                                offset: 0,
                                bytes_per_row: Some(4 * size.width),
                                rows_per_image: Some(size.height),
                        },
                        size,
                );
        }

        fn create_view(texture: &wgpu::Texture) -> wgpu::TextureView
        {
                texture.create_view(&wgpu::TextureViewDescriptor::default())
        }

        pub fn create_sampler(
                device: &wgpu::Device,
                filter: FilterMode,
        ) -> wgpu::Sampler
        {
                let filter = match filter
                {
                        FilterMode::Nearest => wgpu::FilterMode::Nearest,
                        FilterMode::Linear => wgpu::FilterMode::Linear,
                };

                device.create_sampler(&wgpu::SamplerDescriptor {
                        address_mode_u: wgpu::AddressMode::ClampToEdge,
                        address_mode_v: wgpu::AddressMode::ClampToEdge,
                        address_mode_w: wgpu::AddressMode::ClampToEdge,
                        mag_filter: filter,
                        min_filter: filter,
                        mipmap_filter: wgpu::FilterMode::Nearest,
                        ..Default::default()
                })
        }
}
