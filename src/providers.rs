//! Capabilities the engine consumes but does not implement itself: a GPU,
//! an image decoder and a glyph rasterizer.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat
{
        /// Colour data, sampled with sRGB decoding.
        Rgba8Srgb,
        /// Raw bytes: tile indices, glyph coverage.
        Rgba8Unorm,
}

#[derive(Debug, Clone, Copy)]
pub struct TextureDesc<'a>
{
        pub label: &'a str,

        pub width: u32,

        pub height: u32,

        pub format: TextureFormat,

        /// Tightly packed RGBA8 rows; `None` leaves the texture cleared.
        pub data: Option<&'a [u8]>,

        /// Whether passes may draw into the texture.
        pub render_target: bool,
}

/// Largest texture side [`NullGpu`] accepts, the wgpu default limit.
pub const MAX_TEXTURE_DIMENSION: u32 = 8192;

impl TextureDesc<'_>
{
        /// Rejects empty or oversized extents and uploads whose length does
        /// not match the extent.
        pub fn validate(
                &self,
                max_dimension: u32,
        ) -> anyhow::Result<()>
        {
                anyhow::ensure!(
                        self.width > 0 && self.height > 0,
                        "texture '{}' is empty ({}x{})",
                        self.label,
                        self.width,
                        self.height
                );

                anyhow::ensure!(
                        self.width <= max_dimension && self.height <= max_dimension,
                        "texture '{}' is {}x{}, the device allows at most {} per side",
                        self.label,
                        self.width,
                        self.height,
                        max_dimension
                );

                if let Some(data) = self.data
                {
                        let expected = self.width as usize * self.height as usize * 4;

                        anyhow::ensure!(
                                data.len() == expected,
                                "texture '{}' expects {} bytes, got {}",
                                self.label,
                                expected,
                                data.len()
                        );
                }

                Ok(())
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode
{
        #[default]
        Nearest,
        Linear,
}

impl FromStr for FilterMode
{
        type Err = anyhow::Error;

        fn from_str(s: &str) -> Result<Self, Self::Err>
        {
                match s
                {
                        "nearest" => Ok(FilterMode::Nearest),
                        "linear" => Ok(FilterMode::Linear),
                        other => anyhow::bail!("unknown filter mode '{}'", other),
                }
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDesc
{
        pub filter: FilterMode,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramDesc<'a>
{
        pub label: &'a str,

        pub wgsl: &'a str,

        /// Format of the targets the program draws into.
        pub format: TextureFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTarget
{
        /// The frame being rendered.
        Frame,
        Texture(TextureHandle),
}

/// Per-draw uniform block, laid out like `DrawUniforms` in the WGSL
/// template.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms
{
        pub view_proj: [[f32; 4]; 4],
        pub tint: [f32; 4],
        pub light_color: [f32; 4],
        pub light_position: [f32; 4],
        pub map: [f32; 4],
        pub tileset: [f32; 4],
}

/// One tilemap quad.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall
{
        pub program: ProgramHandle,

        pub target: DrawTarget,

        pub tileset: TextureHandle,

        pub sampler: SamplerHandle,

        pub tiles: TextureHandle,

        pub uniforms: DrawUniforms,
}

pub trait GpuProvider
{
        fn name(&self) -> &str;

        fn as_any(&self) -> &dyn Any;

        fn create_texture(
                &mut self,
                desc: &TextureDesc<'_>,
        ) -> anyhow::Result<TextureHandle>;

        fn destroy_texture(
                &mut self,
                texture: TextureHandle,
        );

        fn create_sampler(
                &mut self,
                desc: &SamplerDesc,
        ) -> anyhow::Result<SamplerHandle>;

        fn destroy_sampler(
                &mut self,
                sampler: SamplerHandle,
        );

        fn create_program(
                &mut self,
                desc: &ProgramDesc<'_>,
        ) -> anyhow::Result<ProgramHandle>;

        fn destroy_program(
                &mut self,
                program: ProgramHandle,
        );

        fn clear(
                &mut self,
                target: DrawTarget,
                color: [f32; 4],
        ) -> anyhow::Result<()>;

        fn draw(
                &mut self,
                call: &DrawCall,
        ) -> anyhow::Result<()>;

        /// Submits everything recorded since the last call.
        fn present(&mut self) -> anyhow::Result<()>;
}

/// A decoded image as tightly packed RGBA8 rows.
#[derive(Clone, PartialEq, Eq)]
pub struct Image
{
        pub width: u32,
        pub height: u32,
        pub rgba: Vec<u8>,
}

impl fmt::Debug for Image
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                f.debug_struct("Image")
                        .field("width", &self.width)
                        .field("height", &self.height)
                        .field("bytes", &self.rgba.len())
                        .finish()
        }
}

pub trait ImageDecoder
{
        fn decode(
                &self,
                bytes: &[u8],
        ) -> anyhow::Result<Image>;
}

/// Decodes PNG, JPEG and TGA through the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder
{
        fn decode(
                &self,
                bytes: &[u8],
        ) -> anyhow::Result<Image>
        {
                let img = image::load_from_memory(bytes)?;

                let rgba = img.to_rgba8();

                Ok(Image {
                        width: rgba.width(),
                        height: rgba.height(),
                        rgba: rgba.into_raw(),
                })
        }
}

/// Coverage bitmap of one glyph, one byte per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph
{
        pub width: u32,
        pub height: u32,
        pub advance: f32,
        pub coverage: Vec<u8>,
}

pub trait GlyphRasterizer
{
        fn rasterize(
                &mut self,
                font: &[u8],
                ch: char,
                pixel_size: u32,
        ) -> anyhow::Result<Glyph>;
}

/// Everything a [`NullGpu`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall
{
        CreateTexture
        {
                handle: TextureHandle,
                label: String,
                width: u32,
                height: u32,
        },
        DestroyTexture(TextureHandle),
        CreateSampler
        {
                handle: SamplerHandle,
                filter: FilterMode,
        },
        DestroySampler(SamplerHandle),
        CreateProgram
        {
                handle: ProgramHandle,
                label: String,
        },
        DestroyProgram(ProgramHandle),
        Clear(DrawTarget),
        Draw
        {
                program: ProgramHandle,
                target: DrawTarget,
        },
        Present,
}

/// A GPU that keeps nothing but a log of calls and the set of live
/// handles.
#[derive(Debug, Default)]
pub struct NullGpu
{
        calls: Vec<GpuCall>,

        next_handle: u64,

        textures: HashSet<TextureHandle>,

        samplers: HashSet<SamplerHandle>,

        programs: HashSet<ProgramHandle>,

        /// Texture creation fails once this many textures are alive.
        texture_limit: Option<usize>,
}

impl NullGpu
{
        pub fn new() -> Self
        {
                Self::default()
        }

        pub fn with_texture_limit(
                mut self,
                limit: usize,
        ) -> Self
        {
                self.texture_limit = Some(limit);
                self
        }

        pub fn calls(&self) -> &[GpuCall]
        {
                &self.calls
        }

        pub fn live_textures(&self) -> usize
        {
                self.textures.len()
        }

        pub fn live_samplers(&self) -> usize
        {
                self.samplers.len()
        }

        pub fn live_programs(&self) -> usize
        {
                self.programs.len()
        }

        pub fn is_texture_live(
                &self,
                texture: TextureHandle,
        ) -> bool
        {
                self.textures.contains(&texture)
        }

        pub fn draws(&self) -> usize
        {
                self.calls
                        .iter()
                        .filter(|c| matches!(c, GpuCall::Draw { .. }))
                        .count()
        }

        fn next(&mut self) -> u64
        {
                self.next_handle += 1;
                self.next_handle
        }
}

impl GpuProvider for NullGpu
{
        fn name(&self) -> &str
        {
                "null"
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
                if self.texture_limit.is_some_and(|limit| self.textures.len() >= limit)
                {
                        anyhow::bail!("out of texture memory creating '{}'", desc.label);
                }

                desc.validate(MAX_TEXTURE_DIMENSION)?;

                let handle = TextureHandle(self.next());

                self.textures.insert(handle);
                self.calls.push(GpuCall::CreateTexture {
                        handle,
                        label: desc.label.to_string(),
                        width: desc.width,
                        height: desc.height,
                });

                Ok(handle)
        }

        fn destroy_texture(
                &mut self,
                texture: TextureHandle,
        )
        {
                self.textures.remove(&texture);
                self.calls.push(GpuCall::DestroyTexture(texture));
        }

        fn create_sampler(
                &mut self,
                desc: &SamplerDesc,
        ) -> anyhow::Result<SamplerHandle>
        {
                let handle = SamplerHandle(self.next());

                self.samplers.insert(handle);
                self.calls.push(GpuCall::CreateSampler {
                        handle,
                        filter: desc.filter,
                });

                Ok(handle)
        }

        fn destroy_sampler(
                &mut self,
                sampler: SamplerHandle,
        )
        {
                self.samplers.remove(&sampler);
                self.calls.push(GpuCall::DestroySampler(sampler));
        }

        fn create_program(
                &mut self,
                desc: &ProgramDesc<'_>,
        ) -> anyhow::Result<ProgramHandle>
        {
                if !desc.wgsl.contains("fn fs_main")
                {
                        anyhow::bail!("program '{}' has no fragment entry point", desc.label);
                }

                let handle = ProgramHandle(self.next());

                self.programs.insert(handle);
                self.calls.push(GpuCall::CreateProgram {
                        handle,
                        label: desc.label.to_string(),
                });

                Ok(handle)
        }

        fn destroy_program(
                &mut self,
                program: ProgramHandle,
        )
        {
                self.programs.remove(&program);
                self.calls.push(GpuCall::DestroyProgram(program));
        }

        fn clear(
                &mut self,
                target: DrawTarget,
                _color: [f32; 4],
        ) -> anyhow::Result<()>
        {
                if let DrawTarget::Texture(texture) = target
                {
                        anyhow::ensure!(self.textures.contains(&texture), "clearing dead texture {:?}", texture);
                }

                self.calls.push(GpuCall::Clear(target));

                Ok(())
        }

        fn draw(
                &mut self,
                call: &DrawCall,
        ) -> anyhow::Result<()>
        {
                anyhow::ensure!(self.programs.contains(&call.program), "drawing with dead program {:?}", call.program);
                anyhow::ensure!(self.textures.contains(&call.tileset), "drawing with dead tileset {:?}", call.tileset);
                anyhow::ensure!(self.textures.contains(&call.tiles), "drawing with dead tiles {:?}", call.tiles);
                anyhow::ensure!(self.samplers.contains(&call.sampler), "drawing with dead sampler {:?}", call.sampler);

                self.calls.push(GpuCall::Draw {
                        program: call.program,
                        target: call.target,
                });

                Ok(())
        }

        fn present(&mut self) -> anyhow::Result<()>
        {
                self.calls.push(GpuCall::Present);

                Ok(())
        }
}
