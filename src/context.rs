use crate::providers::{GlyphRasterizer, GpuProvider, ImageDecoder, ProgramHandle};
use crate::shader::{CompiledShader, Dimension, ShaderCache};
use derivative::Derivative;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Environment every builtin component callback runs against.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RenderContext
{
        #[derivative(Debug = "ignore")]
        pub gpu: Box<dyn GpuProvider>,

        #[derivative(Debug = "ignore")]
        pub decoder: Box<dyn ImageDecoder>,

        #[derivative(Debug = "ignore")]
        pub glyphs: Option<Box<dyn GlyphRasterizer>>,

        pub shaders: ShaderCache<CompiledShader>,

        /// Programs evicted from `shaders`, destroyed at the end of the frame.
        retired: Rc<RefCell<Vec<ProgramHandle>>>,

        /// Relative `resource` paths are resolved against this directory.
        pub base_dir: PathBuf,

        /// Size of the frame target in pixels.
        pub target_size: (u32, u32),
}

impl RenderContext
{
        pub fn new(
                gpu: Box<dyn GpuProvider>,
                decoder: Box<dyn ImageDecoder>,
        ) -> Self
        {
                let retired = Rc::new(RefCell::new(Vec::new()));
                let queue = retired.clone();

                Self {
                        gpu,
                        decoder,
                        glyphs: None,
                        shaders: ShaderCache::new(move |shader: CompiledShader| {
                                queue.borrow_mut().push(shader.program);
                        }),
                        retired,
                        base_dir: PathBuf::from("."),
                        target_size: (800, 600),
                }
        }

        pub fn with_glyphs(
                mut self,
                glyphs: Box<dyn GlyphRasterizer>,
        ) -> Self
        {
                self.glyphs = Some(glyphs);
                self
        }

        pub fn aspect(&self) -> f32
        {
                self.target_size.0 as f32 / self.target_size.1.max(1) as f32
        }

        pub fn resolve_path(
                &self,
                path: &str,
        ) -> PathBuf
        {
                let path = Path::new(path);

                if path.is_absolute()
                {
                        path.to_path_buf()
                }
                else
                {
                        self.base_dir.join(path)
                }
        }

        /// Drops cached programs keyed by `dimension`. Their GPU programs are
        /// released on the next [`RenderContext::flush_retired`].
        pub fn invalidate(
                &mut self,
                dimension: Dimension,
        ) -> usize
        {
                self.shaders.invalidate(dimension)
        }

        pub fn retired_programs(&self) -> usize
        {
                self.retired.borrow().len()
        }

        /// Destroys the programs evicted since the last call.
        pub fn flush_retired(&mut self) -> usize
        {
                let retired: Vec<ProgramHandle> = self.retired.borrow_mut().drain(..).collect();

                for program in retired.iter()
                {
                        self.gpu.destroy_program(*program);
                }

                if !retired.is_empty()
                {
                        log::debug!("Destroyed {} retired program(s)", retired.len());
                }

                retired.len()
        }
}
