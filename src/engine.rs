use std::path::Path;

use anyhow::Context;
use derivative::Derivative;

use crate::builtin;
use crate::component::{ComponentKey, EntityId, OptionValue};
use crate::config::{Backend, Config};
use crate::context::RenderContext;
use crate::error::{ComponentError, ComponentResult};
use crate::loader;
use crate::providers::{GlyphRasterizer, GpuProvider, ImageCrateDecoder, ImageDecoder, NullGpu};
use crate::renderer::{FrameStats, Renderer, WgpuBackend};
use crate::view::View;

/// Owns the component view, the environment its callbacks run against and
/// the renderer that draws it.
///
/// # Example
///
/// ```no_run
/// use patina::config::{Backend, Config};
/// use patina::engine::EngineBuilder;
///
/// let mut config = Config::default();
/// config.backend = Backend::Null;
///
/// let mut engine = EngineBuilder::new().with_config(config).build().unwrap();
///
/// engine.load_scene("level.toml").unwrap();
/// engine.activate_all();
/// engine.render_frame().unwrap();
/// engine.shutdown();
/// ```
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Engine
{
        pub config: Config,

        pub view: View<RenderContext>,

        pub ctx: RenderContext,

        pub renderer: Renderer,

        shut_down: bool,
}

/// Builds an [`Engine`]. Collaborators not supplied are chosen from the
/// config: the GPU follows `backend`, images decode through the `image`
/// crate and text stays unavailable.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct EngineBuilder
{
        config: Config,

        #[derivative(Debug = "ignore")]
        gpu: Option<Box<dyn GpuProvider>>,

        #[derivative(Debug = "ignore")]
        decoder: Option<Box<dyn ImageDecoder>>,

        #[derivative(Debug = "ignore")]
        glyphs: Option<Box<dyn GlyphRasterizer>>,
}

#[allow(clippy::new_without_default)]
impl EngineBuilder
{
        pub fn new() -> Self
        {
                Self {
                        config: Config::default(),
                        gpu: None,
                        decoder: None,
                        glyphs: None,
                }
        }

        pub fn with_config(
                mut self,
                config: Config,
        ) -> Self
        {
                self.config = config;
                self
        }

        /// Overrides the backend named in the config.
        pub fn with_gpu(
                mut self,
                gpu: Box<dyn GpuProvider>,
        ) -> Self
        {
                self.gpu = Some(gpu);
                self
        }

        pub fn with_decoder(
                mut self,
                decoder: Box<dyn ImageDecoder>,
        ) -> Self
        {
                self.decoder = Some(decoder);
                self
        }

        pub fn with_glyphs(
                mut self,
                glyphs: Box<dyn GlyphRasterizer>,
        ) -> Self
        {
                self.glyphs = Some(glyphs);
                self
        }

        pub fn build(self) -> anyhow::Result<Engine>
        {
                let target_size = (self.config.target.width, self.config.target.height);

                anyhow::ensure!(
                        target_size.0 > 0 && target_size.1 > 0,
                        "render target must not be empty, got {}x{}",
                        target_size.0,
                        target_size.1
                );

                let gpu = match self.gpu
                {
                        Some(gpu) => gpu,
                        None => Self::gpu(self.config.backend, target_size)?,
                };

                log::info!("Rendering with the {} backend", gpu.name());

                let decoder = self.decoder.unwrap_or_else(|| Box::new(ImageCrateDecoder));

                let mut ctx = RenderContext::new(gpu, decoder);

                ctx.glyphs = self.glyphs;
                ctx.target_size = target_size;

                let registry = builtin::registry().context("registering builtin component types")?;

                let mut renderer = Renderer::default();

                renderer.log_stats = self.config.shader_cache.log_stats;

                Ok(Engine {
                        config: self.config,
                        view: View::new(registry),
                        ctx,
                        renderer,
                        shut_down: false,
                })
        }

        fn gpu(
                backend: Backend,
                target_size: (u32, u32),
        ) -> anyhow::Result<Box<dyn GpuProvider>>
        {
                Ok(match backend
                {
                        Backend::Wgpu => Box::new(WgpuBackend::new(target_size).context("creating wgpu backend")?),
                        Backend::Null => Box::new(NullGpu::new()),
                })
        }
}

impl Engine
{
        /// Adds the components of a scene file. Relative resource paths in
        /// the file are resolved against its directory.
        pub fn load_scene(
                &mut self,
                path: impl AsRef<Path>,
        ) -> anyhow::Result<Vec<ComponentKey>>
        {
                let path = path.as_ref();

                if let Some(dir) = path.parent()
                {
                        self.ctx.base_dir = dir.to_path_buf();
                }

                loader::load_file(&mut self.view, path)
        }

        pub fn load_scene_str(
                &mut self,
                text: &str,
        ) -> anyhow::Result<Vec<ComponentKey>>
        {
                loader::load_str(&mut self.view, text)
        }

        /// Tries to activate every inactive component. Failures are logged
        /// and returned; they do not stop the rest.
        pub fn activate_all(&mut self) -> Vec<(ComponentKey, ComponentError)>
        {
                let failures = self.view.activate_pending(&mut self.ctx);

                for (key, err) in failures.iter()
                {
                        log::warn!("{} stays inactive: {}", key, error_chain(err));
                }

                failures
        }

        pub fn activate(
                &mut self,
                key: &ComponentKey,
        ) -> ComponentResult<()>
        {
                self.view.try_activate(key, &mut self.ctx)
        }

        pub fn set_option(
                &mut self,
                key: &ComponentKey,
                name: &str,
                value: OptionValue,
        ) -> ComponentResult<()>
        {
                self.view.set_option(key, name, value, &mut self.ctx)
        }

        pub fn remove_component(
                &mut self,
                entity: impl Into<EntityId>,
                type_id: &str,
        ) -> bool
        {
                self.view.remove_component(entity, type_id, &mut self.ctx)
        }

        pub fn render_frame(&mut self) -> anyhow::Result<FrameStats>
        {
                let start = instant::Instant::now();

                let stats = self.renderer.render(&self.view, &mut self.ctx)?;

                log::info!(
                        "Frame {} rendered in {:.2?} ({} draw(s))",
                        stats.frame,
                        start.elapsed(),
                        stats.draws
                );

                Ok(stats)
        }

        /// Deactivates everything top-down and releases every cached
        /// program. Runs at most once.
        pub fn shutdown(&mut self)
        {
                if self.shut_down
                {
                        return;
                }

                self.view.deactivate_all(&mut self.ctx);
                self.ctx.shaders.clear();

                let released = self.ctx.flush_retired();

                log::info!("Engine shut down, released {} program(s)", released);

                self.shut_down = true;
        }
}

impl Drop for Engine
{
        fn drop(&mut self)
        {
                self.shutdown();
        }
}

/// `err` followed by its sources, separated by `: `.
fn error_chain(err: &dyn std::error::Error) -> String
{
        let mut message = err.to_string();
        let mut source = err.source();

        while let Some(cause) = source
        {
                message.push_str(": ");
                message.push_str(&cause.to_string());
                source = cause.source();
        }

        message
}
