use std::any::Any;

use anyhow::Context;
use derivative::Derivative;

use crate::context::RenderContext;
use crate::providers::{DrawCall, DrawTarget, ProgramDesc, ProgramHandle, TextureFormat, TextureHandle};
use crate::renderer::frame::{LightFrame, ModelFrame, SceneFrame};
use crate::shader::source::{self, PassKind, Variant};
use crate::shader::{CompiledShader, SHADOW_PASS, ShaderKey};

#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct RenderGraph
{
        #[derivative(Debug = "ignore")]
        pub passes: Vec<Box<dyn RenderPass>>,
}

impl RenderGraph
{
        /// Shadow maps first, then the frame.
        pub fn standard() -> Self
        {
                let mut graph = Self::default();

                graph.add_pass(Box::new(ShadowPass::new()));
                graph.add_pass(Box::new(ForwardPass::new()));

                graph
        }

        pub fn add_pass(
                &mut self,
                pass: Box<dyn RenderPass>,
        )
        {
                self.passes.push(pass);
        }

        /// Records every enabled pass in order and returns the number of
        /// draw calls issued.
        pub fn execute(
                &mut self,
                scenes: &[SceneFrame],
                ctx: &mut RenderContext,
        ) -> anyhow::Result<usize>
        {
                let mut draws = 0;

                for pass in self.passes.iter_mut()
                {
                        if pass.enabled()
                        {
                                draws += pass
                                        .record(scenes, ctx)
                                        .with_context(|| format!("recording pass '{}'", pass.name()))?;
                        }
                }

                Ok(draws)
        }

        pub fn passes_mut(&mut self) -> &mut Vec<Box<dyn RenderPass>>
        {
                &mut self.passes
        }

        pub fn pass_mut<P: RenderPass + 'static>(&mut self) -> Option<&mut P>
        {
                self.passes
                        .iter_mut()
                        .find_map(|pass| pass.as_any_mut().downcast_mut::<P>())
        }
}

pub trait RenderPass
{
        fn name(&self) -> &str;

        fn as_any(&self) -> &dyn Any;

        fn as_any_mut(&mut self) -> &mut dyn Any;

        fn enabled(&mut self) -> bool;

        fn set_enabled(
                &mut self,
                value: bool,
        );

        /// Issues the pass's clears and draws. Returns the number of draws.
        fn record(
                &mut self,
                scenes: &[SceneFrame],
                ctx: &mut RenderContext,
        ) -> anyhow::Result<usize>;
}

/// Returns the program cached for `key`, compiling it on a miss.
fn program(
        ctx: &mut RenderContext,
        key: ShaderKey,
        variant: &Variant<'_>,
        format: TextureFormat,
) -> anyhow::Result<ProgramHandle>
{
        let RenderContext {
                gpu,
                shaders,
                ..
        } = ctx;

        let shader = shaders.get_or_try_insert_with(key, |key| {
                let label = key.to_string();
                let wgsl = source::compose(variant);

                let program = gpu
                        .create_program(&ProgramDesc {
                                label: &label,
                                wgsl: &wgsl,
                                format,
                        })
                        .with_context(|| format!("compiling program for {}", key))?;

                Ok(CompiledShader {
                        program,
                        label,
                })
        })?;

        Ok(shader.program)
}

/// Renders every model's depth into the shadow map of each light that casts
/// shadows.
#[derive(Debug)]
pub struct ShadowPass
{
        pub name: String,
        pub enabled: bool,
}

impl ShadowPass
{
        pub fn new() -> Self
        {
                Self {
                        name: "Shadow Pass".to_string(),
                        enabled: true,
                }
        }

        fn draw_model(
                ctx: &mut RenderContext,
                scene: &SceneFrame,
                light: &LightFrame,
                shadow_map: TextureHandle,
                model: &ModelFrame,
        ) -> anyhow::Result<()>
        {
                let key = ShaderKey {
                        scene: scene.scene,
                        camera: scene.camera,
                        light: Some(light.entity),
                        model: model.entity,
                        material: None,
                        user_data: Some(SHADOW_PASS),
                };

                let variant = Variant {
                        pass: PassKind::Shadow,
                        lit: false,
                        material: None,
                };

                let program = program(ctx, key, &variant, TextureFormat::Rgba8Unorm)?;

                ctx.gpu.draw(&DrawCall {
                        program,
                        target: DrawTarget::Texture(shadow_map),
                        tileset: model.tileset,
                        sampler: model.sampler,
                        tiles: model.tiles,
                        uniforms: model.uniforms(light.view_proj, Some(light)),
                })
        }
}

impl Default for ShadowPass
{
        fn default() -> Self
        {
                Self::new()
        }
}

impl RenderPass for ShadowPass
{
        fn name(&self) -> &str
        {
                self.name.as_str()
        }

        fn as_any(&self) -> &dyn Any
        {
                self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any
        {
                self
        }

        fn enabled(&mut self) -> bool
        {
                self.enabled
        }

        fn set_enabled(
                &mut self,
                value: bool,
        )
        {
                self.enabled = value;
        }

        fn record(
                &mut self,
                scenes: &[SceneFrame],
                ctx: &mut RenderContext,
        ) -> anyhow::Result<usize>
        {
                let mut draws = 0;

                for scene in scenes.iter()
                {
                        for light in scene.lights.iter()
                        {
                                let Some(shadow_map) = light.shadow_map
                                else
                                {
                                        continue;
                                };

                                // Far plane everywhere.
                                ctx.gpu.clear(DrawTarget::Texture(shadow_map), [1.0, 1.0, 1.0, 1.0])?;

                                for model in scene.models.iter()
                                {
                                        Self::draw_model(ctx, scene, light, shadow_map, model)?;

                                        draws += 1;
                                }
                        }
                }

                Ok(draws)
        }
}

/// Clears the frame and draws every model once per light, or once unlit
/// when its scene has no lights.
#[derive(Debug)]
pub struct ForwardPass
{
        pub name: String,
        pub enabled: bool,

        /// Used when no scene is active.
        pub clear_color: [f32; 4],
}

impl ForwardPass
{
        pub fn new() -> Self
        {
                Self {
                        name: "Forward Pass".to_string(),
                        enabled: true,
                        clear_color: [0.0, 0.0, 0.0, 1.0],
                }
        }

        fn draw_model(
                ctx: &mut RenderContext,
                scene: &SceneFrame,
                light: Option<&LightFrame>,
                model: &ModelFrame,
        ) -> anyhow::Result<()>
        {
                let key = ShaderKey {
                        scene: scene.scene,
                        camera: scene.camera,
                        light: light.map(|l| l.entity),
                        model: model.entity,
                        material: model.material,
                        user_data: None,
                };

                let variant = Variant {
                        pass: PassKind::Forward,
                        lit: light.is_some(),
                        material: model.shader.as_deref(),
                };

                let program = program(ctx, key, &variant, TextureFormat::Rgba8Srgb)?;

                ctx.gpu.draw(&DrawCall {
                        program,
                        target: DrawTarget::Frame,
                        tileset: model.tileset,
                        sampler: model.sampler,
                        tiles: model.tiles,
                        uniforms: model.uniforms(scene.view_proj, light),
                })
        }
}

impl Default for ForwardPass
{
        fn default() -> Self
        {
                Self::new()
        }
}

impl RenderPass for ForwardPass
{
        fn name(&self) -> &str
        {
                self.name.as_str()
        }

        fn as_any(&self) -> &dyn Any
        {
                self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any
        {
                self
        }

        fn enabled(&mut self) -> bool
        {
                self.enabled
        }

        fn set_enabled(
                &mut self,
                value: bool,
        )
        {
                self.enabled = value
        }

        fn record(
                &mut self,
                scenes: &[SceneFrame],
                ctx: &mut RenderContext,
        ) -> anyhow::Result<usize>
        {
                let clear_color = scenes
                        .first()
                        .map(|scene| scene.clear_color.into())
                        .unwrap_or(self.clear_color);

                ctx.gpu.clear(DrawTarget::Frame, clear_color)?;

                let mut draws = 0;

                for scene in scenes.iter()
                {
                        for model in scene.models.iter()
                        {
                                if scene.lights.is_empty()
                                {
                                        Self::draw_model(ctx, scene, None, model)?;

                                        draws += 1;
                                }

                                for light in scene.lights.iter()
                                {
                                        Self::draw_model(ctx, scene, Some(light), model)?;

                                        draws += 1;
                                }
                        }
                }

                Ok(draws)
        }
}
