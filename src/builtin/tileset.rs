use crate::builtin::{RESOURCE, ResourceData, TILESET, positive, release_error};
use crate::component::{
        ActivationContext, Component, ComponentBehaviour, ComponentType, OptionSpec, SystemData, UpdateOutcome,
        ValueKind,
};
use crate::context::RenderContext;
use crate::providers::{FilterMode, SamplerDesc, SamplerHandle, TextureDesc, TextureFormat, TextureHandle};
use anyhow::Context;

/// A tileset image on the GPU, cut into equally sized cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetData
{
        pub texture: TextureHandle,

        pub sampler: SamplerHandle,

        pub filter: FilterMode,

        pub width: u32,

        pub height: u32,

        pub tile_width: u32,

        pub tile_height: u32,
}

impl TilesetData
{
        pub fn columns(&self) -> u32
        {
                self.width / self.tile_width
        }

        pub fn rows(&self) -> u32
        {
                self.height / self.tile_height
        }

        pub fn tile_count(&self) -> u32
        {
                self.columns() * self.rows()
        }
}

pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(TILESET, Tileset)
                .option(OptionSpec::dependency("resource", RESOURCE))
                .option(OptionSpec::value("tile_width", ValueKind::Int).with_default(16i64))
                .option(OptionSpec::value("tile_height", ValueKind::Int).with_default(16i64))
                .option(OptionSpec::value("filter", ValueKind::String).with_default("nearest"))
}

fn filter_of(component: &Component) -> anyhow::Result<FilterMode>
{
        component.string("filter").unwrap_or("nearest").parse()
}

pub struct Tileset;

impl ComponentBehaviour<RenderContext> for Tileset
{
        fn activate(
                &self,
                ctx: &mut ActivationContext<'_, RenderContext>,
        ) -> anyhow::Result<SystemData>
        {
                let component = ctx.component();
                let resource = ctx.dependency_data::<ResourceData>("resource")?;

                let tile_width = positive(component, "tile_width")?;
                let tile_height = positive(component, "tile_height")?;
                let filter = filter_of(component)?;

                let image = ctx
                        .env
                        .decoder
                        .decode(&resource.bytes)
                        .with_context(|| format!("decoding the image of {}", component.key()))?;

                anyhow::ensure!(
                        image.width >= tile_width && image.height >= tile_height,
                        "{} is {}x{}, smaller than one {}x{} tile",
                        component.key(),
                        image.width,
                        image.height,
                        tile_width,
                        tile_height
                );

                let label = component.key().to_string();

                let texture = ctx.env.gpu.create_texture(&TextureDesc {
                        label: &label,
                        width: image.width,
                        height: image.height,
                        format: TextureFormat::Rgba8Srgb,
                        data: Some(&image.rgba),
                        render_target: false,
                })?;

                let sampler = match ctx.env.gpu.create_sampler(&SamplerDesc {
                        filter,
                })
                {
                        Ok(sampler) => sampler,
                        Err(err) =>
                        {
                                ctx.env.gpu.destroy_texture(texture);
                                return Err(err);
                        }
                };

                Ok(Box::new(TilesetData {
                        texture,
                        sampler,
                        filter,
                        width: image.width,
                        height: image.height,
                        tile_width,
                        tile_height,
                }))
        }

        /// Swaps the sampler for a `filter` change; anything else needs a
        /// new texture.
        fn update(
                &self,
                component: &mut Component,
                option: &str,
                env: &mut RenderContext,
        ) -> anyhow::Result<UpdateOutcome>
        {
                if option != "filter"
                {
                        return Ok(UpdateOutcome::Restart);
                }

                let filter = filter_of(component)?;

                let data = component
                        .system_data_mut::<TilesetData>()
                        .ok_or_else(|| anyhow::anyhow!("tileset without tileset data"))?;

                let sampler = env.gpu.create_sampler(&SamplerDesc {
                        filter,
                })?;

                env.gpu.destroy_sampler(data.sampler);

                data.sampler = sampler;
                data.filter = filter;

                Ok(UpdateOutcome::Applied)
        }

        fn deactivate(
                &self,
                component: &Component,
                data: SystemData,
                env: &mut RenderContext,
        )
        {
                match data.downcast::<TilesetData>()
                {
                        Ok(data) =>
                        {
                                env.gpu.destroy_sampler(data.sampler);
                                env.gpu.destroy_texture(data.texture);
                        }
                        Err(_) => release_error(component, "TilesetData"),
                }
        }
}
