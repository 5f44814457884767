//! Component kinds shipped with the engine.
//!
//! Each kind lives in its own module and exposes a `component_type()`
//! constructor plus the system data it produces. Kinds that others draw
//! with (scene, camera, light, tilemap, material) drop their shader-cache
//! entries when they deactivate.

pub mod camera;
pub mod light;
pub mod material;
pub mod resource;
pub mod scene;
pub mod text;
pub mod tilemap;
pub mod tiles;
pub mod tileset;

pub use camera::CameraData;
pub use light::LightData;
pub use material::MaterialData;
pub use resource::ResourceData;
pub use scene::SceneData;
pub use text::{PlacedGlyph, TextData};
pub use tilemap::TilemapData;
pub use tiles::{TileGrid, TilesData};
pub use tileset::TilesetData;

use crate::component::{Component, TypeRegistry};
use crate::context::RenderContext;
use crate::error::ComponentResult;

pub const RESOURCE: &str = "resource";
pub const TILESET: &str = "tileset";
pub const TILEMAP_TILES: &str = "tilemap_tiles";
pub const TILEMAP: &str = "tilemap";
pub const CAMERA: &str = "camera";
pub const LIGHT: &str = "light";
pub const MATERIAL: &str = "material";
pub const SCENE: &str = "scene";
pub const TEXT: &str = "text";

pub fn register_all(registry: &mut TypeRegistry<RenderContext>) -> ComponentResult<()>
{
        registry.register(resource::component_type())?;
        registry.register(tileset::component_type())?;
        registry.register(tiles::component_type())?;
        registry.register(tilemap::component_type())?;
        registry.register(camera::component_type())?;
        registry.register(light::component_type())?;
        registry.register(material::component_type())?;
        registry.register(scene::component_type())?;
        registry.register(text::component_type())?;

        log::debug!("Registered {} builtin component types", registry.len());

        Ok(())
}

/// A registry holding every builtin kind.
pub fn registry() -> ComponentResult<TypeRegistry<RenderContext>>
{
        let mut registry = TypeRegistry::new();

        register_all(&mut registry)?;

        Ok(registry)
}

/// Reads an integer option that must be a positive `u32`.
fn positive(
        component: &Component,
        name: &str,
) -> anyhow::Result<u32>
{
        let value = component
                .require(name)?
                .as_int()
                .ok_or_else(|| anyhow::anyhow!("'{}' of {} is not an integer", name, component.key()))?;

        u32::try_from(value)
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| anyhow::anyhow!("'{}' of {} must be positive, got {}", name, component.key(), value))
}

fn release_error(
        component: &Component,
        expected: &str,
)
{
        log::error!("{} was handed system data that is not {}", component.key(), expected);
}

#[cfg(test)]
pub(crate) mod testing
{
        use super::*;
        use crate::component::OptionValue;
        use crate::providers::{ImageCrateDecoder, NullGpu};
        use crate::view::View;

        pub(crate) fn context() -> RenderContext
        {
                RenderContext::new(Box::new(NullGpu::new()), Box::new(ImageCrateDecoder))
        }

        pub(crate) fn gpu(ctx: &RenderContext) -> &NullGpu
        {
                ctx.gpu.as_any()
                        .downcast_ref::<NullGpu>()
                        .expect("test context runs on the null gpu")
        }

        pub(crate) fn view() -> View<RenderContext>
        {
                View::new(registry().unwrap())
        }

        pub(crate) fn none() -> Vec<(String, OptionValue)>
        {
                Vec::new()
        }

        /// A PNG of `width` x `height` opaque pixels.
        pub(crate) fn png(
                width: u32,
                height: u32,
        ) -> Vec<u8>
        {
                let mut bytes = Vec::new();

                image::RgbaImage::from_fn(width, height, |x, y| image::Rgba([x as u8, y as u8, 0, 255]))
                        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
                        .unwrap();

                bytes
        }
}
