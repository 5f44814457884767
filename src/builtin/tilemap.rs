use crate::builtin::{MATERIAL, TILEMAP, TILEMAP_TILES, TILESET, TilesData, TilesetData};
use crate::component::{
        ActivationContext, Callbacks, Component, ComponentType, OptionSpec, OptionValue, SystemData, ValueKind,
};
use crate::context::RenderContext;
use crate::providers::TextureHandle;
use crate::shader::Dimension;
use cgmath::Vector2;

/// A drawable map: the tileset it samples and the grid it lays out.
#[derive(Debug, Clone, PartialEq)]
pub struct TilemapData
{
        pub tileset_texture: TextureHandle,

        pub tiles_texture: TextureHandle,

        /// Map size in tiles.
        pub map_size: (u32, u32),

        /// Tileset columns and rows.
        pub tileset_grid: (u32, u32),

        /// World units per tile.
        pub tile_size: f32,

        pub offset: Vector2<f32>,
}

pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(TILEMAP, Callbacks::new(activate).on_deactivate(deactivate))
                .option(OptionSpec::dependency("tileset", TILESET))
                .option(OptionSpec::dependency("tiles", TILEMAP_TILES))
                .option(OptionSpec::dependency("material", MATERIAL).optional())
                .option(OptionSpec::value("tile_size", ValueKind::Float).with_default(1.0))
                .option(
                        OptionSpec::value("offset", ValueKind::Vector2)
                                .with_default(Vector2::new(0.0f32, 0.0))
                                .live(move_offset),
                )
}

fn activate(ctx: &mut ActivationContext<'_, RenderContext>) -> anyhow::Result<SystemData>
{
        let component = ctx.component();
        let tileset = ctx.dependency_data::<TilesetData>("tileset")?;
        let tiles = ctx.dependency_data::<TilesData>("tiles")?;

        anyhow::ensure!(
                u32::from(tiles.max_index) <= tileset.tile_count(),
                "{} uses tile {} but its tileset has {} tiles",
                component.key(),
                tiles.max_index,
                tileset.tile_count()
        );

        let tile_size = component.float("tile_size").unwrap_or(1.0) as f32;

        anyhow::ensure!(tile_size > 0.0, "{} needs a positive tile_size", component.key());

        Ok(Box::new(TilemapData {
                tileset_texture: tileset.texture,
                tiles_texture: tiles.texture,
                map_size: (tiles.width, tiles.height),
                tileset_grid: (tileset.columns(), tileset.rows()),
                tile_size,
                offset: component.vector2("offset").unwrap_or(Vector2::new(0.0, 0.0)),
        }))
}

fn move_offset(
        component: &mut Component,
        _old: Option<&OptionValue>,
        new: &OptionValue,
        _env: &mut RenderContext,
)
{
        if let (Some(offset), Some(data)) = (new.as_vector2(), component.system_data_mut::<TilemapData>())
        {
                data.offset = offset;
        }
}

fn deactivate(
        component: &Component,
        _data: SystemData,
        env: &mut RenderContext,
)
{
        env.invalidate(Dimension::Model(component.entity()));
}

#[cfg(test)]
mod tests
{
        use super::*;
        use crate::builtin::{RESOURCE, testing};
        use crate::component::EntityId;
        use crate::view::View;

        fn tilemap_view(tiles: &str) -> View<RenderContext>
        {
                let mut view = testing::view();

                view.add_component(1, RESOURCE, [("bytes", OptionValue::Bytes(testing::png(32, 32)))])
                        .unwrap();
                view.add_component(2, RESOURCE, [("bytes", OptionValue::Bytes(tiles.as_bytes().to_vec()))])
                        .unwrap();

                view.add_component(3, TILESET, [("resource", OptionValue::Entity(EntityId(1)))])
                        .unwrap();
                view.add_component(4, TILEMAP_TILES, [("resource", OptionValue::Entity(EntityId(2)))])
                        .unwrap();

                view.add_component(
                        5,
                        TILEMAP,
                        [
                                ("tileset", OptionValue::Entity(EntityId(3))),
                                ("tiles", OptionValue::Entity(EntityId(4))),
                        ],
                )
                .unwrap();

                view
        }

        #[test]
        fn out_of_range_tile_fails_and_rolls_back()
        {
                let mut view = tilemap_view("1 2\n3 5\n");
                let mut ctx = testing::context();

                let key = view.get(EntityId(5), TILEMAP).unwrap().key().clone();

                assert!(view.try_activate(&key, &mut ctx).is_err());

                assert!(view.components_of_type(TILESET).iter().all(|c| !c.is_active()));
                assert_eq!(testing::gpu(&ctx).live_textures(), 0);
        }

        #[test]
        fn offset_moves_without_restart()
        {
                let mut view = tilemap_view("1 2\n3 4\n");
                let mut ctx = testing::context();

                let key = view.get(EntityId(5), TILEMAP).unwrap().key().clone();

                view.try_activate(&key, &mut ctx).unwrap();

                let creates = testing::gpu(&ctx).calls().len();

                view.set_option(&key, "offset", OptionValue::Vector2(Vector2::new(2.0, -1.0)), &mut ctx)
                        .unwrap();

                let data = view.component(&key).unwrap().system_data::<TilemapData>().unwrap();

                assert_eq!(data.offset, Vector2::new(2.0, -1.0));
                assert_eq!(data.map_size, (2, 2));
                assert_eq!(testing::gpu(&ctx).calls().len(), creates);
        }
}
