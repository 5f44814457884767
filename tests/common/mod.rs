#![allow(dead_code)]

use patina::builtin::{CAMERA, RESOURCE, SCENE, TILEMAP, TILEMAP_TILES, TILESET};
use patina::component::{ComponentKey, EntityId, OptionValue};
use patina::config::{Backend, Config};
use patina::engine::{Engine, EngineBuilder};
use patina::providers::NullGpu;

pub const TILESET_IMAGE: u64 = 1;
pub const TILE_GRID: u64 = 2;
pub const TILESET_ENTITY: u64 = 3;
pub const TILES_ENTITY: u64 = 4;
pub const MAP: u64 = 5;
pub const CAMERA_ENTITY: u64 = 6;
pub const SCENE_ENTITY: u64 = 7;

pub fn config() -> Config
{
        let mut config = Config::default();

        config.backend = Backend::Null;
        config.show_start_message = false;
        config.show_exit_message = false;

        config
}

pub fn engine() -> Engine
{
        EngineBuilder::new().with_config(config()).build().unwrap()
}

pub fn gpu(engine: &Engine) -> &NullGpu
{
        engine.ctx
                .gpu
                .as_any()
                .downcast_ref::<NullGpu>()
                .expect("tests run on the null gpu")
}

/// A PNG of `width` x `height` opaque pixels.
pub fn png(
        width: u32,
        height: u32,
) -> Vec<u8>
{
        let mut bytes = Vec::new();

        image::RgbaImage::from_pixel(width, height, image::Rgba([200, 120, 40, 255]))
                .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
                .unwrap();

        bytes
}

pub fn key(
        entity: u64,
        type_id: &str,
) -> ComponentKey
{
        ComponentKey::new(entity, type_id)
}

/// A 32x32 tileset of 16x16 tiles, a 2x2 map, a camera and a scene drawing
/// the map. Nothing is activated.
pub fn add_tilemap_scene(engine: &mut Engine)
{
        let view = &mut engine.view;

        view.add_component(TILESET_IMAGE, RESOURCE, [("bytes", OptionValue::Bytes(png(32, 32)))])
                .unwrap();
        view.add_component(TILE_GRID, RESOURCE, [("bytes", OptionValue::Bytes(b"1 2\n3 4\n".to_vec()))])
                .unwrap();

        view.add_component(
                TILESET_ENTITY,
                TILESET,
                [("resource", OptionValue::Entity(EntityId(TILESET_IMAGE)))],
        )
        .unwrap();
        view.add_component(
                TILES_ENTITY,
                TILEMAP_TILES,
                [("resource", OptionValue::Entity(EntityId(TILE_GRID)))],
        )
        .unwrap();

        view.add_component(
                MAP,
                TILEMAP,
                [
                        ("tileset", OptionValue::Entity(EntityId(TILESET_ENTITY))),
                        ("tiles", OptionValue::Entity(EntityId(TILES_ENTITY))),
                ],
        )
        .unwrap();

        add_camera_and_scene(engine, CAMERA_ENTITY, SCENE_ENTITY);
}

pub fn add_camera_and_scene(
        engine: &mut Engine,
        camera: u64,
        scene: u64,
)
{
        engine.view
                .add_component(camera, CAMERA, Vec::<(String, OptionValue)>::new())
                .unwrap();

        engine.view
                .add_component(
                        scene,
                        SCENE,
                        [
                                ("camera", OptionValue::Entity(EntityId(camera))),
                                ("models", OptionValue::EntityArray(vec![EntityId(MAP)])),
                        ],
                )
                .unwrap();
}
