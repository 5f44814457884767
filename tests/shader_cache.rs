mod common;

use common::*;
use patina::builtin::{CAMERA, MATERIAL, TILEMAP};
use patina::component::{EntityId, OptionValue};
use patina::shader::{Dimension, ShaderCache, ShaderKey};
use std::cell::RefCell;
use std::rc::Rc;

const OTHER_CAMERA: u64 = 10;
const OTHER_SCENE: u64 = 11;

fn scene_key(scene: u64) -> impl Fn(&ShaderKey) -> bool
{
        move |key| key.scene == EntityId(scene)
}

#[test_log::test]
fn removing_a_camera_drops_only_its_programs()
{
        let mut engine = engine();

        add_tilemap_scene(&mut engine);
        add_camera_and_scene(&mut engine, OTHER_CAMERA, OTHER_SCENE);

        engine.activate_all();

        let first = engine.render_frame().unwrap();

        assert_eq!(first.draws, 2);
        assert_eq!(engine.ctx.shaders.len(), 2);

        assert!(engine.remove_component(OTHER_CAMERA, CAMERA));

        // The other scene went down with its camera; the first is untouched.
        assert_eq!(engine.ctx.shaders.len(), 1);
        assert!(engine.ctx.shaders.keys().all(scene_key(SCENE_ENTITY)));
        assert_eq!(engine.ctx.retired_programs(), 1);

        let second = engine.render_frame().unwrap();

        assert_eq!(second.draws, 1);
        assert_eq!(second.retired, 1);
        assert_eq!(second.cache.misses, 2);
        assert_eq!(gpu(&engine).live_programs(), 1);
}

#[test_log::test]
fn material_change_recompiles_only_the_model_it_shades()
{
        let mut engine = engine();

        add_tilemap_scene(&mut engine);

        engine.view
                .add_component(
                        12,
                        MATERIAL,
                        [(
                                "shader",
                                OptionValue::String(
                                        "fn material(color: vec4<f32>, uv: vec2<f32>) -> vec4<f32> { return color.bgra; }"
                                                .into(),
                                ),
                        )],
                )
                .unwrap();

        engine.activate_all();
        engine.render_frame().unwrap();

        engine.set_option(&key(MAP, TILEMAP), "material", OptionValue::Entity(EntityId(12)))
                .unwrap();

        let stats = engine.render_frame().unwrap();

        assert_eq!(stats.retired, 1);
        assert_eq!(stats.cache.misses, 2);

        let keys: Vec<ShaderKey> = engine.ctx.shaders.keys().copied().collect();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].material, Some(EntityId(12)));

        // The remaining program goes with its material.
        assert_eq!(engine.ctx.invalidate(Dimension::Material(EntityId(12))), 1);
        assert_eq!(engine.ctx.invalidate(Dimension::Camera(EntityId(CAMERA_ENTITY))), 0);
}

#[test]
fn invalidation_frees_exactly_the_matching_entries()
{
        let freed = Rc::new(RefCell::new(Vec::new()));
        let sink = freed.clone();

        let mut cache = ShaderCache::new(move |shader: &'static str| sink.borrow_mut().push(shader));

        let key = |camera: u64, light: Option<u64>| ShaderKey {
                scene: EntityId(1),
                camera: EntityId(camera),
                light: light.map(EntityId),
                model: EntityId(5),
                material: None,
                user_data: None,
        };

        cache.insert(key(2, Some(3)), "c2-lit").unwrap();
        cache.insert(key(2, None), "c2-unlit").unwrap();
        cache.insert(key(4, Some(3)), "c4-lit").unwrap();

        assert_eq!(cache.invalidate_light(EntityId(3)), 2);
        assert_eq!(freed.borrow().len(), 2);
        assert!(cache.contains(&key(2, None)));

        assert_eq!(cache.invalidate_model(EntityId(5)), 1);
        assert!(cache.is_empty());
        assert_eq!(freed.borrow().len(), 3);
}
