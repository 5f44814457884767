//! Per-frame snapshot of everything the passes draw.
//!
//! Passes never walk the view themselves. [`collect`] follows the resolved
//! links of every active scene once per frame and copies out the handles and
//! parameters the draw calls need.

use crate::builtin::{CameraData, LightData, MaterialData, SCENE, SceneData, TilemapData, TilesetData};
use crate::camera::{Camera, Projection};
use crate::component::{Component, ComponentKey, EntityId};
use crate::context::RenderContext;
use crate::providers::{DrawUniforms, SamplerHandle, TextureHandle};
use crate::view::View;
use cgmath::{Matrix4, Vector3, Vector4};

#[derive(Debug, Clone, PartialEq)]
pub struct LightFrame
{
        pub entity: EntityId,

        pub color: Vector3<f32>,

        pub position: Vector3<f32>,

        pub shadow_map: Option<TextureHandle>,

        /// Projection seen from the light, used by the shadow pass.
        pub view_proj: Matrix4<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelFrame
{
        pub entity: EntityId,

        pub tileset: TextureHandle,

        pub sampler: SamplerHandle,

        pub tiles: TextureHandle,

        pub map_size: (u32, u32),

        pub tileset_grid: (u32, u32),

        pub tile_size: f32,

        pub offset: (f32, f32),

        pub material: Option<EntityId>,

        pub tint: Vector4<f32>,

        /// WGSL of the material, when it brings its own.
        pub shader: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneFrame
{
        pub scene: EntityId,

        pub camera: EntityId,

        pub view_proj: Matrix4<f32>,

        pub clear_color: Vector4<f32>,

        pub lights: Vec<LightFrame>,

        pub models: Vec<ModelFrame>,
}

impl ModelFrame
{
        pub fn uniforms(
                &self,
                view_proj: Matrix4<f32>,
                light: Option<&LightFrame>,
        ) -> DrawUniforms
        {
                let (light_color, light_position) = match light
                {
                        Some(light) => (
                                [light.color.x, light.color.y, light.color.z, 1.0],
                                [light.position.x, light.position.y, light.position.z, 1.0],
                        ),
                        None => ([0.0; 4], [0.0; 4]),
                };

                DrawUniforms {
                        view_proj: view_proj.into(),
                        tint: self.tint.into(),
                        light_color,
                        light_position,
                        map: [
                                self.map_size.0 as f32,
                                self.map_size.1 as f32,
                                self.tile_size,
                                self.tile_size,
                        ],
                        tileset: [
                                self.tileset_grid.0 as f32,
                                self.tileset_grid.1 as f32,
                                self.offset.0,
                                self.offset.1,
                        ],
                }
        }
}

/// Snapshots every active scene, ordered by entity.
pub fn collect(view: &View<RenderContext>) -> Vec<SceneFrame>
{
        view.components_of_type(SCENE)
                .into_iter()
                .filter(|scene| scene.is_active())
                .filter_map(|scene| collect_scene(view, scene))
                .collect()
}

fn collect_scene(
        view: &View<RenderContext>,
        scene: &Component,
) -> Option<SceneFrame>
{
        let data = scene.system_data::<SceneData>()?;

        let camera = active(view, scene.resolved_dependency("camera")?)?;
        let camera_data = camera.system_data::<CameraData>()?;

        let lights = scene
                .resolved_dependencies("lights")
                .into_iter()
                .filter_map(|key| active(view, key))
                .filter_map(light_frame)
                .collect();

        let models = scene
                .resolved_dependencies("models")
                .into_iter()
                .filter_map(|key| active(view, key))
                .filter_map(|model| model_frame(view, model))
                .collect();

        Some(SceneFrame {
                scene: scene.entity(),
                camera: camera.entity(),
                view_proj: camera_data.view_proj,
                clear_color: data.clear_color,
                lights,
                models,
        })
}

fn active<'a>(
        view: &'a View<RenderContext>,
        key: &ComponentKey,
) -> Option<&'a Component>
{
        view.component(key).filter(|c| c.is_active())
}

fn light_frame(light: &Component) -> Option<LightFrame>
{
        let data = light.system_data::<LightData>()?;

        // Lights look straight down onto the map plane.
        let eye = data.position;
        let target = eye - Vector3::unit_z();

        let view_proj = Camera::new(
                eye,
                target,
                1.0,
                Projection::Perspective {
                        fovy: 90.0,
                },
        )
        .build_view_projection_matrix();

        Some(LightFrame {
                entity: light.entity(),
                color: data.color,
                position: data.position,
                shadow_map: data.shadow_map,
                view_proj,
        })
}

fn model_frame(
        view: &View<RenderContext>,
        model: &Component,
) -> Option<ModelFrame>
{
        let data = model.system_data::<TilemapData>()?;

        // The sampler can be swapped in place, so it is read from the tileset
        // every frame.
        let tileset = active(view, model.resolved_dependency("tileset")?)?;
        let tileset_data = tileset.system_data::<TilesetData>()?;

        let material = model
                .resolved_dependency("material")
                .and_then(|key| active(view, key));

        let material_data = material.and_then(|m| m.system_data::<MaterialData>());

        Some(ModelFrame {
                entity: model.entity(),
                tileset: data.tileset_texture,
                sampler: tileset_data.sampler,
                tiles: data.tiles_texture,
                map_size: data.map_size,
                tileset_grid: data.tileset_grid,
                tile_size: data.tile_size,
                offset: (data.offset.x, data.offset.y),
                material: material.map(Component::entity),
                tint: material_data
                        .map(|m| m.tint)
                        .unwrap_or(Vector4::new(1.0, 1.0, 1.0, 1.0)),
                shader: material_data.and_then(|m| m.shader.clone()),
        })
}
