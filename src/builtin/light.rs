use crate::builtin::{LIGHT, positive, release_error};
use crate::component::{
        ActivationContext, Callbacks, Component, ComponentType, OptionSpec, OptionValue, SystemData, ValueKind,
};
use crate::context::RenderContext;
use crate::providers::{TextureDesc, TextureFormat, TextureHandle};
use crate::shader::Dimension;
use cgmath::Vector3;

#[derive(Debug, Clone, PartialEq)]
pub struct LightData
{
        pub color: Vector3<f32>,

        pub position: Vector3<f32>,

        /// Present on shadow-casting lights.
        pub shadow_map: Option<TextureHandle>,

        pub shadow_resolution: u32,
}

pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(LIGHT, Callbacks::new(activate).on_deactivate(deactivate))
                .option(
                        OptionSpec::value("color", ValueKind::Vector3)
                                .with_default(Vector3::new(1.0f32, 1.0, 1.0))
                                .live(recolor),
                )
                .option(
                        OptionSpec::value("position", ValueKind::Vector3)
                                .with_default(Vector3::new(0.0f32, 0.0, 5.0))
                                .live(reposition),
                )
                .option(OptionSpec::value("casts_shadow", ValueKind::Bool).with_default(false))
                .option(OptionSpec::value("shadow_resolution", ValueKind::Int).with_default(512i64))
}

fn activate(ctx: &mut ActivationContext<'_, RenderContext>) -> anyhow::Result<SystemData>
{
        let component = ctx.component();

        let shadow_resolution = positive(component, "shadow_resolution")?;

        let shadow_map = if component.bool("casts_shadow").unwrap_or(false)
        {
                let label = format!("shadow map of {}", component.key());

                Some(ctx.env.gpu.create_texture(&TextureDesc {
                        label: &label,
                        width: shadow_resolution,
                        height: shadow_resolution,
                        format: TextureFormat::Rgba8Unorm,
                        data: None,
                        render_target: true,
                })?)
        }
        else
        {
                None
        };

        Ok(Box::new(LightData {
                color: component.vector3("color").unwrap_or(Vector3::new(1.0, 1.0, 1.0)),
                position: component.vector3("position").unwrap_or(Vector3::new(0.0, 0.0, 5.0)),
                shadow_map,
                shadow_resolution,
        }))
}

fn recolor(
        component: &mut Component,
        _old: Option<&OptionValue>,
        new: &OptionValue,
        _env: &mut RenderContext,
)
{
        if let (Some(color), Some(data)) = (new.as_vector3(), component.system_data_mut::<LightData>())
        {
                data.color = color;
        }
}

fn reposition(
        component: &mut Component,
        _old: Option<&OptionValue>,
        new: &OptionValue,
        _env: &mut RenderContext,
)
{
        if let (Some(position), Some(data)) = (new.as_vector3(), component.system_data_mut::<LightData>())
        {
                data.position = position;
        }
}

fn deactivate(
        component: &Component,
        data: SystemData,
        env: &mut RenderContext,
)
{
        env.invalidate(Dimension::Light(component.entity()));

        match data.downcast::<LightData>()
        {
                Ok(data) =>
                {
                        if let Some(shadow_map) = data.shadow_map
                        {
                                env.gpu.destroy_texture(shadow_map);
                        }
                }
                Err(_) => release_error(component, "LightData"),
        }
}
