use crate::builtin::{CAMERA, LIGHT, SCENE, TILEMAP};
use crate::component::{
        ActivationContext, Callbacks, Component, ComponentType, OptionSpec, OptionValue, SystemData, ValueKind,
};
use crate::context::RenderContext;
use crate::shader::Dimension;
use cgmath::Vector4;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneData
{
        pub clear_color: Vector4<f32>,
}

/// A scene ties a camera, its lights and the models it draws together.
/// Lights are optional; a light that cannot activate is left out.
pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(SCENE, Callbacks::new(activate).on_deactivate(deactivate))
                .option(OptionSpec::dependency("camera", CAMERA))
                .option(OptionSpec::dependency_array("lights", LIGHT).optional())
                .option(OptionSpec::dependency_array("models", TILEMAP))
                .option(
                        OptionSpec::value("clear_color", ValueKind::Vector4)
                                .with_default(Vector4::new(0.1f32, 0.1, 0.1, 1.0))
                                .live(set_clear_color),
                )
}

fn activate(ctx: &mut ActivationContext<'_, RenderContext>) -> anyhow::Result<SystemData>
{
        let component = ctx.component();

        log::debug!(
                "{} draws {} model(s) under {} light(s)",
                component.key(),
                ctx.dependencies("models").len(),
                ctx.dependencies("lights").len()
        );

        Ok(Box::new(SceneData {
                clear_color: component
                        .vector4("clear_color")
                        .unwrap_or(Vector4::new(0.1, 0.1, 0.1, 1.0)),
        }))
}

fn set_clear_color(
        component: &mut Component,
        _old: Option<&OptionValue>,
        new: &OptionValue,
        _env: &mut RenderContext,
)
{
        if let (Some(color), Some(data)) = (new.as_vector4(), component.system_data_mut::<SceneData>())
        {
                data.clear_color = color;
        }
}

fn deactivate(
        component: &Component,
        _data: SystemData,
        env: &mut RenderContext,
)
{
        env.invalidate(Dimension::Scene(component.entity()));
}
