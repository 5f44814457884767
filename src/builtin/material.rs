use crate::builtin::MATERIAL;
use crate::component::{
        ActivationContext, Callbacks, Component, ComponentType, OptionSpec, OptionValue, SystemData, ValueKind,
};
use crate::context::RenderContext;
use crate::shader::{Dimension, source};
use cgmath::Vector4;

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData
{
        pub tint: Vector4<f32>,

        /// WGSL defining `fn material(color, uv)`; the default multiplies by
        /// `tint`.
        pub shader: Option<String>,
}

pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(MATERIAL, Callbacks::new(activate).on_deactivate(deactivate))
                .option(
                        OptionSpec::value("tint", ValueKind::Vector4)
                                .with_default(Vector4::new(1.0f32, 1.0, 1.0, 1.0))
                                .live(retint),
                )
                .option(OptionSpec::value("shader", ValueKind::String).optional())
}

fn activate(ctx: &mut ActivationContext<'_, RenderContext>) -> anyhow::Result<SystemData>
{
        let component = ctx.component();

        let shader = component.string("shader").map(str::to_string);

        if let Some(snippet) = &shader
        {
                source::validate_material(snippet)?;
        }

        Ok(Box::new(MaterialData {
                tint: component.vector4("tint").unwrap_or(Vector4::new(1.0, 1.0, 1.0, 1.0)),
                shader,
        }))
}

fn retint(
        component: &mut Component,
        _old: Option<&OptionValue>,
        new: &OptionValue,
        _env: &mut RenderContext,
)
{
        if let (Some(tint), Some(data)) = (new.as_vector4(), component.system_data_mut::<MaterialData>())
        {
                data.tint = tint;
        }
}

/// Drops every cached program shaded by this material.
fn deactivate(
        component: &Component,
        _data: SystemData,
        env: &mut RenderContext,
)
{
        env.invalidate(Dimension::Material(component.entity()));
}
