use crate::builtin::CAMERA;
use crate::camera::{Camera, Projection};
use crate::component::{
        ActivationContext, Callbacks, Component, ComponentType, OptionSpec, OptionValue, SystemData, ValueKind,
};
use crate::context::RenderContext;
use crate::shader::Dimension;
use cgmath::{EuclideanSpace, Matrix4, Point3, Vector3};

#[derive(Debug, Clone, PartialEq)]
pub struct CameraData
{
        pub camera: Camera,

        pub view_proj: Matrix4<f32>,
}

impl CameraData
{
        fn refresh(&mut self)
        {
                self.view_proj = self.camera.build_view_projection_matrix();
        }
}

pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(CAMERA, Callbacks::new(activate).on_deactivate(deactivate))
                .option(
                        OptionSpec::value("position", ValueKind::Vector3)
                                .with_default(Vector3::new(0.0f32, 0.0, 10.0))
                                .live(move_eye),
                )
                .option(
                        OptionSpec::value("target", ValueKind::Vector3)
                                .with_default(Vector3::new(0.0f32, 0.0, 0.0)),
                )
                .option(OptionSpec::value("fov", ValueKind::Float).with_default(45.0).live(zoom))
                .option(OptionSpec::value("orthographic", ValueKind::Bool).with_default(false))
                .option(OptionSpec::value("ortho_height", ValueKind::Float).with_default(10.0))
}

fn activate(ctx: &mut ActivationContext<'_, RenderContext>) -> anyhow::Result<SystemData>
{
        let component = ctx.component();

        let projection = if component.bool("orthographic").unwrap_or(false)
        {
                Projection::Orthographic {
                        half_height: component.float("ortho_height").unwrap_or(10.0) as f32 / 2.0,
                }
        }
        else
        {
                Projection::Perspective {
                        fovy: component.float("fov").unwrap_or(45.0) as f32,
                }
        };

        let camera = Camera::new(
                component.vector3("position").unwrap_or(Vector3::new(0.0, 0.0, 10.0)),
                component.vector3("target").unwrap_or(Vector3::new(0.0, 0.0, 0.0)),
                ctx.env.aspect(),
                projection,
        );

        anyhow::ensure!(camera.eye != camera.target, "{} looks at its own position", component.key());

        let mut data = CameraData {
                camera,
                view_proj: Matrix4::from_scale(1.0),
        };

        data.refresh();

        Ok(Box::new(data))
}

fn move_eye(
        component: &mut Component,
        _old: Option<&OptionValue>,
        new: &OptionValue,
        _env: &mut RenderContext,
)
{
        if let (Some(position), Some(data)) = (new.as_vector3(), component.system_data_mut::<CameraData>())
        {
                data.camera.eye = Point3::from_vec(position);
                data.refresh();
        }
}

fn zoom(
        component: &mut Component,
        _old: Option<&OptionValue>,
        new: &OptionValue,
        _env: &mut RenderContext,
)
{
        let Some(fov) = new.as_float()
        else
        {
                return;
        };

        if let Some(data) = component.system_data_mut::<CameraData>()
        {
                if let Projection::Perspective {
                        fovy,
                } = &mut data.camera.projection
                {
                        *fovy = fov as f32;
                        data.refresh();
                }
        }
}

fn deactivate(
        component: &Component,
        _data: SystemData,
        env: &mut RenderContext,
)
{
        env.invalidate(Dimension::Camera(component.entity()));
}
