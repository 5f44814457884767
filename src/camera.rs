use cgmath::{EuclideanSpace, Point3, Vector3};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.0,
        0.0, 0.0, 0.5, 1.0,
);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection
{
        /// Vertical field of view in degrees.
        Perspective
        {
                fovy: f32,
        },
        /// Half of the visible height in world units.
        Orthographic
        {
                half_height: f32,
        },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera
{
        pub eye: Point3<f32>,
        pub target: Point3<f32>,
        pub up: Vector3<f32>,
        pub aspect: f32,
        pub projection: Projection,
        pub znear: f32,
        pub zfar: f32,
}

impl Camera
{
        pub fn new(
                eye: Vector3<f32>,
                target: Vector3<f32>,
                aspect: f32,
                projection: Projection,
        ) -> Self
        {
                Self {
                        eye: Point3::from_vec(eye),
                        target: Point3::from_vec(target),
                        up: Vector3::unit_y(),
                        aspect,
                        projection,
                        znear: 0.1,
                        zfar: 1000.0,
                }
        }

        pub fn build_view_projection_matrix(&self) -> cgmath::Matrix4<f32>
        {
                let view = cgmath::Matrix4::look_at_rh(self.eye, self.target, self.up);

                let proj = match self.projection
                {
                        Projection::Perspective {
                                fovy,
                        } => cgmath::perspective(cgmath::Deg(fovy), self.aspect, self.znear, self.zfar),
                        Projection::Orthographic {
                                half_height,
                        } =>
                        {
                                let half_width = half_height * self.aspect;

                                cgmath::ortho(
                                        -half_width,
                                        half_width,
                                        -half_height,
                                        half_height,
                                        self.znear,
                                        self.zfar,
                                )
                        }
                };

                OPENGL_TO_WGPU_MATRIX * proj * view
        }
}
