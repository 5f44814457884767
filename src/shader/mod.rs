//! Compiled-program caching.
//!
//! A program is bound to the whole context it was built for: the scene,
//! its camera, the light it is lit by, the model it draws, the material
//! that shades it and an optional pass tag. [`ShaderCache`] memoizes one
//! program per such [`ShaderKey`] and drops exactly the entries that name
//! an object when that object goes away.

pub mod cache;
pub mod source;

pub use cache::{CacheStats, ShaderCache};

use crate::component::EntityId;
use crate::providers::ProgramHandle;
use std::fmt;

/// `user_data` tag of keys used by the shadow pass.
pub const SHADOW_PASS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey
{
        pub scene: EntityId,

        pub camera: EntityId,

        /// `None` for unlit draws.
        pub light: Option<EntityId>,

        pub model: EntityId,

        /// `None` when the model draws with the default material.
        pub material: Option<EntityId>,

        pub user_data: Option<u64>,
}

impl ShaderKey
{
        /// Every dimension value this key can be invalidated by.
        pub fn dimensions(&self) -> Vec<Dimension>
        {
                let mut dimensions = vec![
                        Dimension::Scene(self.scene),
                        Dimension::Camera(self.camera),
                        Dimension::Model(self.model),
                ];

                if let Some(light) = self.light
                {
                        dimensions.push(Dimension::Light(light));
                }

                if let Some(material) = self.material
                {
                        dimensions.push(Dimension::Material(material));
                }

                if let Some(user_data) = self.user_data
                {
                        dimensions.push(Dimension::UserData(user_data));
                }

                dimensions
        }
}

impl fmt::Display for ShaderKey
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                write!(f, "scene {} camera {} model {}", self.scene, self.camera, self.model)?;

                if let Some(light) = self.light
                {
                        write!(f, " light {}", light)?;
                }

                if let Some(material) = self.material
                {
                        write!(f, " material {}", material)?;
                }

                if let Some(user_data) = self.user_data
                {
                        write!(f, " user {}", user_data)?;
                }

                Ok(())
        }
}

/// One key dimension together with the value to invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension
{
        Scene(EntityId),
        Camera(EntityId),
        Light(EntityId),
        Model(EntityId),
        Material(EntityId),
        UserData(u64),
}

/// What the engine keeps in its cache: a program living on the GPU
/// provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledShader
{
        pub program: ProgramHandle,

        pub label: String,
}
