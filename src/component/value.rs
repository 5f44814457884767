use cgmath::{Vector2, Vector3, Vector4};
use std::fmt;
use std::str::FromStr;

/// Identifier of an entity. Entities are plain ids; everything they carry
/// lives in their components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                write!(f, "#{}", self.0)
        }
}

impl From<u64> for EntityId
{
        fn from(value: u64) -> Self
        {
                Self(value)
        }
}

/// The tag of an [`OptionValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind
{
        Bool,
        Int,
        Float,
        String,
        Bytes,
        Vector2,
        Vector3,
        Vector4,
        Entity,
        EntityArray,
}

impl ValueKind
{
        pub fn name(self) -> &'static str
        {
                match self
                {
                        ValueKind::Bool => "bool",
                        ValueKind::Int => "int",
                        ValueKind::Float => "float",
                        ValueKind::String => "string",
                        ValueKind::Bytes => "bytes",
                        ValueKind::Vector2 => "vector2",
                        ValueKind::Vector3 => "vector3",
                        ValueKind::Vector4 => "vector4",
                        ValueKind::Entity => "entity",
                        ValueKind::EntityArray => "entity_array",
                }
        }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValueKind(pub String);

impl fmt::Display for UnknownValueKind
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                write!(f, "unknown value kind '{}'", self.0)
        }
}

impl FromStr for ValueKind
{
        type Err = UnknownValueKind;

        fn from_str(s: &str) -> Result<Self, Self::Err>
        {
                let kind = match s
                {
                        "bool" => ValueKind::Bool,
                        "int" => ValueKind::Int,
                        "float" => ValueKind::Float,
                        "string" => ValueKind::String,
                        "bytes" => ValueKind::Bytes,
                        "vector2" => ValueKind::Vector2,
                        "vector3" => ValueKind::Vector3,
                        "vector4" => ValueKind::Vector4,
                        "entity" => ValueKind::Entity,
                        "entity_array" => ValueKind::EntityArray,
                        other => return Err(UnknownValueKind(other.to_string())),
                };

                Ok(kind)
        }
}

/// Current value of a configuration option.
///
/// Dependency options hold the *target entity*, never the target component;
/// the [`View`](crate::view::View) resolves it when the owner activates.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue
{
        Bool(bool),
        Int(i64),
        Float(f64),
        String(String),
        Bytes(Vec<u8>),
        Vector2(Vector2<f32>),
        Vector3(Vector3<f32>),
        Vector4(Vector4<f32>),
        Entity(EntityId),
        EntityArray(Vec<EntityId>),
}

impl OptionValue
{
        pub fn kind(&self) -> ValueKind
        {
                match self
                {
                        OptionValue::Bool(_) => ValueKind::Bool,
                        OptionValue::Int(_) => ValueKind::Int,
                        OptionValue::Float(_) => ValueKind::Float,
                        OptionValue::String(_) => ValueKind::String,
                        OptionValue::Bytes(_) => ValueKind::Bytes,
                        OptionValue::Vector2(_) => ValueKind::Vector2,
                        OptionValue::Vector3(_) => ValueKind::Vector3,
                        OptionValue::Vector4(_) => ValueKind::Vector4,
                        OptionValue::Entity(_) => ValueKind::Entity,
                        OptionValue::EntityArray(_) => ValueKind::EntityArray,
                }
        }

        pub fn as_bool(&self) -> Option<bool>
        {
                match self
                {
                        OptionValue::Bool(v) => Some(*v),
                        _ => None,
                }
        }

        pub fn as_int(&self) -> Option<i64>
        {
                match self
                {
                        OptionValue::Int(v) => Some(*v),
                        _ => None,
                }
        }

        /// Ints are accepted where a float is read.
        pub fn as_float(&self) -> Option<f64>
        {
                match self
                {
                        OptionValue::Float(v) => Some(*v),
                        OptionValue::Int(v) => Some(*v as f64),
                        _ => None,
                }
        }

        pub fn as_str(&self) -> Option<&str>
        {
                match self
                {
                        OptionValue::String(v) => Some(v.as_str()),
                        _ => None,
                }
        }

        pub fn as_bytes(&self) -> Option<&[u8]>
        {
                match self
                {
                        OptionValue::Bytes(v) => Some(v.as_slice()),
                        _ => None,
                }
        }

        pub fn as_vector2(&self) -> Option<Vector2<f32>>
        {
                match self
                {
                        OptionValue::Vector2(v) => Some(*v),
                        _ => None,
                }
        }

        pub fn as_vector3(&self) -> Option<Vector3<f32>>
        {
                match self
                {
                        OptionValue::Vector3(v) => Some(*v),
                        _ => None,
                }
        }

        pub fn as_vector4(&self) -> Option<Vector4<f32>>
        {
                match self
                {
                        OptionValue::Vector4(v) => Some(*v),
                        _ => None,
                }
        }

        /// Entity ids referenced by the value, in order. Empty for non-entity
        /// values.
        pub fn entities(&self) -> &[EntityId]
        {
                match self
                {
                        OptionValue::Entity(v) => std::slice::from_ref(v),
                        OptionValue::EntityArray(v) => v.as_slice(),
                        _ => &[],
                }
        }
}

impl From<bool> for OptionValue
{
        fn from(value: bool) -> Self
        {
                OptionValue::Bool(value)
        }
}

impl From<i64> for OptionValue
{
        fn from(value: i64) -> Self
        {
                OptionValue::Int(value)
        }
}

impl From<f64> for OptionValue
{
        fn from(value: f64) -> Self
        {
                OptionValue::Float(value)
        }
}

impl From<&str> for OptionValue
{
        fn from(value: &str) -> Self
        {
                OptionValue::String(value.to_string())
        }
}

impl From<String> for OptionValue
{
        fn from(value: String) -> Self
        {
                OptionValue::String(value)
        }
}

impl From<Vec<u8>> for OptionValue
{
        fn from(value: Vec<u8>) -> Self
        {
                OptionValue::Bytes(value)
        }
}

impl From<Vector2<f32>> for OptionValue
{
        fn from(value: Vector2<f32>) -> Self
        {
                OptionValue::Vector2(value)
        }
}

impl From<Vector3<f32>> for OptionValue
{
        fn from(value: Vector3<f32>) -> Self
        {
                OptionValue::Vector3(value)
        }
}

impl From<Vector4<f32>> for OptionValue
{
        fn from(value: Vector4<f32>) -> Self
        {
                OptionValue::Vector4(value)
        }
}

impl From<EntityId> for OptionValue
{
        fn from(value: EntityId) -> Self
        {
                OptionValue::Entity(value)
        }
}

impl From<Vec<EntityId>> for OptionValue
{
        fn from(value: Vec<EntityId>) -> Self
        {
                OptionValue::EntityArray(value)
        }
}
