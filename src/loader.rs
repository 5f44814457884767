//! Scene files.
//!
//! A scene file is a TOML document listing entities and the components they
//! carry:
//!
//! ```toml
//! [[entity]]
//! id = 1
//!
//! [entity.components.resource]
//! path = "tiles.png"
//!
//! [[entity]]
//! id = 2
//!
//! [entity.components.tileset]
//! resource = 1
//! tile_width = 8
//! ```
//!
//! Option values are converted according to the kind the component type
//! declares for them, so `resource = 1` becomes an entity reference and
//! `position = [0.0, 0.0, 10.0]` a three-component vector.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use cgmath::{Vector2, Vector3, Vector4};
use serde::Deserialize;

use crate::component::{ComponentKey, EntityId, OptionValue, ValueKind};
use crate::view::View;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneFile
{
        #[serde(default)]
        pub entity: Vec<EntityEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityEntry
{
        pub id: u64,

        /// Option tables keyed by component type id.
        #[serde(default)]
        pub components: BTreeMap<String, toml::Table>,
}

/// A component ready to be added to a view.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentEntry
{
        pub entity: EntityId,

        pub type_id: String,

        pub options: Vec<(String, OptionValue)>,
}

impl SceneFile
{
        pub fn parse(text: &str) -> anyhow::Result<Self>
        {
                let file = toml::from_str(text)?;

                Ok(file)
        }

        /// Converts every option table against the registered schemas.
        pub fn components<E>(
                &self,
                view: &View<E>,
        ) -> anyhow::Result<Vec<ComponentEntry>>
        {
                let mut entries = Vec::new();

                for entity in self.entity.iter()
                {
                        for (type_id, table) in entity.components.iter()
                        {
                                let component_type = view.registry().get(type_id).ok_or_else(|| {
                                        anyhow::anyhow!("entity {}: unknown component type '{}'", entity.id, type_id)
                                })?;

                                let mut options = Vec::with_capacity(table.len());

                                for (name, value) in table.iter()
                                {
                                        let spec = component_type.option_spec(name).ok_or_else(|| {
                                                anyhow::anyhow!(
                                                        "entity {}: component '{}' has no option '{}'",
                                                        entity.id,
                                                        type_id,
                                                        name
                                                )
                                        })?;

                                        let value = convert(value, spec.kind.value_kind()).with_context(|| {
                                                format!(
                                                        "entity {}: component '{}' option '{}'",
                                                        entity.id, type_id, name
                                                )
                                        })?;

                                        options.push((name.clone(), value));
                                }

                                entries.push(ComponentEntry {
                                        entity: EntityId(entity.id),
                                        type_id: type_id.clone(),
                                        options,
                                });
                        }
                }

                Ok(entries)
        }
}

/// Adds every component of a scene file to `view`, inactive.
///
/// The whole file is converted before anything is added. Components added
/// before one that the view rejects stay in the view.
pub fn load_str<E>(
        view: &mut View<E>,
        text: &str,
) -> anyhow::Result<Vec<ComponentKey>>
{
        let file = SceneFile::parse(text)?;

        let entries = file.components(view)?;

        let mut keys = Vec::with_capacity(entries.len());

        for entry in entries
        {
                let key = view
                        .add_component(entry.entity, &entry.type_id, entry.options)
                        .with_context(|| format!("entity {}: adding component '{}'", entry.entity, entry.type_id))?;

                keys.push(key);
        }

        log::info!("Loaded {} component(s)", keys.len());

        Ok(keys)
}

pub fn load_file<E>(
        view: &mut View<E>,
        path: impl AsRef<Path>,
) -> anyhow::Result<Vec<ComponentKey>>
{
        let path = path.as_ref();

        let text = std::fs::read_to_string(path).with_context(|| format!("reading scene {}", path.display()))?;

        load_str(view, &text).with_context(|| format!("loading scene {}", path.display()))
}

/// Converts one TOML value to the declared kind.
pub fn convert(
        value: &toml::Value,
        kind: ValueKind,
) -> anyhow::Result<OptionValue>
{
        let converted = match kind
        {
                ValueKind::Bool => value.as_bool().map(OptionValue::Bool),
                ValueKind::Int => value.as_integer().map(OptionValue::Int),
                ValueKind::Float => number(value).map(OptionValue::Float),
                ValueKind::String => value.as_str().map(|s| OptionValue::String(s.to_string())),
                ValueKind::Bytes => return bytes(value).map(OptionValue::Bytes),
                ValueKind::Vector2 => floats::<2>(value)?.map(|[x, y]| OptionValue::Vector2(Vector2::new(x, y))),
                ValueKind::Vector3 => {
                        floats::<3>(value)?.map(|[x, y, z]| OptionValue::Vector3(Vector3::new(x, y, z)))
                }
                ValueKind::Vector4 => {
                        floats::<4>(value)?.map(|[x, y, z, w]| OptionValue::Vector4(Vector4::new(x, y, z, w)))
                }
                ValueKind::Entity => return entity(value).map(OptionValue::Entity),
                ValueKind::EntityArray => value
                        .as_array()
                        .map(|items| items.iter().map(entity).collect::<anyhow::Result<Vec<_>>>())
                        .transpose()?
                        .map(OptionValue::EntityArray),
        };

        converted.ok_or_else(|| anyhow::anyhow!("expected {}, found {}", kind.name(), value.type_str()))
}

fn number(value: &toml::Value) -> Option<f64>
{
        value.as_float().or_else(|| value.as_integer().map(|i| i as f64))
}

fn floats<const N: usize>(value: &toml::Value) -> anyhow::Result<Option<[f32; N]>>
{
        let Some(items) = value.as_array()
        else
        {
                return Ok(None);
        };

        anyhow::ensure!(items.len() == N, "expected {} numbers, found {}", N, items.len());

        let mut out = [0.0f32; N];

        for (slot, item) in out.iter_mut().zip(items.iter())
        {
                *slot = number(item).ok_or_else(|| anyhow::anyhow!("expected a number, found {}", item.type_str()))?
                        as f32;
        }

        Ok(Some(out))
}

fn entity(value: &toml::Value) -> anyhow::Result<EntityId>
{
        let id = value
                .as_integer()
                .ok_or_else(|| anyhow::anyhow!("expected an entity id, found {}", value.type_str()))?;

        let id = u64::try_from(id).map_err(|_| anyhow::anyhow!("entity ids are non-negative, found {}", id))?;

        Ok(EntityId(id))
}

/// Strings are taken as UTF-8; arrays as one integer per byte.
fn bytes(value: &toml::Value) -> anyhow::Result<Vec<u8>>
{
        if let Some(text) = value.as_str()
        {
                return Ok(text.as_bytes().to_vec());
        }

        let items = value
                .as_array()
                .ok_or_else(|| anyhow::anyhow!("expected bytes, found {}", value.type_str()))?;

        items.iter()
                .map(|item| {
                        item.as_integer()
                                .and_then(|i| u8::try_from(i).ok())
                                .ok_or_else(|| anyhow::anyhow!("{} is not a byte", item))
                })
                .collect()
}

#[cfg(test)]
mod tests
{
        use super::*;
        use crate::builtin::{CAMERA, RESOURCE, SCENE, testing};

        #[test]
        fn values_follow_declared_kinds()
        {
                let mut view = testing::view();

                let keys = load_str(
                        &mut view,
                        r#"
                        [[entity]]
                        id = 7

                        [entity.components.camera]
                        position = [1, 2.5, 10]
                        fov = 60

                        [entity.components.resource]
                        bytes = "1 2"

                        [[entity]]
                        id = 8

                        [entity.components.scene]
                        camera = 7
                        models = []
                        "#,
                )
                .unwrap();

                assert_eq!(keys.len(), 3);

                let camera = view.get(EntityId(7), CAMERA).unwrap();

                assert_eq!(camera.vector3("position"), Some(Vector3::new(1.0, 2.5, 10.0)));
                assert_eq!(camera.float("fov"), Some(60.0));

                let resource = view.get(EntityId(7), RESOURCE).unwrap();

                assert_eq!(resource.bytes("bytes"), Some(&b"1 2"[..]));

                let scene = view.get(EntityId(8), SCENE).unwrap();

                assert_eq!(scene.option("camera"), Some(&OptionValue::Entity(EntityId(7))));
                assert_eq!(scene.option("models"), Some(&OptionValue::EntityArray(Vec::new())));
        }

        #[test]
        fn errors_name_entity_type_and_option()
        {
                let mut view = testing::view();

                let err = load_str(
                        &mut view,
                        r#"
                        [[entity]]
                        id = 3

                        [entity.components.camera]
                        position = [1, 2]
                        "#,
                )
                .unwrap_err();

                let message = format!("{err:#}");

                assert!(message.contains("entity 3"), "{message}");
                assert!(message.contains("'camera'"), "{message}");
                assert!(message.contains("'position'"), "{message}");
                assert!(view.is_empty());
        }

        #[test]
        fn unknown_types_and_options_are_rejected()
        {
                let mut view = testing::view();

                let unknown_type = "[[entity]]\nid = 1\n[entity.components.mesh]\n";
                let unknown_option = "[[entity]]\nid = 1\n[entity.components.camera]\nzoom = 2.0\n";

                assert!(load_str(&mut view, unknown_type).is_err());
                assert!(load_str(&mut view, unknown_option).is_err());
        }

        #[test]
        fn conversion_rejects_out_of_range_values()
        {
                assert!(convert(&toml::Value::Integer(-1), ValueKind::Entity).is_err());
                assert!(convert(&toml::Value::Integer(300), ValueKind::Bytes).is_err());

                let bytes = toml::Value::Array(vec![toml::Value::Integer(0), toml::Value::Integer(255)]);

                assert_eq!(convert(&bytes, ValueKind::Bytes).unwrap(), OptionValue::Bytes(vec![0, 255]));
                assert!(convert(&toml::Value::Boolean(true), ValueKind::String).is_err());
        }
}
