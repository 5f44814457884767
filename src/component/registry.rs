use crate::component::{ComponentType, OptionKind};
use crate::error::{ComponentError, ComponentResult};
use derivative::Derivative;
use std::collections::{HashMap, HashSet};

/// All known component kinds, by id.
///
/// Dependency options may name a target type that is registered later;
/// targets are only looked up when a component activates.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct TypeRegistry<E>
{
        types: HashMap<String, ComponentType<E>>,
}

impl<E> Default for TypeRegistry<E>
{
        fn default() -> Self
        {
                Self::new()
        }
}

impl<E> TypeRegistry<E>
{
        pub fn new() -> Self
        {
                Self {
                        types: HashMap::new(),
                }
        }

        pub fn register(
                &mut self,
                component_type: ComponentType<E>,
        ) -> ComponentResult<()>
        {
                if self.types.contains_key(&component_type.id)
                {
                        return Err(ComponentError::DuplicateType(component_type.id));
                }

                Self::validate(&component_type)?;

                log::debug!(
                        "Registered component type '{}' ({} options)",
                        component_type.id,
                        component_type.options.len()
                );

                self.types
                        .insert(component_type.id.clone(), component_type);

                Ok(())
        }

        pub fn get(
                &self,
                id: &str,
        ) -> Option<&ComponentType<E>>
        {
                self.types.get(id)
        }

        pub fn contains(
                &self,
                id: &str,
        ) -> bool
        {
                self.types.contains_key(id)
        }

        pub fn ids(&self) -> impl Iterator<Item = &str>
        {
                self.types.keys().map(String::as_str)
        }

        pub fn len(&self) -> usize
        {
                self.types.len()
        }

        pub fn is_empty(&self) -> bool
        {
                self.types.is_empty()
        }

        fn validate(component_type: &ComponentType<E>) -> ComponentResult<()>
        {
                let invalid = |option: &str, reason: &str| ComponentError::InvalidOptionSpec {
                        type_id: component_type.id.clone(),
                        option: option.to_string(),
                        reason: reason.to_string(),
                };

                if component_type.id.is_empty()
                {
                        return Err(invalid("", "type id is empty"));
                }

                let mut seen = HashSet::new();

                for option in component_type.options.iter()
                {
                        if option.name.is_empty()
                        {
                                return Err(invalid("", "option name is empty"));
                        }

                        if !seen.insert(option.name.as_str())
                        {
                                return Err(invalid(&option.name, "duplicate option name"));
                        }

                        if let OptionKind::Dependency {
                                target,
                                ..
                        } = &option.kind
                        {
                                if target.is_empty()
                                {
                                        return Err(invalid(
                                                &option.name,
                                                "dependency names no target type",
                                        ));
                                }

                                if option.live_update.is_some()
                                {
                                        return Err(invalid(
                                                &option.name,
                                                "dependency options cannot be live-updated",
                                        ));
                                }
                        }

                        if let Some(default) = &option.default
                        {
                                if default.kind() != option.kind.value_kind()
                                {
                                        return Err(invalid(
                                                &option.name,
                                                "default value does not match the option kind",
                                        ));
                                }
                        }
                }

                Ok(())
        }
}

#[cfg(test)]
mod tests
{
        use super::*;
        use crate::component::{Callbacks, OptionSpec, ValueKind};

        fn noop() -> Callbacks<()>
        {
                Callbacks::new(|_| Ok(Box::new(())))
        }

        #[test]
        fn duplicate_type_is_rejected()
        {
                let mut registry = TypeRegistry::new();

                registry.register(ComponentType::new("resource", noop()))
                        .unwrap();

                let err = registry
                        .register(ComponentType::new("resource", noop()))
                        .unwrap_err();

                assert!(matches!(err, ComponentError::DuplicateType(id) if id == "resource"));
                assert_eq!(registry.len(), 1);
        }

        #[test]
        fn duplicate_option_name_is_rejected()
        {
                let mut registry = TypeRegistry::new();

                let err = registry
                        .register(
                                ComponentType::new("tileset", noop())
                                        .option(OptionSpec::value("width", ValueKind::Int))
                                        .option(OptionSpec::value("width", ValueKind::Float)),
                        )
                        .unwrap_err();

                assert!(matches!(err, ComponentError::InvalidOptionSpec { option, .. } if option == "width"));
                assert!(!registry.contains("tileset"));
        }

        #[test]
        fn forward_dependency_target_is_accepted()
        {
                let mut registry = TypeRegistry::new();

                registry.register(
                        ComponentType::new("tilemap", noop())
                                .option(OptionSpec::dependency("tileset", "tileset")),
                )
                .unwrap();

                assert!(registry.get("tilemap").is_some());
                assert!(registry.get("tileset").is_none());
        }

        #[test]
        fn mismatched_default_is_rejected()
        {
                let mut registry = TypeRegistry::new();

                let err = registry
                        .register(
                                ComponentType::new("camera", noop()).option(
                                        OptionSpec::value("fov", ValueKind::Float)
                                                .with_default(true),
                                ),
                        )
                        .unwrap_err();

                assert!(matches!(err, ComponentError::InvalidOptionSpec { .. }));
        }

        #[test]
        fn live_dependency_is_rejected()
        {
                let mut registry = TypeRegistry::new();

                let err = registry
                        .register(ComponentType::new("tilemap", noop()).option(
                                OptionSpec::dependency("tileset", "tileset").live(|_, _, _, _| {}),
                        ))
                        .unwrap_err();

                assert!(matches!(err, ComponentError::InvalidOptionSpec { .. }));
        }
}
