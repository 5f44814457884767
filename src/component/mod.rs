//! Component model: typed option values, per-kind schemas and behaviours,
//! the type registry and live component instances.
//!
//! A component is identified by a [`ComponentKey`], the pair of the entity
//! that owns it and the id of its [`ComponentType`]. An entity carries at
//! most one component of each type.

pub mod instance;
pub mod registry;
pub mod schema;
pub mod value;

use std::fmt;

pub use instance::{ActivationState, Component, DependencySlot, SystemData};
pub use registry::TypeRegistry;
pub use schema::{
        ActivationContext, Callbacks, ComponentBehaviour, ComponentType, LiveUpdateFn, OptionKind,
        OptionSpec, UpdateOutcome,
};
pub use value::{EntityId, OptionValue, ValueKind};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKey
{
        pub entity: EntityId,
        pub type_id: String,
}

impl ComponentKey
{
        pub fn new(
                entity: impl Into<EntityId>,
                type_id: impl Into<String>,
        ) -> Self
        {
                Self {
                        entity: entity.into(),
                        type_id: type_id.into(),
                }
        }
}

impl fmt::Display for ComponentKey
{
        fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result
        {
                write!(f, "{}@{}", self.type_id, self.entity)
        }
}
