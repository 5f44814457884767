use crate::component::{ComponentKey, EntityId, OptionValue};
use cgmath::{Vector2, Vector3, Vector4};
use derivative::Derivative;
use std::any::Any;
use std::collections::BTreeMap;

/// Opaque resource state produced by a behaviour's `activate` and handed
/// back to its `deactivate`.
pub type SystemData = Box<dyn Any>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState
{
        Inactive,
        /// The `activate` callback is running.
        Activating,
        Active,
        /// The `deactivate` callback is running.
        Deactivating,
}

/// One resolved target of a dependency option. Scalar dependencies use
/// index 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencySlot
{
        pub option: String,
        pub index: usize,
}

/// A live, configuration-bound node of the view.
///
/// `resolved` holds the keys of the components this one was activated
/// against. It is a weak back-reference: it never keeps a target alive and
/// is only meaningful while the component is [`ActivationState::Active`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Component
{
        key: ComponentKey,

        options: BTreeMap<String, OptionValue>,

        resolved: BTreeMap<DependencySlot, ComponentKey>,

        state: ActivationState,

        #[derivative(Debug = "ignore")]
        system_data: Option<SystemData>,
}

impl Component
{
        pub(crate) fn new(
                key: ComponentKey,
                options: BTreeMap<String, OptionValue>,
        ) -> Self
        {
                Self {
                        key,
                        options,
                        resolved: BTreeMap::new(),
                        state: ActivationState::Inactive,
                        system_data: None,
                }
        }

        pub fn key(&self) -> &ComponentKey
        {
                &self.key
        }

        pub fn entity(&self) -> EntityId
        {
                self.key.entity
        }

        pub fn type_id(&self) -> &str
        {
                &self.key.type_id
        }

        pub fn state(&self) -> ActivationState
        {
                self.state
        }

        pub fn is_active(&self) -> bool
        {
                self.state == ActivationState::Active
        }

        pub fn option(
                &self,
                name: &str,
        ) -> Option<&OptionValue>
        {
                self.options.get(name)
        }

        pub fn options(&self) -> impl Iterator<Item = (&str, &OptionValue)>
        {
                self.options.iter().map(|(k, v)| (k.as_str(), v))
        }

        pub fn bool(
                &self,
                name: &str,
        ) -> Option<bool>
        {
                self.option(name).and_then(OptionValue::as_bool)
        }

        pub fn int(
                &self,
                name: &str,
        ) -> Option<i64>
        {
                self.option(name).and_then(OptionValue::as_int)
        }

        pub fn float(
                &self,
                name: &str,
        ) -> Option<f64>
        {
                self.option(name).and_then(OptionValue::as_float)
        }

        pub fn string(
                &self,
                name: &str,
        ) -> Option<&str>
        {
                self.option(name).and_then(OptionValue::as_str)
        }

        pub fn bytes(
                &self,
                name: &str,
        ) -> Option<&[u8]>
        {
                self.option(name).and_then(OptionValue::as_bytes)
        }

        pub fn vector2(
                &self,
                name: &str,
        ) -> Option<Vector2<f32>>
        {
                self.option(name).and_then(OptionValue::as_vector2)
        }

        pub fn vector3(
                &self,
                name: &str,
        ) -> Option<Vector3<f32>>
        {
                self.option(name).and_then(OptionValue::as_vector3)
        }

        pub fn vector4(
                &self,
                name: &str,
        ) -> Option<Vector4<f32>>
        {
                self.option(name).and_then(OptionValue::as_vector4)
        }

        /// Reads an option that activation cannot do without.
        pub fn require(
                &self,
                name: &str,
        ) -> anyhow::Result<&OptionValue>
        {
                self.option(name)
                        .ok_or_else(|| anyhow::anyhow!("{} has no value for '{}'", self.key, name))
        }

        pub fn system_data<T: 'static>(&self) -> Option<&T>
        {
                self.system_data.as_ref()?.downcast_ref::<T>()
        }

        pub fn system_data_mut<T: 'static>(&mut self) -> Option<&mut T>
        {
                self.system_data.as_mut()?.downcast_mut::<T>()
        }

        /// Key of the component resolved for a scalar dependency option.
        pub fn resolved_dependency(
                &self,
                option: &str,
        ) -> Option<&ComponentKey>
        {
                self.resolved.get(&DependencySlot {
                        option: option.to_string(),
                        index: 0,
                })
        }

        /// Keys resolved for an array dependency option, in index order.
        pub fn resolved_dependencies(
                &self,
                option: &str,
        ) -> Vec<&ComponentKey>
        {
                self.resolved
                        .iter()
                        .filter(|(slot, _)| slot.option == option)
                        .map(|(_, key)| key)
                        .collect()
        }

        pub fn links_to(
                &self,
                target: &ComponentKey,
        ) -> bool
        {
                self.resolved.values().any(|key| key == target)
        }

        pub(crate) fn set_state(
                &mut self,
                state: ActivationState,
        )
        {
                self.state = state;
        }

        pub(crate) fn set_resolved(
                &mut self,
                resolved: BTreeMap<DependencySlot, ComponentKey>,
        )
        {
                self.resolved = resolved;
        }

        pub(crate) fn clear_resolved(&mut self)
        {
                self.resolved.clear();
        }

        pub(crate) fn unlink(
                &mut self,
                target: &ComponentKey,
        )
        {
                self.resolved.retain(|_, key| key != target);
        }

        pub(crate) fn set_system_data(
                &mut self,
                data: SystemData,
        )
        {
                self.system_data = Some(data);
        }

        pub(crate) fn take_system_data(&mut self) -> Option<SystemData>
        {
                self.system_data.take()
        }

        pub(crate) fn replace_option(
                &mut self,
                name: &str,
                value: OptionValue,
        ) -> Option<OptionValue>
        {
                self.options.insert(name.to_string(), value)
        }
}
