//! The dependency graph that owns every component of every entity.
//!
//! # Ordering
//!
//! - Activation is bottom-up: [`View::try_activate`] activates the required
//!   dependencies of a component before the component itself.
//! - Deactivation is top-down: before a component's `deactivate` callback
//!   runs, every active component holding a resolved link to it has already
//!   been deactivated. No system data is released while something still
//!   points at it.
//!
//! # Ownership
//!
//! The view owns all [`Component`]s. Cross references are
//! [`ComponentKey`]s: dependency options store target entities, and the
//! resolved-dependency cache of a component stores target keys. The view
//! keeps a reverse index from each declared target key to the components
//! that name it.

#[cfg(test)]
mod tests;

use crate::component::{
        ActivationContext, ActivationState, Component, ComponentKey, ComponentType,
        DependencySlot, EntityId, OptionValue, TypeRegistry, UpdateOutcome,
};
use crate::error::{ComponentError, ComponentResult};
use derivative::Derivative;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct View<E>
{
        registry: TypeRegistry<E>,

        components: HashMap<ComponentKey, Component>,

        /// Declared target -> components whose dependency options name it.
        dependents: HashMap<ComponentKey, BTreeSet<ComponentKey>>,
}

/// Bookkeeping of one `try_activate` call.
#[derive(Debug, Default)]
struct Attempt
{
        /// Components whose dependencies are being resolved, outermost first.
        stack: Vec<ComponentKey>,

        /// Components activated by this attempt, in activation order.
        activated: Vec<ComponentKey>,
}

struct Requirement
{
        option: String,
        optional: bool,
        targets: Vec<ComponentKey>,
}

enum Change
{
        Done,
        Restart,
}

impl<E> Default for View<E>
{
        fn default() -> Self
        {
                Self::new(TypeRegistry::new())
        }
}

impl<E> View<E>
{
        pub fn new(registry: TypeRegistry<E>) -> Self
        {
                Self {
                        registry,
                        components: HashMap::new(),
                        dependents: HashMap::new(),
                }
        }

        pub fn registry(&self) -> &TypeRegistry<E>
        {
                &self.registry
        }

        pub fn register_type(
                &mut self,
                component_type: ComponentType<E>,
        ) -> ComponentResult<()>
        {
                self.registry.register(component_type)
        }

        pub fn len(&self) -> usize
        {
                self.components.len()
        }

        pub fn is_empty(&self) -> bool
        {
                self.components.is_empty()
        }

        pub fn component(
                &self,
                key: &ComponentKey,
        ) -> Option<&Component>
        {
                self.components.get(key)
        }

        pub fn component_mut(
                &mut self,
                key: &ComponentKey,
        ) -> Option<&mut Component>
        {
                self.components.get_mut(key)
        }

        pub fn get(
                &self,
                entity: EntityId,
                type_id: &str,
        ) -> Option<&Component>
        {
                self.components.get(&ComponentKey::new(entity, type_id))
        }

        pub fn state(
                &self,
                key: &ComponentKey,
        ) -> Option<ActivationState>
        {
                self.components.get(key).map(Component::state)
        }

        /// Components of one type, ordered by entity.
        pub fn components_of_type(
                &self,
                type_id: &str,
        ) -> Vec<&Component>
        {
                let mut found: Vec<&Component> = self
                        .components
                        .values()
                        .filter(|c| c.type_id() == type_id)
                        .collect();

                found.sort_by(|a, b| a.key().cmp(b.key()));

                found
        }

        /// Components that declare a dependency on `key`, whether or not
        /// either side exists or is active.
        pub fn dependents_of(
                &self,
                key: &ComponentKey,
        ) -> Vec<ComponentKey>
        {
                self.dependents
                        .get(key)
                        .map(|set| set.iter().cloned().collect())
                        .unwrap_or_default()
        }

        /// Creates an inactive component. Options are validated against the
        /// type's schema; absent options take their default, and a missing
        /// required option is an error.
        pub fn add_component<I, S>(
                &mut self,
                entity: impl Into<EntityId>,
                type_id: &str,
                options: I,
        ) -> ComponentResult<ComponentKey>
        where
                I: IntoIterator<Item = (S, OptionValue)>,
                S: Into<String>,
        {
                let key = ComponentKey::new(entity, type_id);

                let component_type = self
                        .registry
                        .get(type_id)
                        .ok_or_else(|| ComponentError::UnknownType(type_id.to_string()))?;

                if self.components.contains_key(&key)
                {
                        return Err(ComponentError::DuplicateComponent(key));
                }

                let mut values = BTreeMap::new();

                for (name, value) in options
                {
                        let name: String = name.into();

                        let spec = component_type.option_spec(&name).ok_or_else(|| {
                                ComponentError::UnknownOption {
                                        key: key.clone(),
                                        option: name.clone(),
                                }
                        })?;

                        let expected = spec.kind.value_kind();

                        if value.kind() != expected
                        {
                                return Err(ComponentError::OptionKindMismatch {
                                        key,
                                        option: name,
                                        expected,
                                        actual: value.kind(),
                                });
                        }

                        values.insert(name, value);
                }

                for spec in component_type.options.iter()
                {
                        if values.contains_key(&spec.name)
                        {
                                continue;
                        }

                        match &spec.default
                        {
                                Some(default) =>
                                {
                                        values.insert(spec.name.clone(), default.clone());
                                }
                                None if !spec.optional =>
                                {
                                        return Err(ComponentError::MissingOption {
                                                key,
                                                option: spec.name.clone(),
                                        });
                                }
                                None => (),
                        }
                }

                let component = Component::new(key.clone(), values);

                for target in declared_targets(component_type, &component, None)
                {
                        self.dependents
                                .entry(target)
                                .or_default()
                                .insert(key.clone());
                }

                self.components.insert(key.clone(), component);

                log::debug!("Added {}", key);

                Ok(key)
        }

        /// Removes a component, deactivating it (and everything that depends
        /// on it) first. Returns `false` if there was nothing to remove.
        pub fn remove_component(
                &mut self,
                entity: impl Into<EntityId>,
                type_id: &str,
                env: &mut E,
        ) -> bool
        {
                let key = ComponentKey::new(entity, type_id);

                if !self.components.contains_key(&key)
                {
                        return false;
                }

                self.deactivate_in(&key, env, &mut Vec::new());

                let Some(component) = self.components.remove(&key)
                else
                {
                        return false;
                };

                if let Some(component_type) = self.registry.get(type_id)
                {
                        for target in declared_targets(component_type, &component, None)
                        {
                                unindex(&mut self.dependents, &target, &key);
                        }
                }

                if let Some(dependents) = self.dependents.get(&key)
                {
                        for dependent in dependents.iter()
                        {
                                if let Some(c) = self.components.get_mut(dependent)
                                {
                                        c.unlink(&key);
                                }
                        }
                }

                log::debug!("Removed {}", key);

                true
        }

        /// Resolves a dependency option to the component it names. For array
        /// options this is the first entry; see [`View::resolve_dependencies`].
        pub fn resolve_dependency(
                &self,
                key: &ComponentKey,
                option: &str,
        ) -> Option<&Component>
        {
                self.resolve_dependencies(key, option).into_iter().next()
        }

        /// Every existing component named by a dependency option, in order.
        pub fn resolve_dependencies(
                &self,
                key: &ComponentKey,
                option: &str,
        ) -> Vec<&Component>
        {
                let Some(component) = self.components.get(key)
                else
                {
                        return Vec::new();
                };

                let Some(target) = self
                        .registry
                        .get(&key.type_id)
                        .and_then(|t| t.option_spec(option))
                        .and_then(|spec| spec.kind.dependency_target())
                else
                {
                        return Vec::new();
                };

                component
                        .option(option)
                        .map(OptionValue::entities)
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|entity| {
                                self.components.get(&ComponentKey::new(*entity, target))
                        })
                        .collect()
        }

        /// Activates a component, activating its dependencies first.
        ///
        /// On failure the view is left as it was before the call: the
        /// component stays inactive and dependencies activated along the way
        /// are deactivated again.
        pub fn try_activate(
                &mut self,
                key: &ComponentKey,
                env: &mut E,
        ) -> ComponentResult<()>
        {
                let mut attempt = Attempt::default();

                let result = self.activate_in(key, env, &mut attempt);

                if result.is_err()
                {
                        self.rollback(&mut attempt, 0, env);
                }

                result
        }

        /// Tries every inactive component once. Components that cannot be
        /// activated yet are reported, not retried.
        pub fn activate_pending(
                &mut self,
                env: &mut E,
        ) -> Vec<(ComponentKey, ComponentError)>
        {
                let mut pending: Vec<ComponentKey> = self
                        .components
                        .values()
                        .filter(|c| c.state() == ActivationState::Inactive)
                        .map(|c| c.key().clone())
                        .collect();

                pending.sort();

                let mut failures = Vec::new();

                for key in pending
                {
                        if self.state(&key) != Some(ActivationState::Inactive)
                        {
                                continue;
                        }

                        if let Err(err) = self.try_activate(&key, env)
                        {
                                failures.push((key, err));
                        }
                }

                failures
        }

        /// Deactivates a component after deactivating everything that holds
        /// a resolved link to it. Returns the deactivated keys in order.
        pub fn deactivate(
                &mut self,
                key: &ComponentKey,
                env: &mut E,
        ) -> ComponentResult<Vec<ComponentKey>>
        {
                if !self.components.contains_key(key)
                {
                        return Err(ComponentError::ComponentNotFound(key.clone()));
                }

                let mut order = Vec::new();

                self.deactivate_in(key, env, &mut order);

                Ok(order)
        }

        pub fn deactivate_all(
                &mut self,
                env: &mut E,
        )
        {
                let mut active: Vec<ComponentKey> = self
                        .components
                        .values()
                        .filter(|c| c.is_active())
                        .map(|c| c.key().clone())
                        .collect();

                active.sort();

                let mut order = Vec::new();

                for key in active.iter()
                {
                        self.deactivate_in(key, env, &mut order);
                }

                log::debug!("Deactivated {} components", order.len());
        }

        /// Changes an option value.
        ///
        /// On an active component the change is applied by, in order of
        /// preference: the option's live-update callback, the behaviour's
        /// `update`, or a deactivate/reactivate cycle that also brings back
        /// the dependents it took down. Dependency options always cycle.
        ///
        /// If the component cannot be activated again, the error is returned
        /// and the new value stays stored; the component and the dependents
        /// it took down stay inactive until a later `try_activate`.
        pub fn set_option(
                &mut self,
                key: &ComponentKey,
                name: &str,
                value: OptionValue,
                env: &mut E,
        ) -> ComponentResult<()>
        {
                let change = {
                        let component_type = self
                                .registry
                                .get(&key.type_id)
                                .ok_or_else(|| ComponentError::UnknownType(key.type_id.clone()))?;

                        let spec = component_type.option_spec(name).ok_or_else(|| {
                                ComponentError::UnknownOption {
                                        key: key.clone(),
                                        option: name.to_string(),
                                }
                        })?;

                        let expected = spec.kind.value_kind();

                        if value.kind() != expected
                        {
                                return Err(ComponentError::OptionKindMismatch {
                                        key: key.clone(),
                                        option: name.to_string(),
                                        expected,
                                        actual: value.kind(),
                                });
                        }

                        let component = self
                                .components
                                .get_mut(key)
                                .ok_or_else(|| ComponentError::ComponentNotFound(key.clone()))?;

                        if component.option(name) == Some(&value)
                        {
                                return Ok(());
                        }

                        let old_targets = declared_targets(component_type, component, Some(name));

                        let old = component.replace_option(name, value.clone());

                        if spec.is_dependency()
                        {
                                for target in old_targets.iter()
                                {
                                        unindex(&mut self.dependents, target, key);
                                }

                                for target in declared_targets(component_type, component, Some(name))
                                {
                                        self.dependents
                                                .entry(target)
                                                .or_default()
                                                .insert(key.clone());
                                }
                        }

                        if !component.is_active()
                        {
                                Change::Done
                        }
                        else if spec.is_dependency()
                        {
                                Change::Restart
                        }
                        else if let Some(live) = &spec.live_update
                        {
                                log::debug!("Live update of '{}' on {}", name, key);

                                live(component, old.as_ref(), &value, env);

                                Change::Done
                        }
                        else
                        {
                                match component_type.behaviour.update(component, name, env)
                                {
                                        Ok(UpdateOutcome::Applied) => Change::Done,
                                        Ok(UpdateOutcome::Restart) => Change::Restart,
                                        Err(err) =>
                                        {
                                                log::warn!(
                                                        "Updating '{}' on {} failed, restarting: {:#}",
                                                        name,
                                                        key,
                                                        err
                                                );

                                                Change::Restart
                                        }
                                }
                        }
                };

                match change
                {
                        Change::Done => Ok(()),
                        Change::Restart => self.restart(key, env),
                }
        }

        fn restart(
                &mut self,
                key: &ComponentKey,
                env: &mut E,
        ) -> ComponentResult<()>
        {
                let mut order = Vec::new();

                self.deactivate_in(key, env, &mut order);

                log::debug!("Restarting {} ({} dependents)", key, order.len().saturating_sub(1));

                self.try_activate(key, env)?;

                // `order` ends with `key`; the rest comes back bottom-up.
                for dependent in order.iter().rev().skip(1)
                {
                        if let Err(err) = self.try_activate(dependent, env)
                        {
                                log::warn!("{} did not come back after restart: {}", dependent, err);
                        }
                }

                Ok(())
        }

        fn activate_in(
                &mut self,
                key: &ComponentKey,
                env: &mut E,
                attempt: &mut Attempt,
        ) -> ComponentResult<()>
        {
                let component = self
                        .components
                        .get(key)
                        .ok_or_else(|| ComponentError::ComponentNotFound(key.clone()))?;

                if component.is_active()
                {
                        return Ok(());
                }

                if let Some(position) = attempt.stack.iter().position(|k| k == key)
                {
                        let mut cycle = attempt.stack[position..].to_vec();
                        cycle.push(key.clone());

                        return Err(ComponentError::CyclicDependency(cycle));
                }

                let component_type = self
                        .registry
                        .get(&key.type_id)
                        .ok_or_else(|| ComponentError::UnknownType(key.type_id.clone()))?;

                let requirements: Vec<Requirement> = component_type
                        .dependency_options()
                        .map(|spec| Requirement {
                                option: spec.name.clone(),
                                optional: spec.optional,
                                targets: declared_targets(
                                        component_type,
                                        component,
                                        Some(&spec.name),
                                ),
                        })
                        .collect();

                attempt.stack.push(key.clone());

                let resolved = self.resolve_requirements(key, requirements, env, attempt);

                attempt.stack.pop();

                self.run_activate(key, resolved?, env)?;

                attempt.activated.push(key.clone());

                Ok(())
        }

        fn resolve_requirements(
                &mut self,
                key: &ComponentKey,
                requirements: Vec<Requirement>,
                env: &mut E,
                attempt: &mut Attempt,
        ) -> ComponentResult<BTreeMap<DependencySlot, ComponentKey>>
        {
                let mut resolved = BTreeMap::new();

                for requirement in requirements
                {
                        let unsatisfied = |reason: String| ComponentError::UnsatisfiedDependency {
                                key: key.clone(),
                                option: requirement.option.clone(),
                                reason,
                        };

                        if requirement.targets.is_empty() && !requirement.optional
                        {
                                return Err(unsatisfied("no target entity".to_string()));
                        }

                        for (index, target) in requirement.targets.iter().enumerate()
                        {
                                if !self.components.contains_key(target)
                                {
                                        if requirement.optional
                                        {
                                                log::debug!(
                                                        "Optional dependency {} of {} does not exist",
                                                        target,
                                                        key
                                                );
                                                continue;
                                        }

                                        return Err(unsatisfied(format!("{} does not exist", target)));
                                }

                                let mark = attempt.activated.len();

                                match self.activate_in(target, env, attempt)
                                {
                                        Ok(()) =>
                                        {
                                                resolved.insert(
                                                        DependencySlot {
                                                                option: requirement.option.clone(),
                                                                index,
                                                        },
                                                        target.clone(),
                                                );
                                        }
                                        Err(err @ ComponentError::CyclicDependency(_)) =>
                                        {
                                                return Err(err);
                                        }
                                        Err(err) if requirement.optional =>
                                        {
                                                log::debug!(
                                                        "Optional dependency {} of {} stays inactive: {}",
                                                        target,
                                                        key,
                                                        err
                                                );

                                                self.rollback(attempt, mark, env);
                                        }
                                        Err(err) =>
                                        {
                                                return Err(unsatisfied(format!(
                                                        "{} could not be activated: {}",
                                                        target, err
                                                )));
                                        }
                                }
                        }
                }

                Ok(resolved)
        }

        fn run_activate(
                &mut self,
                key: &ComponentKey,
                resolved: BTreeMap<DependencySlot, ComponentKey>,
                env: &mut E,
        ) -> ComponentResult<()>
        {
                let component_type = self
                        .registry
                        .get(&key.type_id)
                        .ok_or_else(|| ComponentError::UnknownType(key.type_id.clone()))?;

                {
                        let component = self
                                .components
                                .get_mut(key)
                                .ok_or_else(|| ComponentError::ComponentNotFound(key.clone()))?;

                        component.set_resolved(resolved);
                        component.set_state(ActivationState::Activating);
                }

                let result = match self.components.get(key)
                {
                        Some(component) =>
                        {
                                let mut ctx = ActivationContext::new(component, &self.components, env);

                                component_type.behaviour.activate(&mut ctx)
                        }
                        None => return Err(ComponentError::ComponentNotFound(key.clone())),
                };

                let component = self
                        .components
                        .get_mut(key)
                        .ok_or_else(|| ComponentError::ComponentNotFound(key.clone()))?;

                match result
                {
                        Ok(data) =>
                        {
                                component.set_system_data(data);
                                component.set_state(ActivationState::Active);

                                log::info!("Activated {}", key);

                                Ok(())
                        }
                        Err(source) =>
                        {
                                component.clear_resolved();
                                component.set_state(ActivationState::Inactive);

                                log::warn!("Activation of {} failed: {:#}", key, source);

                                Err(ComponentError::ActivationFailed {
                                        key: key.clone(),
                                        source,
                                })
                        }
                }
        }

        /// Deactivates what `attempt` activated after `mark`, newest first.
        fn rollback(
                &mut self,
                attempt: &mut Attempt,
                mark: usize,
                env: &mut E,
        )
        {
                let activated: Vec<ComponentKey> = attempt.activated.drain(mark..).collect();

                for key in activated.iter().rev()
                {
                        log::debug!("Rolling back activation of {}", key);

                        self.deactivate_in(key, env, &mut Vec::new());
                }
        }

        fn deactivate_in(
                &mut self,
                key: &ComponentKey,
                env: &mut E,
                order: &mut Vec<ComponentKey>,
        )
        {
                match self.components.get_mut(key)
                {
                        Some(component) if component.is_active() =>
                        {
                                component.set_state(ActivationState::Deactivating);
                        }
                        _ => return,
                }

                let linked: Vec<ComponentKey> = self
                        .dependents
                        .get(key)
                        .map(|set| {
                                set.iter()
                                        .filter(|dependent| {
                                                self.components
                                                        .get(*dependent)
                                                        .is_some_and(|c| c.is_active() && c.links_to(key))
                                        })
                                        .cloned()
                                        .collect()
                        })
                        .unwrap_or_default();

                for dependent in linked.iter()
                {
                        log::debug!("Deactivating {} before its dependency {}", dependent, key);

                        self.deactivate_in(dependent, env, order);
                }

                let Some(component) = self.components.get_mut(key)
                else
                {
                        return;
                };

                match (self.registry.get(&key.type_id), component.take_system_data())
                {
                        (Some(component_type), Some(data)) =>
                        {
                                component_type
                                        .behaviour
                                        .deactivate(component, data, env);
                        }
                        _ => log::error!("{} was active without a type or system data", key),
                }

                component.clear_resolved();
                component.set_state(ActivationState::Inactive);

                log::info!("Deactivated {}", key);

                order.push(key.clone());
        }
}

/// Target keys named by the dependency options of `component`, or by the
/// single option `only`.
fn declared_targets<E>(
        component_type: &ComponentType<E>,
        component: &Component,
        only: Option<&str>,
) -> Vec<ComponentKey>
{
        component_type
                .dependency_options()
                .filter(|spec| only.is_none_or(|name| spec.name == name))
                .flat_map(|spec| {
                        let target = spec.kind.dependency_target().unwrap_or_default();

                        component
                                .option(&spec.name)
                                .map(OptionValue::entities)
                                .unwrap_or_default()
                                .iter()
                                .map(move |entity| ComponentKey::new(*entity, target))
                })
                .collect()
}

fn unindex(
        dependents: &mut HashMap<ComponentKey, BTreeSet<ComponentKey>>,
        target: &ComponentKey,
        dependent: &ComponentKey,
)
{
        if let Some(set) = dependents.get_mut(target)
        {
                set.remove(dependent);

                if set.is_empty()
                {
                        dependents.remove(target);
                }
        }
}
