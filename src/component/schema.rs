use crate::component::{Component, ComponentKey, OptionValue, SystemData, ValueKind};
use derivative::Derivative;
use std::collections::HashMap;

/// Called with `(component, old, new, env)` when an option that declares it
/// changes on an active component. The component already holds `new`; `old`
/// is `None` when the option was unset.
pub type LiveUpdateFn<E> = Box<dyn Fn(&mut Component, Option<&OptionValue>, &OptionValue, &mut E)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind
{
        /// A plain typed value.
        Value(ValueKind),
        /// A reference to the component of type `target` on another entity.
        Dependency
        {
                target: String,
                array: bool,
        },
}

impl OptionKind
{
        /// The [`ValueKind`] an [`OptionValue`] must have to be stored in an
        /// option of this kind.
        pub fn value_kind(&self) -> ValueKind
        {
                match self
                {
                        OptionKind::Value(kind) => *kind,
                        OptionKind::Dependency {
                                array: false,
                                ..
                        } => ValueKind::Entity,
                        OptionKind::Dependency {
                                array: true,
                                ..
                        } => ValueKind::EntityArray,
                }
        }

        pub fn dependency_target(&self) -> Option<&str>
        {
                match self
                {
                        OptionKind::Dependency {
                                target,
                                ..
                        } => Some(target.as_str()),
                        OptionKind::Value(_) => None,
                }
        }
}

#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct OptionSpec<E>
{
        pub name: String,

        pub kind: OptionKind,

        pub optional: bool,

        /// Filled in when a component is added without this option.
        pub default: Option<OptionValue>,

        #[derivative(Debug = "ignore")]
        pub live_update: Option<LiveUpdateFn<E>>,
}

impl<E> OptionSpec<E>
{
        pub fn value(
                name: impl Into<String>,
                kind: ValueKind,
        ) -> Self
        {
                Self::with_kind(name, OptionKind::Value(kind))
        }

        pub fn dependency(
                name: impl Into<String>,
                target: impl Into<String>,
        ) -> Self
        {
                Self::with_kind(
                        name,
                        OptionKind::Dependency {
                                target: target.into(),
                                array: false,
                        },
                )
        }

        pub fn dependency_array(
                name: impl Into<String>,
                target: impl Into<String>,
        ) -> Self
        {
                Self::with_kind(
                        name,
                        OptionKind::Dependency {
                                target: target.into(),
                                array: true,
                        },
                )
        }

        fn with_kind(
                name: impl Into<String>,
                kind: OptionKind,
        ) -> Self
        {
                Self {
                        name: name.into(),
                        kind,
                        optional: false,
                        default: None,
                        live_update: None,
                }
        }

        pub fn optional(mut self) -> Self
        {
                self.optional = true;
                self
        }

        /// Gives the option a default value. Options with a default are
        /// optional.
        pub fn with_default(
                mut self,
                value: impl Into<OptionValue>,
        ) -> Self
        {
                self.optional = true;
                self.default = Some(value.into());
                self
        }

        pub fn live<F>(
                mut self,
                f: F,
        ) -> Self
        where
                F: Fn(&mut Component, Option<&OptionValue>, &OptionValue, &mut E) + 'static,
        {
                self.live_update = Some(Box::new(f));
                self
        }

        pub fn is_dependency(&self) -> bool
        {
                matches!(self.kind, OptionKind::Dependency { .. })
        }
}

/// What a behaviour did with an option change on an active component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome
{
        /// The new value is in effect; the component stays active.
        Applied,
        /// The component has to be deactivated and activated again.
        Restart,
}

/// Read access to the component being activated and to the components it
/// was resolved against, plus the caller's environment.
pub struct ActivationContext<'a, E>
{
        component: &'a Component,

        components: &'a HashMap<ComponentKey, Component>,

        pub env: &'a mut E,
}

impl<'a, E> ActivationContext<'a, E>
{
        pub(crate) fn new(
                component: &'a Component,
                components: &'a HashMap<ComponentKey, Component>,
                env: &'a mut E,
        ) -> Self
        {
                Self {
                        component,
                        components,
                        env,
                }
        }

        pub fn component(&self) -> &'a Component
        {
                self.component
        }

        /// The component resolved for a scalar dependency option.
        pub fn dependency(
                &self,
                option: &str,
        ) -> Option<&'a Component>
        {
                let key = self.component.resolved_dependency(option)?;
                self.components.get(key)
        }

        /// The components resolved for an array dependency option, in order.
        /// Unresolved optional entries are skipped.
        pub fn dependencies(
                &self,
                option: &str,
        ) -> Vec<&'a Component>
        {
                self.component
                        .resolved_dependencies(option)
                        .into_iter()
                        .filter_map(|key| self.components.get(key))
                        .collect()
        }

        /// System data of a resolved scalar dependency.
        pub fn dependency_data<T: 'static>(
                &self,
                option: &str,
        ) -> anyhow::Result<&'a T>
        {
                let dependency = self.dependency(option).ok_or_else(|| {
                        anyhow::anyhow!(
                                "{} has no resolved dependency '{}'",
                                self.component.key(),
                                option
                        )
                })?;

                dependency.system_data::<T>().ok_or_else(|| {
                        anyhow::anyhow!(
                                "{} carries no {} system data",
                                dependency.key(),
                                std::any::type_name::<T>()
                        )
                })
        }
}

/// The callback contract of a component kind.
///
/// `activate` runs once every required dependency is active and returns
/// the system data the component keeps while active. It must release
/// whatever it acquired before returning an error. `deactivate` gets the
/// system data back and must release everything; it cannot fail.
pub trait ComponentBehaviour<E>
{
        fn activate(
                &self,
                ctx: &mut ActivationContext<'_, E>,
        ) -> anyhow::Result<SystemData>;

        /// Applies a change of `option` to an active component that has no
        /// live-update callback for it.
        fn update(
                &self,
                #[allow(unused_variables)] component: &mut Component,
                #[allow(unused_variables)] option: &str,
                #[allow(unused_variables)] env: &mut E,
        ) -> anyhow::Result<UpdateOutcome>
        {
                Ok(UpdateOutcome::Restart)
        }

        fn deactivate(
                &self,
                component: &Component,
                data: SystemData,
                env: &mut E,
        );
}

type ActivateFn<E> = Box<dyn Fn(&mut ActivationContext<'_, E>) -> anyhow::Result<SystemData>>;

type DeactivateFn<E> = Box<dyn Fn(&Component, SystemData, &mut E)>;

type UpdateFn<E> = Box<dyn Fn(&mut Component, &str, &mut E) -> anyhow::Result<UpdateOutcome>>;

/// A behaviour assembled from closures, for kinds that carry no state of
/// their own.
pub struct Callbacks<E>
{
        activate: ActivateFn<E>,

        update: Option<UpdateFn<E>>,

        deactivate: Option<DeactivateFn<E>>,
}

impl<E> Callbacks<E>
{
        pub fn new<F>(activate: F) -> Self
        where
                F: Fn(&mut ActivationContext<'_, E>) -> anyhow::Result<SystemData> + 'static,
        {
                Self {
                        activate: Box::new(activate),
                        update: None,
                        deactivate: None,
                }
        }

        pub fn on_update<F>(
                mut self,
                f: F,
        ) -> Self
        where
                F: Fn(&mut Component, &str, &mut E) -> anyhow::Result<UpdateOutcome> + 'static,
        {
                self.update = Some(Box::new(f));
                self
        }

        pub fn on_deactivate<F>(
                mut self,
                f: F,
        ) -> Self
        where
                F: Fn(&Component, SystemData, &mut E) + 'static,
        {
                self.deactivate = Some(Box::new(f));
                self
        }
}

impl<E> ComponentBehaviour<E> for Callbacks<E>
{
        fn activate(
                &self,
                ctx: &mut ActivationContext<'_, E>,
        ) -> anyhow::Result<SystemData>
        {
                (self.activate)(ctx)
        }

        fn update(
                &self,
                component: &mut Component,
                option: &str,
                env: &mut E,
        ) -> anyhow::Result<UpdateOutcome>
        {
                match &self.update
                {
                        Some(f) => f(component, option, env),
                        None => Ok(UpdateOutcome::Restart),
                }
        }

        fn deactivate(
                &self,
                component: &Component,
                data: SystemData,
                env: &mut E,
        )
        {
                if let Some(f) = &self.deactivate
                {
                        f(component, data, env);
                }
        }
}

/// Schema and behaviour of one named component kind.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct ComponentType<E>
{
        pub id: String,

        pub options: Vec<OptionSpec<E>>,

        /// Only consulted by replication; the local view ignores it.
        pub requires_authority: bool,

        #[derivative(Debug = "ignore")]
        pub behaviour: Box<dyn ComponentBehaviour<E>>,
}

impl<E> ComponentType<E>
{
        pub fn new(
                id: impl Into<String>,
                behaviour: impl ComponentBehaviour<E> + 'static,
        ) -> Self
        {
                Self {
                        id: id.into(),
                        options: Vec::new(),
                        requires_authority: false,
                        behaviour: Box::new(behaviour),
                }
        }

        pub fn option(
                mut self,
                spec: OptionSpec<E>,
        ) -> Self
        {
                self.options.push(spec);
                self
        }

        pub fn requires_authority(
                mut self,
                value: bool,
        ) -> Self
        {
                self.requires_authority = value;
                self
        }

        pub fn option_spec(
                &self,
                name: &str,
        ) -> Option<&OptionSpec<E>>
        {
                self.options.iter().find(|o| o.name == name)
        }

        pub fn dependency_options(&self) -> impl Iterator<Item = &OptionSpec<E>>
        {
                self.options.iter().filter(|o| o.is_dependency())
        }
}
