use crate::component::{ComponentKey, ValueKind};
use crate::shader::ShaderKey;
use thiserror::Error;

/// Errors raised by the type registry and the [`View`](crate::view::View).
#[derive(Error, Debug)]
pub enum ComponentError
{
        #[error("component type '{0}' is already registered")]
        DuplicateType(String),

        #[error("invalid option spec '{option}' on type '{type_id}': {reason}")]
        InvalidOptionSpec
        {
                type_id: String,
                option: String,
                reason: String,
        },

        #[error("component type '{0}' is not registered")]
        UnknownType(String),

        #[error("{0} already exists")]
        DuplicateComponent(ComponentKey),

        #[error("{0} does not exist")]
        ComponentNotFound(ComponentKey),

        #[error("{key} has no option named '{option}'")]
        UnknownOption
        {
                key: ComponentKey,
                option: String,
        },

        #[error("option '{option}' of {key} expects {expected:?}, got {actual:?}")]
        OptionKindMismatch
        {
                key: ComponentKey,
                option: String,
                expected: ValueKind,
                actual: ValueKind,
        },

        #[error("{key} is missing required option '{option}'")]
        MissingOption
        {
                key: ComponentKey,
                option: String,
        },

        #[error("dependency '{option}' of {key} is not satisfied: {reason}")]
        UnsatisfiedDependency
        {
                key: ComponentKey,
                option: String,
                reason: String,
        },

        #[error("cyclic dependency: {}", format_cycle(.0))]
        CyclicDependency(Vec<ComponentKey>),

        #[error("activation of {key} failed")]
        ActivationFailed
        {
                key: ComponentKey,
                #[source]
                source: anyhow::Error,
        },
}

fn format_cycle(path: &[ComponentKey]) -> String
{
        path.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderCacheError
{
        #[error("a shader is already cached for {0:?}")]
        DuplicateKey(ShaderKey),
}

pub type ComponentResult<T> = Result<T, ComponentError>;
