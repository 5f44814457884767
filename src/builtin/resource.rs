use crate::builtin::RESOURCE;
use crate::component::{ActivationContext, Callbacks, ComponentType, OptionSpec, SystemData, ValueKind};
use crate::context::RenderContext;
use anyhow::Context;

/// Raw bytes other components decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceData
{
        pub bytes: Vec<u8>,

        /// The file the bytes came from, if any.
        pub path: Option<String>,
}

pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(RESOURCE, Callbacks::new(activate))
                .option(OptionSpec::value("bytes", ValueKind::Bytes).optional())
                .option(OptionSpec::value("path", ValueKind::String).optional())
}

fn activate(ctx: &mut ActivationContext<'_, RenderContext>) -> anyhow::Result<SystemData>
{
        let component = ctx.component();

        if let Some(bytes) = component.bytes("bytes")
        {
                return Ok(Box::new(ResourceData {
                        bytes: bytes.to_vec(),
                        path: None,
                }));
        }

        let path = component
                .string("path")
                .ok_or_else(|| anyhow::anyhow!("{} needs either 'bytes' or 'path'", component.key()))?;

        let full = ctx.env.resolve_path(path);

        let bytes = std::fs::read(&full).with_context(|| format!("reading {}", full.display()))?;

        log::debug!("Loaded {} bytes from {}", bytes.len(), full.display());

        Ok(Box::new(ResourceData {
                bytes,
                path: Some(path.to_string()),
        }))
}
