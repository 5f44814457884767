//! WGSL program assembly.
//!
//! Every program is the tilemap template with three holes filled in: the
//! `material` function, the `lighting` function and the fragment output.

const TEMPLATE: &str = include_str!("tilemap.wgsl");

const DEFAULT_MATERIAL: &str = "fn material(color: vec4<f32>, uv: vec2<f32>) -> vec4<f32> {
    return color * u.tint;
}";

const LIT: &str = "fn lighting(color: vec4<f32>, world: vec3<f32>) -> vec4<f32> {
    let distance = length(u.light_position.xyz - world);
    let falloff = 1.0 / (1.0 + 0.05 * distance * distance);
    return vec4<f32>(color.rgb * (0.15 + u.light_color.rgb * falloff), color.a);
}";

const UNLIT: &str = "fn lighting(color: vec4<f32>, world: vec3<f32>) -> vec4<f32> {
    return color;
}";

const FORWARD_OUTPUT: &str = "return lighting(material(base, in.map_uv), in.world);";

const SHADOW_OUTPUT: &str = "let depth = in.clip_position.z;
    return vec4<f32>(depth, depth, depth, 1.0);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind
{
        Forward,
        Shadow,
}

/// Inputs that change the generated source.
#[derive(Debug, Clone, Copy)]
pub struct Variant<'a>
{
        pub pass: PassKind,

        pub lit: bool,

        /// A material's own `fn material(color, uv) -> vec4<f32>`.
        pub material: Option<&'a str>,
}

pub fn compose(variant: &Variant<'_>) -> String
{
        let output = match variant.pass
        {
                PassKind::Forward => FORWARD_OUTPUT,
                PassKind::Shadow => SHADOW_OUTPUT,
        };

        let lighting = if variant.lit { LIT } else { UNLIT };

        TEMPLATE.replace("//{{MATERIAL}}", variant.material.unwrap_or(DEFAULT_MATERIAL))
                .replace("//{{LIGHTING}}", lighting)
                .replace("//{{OUTPUT}}", output)
}

/// Checks that a material snippet defines the entry the template calls.
pub fn validate_material(snippet: &str) -> anyhow::Result<()>
{
        if !snippet.contains("fn material(")
        {
                anyhow::bail!("material shader must define `fn material(color: vec4<f32>, uv: vec2<f32>) -> vec4<f32>`");
        }

        Ok(())
}
