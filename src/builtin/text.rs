use crate::builtin::{RESOURCE, ResourceData, TEXT, positive, release_error};
use crate::component::{ActivationContext, Callbacks, Component, ComponentType, OptionSpec, SystemData, ValueKind};
use crate::context::RenderContext;
use crate::providers::{Glyph, TextureDesc, TextureFormat, TextureHandle};
use anyhow::Context;

/// Where a glyph sits in the atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedGlyph
{
        pub ch: char,
        pub x: u32,
        pub width: u32,
        pub height: u32,
        pub advance: f32,
}

/// A texture holding every distinct glyph of the text, side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct TextData
{
        pub atlas: TextureHandle,

        pub width: u32,

        pub height: u32,

        pub glyphs: Vec<PlacedGlyph>,
}

impl TextData
{
        pub fn glyph(
                &self,
                ch: char,
        ) -> Option<&PlacedGlyph>
        {
                self.glyphs.iter().find(|g| g.ch == ch)
        }
}

pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(TEXT, Callbacks::new(activate).on_deactivate(deactivate))
                .option(OptionSpec::dependency("font", RESOURCE))
                .option(OptionSpec::value("text", ValueKind::String))
                .option(OptionSpec::value("pixel_size", ValueKind::Int).with_default(16i64))
}

/// Glyphs are packed left to right with one pixel of padding.
fn pack(glyphs: Vec<(char, Glyph)>) -> (u32, u32, Vec<PlacedGlyph>, Vec<u8>)
{
        let width = glyphs
                .iter()
                .map(|(_, g)| g.width + 1)
                .sum::<u32>()
                .max(1);

        let height = glyphs.iter().map(|(_, g)| g.height).max().unwrap_or(0).max(1);

        let mut rgba = vec![0u8; width as usize * height as usize * 4];
        let mut placed = Vec::with_capacity(glyphs.len());
        let mut x = 0;

        for (ch, glyph) in glyphs.iter()
        {
                for row in 0..glyph.height
                {
                        for column in 0..glyph.width
                        {
                                let coverage = glyph.coverage[(row * glyph.width + column) as usize];
                                let texel = ((row * width + x + column) * 4) as usize;

                                rgba[texel..texel + 4].copy_from_slice(&[255, 255, 255, coverage]);
                        }
                }

                placed.push(PlacedGlyph {
                        ch: *ch,
                        x,
                        width: glyph.width,
                        height: glyph.height,
                        advance: glyph.advance,
                });

                x += glyph.width + 1;
        }

        (width, height, placed, rgba)
}

fn activate(ctx: &mut ActivationContext<'_, RenderContext>) -> anyhow::Result<SystemData>
{
        let component = ctx.component();
        let font = ctx.dependency_data::<ResourceData>("font")?;

        let text = component.string("text").unwrap_or_default();
        let pixel_size = positive(component, "pixel_size")?;

        let rasterizer = ctx
                .env
                .glyphs
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("{} needs a glyph rasterizer", component.key()))?;

        let mut glyphs: Vec<(char, Glyph)> = Vec::new();

        for ch in text.chars()
        {
                if glyphs.iter().any(|(seen, _)| *seen == ch)
                {
                        continue;
                }

                let glyph = rasterizer
                        .rasterize(&font.bytes, ch, pixel_size)
                        .with_context(|| format!("rasterizing {:?} for {}", ch, component.key()))?;

                anyhow::ensure!(
                        glyph.coverage.len() == (glyph.width * glyph.height) as usize,
                        "glyph {:?} has {} coverage bytes for {}x{} pixels",
                        ch,
                        glyph.coverage.len(),
                        glyph.width,
                        glyph.height
                );

                glyphs.push((ch, glyph));
        }

        let (width, height, placed, rgba) = pack(glyphs);

        let label = format!("glyph atlas of {}", component.key());

        let atlas = ctx.env.gpu.create_texture(&TextureDesc {
                label: &label,
                width,
                height,
                format: TextureFormat::Rgba8Unorm,
                data: Some(&rgba),
                render_target: false,
        })?;

        Ok(Box::new(TextData {
                atlas,
                width,
                height,
                glyphs: placed,
        }))
}

fn deactivate(
        component: &Component,
        data: SystemData,
        env: &mut RenderContext,
)
{
        match data.downcast::<TextData>()
        {
                Ok(data) => env.gpu.destroy_texture(data.atlas),
                Err(_) => release_error(component, "TextData"),
        }
}
