use crate::builtin::{RESOURCE, ResourceData, TILEMAP_TILES, release_error};
use crate::component::{ActivationContext, Callbacks, Component, ComponentType, OptionSpec, SystemData};
use crate::context::RenderContext;
use crate::providers::{TextureDesc, TextureFormat, TextureHandle};
use anyhow::Context;

/// Tile indices of a map, row-major. Index 0 is an empty cell; index `n`
/// draws cell `n - 1` of the tileset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid
{
        pub width: u32,
        pub height: u32,
        pub indices: Vec<u16>,
}

impl TileGrid
{
        /// Parses one row per line, cells separated by whitespace or commas.
        /// Blank lines and lines starting with `#` are skipped.
        pub fn parse(text: &str) -> anyhow::Result<Self>
        {
                let mut indices = Vec::new();
                let mut width = None;
                let mut height = 0u32;

                for (number, line) in text.lines().enumerate()
                {
                        let line = line.trim();

                        if line.is_empty() || line.starts_with('#')
                        {
                                continue;
                        }

                        let row = line
                                .split(|c: char| c == ',' || c.is_whitespace())
                                .filter(|cell| !cell.is_empty())
                                .map(|cell| {
                                        cell.parse::<u16>().with_context(|| {
                                                format!("line {}: '{}' is not a tile index", number + 1, cell)
                                        })
                                })
                                .collect::<anyhow::Result<Vec<u16>>>()?;

                        anyhow::ensure!(!row.is_empty(), "line {}: row has no tiles", number + 1);

                        let row_width = row.len() as u32;

                        match width
                        {
                                None => width = Some(row_width),
                                Some(expected) if expected != row_width =>
                                {
                                        anyhow::bail!(
                                                "line {}: expected {} tiles, found {}",
                                                number + 1,
                                                expected,
                                                row_width
                                        );
                                }
                                Some(_) => (),
                        }

                        indices.extend(row);
                        height += 1;
                }

                let width = width.ok_or_else(|| anyhow::anyhow!("tile grid has no rows"))?;

                Ok(Self {
                        width,
                        height,
                        indices,
                })
        }

        pub fn max_index(&self) -> u16
        {
                self.indices.iter().copied().max().unwrap_or(0)
        }

        /// One texel per tile: the index split over red (low byte) and green
        /// (high byte).
        pub fn to_rgba(&self) -> Vec<u8>
        {
                self.indices
                        .iter()
                        .flat_map(|index| {
                                let [lo, hi] = index.to_le_bytes();
                                [lo, hi, 0, 255]
                        })
                        .collect()
        }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesData
{
        pub texture: TextureHandle,

        pub width: u32,

        pub height: u32,

        pub max_index: u16,
}

pub fn component_type() -> ComponentType<RenderContext>
{
        ComponentType::new(TILEMAP_TILES, Callbacks::new(activate).on_deactivate(deactivate))
                .option(OptionSpec::dependency("resource", RESOURCE))
}

fn activate(ctx: &mut ActivationContext<'_, RenderContext>) -> anyhow::Result<SystemData>
{
        let component = ctx.component();
        let resource = ctx.dependency_data::<ResourceData>("resource")?;

        let text = std::str::from_utf8(&resource.bytes)
                .with_context(|| format!("tiles of {} are not UTF-8", component.key()))?;

        let grid = TileGrid::parse(text).with_context(|| format!("parsing tiles of {}", component.key()))?;

        let label = component.key().to_string();

        let texture = ctx.env.gpu.create_texture(&TextureDesc {
                label: &label,
                width: grid.width,
                height: grid.height,
                format: TextureFormat::Rgba8Unorm,
                data: Some(&grid.to_rgba()),
                render_target: false,
        })?;

        log::debug!("{} holds a {}x{} tile grid", component.key(), grid.width, grid.height);

        Ok(Box::new(TilesData {
                texture,
                width: grid.width,
                height: grid.height,
                max_index: grid.max_index(),
        }))
}

fn deactivate(
        component: &Component,
        data: SystemData,
        env: &mut RenderContext,
)
{
        match data.downcast::<TilesData>()
        {
                Ok(data) => env.gpu.destroy_texture(data.texture),
                Err(_) => release_error(component, "TilesData"),
        }
}

#[cfg(test)]
mod tests
{
        use super::*;

        #[test]
        fn grid_parses_mixed_separators()
        {
                let grid = TileGrid::parse("# level 1\n1, 2, 0\n\n3 4 300\n").unwrap();

                assert_eq!((grid.width, grid.height), (3, 2));
                assert_eq!(grid.indices, vec![1, 2, 0, 3, 4, 300]);
                assert_eq!(grid.max_index(), 300);
                assert_eq!(&grid.to_rgba()[20..24], &[44, 1, 0, 255]);
        }

        #[test]
        fn ragged_or_empty_grids_are_rejected()
        {
                let err = TileGrid::parse("1 2\n3\n").unwrap_err();
                assert!(err.to_string().contains("line 2: expected 2 tiles, found 1"));

                assert!(TileGrid::parse("\n# nothing\n").is_err());
                assert!(TileGrid::parse("1 x\n").is_err());
                assert!(TileGrid::parse("70000\n").is_err());
        }

        #[test]
        fn separator_only_rows_are_rejected()
        {
                let err = TileGrid::parse(",\n").unwrap_err();
                assert!(err.to_string().contains("line 1: row has no tiles"), "{err}");

                let err = TileGrid::parse("1 2\n , ,\n").unwrap_err();
                assert!(err.to_string().contains("line 2: row has no tiles"), "{err}");
        }
}
