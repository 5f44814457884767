use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file read by [`Config::load`].
pub const CONFIG_ENV: &str = "PATINA_CONFIG";

pub const DEFAULT_CONFIG_FILE: &str = "patina.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend
{
        #[default]
        Wgpu,
        /// Records GPU calls without touching a device.
        Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig
{
        pub width: u32,
        pub height: u32,
}

impl Default for TargetConfig
{
        fn default() -> Self
        {
                Self {
                        width: 800,
                        height: 600,
                }
        }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderCacheConfig
{
        pub log_stats: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
        pub show_start_message: bool,

        pub show_exit_message: bool,

        /// Used when `RUST_LOG` is not set.
        pub log_filter: String,

        pub backend: Backend,

        /// Frames rendered by [`crate::run`].
        pub frames: u32,

        /// Scene file loaded at start-up.
        pub scene: Option<PathBuf>,

        pub target: TargetConfig,

        pub shader_cache: ShaderCacheConfig,
}

impl Default for Config
{
        fn default() -> Self
        {
                Self {
                        show_start_message: true,
                        show_exit_message: true,
                        log_filter: "info".to_string(),
                        backend: Backend::default(),
                        frames: 1,
                        scene: None,
                        target: TargetConfig::default(),
                        shader_cache: ShaderCacheConfig::default(),
                }
        }
}

impl Config
{
        pub fn new() -> Self
        {
                Self::default()
        }

        pub fn parse(text: &str) -> anyhow::Result<Self>
        {
                let config = toml::from_str(text)?;

                Ok(config)
        }

        /// Relative `scene` paths are resolved against the file's directory.
        pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self>
        {
                let path = path.as_ref();

                let text = std::fs::read_to_string(path)
                        .with_context(|| format!("reading config {}", path.display()))?;

                let mut config =
                        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))?;

                if let (Some(scene), Some(dir)) = (config.scene.as_mut(), path.parent())
                {
                        if scene.is_relative()
                        {
                                *scene = dir.join(&*scene);
                        }
                }

                Ok(config)
        }

        /// Reads the file named by `PATINA_CONFIG`, else `patina.toml`. Falls
        /// back to defaults when neither can be read.
        pub fn load() -> Self
        {
                let path = std::env::var_os(CONFIG_ENV)
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

                Self::from_file(&path).unwrap_or_else(|err| {
                        log::warn!("Failed to load config: {err:#}, falling back to default");
                        Self::default()
                })
        }
}
