//! Patina: a component-driven tilemap renderer.
//!
//! Entities carry typed components ([`component`]) whose dependencies on
//! each other are tracked by a [`view::View`]: a component activates only
//! once everything it depends on is active, and tears down before anything
//! it depends on does. The builtin kinds ([`builtin`]) turn images and tile
//! grids into GPU resources, and the [`renderer`] draws every active scene
//! with programs memoized by a [`shader::ShaderCache`] that drops exactly the
//! programs bound to an object when that object goes away.

pub mod builtin;
pub mod camera;
pub mod component;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod loader;
pub mod providers;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod utils;
pub mod view;

use anyhow::Context;

use crate::config::Config;

/// Runs the engine headless with the configuration found by
/// [`Config::load`].
///
/// Loads the configured scene, activates what can be activated, renders
/// `frames` frames and shuts down.
///
/// # Example
///
/// ```no_run
/// patina::run().unwrap()
/// ```
pub fn run() -> anyhow::Result<()>
{
        let config = utils::bootstrap::create_config();

        run_with(config)
}

pub fn run_with(config: Config) -> anyhow::Result<()>
{
        utils::bootstrap::config_logging(&config);

        utils::bootstrap::show_start_message(&config);

        let mut engine = engine::EngineBuilder::new().with_config(config.clone()).build()?;

        match &config.scene
        {
                Some(scene) =>
                {
                        engine.load_scene(scene)
                                .with_context(|| format!("loading {}", scene.display()))?;
                }
                None => log::warn!("No scene configured, rendering empty frames"),
        }

        let failures = engine.activate_all();

        if !failures.is_empty()
        {
                log::warn!("{} component(s) could not be activated", failures.len());
        }

        for _ in 0..config.frames
        {
                engine.render_frame()?;
        }

        engine.shutdown();

        utils::exit::show_exit_message(&config);

        Ok(())
}
