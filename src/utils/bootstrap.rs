use crate::config::Config;

pub fn show_start_message(config: &Config)
{
        if !config.show_start_message
        {
                return;
        }

        let patina_string = r#"

     ░█████████     ░███    ░██████████ ░██████ ░███    ░██     ░███    
     ░██     ░██   ░██░██       ░██       ░██   ░████   ░██    ░██░██   
     ░██     ░██  ░██  ░██      ░██       ░██   ░██░██  ░██   ░██  ░██  
     ░█████████  ░█████████     ░██       ░██   ░██ ░██ ░██  ░█████████ 
     ░██         ░██    ░██     ░██       ░██   ░██  ░██░██  ░██    ░██ 
     ░██         ░██    ░██     ░██       ░██   ░██   ░████  ░██    ░██ 
     ░██         ░██    ░██     ░██     ░██████ ░██    ░███  ░██    ░██ 

 Component-driven tilemap renderer built with wgpu and Rust.

            "#;

        log::info!("{patina_string}")
}

/// Initialises `env_logger` once. `RUST_LOG` wins over the config's
/// `log_filter`.
pub fn config_logging(config: &Config)
{
        let env = env_logger::Env::default().default_filter_or(config.log_filter.as_str());

        if env_logger::Builder::from_env(env).try_init().is_ok()
        {
                log::info!("Logging initialised.");
        }
}

/// Reads the config, falling back to defaults when none can be loaded.
pub fn create_config() -> Config
{
        Config::load()
}
