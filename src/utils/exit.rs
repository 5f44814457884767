use colored::*;

use crate::utils::random::get_random_u128;

const MESSAGES: [(&str, &str); 8] = [
        ("Patina has flaked off the last surface it covered.", "green"),
        ("Patina weathered away, leaving bare metal behind.", "yellow"),
        ("Patina was polished clean out of existence.", "cyan"),
        ("Patina's tiles have all been swept off the map.", "magenta"),
        ("Patina deactivated every component, bottom to top.", "blue"),
        ("Patina's shader cache has been invalidated. All of it.", "red"),
        ("Patina returned its textures to the void.", "bright yellow"),
        ("Patina has reached equilibrium with the atmosphere.", "white"),
];

pub fn get_exit_message(config: &crate::config::Config) -> String
{
        if !config.show_exit_message
        {
                return String::from("");
        }

        let choice = get_random_u128(MESSAGES.len() as u128).unwrap_or(0) as usize;

        let (message, color) = MESSAGES[choice % MESSAGES.len()];

        match color
        {
                "red" => message.red().to_string(),
                "magenta" => message.magenta().to_string(),
                "yellow" => message.yellow().to_string(),
                "cyan" => message.cyan().to_string(),
                "green" => message.green().to_string(),
                "blue" => message.blue().to_string(),
                "white" => message.white().to_string(),
                "bright yellow" => message.bright_yellow().to_string(),
                _ => message.to_string(),
        }
}

pub fn show_exit_message(config: &crate::config::Config)
{
        let message = get_exit_message(config);

        if !message.is_empty()
        {
                log::info!("{message}");
        }
}
