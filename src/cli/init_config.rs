use super::config::{default_config_path, default_store_path, CuratorConfig};
use std::path::PathBuf;

/// Write a commented default configuration file
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn execute(config_path: Option<String>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(format!(
            "Config file '{}' already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }

    CuratorConfig::create_default(&config_path, &default_store_path())?;

    println!("📝 Created: {}", config_path.display());
    println!();
    println!("Set telegram.bot_token, moderation.moderators and moderation.outlet,");
    println!("then start the bot with `curator run`.");

    Ok(())
}
