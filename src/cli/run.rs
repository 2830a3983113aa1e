use super::config::{default_config_path, CuratorConfig, LoggingConfig};
use curator::ingress;
use curator::moderation::Pipeline;
use curator::store::SqliteProposalStore;
use curator::telegram::TelegramClient;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run the bot service
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided, else `~/.local/share/curator/config.toml`
/// 2. `CURATOR_BOT_TOKEN`, `CURATOR_MODERATORS`, `CURATOR_OUTLET` override
///    the file
/// 3. `--store-path` overrides `store.path`
///
/// If the config file doesn't exist, a default one is generated and the
/// command stops unless the environment supplies the required settings.
pub async fn execute(
    config_path: Option<String>,
    store_path: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Starting Curator bot service...");
    println!();

    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    println!("Config: {}", config_path.display());

    let mut config = if config_path.exists() {
        CuratorConfig::load(&config_path)?
    } else {
        println!();
        println!("📝 No config file found. Creating default configuration...");
        CuratorConfig::create_default(&config_path, &CuratorConfig::default().store.path)?;
        println!("   Created: {}", config_path.display());
        CuratorConfig::load(&config_path)?
    };

    config.apply_env()?;
    if let Some(path) = store_path {
        config.store.path = PathBuf::from(path);
    }
    config.validate()?;

    println!("Store: {}", config.store.path.display());
    println!();

    init_logging(&config.logging)?;

    let store = SqliteProposalStore::open(&config.store.path).await?;
    let client = TelegramClient::new(&config.telegram.bot_token, &config.telegram.api_url);

    let me = client.get_me().await?;
    info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or(""),
        moderators = config.moderation.moderators.len(),
        "authenticated with Telegram"
    );

    let settings = config.pipeline_settings()?;
    info!(outlet = %settings.outlet, "publishing approved proposals");

    let pipeline = Arc::new(Pipeline::new(store.clone(), client.clone(), settings));
    ingress::serve(config.ingress_settings()?, client, pipeline).await?;

    store.close().await;
    info!("bot stopped");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr, or are
/// appended to `logging.file` without ANSI colours.
fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| e as Box<dyn std::error::Error>)?;
        }
        None => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| e as Box<dyn std::error::Error>)?,
    }

    Ok(())
}
