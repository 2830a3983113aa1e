use clap::{Parser, Subcommand};

pub mod config;
pub mod init_config;
pub mod run;
pub mod status;
pub mod version;

#[derive(Parser)]
#[command(name = "curator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Telegram bot for moderated anonymous submissions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot service
    Run {
        /// Path to config file (default: ~/.local/share/curator/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Path to the proposals database (overrides store.path from the config)
        #[arg(long)]
        store_path: Option<String>,
    },

    /// Show proposal counts per status
    Status {
        /// Path to config file (default: ~/.local/share/curator/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Path to the proposals database (overrides store.path from the config)
        #[arg(long)]
        store_path: Option<String>,
    },

    /// Write a commented default configuration file
    InitConfig {
        /// Where to write it (default: ~/.local/share/curator/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config, store_path } => run::execute(config, store_path).await,
        Commands::Status { config, store_path } => status::execute(config, store_path).await,
        Commands::InitConfig { config, force } => init_config::execute(config, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
