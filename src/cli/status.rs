use super::config::{default_config_path, CuratorConfig};
use curator::store::{ProposalStore, SqliteProposalStore, StatusCounts};
use std::path::{Path, PathBuf};

/// Show proposal counts per status
///
/// The database path comes from `--store-path`, else from the config file,
/// else the default location. A missing database is reported, not created.
pub async fn execute(
    config_path: Option<String>,
    store_path: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store_path = match store_path {
        Some(path) => PathBuf::from(path),
        None => {
            let config_path = config_path
                .map(PathBuf::from)
                .unwrap_or_else(default_config_path);
            if config_path.exists() {
                CuratorConfig::load(&config_path)?.store.path
            } else {
                CuratorConfig::default().store.path
            }
        }
    };

    println!("📊 Curator Status");
    println!();
    println!("Store: {}", store_path.display());

    match read_counts(&store_path).await? {
        Some(counts) => print!("{}", render(&counts)),
        None => println!("❌ No proposals database yet (the bot has not run)"),
    }

    Ok(())
}

async fn read_counts(path: &Path) -> Result<Option<StatusCounts>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(None);
    }

    let store = SqliteProposalStore::open(path).await?;
    let counts = store.counts().await?;
    store.close().await;
    Ok(Some(counts))
}

fn render(counts: &StatusCounts) -> String {
    format!(
        "  Pending:  {}\n  Approved: {}\n  Rejected: {}\n  Total:    {}\n",
        counts.pending,
        counts.approved,
        counts.rejected,
        counts.total()
    )
}
