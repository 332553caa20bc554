use std::io::Write;

use dispatch_core::assets::{AssetCache, DEFAULT_MANIFEST};
use dispatch_core::ClientConfig;

use crate::cli::AssetsCommand;
use crate::commands::common::open_database;
use crate::error::CliError;

pub async fn run_assets(config: &ClientConfig, action: AssetsCommand) -> Result<(), CliError> {
    let cache = AssetCache::new(
        open_database(config).await?,
        config.api_base_url.clone(),
        config.asset_cache_name.clone(),
        config.request_timeout,
    )?;

    match action {
        AssetsCommand::Install => {
            let count = cache.install(DEFAULT_MANIFEST).await?;
            println!("Cached {count} asset(s) in {}", cache.cache_name());
        }
        AssetsCommand::Activate => {
            let purged = cache.activate().await?;
            println!("Activated {} (purged {purged} stale entries)", cache.cache_name());
        }
        AssetsCommand::Fetch { path, output } => {
            let asset = cache.fetch(&path).await?;
            eprintln!(
                "{} from {} ({})",
                asset.path,
                asset.source,
                asset.content_type.as_deref().unwrap_or("unknown type")
            );
            match output {
                Some(file) => std::fs::write(file, &asset.body)?,
                None => std::io::stdout().write_all(&asset.body)?,
            }
        }
    }

    Ok(())
}
