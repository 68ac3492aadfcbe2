//! The `natureid cache` command.

use clap::{Args, Subcommand};
use natureid_core::api::ApiCache;
use natureid_core::Config;

/// Arguments for the `cache` command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show the API response cache file path
    Path,

    /// Show the number of cached responses and their lifetime
    Info,
}

/// Execute the cache command.
pub async fn execute(args: CacheArgs, config: Config) -> anyhow::Result<()> {
    let path = config.api_cache_path();
    match args.command {
        CacheCommand::Path => println!("{}", path.display()),
        CacheCommand::Info => {
            let cache = ApiCache::open(&path, config.api.cache_ttl())?;
            println!("{}", path.display());
            println!(
                "{} cached response(s), kept for {} day(s)",
                cache.len(),
                config.api.cache_ttl_days
            );
        }
    }
    Ok(())
}
