//! Subcommand implementations.

pub mod build;
pub mod cache;
pub mod classify;
pub mod config;
pub mod lookup;

use natureid_core::{Config, RemoteTaxonClient};

/// Remote client with the persistent cache, or `None` when `offline`.
///
/// A cache that cannot be opened is reported and remote lookups are skipped.
pub(crate) fn remote_client(config: &Config, offline: bool) -> Option<RemoteTaxonClient> {
    if offline {
        tracing::debug!("Offline: remote taxa lookups disabled");
        return None;
    }
    let cache_path = config.api_cache_path();
    match RemoteTaxonClient::from_config(&config.api, &cache_path) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!("Remote taxa lookups disabled, cannot open cache {:?}: {}", cache_path, e);
            None
        }
    }
}
