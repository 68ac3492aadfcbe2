//! The `natureid lookup` command: resolve one name and print its lineage.

use clap::Args;
use natureid_core::taxonomy::{LabelResolver, ReferenceTaxonomy};
use natureid_core::Config;

/// Arguments for the `lookup` command.
#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Scientific name, or a former name known to the remote API
    pub name: String,

    /// Only search the local reference taxonomy
    #[arg(long)]
    pub offline: bool,
}

/// Execute the lookup command.
pub async fn execute(args: LookupArgs, config: Config) -> anyhow::Result<()> {
    let mut client = super::remote_client(&config, args.offline);

    let mut store = ReferenceTaxonomy::new();
    store
        .load_archive(&config.taxonomy_archive(), client.as_mut())
        .await?;

    let resolution = {
        let mut resolver = LabelResolver::new(&store, client.as_mut());
        resolver.resolve(&args.name).await
    };
    if let Some(client) = client.as_mut() {
        if let Err(e) = client.flush() {
            tracing::warn!("Failed to save API cache: {}", e);
        }
    }

    let Some(resolution) = resolution else {
        anyhow::bail!("Taxon '{}' not found", args.name);
    };

    for (depth, taxon) in resolution
        .ancestors
        .iter()
        .chain(std::iter::once(&resolution.taxon))
        .enumerate()
    {
        println!(
            "{:indent$}{} {} ({})",
            "",
            store.rank_name(taxon),
            taxon.name,
            taxon.id,
            indent = depth * 2
        );
    }
    Ok(())
}
