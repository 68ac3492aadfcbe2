//! The `natureid build` command: synthesize the taxonomy file for a label file.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use natureid_core::taxonomy::{
    default_taxonomy_path, read_taxonomy_file, write_taxonomy_file, LabelOutcome, LabelResolver,
    ReferenceTaxonomy, TaxonomyFile, TreeSynthesizer,
};
use natureid_core::Config;

/// Arguments for the `build` command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Label file (`id,name` rows)
    pub labels: PathBuf,

    /// Where to write the taxonomy file [default: derived from the label file name]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not query the remote taxa API for unresolved names
    #[arg(long)]
    pub offline: bool,
}

/// Execute the build command.
pub async fn execute(args: BuildArgs, config: Config) -> anyhow::Result<()> {
    let labels = match read_taxonomy_file(&args.labels)? {
        TaxonomyFile::Labels(labels) => labels,
        TaxonomyFile::Tree { .. } => anyhow::bail!(
            "{} is already a taxonomy file, expected a label file",
            args.labels.display()
        ),
    };
    let output = args
        .output
        .unwrap_or_else(|| default_taxonomy_path(&args.labels));

    let mut client = super::remote_client(&config, args.offline);

    let archive = config.taxonomy_archive();
    tracing::info!("Loading reference taxonomy from {:?}", archive);
    let mut store = ReferenceTaxonomy::new();
    store.load_archive(&archive, client.as_mut()).await?;
    tracing::info!("Reference taxonomy has {} taxa", store.len());

    let start = Instant::now();
    let progress = create_progress_bar(labels.len() as u64);
    let mut synthesizer = TreeSynthesizer::new();
    let mut placeholders = Vec::new();
    {
        let mut resolver = LabelResolver::new(&store, client.as_mut());
        for (&class_id, name) in &labels {
            progress.set_message(name.clone());
            if let LabelOutcome::Placeholder { .. } =
                synthesizer.add_label(&mut resolver, class_id, name).await
            {
                placeholders.push(name.clone());
            }
            progress.inc(1);
        }
    }
    progress.finish_and_clear();

    if let Some(client) = client.as_mut() {
        if let Err(e) = client.flush() {
            tracing::warn!("Failed to save API cache: {}", e);
        }
    }

    let tree = synthesizer.finish();
    write_taxonomy_file(&tree, &output)?;

    println!(
        "Wrote {} ({} taxa, {} labels) in {:.1}s",
        output.display(),
        tree.taxon_count(),
        tree.leaf_class_count(),
        start.elapsed().as_secs_f64()
    );
    if !placeholders.is_empty() {
        println!(
            "{} label(s) not found in the taxonomy, kept as pseudo-kingdoms: {}",
            placeholders.len(),
            placeholders.join(", ")
        );
    }

    Ok(())
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb
}
