//! The `natureid classify` command: turn score vectors into ranked results.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, ValueEnum};
use natureid_core::{ClassificationRecord, Classifier, Config, OutputWriter};

/// Arguments for the `classify` command.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Taxonomy file, or a label file to build one from
    pub taxonomy: PathBuf,

    /// Score files: a JSON array of numbers, or one array per line
    #[arg(required = true)]
    pub scores: Vec<PathBuf>,

    /// Report label probabilities instead of a taxonomic path
    #[arg(short, long)]
    pub label_probabilities_only: bool,

    /// Show scientific names only
    #[arg(short, long)]
    pub scientific_names_only: bool,

    /// Show all common names of a taxon
    #[arg(short, long)]
    pub all_common_names: bool,

    /// Number of labels reported in label-probabilities mode
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=100))]
    pub result_size: Option<u16>,

    /// Common name language [default: from the locale]
    #[arg(long)]
    pub language: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Output file [default: stdout]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not query the remote taxa API when building from a label file
    #[arg(long)]
    pub offline: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// A single JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<OutputFormat> for natureid_core::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
            OutputFormat::Jsonl => Self::JsonLines,
        }
    }
}

/// Execute the classify command.
pub async fn execute(args: ClassifyArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&args, &mut config);

    // Score files are read up front so a bad path fails before any taxonomy work.
    let mut batches = Vec::with_capacity(args.scores.len());
    for path in &args.scores {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read score file {}", path.display()))?;
        let vectors = parse_scores(&content)
            .with_context(|| format!("Invalid score file {}", path.display()))?;
        batches.push((path.clone(), vectors));
    }

    let mut client = super::remote_client(&config, args.offline);
    let mut classifier = Classifier::from_file(&args.taxonomy, &config, client.as_mut()).await?;
    if let Some(client) = client.as_mut() {
        if let Err(e) = client.flush() {
            tracing::warn!("Failed to save API cache: {}", e);
        }
    }
    if classifier.is_label_only() && !config.prediction.label_probabilities_only {
        tracing::info!("No taxonomy available, reporting label probabilities");
    }

    let mut records = Vec::new();
    for (path, vectors) in &batches {
        let label_count = classifier.labels().len();
        for (i, scores) in vectors.iter().enumerate() {
            if scores.len() != label_count {
                tracing::warn!(
                    "{}: {} scores for {} labels",
                    source_name(path, i, vectors.len()),
                    scores.len(),
                    label_count
                );
            }
            records.push(ClassificationRecord {
                source: source_name(path, i, vectors.len()),
                classification: classifier.classify(scores),
            });
        }
    }

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut output = OutputWriter::new(writer, args.format.into(), true);
    output.write_all(&records)?;
    output.flush()?;

    tracing::debug!("Wrote {} classification(s)", output.items_written());
    Ok(())
}

fn apply_overrides(args: &ClassifyArgs, config: &mut Config) {
    if args.label_probabilities_only {
        config.prediction.label_probabilities_only = true;
    }
    if let Some(size) = args.result_size {
        config.prediction.result_size = usize::from(size);
    }
    if args.scientific_names_only {
        config.names.scientific_names_only = true;
    }
    if args.all_common_names {
        config.names.all_common_names = true;
    }
    if let Some(language) = &args.language {
        config.names.language = Some(language.clone());
    }
}

/// Score file path, with the 1-based line for files holding several vectors.
fn source_name(path: &Path, index: usize, count: usize) -> String {
    if count > 1 {
        format!("{}:{}", path.display(), index + 1)
    } else {
        path.display().to_string()
    }
}

/// Parse one JSON array of scores, a JSON array of arrays, or JSON lines of arrays.
pub fn parse_scores(content: &str) -> anyhow::Result<Vec<Vec<f32>>> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        anyhow::bail!("no scores");
    }
    if let Ok(single) = serde_json::from_str::<Vec<f32>>(trimmed) {
        return Ok(vec![single]);
    }
    if let Ok(many) = serde_json::from_str::<Vec<Vec<f32>>>(trimmed) {
        return Ok(many);
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Vec<f32>>(line)
                .with_context(|| format!("line {}: expected a JSON array of numbers", n + 1))
        })
        .collect()
}
