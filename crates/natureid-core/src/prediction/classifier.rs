//! Classifier facade: from a label or taxonomy file to ranked results.

use std::collections::HashMap;
use std::path::Path;

use crate::api::RemoteTaxonClient;
use crate::config::{Config, PredictionConfig};
use crate::error::Result;
use crate::taxonomy::archive::{annotate_common_names, detect_language};
use crate::taxonomy::{
    default_taxonomy_path, read_taxonomy_file, synthesize, write_taxonomy_file, LabelResolver,
    Labels, RankRegistry, ReferenceTaxonomy, TaxonTree, TaxonomyFile,
};
use crate::types::Classification;

use super::path::{classify_path, top_labels};

/// Turns score vectors into classification paths or top labels.
pub struct Classifier {
    tree: TaxonTree,
    labels: Labels,
    ranks: RankRegistry,
    /// Label display names for label-only output
    display_names: HashMap<usize, String>,
    result_size: usize,
    label_only: bool,
}

impl Classifier {
    /// Build from a synthesized tree.
    ///
    /// Falls back to label-only mode when the tree is empty.
    pub fn new(tree: TaxonTree, labels: Labels, ranks: RankRegistry, config: &PredictionConfig) -> Self {
        let label_only = config.label_probabilities_only || tree.is_empty();
        let mut classifier = Self {
            tree,
            labels,
            ranks,
            display_names: HashMap::new(),
            result_size: config.result_size,
            label_only,
        };
        classifier.refresh_display_names();
        classifier
    }

    /// A classifier that only reports label probabilities.
    pub fn label_only(labels: Labels, result_size: usize) -> Self {
        let config = PredictionConfig {
            result_size,
            label_probabilities_only: true,
        };
        Self::new(TaxonTree::new(), labels, RankRegistry::default(), &config)
    }

    /// Load a taxonomy file, or a label file from which the tree is synthesized.
    ///
    /// A synthesized tree is written next to the label file. Without a usable
    /// reference archive the classifier runs in label-only mode.
    pub async fn from_file(
        path: &Path,
        config: &Config,
        mut client: Option<&mut RemoteTaxonClient>,
    ) -> Result<Self> {
        let archive = config.taxonomy_archive();
        let (mut tree, labels, ranks) = match read_taxonomy_file(path)? {
            TaxonomyFile::Tree { tree, labels } => (tree, labels, RankRegistry::default()),
            TaxonomyFile::Labels(labels) if config.prediction.label_probabilities_only => {
                (TaxonTree::new(), labels, RankRegistry::default())
            }
            TaxonomyFile::Labels(labels) => {
                let mut store = ReferenceTaxonomy::new();
                match store.load_archive(&archive, client.as_deref_mut()).await {
                    Ok(()) => {
                        let mut resolver = LabelResolver::new(&store, client.as_deref_mut());
                        let tree = synthesize(&labels, &mut resolver).await;
                        if !tree.is_empty() {
                            let output = default_taxonomy_path(path);
                            if let Err(e) = write_taxonomy_file(&tree, &output) {
                                tracing::debug!("Continuing with unsaved taxonomy for {:?}: {}", path, e);
                            }
                        }
                        let ranks = store.ranks().clone();
                        (tree, labels, ranks)
                    }
                    Err(e) => {
                        tracing::warn!("Reference taxonomy unavailable ({}), reporting label probabilities only.", e);
                        (TaxonTree::new(), labels, RankRegistry::default())
                    }
                }
            }
        };

        if !config.names.scientific_names_only && !tree.is_empty() {
            let language = config.names.language.clone().unwrap_or_else(detect_language);
            annotate_common_names(&mut tree, &archive, &language, config.names.all_common_names);
        }

        Ok(Self::new(tree, labels, ranks, &config.prediction))
    }

    fn refresh_display_names(&mut self) {
        self.display_names = self.labels.iter().map(|(&id, name)| (id, name.clone())).collect();
        if !self.tree.is_empty() {
            self.display_names.extend(self.tree.leaf_display_names());
        }
    }

    /// Classify one score vector, indexed by class id.
    pub fn classify(&mut self, scores: &[f32]) -> Classification {
        if self.label_only {
            Classification::Labels(top_labels(scores, self.result_size, &self.display_names))
        } else {
            Classification::Path(classify_path(&mut self.tree, &self.ranks, scores))
        }
    }

    pub fn tree(&self) -> &TaxonTree {
        &self.tree
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn is_label_only(&self) -> bool {
        self.label_only
    }

    pub fn result_size(&self) -> usize {
        self.result_size
    }
}
