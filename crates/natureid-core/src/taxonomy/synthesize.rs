//! Merge resolved labels into one taxonomic tree.

use std::collections::BTreeMap;

use super::rank::RankLevel;
use super::resolver::{LabelResolver, Resolution};
use super::tree::{TaxonTree, ROOT_INDEX};
use super::TaxonId;

/// Classifier labels by class index.
pub type Labels = BTreeMap<usize, String>;

/// What became of one label.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelOutcome {
    /// Attached to reference taxon `taxon_id`
    Resolved { taxon_id: TaxonId, name: String },
    /// Not found; inserted as a kingdom-level placeholder
    Placeholder { taxon_id: TaxonId },
}

/// Builds a [`TaxonTree`] one label at a time.
#[derive(Debug, Default)]
pub struct TreeSynthesizer {
    tree: TaxonTree,
    last_placeholder: TaxonId,
}

impl TreeSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` and attach it as class `class_id`.
    pub async fn add_label(
        &mut self,
        resolver: &mut LabelResolver<'_>,
        class_id: usize,
        name: &str,
    ) -> LabelOutcome {
        match resolver.resolve(name).await {
            Some(resolution) => {
                self.add_resolution(class_id, &resolution);
                LabelOutcome::Resolved {
                    taxon_id: resolution.taxon.id,
                    name: resolution.taxon.name,
                }
            }
            None => {
                tracing::info!("Taxon for label '{}' not found, inserting as pseudo-kingdom.", name);
                LabelOutcome::Placeholder {
                    taxon_id: self.add_placeholder(class_id, name),
                }
            }
        }
    }

    /// Attach a resolved taxon and its ancestors; returns its node index.
    pub fn add_resolution(&mut self, class_id: usize, resolution: &Resolution) -> usize {
        let mut parent = ROOT_INDEX;
        for ancestor in &resolution.ancestors {
            parent = self
                .tree
                .get_or_insert(parent, ancestor.id, &ancestor.name, ancestor.rank_level);
        }
        let taxon = &resolution.taxon;
        let index = self
            .tree
            .get_or_insert(parent, taxon.id, &taxon.name, taxon.rank_level);
        self.tree.add_leaf_class(index, class_id);
        index
    }

    /// Insert a placeholder for an unresolved label under the root.
    pub fn add_placeholder(&mut self, class_id: usize, name: &str) -> TaxonId {
        self.last_placeholder -= 1;
        let id = self.last_placeholder;
        let index = self.tree.get_or_insert(ROOT_INDEX, id, name, RankLevel::KINGDOM);
        self.tree.add_leaf_class(index, class_id);
        id
    }

    pub fn tree(&self) -> &TaxonTree {
        &self.tree
    }

    pub fn finish(self) -> TaxonTree {
        self.tree
    }
}

/// Build the tree for all `labels`.
pub async fn synthesize(labels: &Labels, resolver: &mut LabelResolver<'_>) -> TaxonTree {
    let start = std::time::Instant::now();
    let mut synthesizer = TreeSynthesizer::new();
    for (&class_id, name) in labels {
        synthesizer.add_label(resolver, class_id, name).await;
    }
    let tree = synthesizer.finish();
    tracing::info!(
        "Computed taxonomic tree from labels in {:.1} secs: {} taxa including {} leaf taxa.",
        start.elapsed().as_secs_f64(),
        tree.taxon_count(),
        labels.len()
    );
    tree
}
