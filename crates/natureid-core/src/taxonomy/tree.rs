//! The synthesized taxonomic tree.
//!
//! Nodes live in an arena indexed by position; the root "Life" is always at
//! index 0. Each taxon id appears at most once and every node except the root
//! has exactly one parent.

use std::collections::HashMap;

use super::rank::RankLevel;
use super::{TaxonId, ROOT_NAME, ROOT_TAXON_ID};

/// Arena index of the root node.
pub const ROOT_INDEX: usize = 0;

/// A node of the synthesized tree.
#[derive(Debug, Clone)]
pub struct TaxonNode {
    pub id: TaxonId,
    /// Scientific name, or the label name for placeholders
    pub name: String,
    pub rank_level: RankLevel,
    pub common_name: Option<String>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Indices into the classifier score vector
    pub leaf_class_ids: Vec<usize>,
    /// Aggregated score of the last prediction
    pub score: f32,
}

impl TaxonNode {
    fn new(id: TaxonId, name: &str, rank_level: RankLevel, parent: Option<usize>) -> Self {
        Self {
            id,
            name: name.to_string(),
            rank_level,
            common_name: None,
            parent,
            children: Vec::new(),
            leaf_class_ids: Vec::new(),
            score: 0.0,
        }
    }

    /// `"Common (Scientific)"` when a common name is known, else the scientific name.
    pub fn display_name(&self) -> String {
        match &self.common_name {
            Some(common) => format!("{} ({})", common, self.name),
            None => self.name.clone(),
        }
    }

    /// Placeholder nodes stand in for labels that could not be resolved.
    pub fn is_placeholder(&self) -> bool {
        self.id < 0
    }
}

/// Tree of taxa spanning a classifier's labels.
#[derive(Debug, Clone)]
pub struct TaxonTree {
    nodes: Vec<TaxonNode>,
    by_id: HashMap<TaxonId, usize>,
}

impl Default for TaxonTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxonTree {
    /// A tree holding only the root.
    pub fn new() -> Self {
        let root = TaxonNode::new(ROOT_TAXON_ID, ROOT_NAME, RankLevel::ROOT, None);
        Self {
            nodes: vec![root],
            by_id: HashMap::from([(ROOT_TAXON_ID, ROOT_INDEX)]),
        }
    }

    pub fn root(&self) -> &TaxonNode {
        &self.nodes[ROOT_INDEX]
    }

    pub fn node(&self, index: usize) -> &TaxonNode {
        &self.nodes[index]
    }

    pub fn node_mut(&mut self, index: usize) -> &mut TaxonNode {
        &mut self.nodes[index]
    }

    pub fn index_of(&self, id: TaxonId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn get(&self, id: TaxonId) -> Option<&TaxonNode> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    /// Index of the node with `id`, creating it under `parent` when absent.
    ///
    /// An existing node keeps its place in the tree.
    pub fn get_or_insert(
        &mut self,
        parent: usize,
        id: TaxonId,
        name: &str,
        rank_level: RankLevel,
    ) -> usize {
        if let Some(index) = self.index_of(id) {
            return index;
        }
        let index = self.nodes.len();
        self.nodes.push(TaxonNode::new(id, name, rank_level, Some(parent)));
        self.nodes[parent].children.push(index);
        self.by_id.insert(id, index);
        index
    }

    pub fn add_leaf_class(&mut self, index: usize, class_id: usize) {
        self.nodes[index].leaf_class_ids.push(class_id);
    }

    /// Node indices in pre-order, children in insertion order.
    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT_INDEX];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.nodes[index].children.iter().rev());
        }
        order
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaxonNode> {
        self.nodes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = TaxonId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    /// Set common names by taxon id, replacing earlier ones.
    pub fn set_common_names(&mut self, names: &HashMap<TaxonId, String>) {
        for node in &mut self.nodes {
            if let Some(name) = names.get(&node.id) {
                node.common_name = Some(name.clone());
            }
        }
    }

    /// Display name per leaf class id.
    pub fn leaf_display_names(&self) -> HashMap<usize, String> {
        self.nodes
            .iter()
            .flat_map(|node| {
                let name = node.display_name();
                node.leaf_class_ids
                    .iter()
                    .map(move |&class_id| (class_id, name.clone()))
            })
            .collect()
    }

    /// Number of taxa, not counting the root.
    pub fn taxon_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Number of distinct leaf class ids.
    pub fn leaf_class_count(&self) -> usize {
        self.nodes.iter().map(|node| node.leaf_class_ids.len()).sum()
    }

    /// True when nothing hangs below the root.
    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }
}
