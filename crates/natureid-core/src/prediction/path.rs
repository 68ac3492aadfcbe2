//! Score propagation and greedy path selection.

use std::collections::HashMap;

use crate::taxonomy::tree::TaxonTree;
use crate::taxonomy::RankRegistry;
use crate::types::{LabelScore, PathStep};

/// A child must hold at least this share of its parent's score to be descended into.
const DESCEND_THRESHOLD: f32 = 0.5;

/// Set every node's score to the sum of its own class scores and its children's.
///
/// Leaf class ids past the end of `scores` count as zero.
pub fn propagate(tree: &mut TaxonTree, scores: &[f32]) {
    for index in tree.preorder().into_iter().rev() {
        let node = tree.node(index);
        let own: f32 = node
            .leaf_class_ids
            .iter()
            .map(|&class_id| scores.get(class_id).copied().unwrap_or(0.0))
            .sum();
        let below: f32 = node.children.iter().map(|&child| tree.node(child).score).sum();
        tree.node_mut(index).score = own + below;
    }
}

/// Walk down from the root along the best-scoring child.
///
/// Stops at a leaf or when the best child holds less than half of its parent's
/// score. Scores are reported relative to the root.
pub fn select_path(tree: &TaxonTree, ranks: &RankRegistry) -> Vec<PathStep> {
    let total = tree.root().score;
    let mut path = Vec::new();
    if total <= 0.0 {
        return path;
    }

    let mut current = tree.root();
    loop {
        let mut best: Option<usize> = None;
        for &child in &current.children {
            match best {
                Some(b) if tree.node(child).score <= tree.node(b).score => {}
                _ => best = Some(child),
            }
        }
        let Some(best) = best.map(|index| tree.node(index)) else {
            break;
        };
        if best.score < DESCEND_THRESHOLD * current.score {
            break;
        }

        let rank = if best.is_placeholder() {
            String::new()
        } else {
            ranks.rank_name(best.rank_level).to_string()
        };
        path.push(PathStep {
            score: best.score / total,
            taxon_id: best.id,
            rank,
            name: best.display_name(),
        });
        current = best;
    }
    path
}

/// Propagate `scores` and select the path in one call.
pub fn classify_path(tree: &mut TaxonTree, ranks: &RankRegistry, scores: &[f32]) -> Vec<PathStep> {
    propagate(tree, scores);
    select_path(tree, ranks)
}

/// The `k` best labels, normalized by the sum of all scores, best first.
///
/// Zero scores are dropped. Labels without a name show their class index.
pub fn top_labels(scores: &[f32], k: usize, names: &HashMap<usize, String>) -> Vec<LabelScore> {
    let total: f32 = scores.iter().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    indices
        .into_iter()
        .take(k)
        .filter(|&i| scores[i] != 0.0)
        .map(|i| LabelScore {
            score: scores[i] / total,
            class_id: i,
            name: names
                .get(&i)
                .cloned()
                .unwrap_or_else(|| format!("class {i}")),
        })
        .collect()
}
