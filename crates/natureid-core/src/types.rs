//! Core data types for classification results.

use serde::{Deserialize, Serialize};

use crate::taxonomy::TaxonId;

/// One step of a classification path, kingdom first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    /// Share of the total score held by this taxon (0.0-1.0)
    pub score: f32,

    pub taxon_id: TaxonId,

    /// Rank name; empty for placeholder taxa
    pub rank: String,

    /// "Common (Scientific)" or the scientific name
    pub name: String,
}

/// A label and its normalized score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// Score divided by the sum of all scores
    pub score: f32,

    /// Index into the score vector
    pub class_id: usize,

    pub name: String,
}

/// Result of classifying one score vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "results", rename_all = "snake_case")]
pub enum Classification {
    /// Path down the taxonomic tree
    Path(Vec<PathStep>),
    /// Top labels by score, best first
    Labels(Vec<LabelScore>),
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Path(steps) => steps.is_empty(),
            Self::Labels(labels) => labels.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Path(steps) => steps.len(),
            Self::Labels(labels) => labels.len(),
        }
    }
}
