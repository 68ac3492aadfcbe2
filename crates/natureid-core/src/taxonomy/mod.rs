//! Reference taxonomy, label resolution, and tree synthesis.
//!
//! The reference taxonomy is loaded once from a Darwin Core archive. Each
//! classifier label is resolved against it (falling back to the remote taxa
//! service for renamed taxa) and the resulting ancestor chains are merged into
//! one tree rooted at "Life".

pub mod archive;
pub mod file;
pub mod rank;
pub mod resolver;
pub mod store;
pub mod synthesize;
pub mod tree;

pub use file::{default_taxonomy_path, read_taxonomy_file, write_taxonomy_file, TaxonomyFile};
pub use rank::{RankLevel, RankRegistry};
pub use resolver::{LabelResolver, Resolution, DEFAULT_DESIRED_RANKS};
pub use store::{ReferenceTaxon, ReferenceTaxonomy, TaxonRecord};
pub use synthesize::{synthesize, LabelOutcome, Labels, TreeSynthesizer};
pub use tree::{TaxonNode, TaxonTree};

/// Taxon identifier. Negative ids are placeholders for unresolved labels.
pub type TaxonId = i64;

/// Id of the synthetic root of the tree of life.
pub const ROOT_TAXON_ID: TaxonId = 48460;

/// Scientific name of the root.
pub const ROOT_NAME: &str = "Life";
