//! natureid core - taxonomic trees for flat classifier labels.
//!
//! Image classifiers predict one of a fixed set of labels. This crate places
//! those labels in the tree of life and turns a score vector into a path from
//! kingdom down to the most specific taxon the scores support.
//!
//! # Architecture
//!
//! ```text
//! labels → resolve (reference archive, remote taxa API) → synthesized tree
//! scores → propagate bottom-up → greedy path (or top labels)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use natureid_core::{Classifier, Config};
//!
//! #[tokio::main]
//! async fn main() -> natureid_core::Result<()> {
//!     let config = Config::load()?;
//!     let mut classifier =
//!         Classifier::from_file("birds_labelmap.csv".as_ref(), &config, None).await?;
//!
//!     let classification = classifier.classify(&[0.1, 0.7, 0.2]);
//!     println!("{}", natureid_core::output::format_text(&classification));
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod api;
pub mod config;
pub mod error;
pub mod output;
pub mod prediction;
pub mod taxonomy;
pub mod types;

// Re-exports for convenient access
pub use api::RemoteTaxonClient;
pub use config::Config;
pub use error::{ConfigError, NatureIdError, Result, TaxonomyError, TaxonomyResult};
pub use output::{ClassificationRecord, OutputFormat, OutputWriter};
pub use prediction::Classifier;
pub use taxonomy::{
    LabelResolver, Labels, RankLevel, RankRegistry, ReferenceTaxonomy, TaxonId, TaxonTree,
    TreeSynthesizer,
};
pub use types::{Classification, LabelScore, PathStep};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
