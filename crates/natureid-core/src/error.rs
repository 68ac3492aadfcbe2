//! Error types for taxonomy loading, tree synthesis, and prediction.
//!
//! Most failures in this crate degrade to a less informative result rather than
//! an error (see the resolver and remote client). The errors here cover the
//! cases a caller must decide about: an unusable archive, a corrupt taxonomy
//! file, or an invalid configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for natureid operations.
#[derive(Error, Debug)]
pub enum NatureIdError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reference taxonomy and taxonomy file errors
    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading/writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Zip archive errors
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while loading reference taxa or reading/writing tree files.
#[derive(Error, Debug)]
pub enum TaxonomyError {
    /// Rank name not present in the registry
    #[error("Unknown rank: {0}")]
    UnknownRank(String),

    /// The reference archive could not be opened or is missing a member
    #[error("Cannot load taxonomy from archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// A record could not be parsed
    #[error("Parse error at record {record}: {message}")]
    Parse { record: u64, message: String },

    /// Two reference records share one id
    #[error("Duplicate taxon id {0}")]
    DuplicateTaxon(i64),

    /// The archive has no record for the root of the tree of life
    #[error("Root taxon {0} missing from reference taxonomy")]
    MissingRoot(i64),

    /// A label or taxonomy file could not be read or written
    #[error("Taxonomy file {path}: {message}")]
    TaxonomyFile { path: PathBuf, message: String },
}

/// Convenience type alias for natureid results.
pub type Result<T> = std::result::Result<T, NatureIdError>;

/// Convenience type alias for taxonomy-specific results.
pub type TaxonomyResult<T> = std::result::Result<T, TaxonomyError>;
