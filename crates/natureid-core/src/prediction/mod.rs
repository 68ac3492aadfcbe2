//! Turning classifier scores into results.
//!
//! Scores are summed bottom-up through the synthesized tree and a path is
//! chosen greedily from the root. Without a tree the best raw labels are
//! reported instead.

pub mod classifier;
pub mod path;

pub use classifier::Classifier;
pub use path::{classify_path, propagate, select_path, top_labels};
