//! Label and taxonomy CSV files.
//!
//! A label file maps class indices to names (`id,name`). A taxonomy file holds
//! a synthesized tree, one row per taxon in pre-order:
//! `parent_taxon_id,taxon_id,rank_level,leaf_class_id,name`. Kingdom-level
//! rows have an empty parent and several leaf class ids are `;`-joined. The
//! root only gets a row when labels resolved to it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{NatureIdError, TaxonomyError};

use super::rank::RankLevel;
use super::synthesize::Labels;
use super::tree::{TaxonTree, ROOT_INDEX};
use super::{TaxonId, ROOT_TAXON_ID};

const TAXONOMY_HEADER: [&str; 5] = ["parent_taxon_id", "taxon_id", "rank_level", "leaf_class_id", "name"];

/// Contents of a label or taxonomy file.
#[derive(Debug, Clone)]
pub enum TaxonomyFile {
    Labels(Labels),
    Tree { tree: TaxonTree, labels: Labels },
}

impl TaxonomyFile {
    pub fn labels(&self) -> &Labels {
        match self {
            Self::Labels(labels) => labels,
            Self::Tree { labels, .. } => labels,
        }
    }
}

struct TaxonRow {
    parent: TaxonId,
    id: TaxonId,
    rank_level: RankLevel,
    leaf_class_ids: Vec<usize>,
    name: String,
}

/// Read a label file or a taxonomy file, telling them apart by header.
pub fn read_taxonomy_file(path: &Path) -> Result<TaxonomyFile, NatureIdError> {
    let file_error = |message: String| TaxonomyError::TaxonomyFile {
        path: path.to_path_buf(),
        message,
    };

    let mut csv = csv::Reader::from_path(path)?;
    let headers = csv.byte_headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name.as_bytes());

    let mut row = csv::ByteRecord::new();
    let mut labels = Labels::new();

    if let Some(id_col) = column("id") {
        let name_col = column("name").ok_or_else(|| file_error("missing column 'name'".into()))?;
        while csv.read_byte_record(&mut row)? {
            let id = parse_field::<usize>(&row, id_col).map_err(&file_error)?;
            labels.insert(id, text_field(&row, name_col));
        }
        tracing::info!("Read {} labels from {:?}.", labels.len(), path);
        return Ok(TaxonomyFile::Labels(labels));
    }

    let mut columns = [0usize; 5];
    for (slot, name) in columns.iter_mut().zip(TAXONOMY_HEADER) {
        *slot = column(name).ok_or_else(|| file_error(format!("missing column '{name}'")))?;
    }
    let [parent_col, id_col, rank_col, leaf_col, name_col] = columns;

    let mut rows = Vec::new();
    while csv.read_byte_record(&mut row)? {
        let parent_text = text_field(&row, parent_col);
        let parent = if parent_text.trim().is_empty() {
            ROOT_TAXON_ID
        } else {
            parse_field(&row, parent_col).map_err(&file_error)?
        };
        let leaf_class_ids = text_field(&row, leaf_col)
            .split(';')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse::<usize>()
                    .map_err(|e| file_error(format!("invalid leaf class id '{s}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(TaxonRow {
            parent,
            id: parse_field(&row, id_col).map_err(&file_error)?,
            rank_level: parse_field(&row, rank_col).map_err(&file_error)?,
            leaf_class_ids,
            name: text_field(&row, name_col),
        });
    }

    let tree = build_tree(rows, &mut labels).map_err(file_error)?;
    tracing::info!(
        "Read taxonomy from {:?}: {} taxa including {} leaf taxa.",
        path,
        tree.taxon_count(),
        labels.len()
    );
    Ok(TaxonomyFile::Tree { tree, labels })
}

/// Insert rows whose parent is already placed, repeating until all are placed.
fn build_tree(rows: Vec<TaxonRow>, labels: &mut Labels) -> Result<TaxonTree, String> {
    let mut tree = TaxonTree::new();
    let mut seen = HashSet::new();
    for row in &rows {
        if !seen.insert(row.id) {
            return Err(format!("duplicate taxon id {}", row.id));
        }
    }

    let mut pending = rows;
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        for row in pending {
            if row.id == ROOT_TAXON_ID {
                for class_id in row.leaf_class_ids {
                    tree.add_leaf_class(ROOT_INDEX, class_id);
                    labels.insert(class_id, row.name.clone());
                }
                continue;
            }
            let Some(parent) = tree.index_of(row.parent) else {
                deferred.push(row);
                continue;
            };
            let index = tree.get_or_insert(parent, row.id, &row.name, row.rank_level);
            for class_id in row.leaf_class_ids {
                tree.add_leaf_class(index, class_id);
                labels.insert(class_id, row.name.clone());
            }
        }
        if deferred.len() == before {
            let orphans: Vec<String> = deferred.iter().map(|r| r.id.to_string()).collect();
            return Err(format!("taxa without parent: {}", orphans.join(", ")));
        }
        pending = deferred;
    }
    Ok(tree)
}

/// Write `tree` in pre-order. A partially written file is removed.
pub fn write_taxonomy_file(tree: &TaxonTree, path: &Path) -> Result<(), NatureIdError> {
    match write_rows(tree, path) {
        Ok(()) => {
            tracing::info!("Taxonomy written to file {:?}.", path);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failure writing taxonomy to file {:?}: {}", path, e);
            if path.exists() {
                if let Err(remove) = std::fs::remove_file(path) {
                    tracing::warn!("Cannot remove partial taxonomy file {:?}: {}", path, remove);
                }
            }
            Err(TaxonomyError::TaxonomyFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into())
        }
    }
}

fn write_rows(tree: &TaxonTree, path: &Path) -> Result<(), NatureIdError> {
    let mut csv = csv::Writer::from_path(path)?;
    csv.write_record(TAXONOMY_HEADER)?;
    for index in tree.preorder() {
        let node = tree.node(index);
        if index == ROOT_INDEX && node.leaf_class_ids.is_empty() {
            continue;
        }
        let parent = match node.parent {
            Some(ROOT_INDEX) | None => String::new(),
            Some(parent) => tree.node(parent).id.to_string(),
        };
        let leaves = node
            .leaf_class_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(";");
        csv.write_record([
            parent,
            node.id.to_string(),
            node.rank_level.to_string(),
            leaves,
            node.name.clone(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Taxonomy file path for a label file: `labelmap` becomes `taxonomy` in the
/// file name, otherwise `.taxonomy.csv` replaces the extension.
pub fn default_taxonomy_path(labels: &Path) -> PathBuf {
    let file_name = labels
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if file_name.contains("labelmap") {
        return labels.with_file_name(file_name.replace("labelmap", "taxonomy"));
    }
    let stem = labels
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "labels".to_string());
    labels.with_file_name(format!("{stem}.taxonomy.csv"))
}

fn text_field(row: &csv::ByteRecord, index: usize) -> String {
    String::from_utf8_lossy(row.get(index).unwrap_or_default()).into_owned()
}

fn parse_field<T>(row: &csv::ByteRecord, index: usize) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text = text_field(row, index);
    text.trim()
        .parse::<T>()
        .map_err(|e| format!("invalid value '{text}' at line {}: {e}", line_of(row)))
}

fn line_of(row: &csv::ByteRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or_default()
}
