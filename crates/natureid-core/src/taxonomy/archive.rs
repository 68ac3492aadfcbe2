//! Reader for the Darwin Core taxonomy archive.
//!
//! The archive is a zip holding `taxa.csv` and one `VernacularNames-*.csv`
//! per language. Vernacular files are matched against the active language
//! tag: exact tag first, then files whose tag is a prefix (`en` for `en_US`).

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use crate::error::{NatureIdError, TaxonomyError};

use super::store::TaxonRecord;
use super::tree::TaxonTree;
use super::TaxonId;

const TAXA_MEMBER: &str = "taxa.csv";
const VERNACULAR_PREFIX: &str = "VernacularNames-";
const PARAPHYLETIC_SUFFIX: &str = " [paraphyletic]";

/// Read all records of `taxa.csv` from the archive at `path`.
pub fn read_taxon_records(path: &Path) -> Result<Vec<TaxonRecord>, NatureIdError> {
    let mut zip = open_archive(path)?;
    let member = zip.by_name(TAXA_MEMBER).map_err(|e| TaxonomyError::Archive {
        path: path.to_path_buf(),
        message: format!("{TAXA_MEMBER}: {e}"),
    })?;
    parse_taxa(member)
}

/// Parse taxa records from CSV. Bytes that are not UTF-8 are replaced.
pub fn parse_taxa<R: Read>(reader: R) -> Result<Vec<TaxonRecord>, NatureIdError> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv.byte_headers()?.clone();
    let column = |name: &str| -> Result<usize, TaxonomyError> {
        headers
            .iter()
            .position(|h| h == name.as_bytes())
            .ok_or_else(|| TaxonomyError::Parse {
                record: 0,
                message: format!("missing column '{name}'"),
            })
    };
    let id_col = column("id")?;
    let parent_col = column("parentNameUsageID")?;
    let name_col = column("scientificName")?;
    let rank_col = column("taxonRank")?;

    let mut records = Vec::new();
    let mut row = csv::ByteRecord::new();
    let mut position = 0u64;
    while csv.read_byte_record(&mut row)? {
        position += 1;
        let field = |index: usize| String::from_utf8_lossy(row.get(index).unwrap_or_default()).into_owned();
        let id_text = field(id_col);
        let id = id_text.trim().parse::<TaxonId>().map_err(|e| TaxonomyError::Parse {
            record: position,
            message: format!("invalid taxon id '{id_text}': {e}"),
        })?;
        records.push(TaxonRecord {
            id,
            parent_name_usage_id: field(parent_col),
            scientific_name: field(name_col),
            taxon_rank: field(rank_col),
        });
    }
    Ok(records)
}

/// Active language tag from `LC_ALL`, `LC_MESSAGES` or `LANG`.
pub fn detect_language() -> String {
    language_from_env(|key| std::env::var(key).ok())
}

fn language_from_env(lookup: impl Fn(&str) -> Option<String>) -> String {
    let raw = ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
        .unwrap_or_default();

    // Strip encoding and modifier: de_CH.UTF-8@euro -> de_CH
    let tag = raw.split(['.', '@']).next().unwrap_or_default();
    match tag {
        "" | "C" | "POSIX" => "en".to_string(),
        tag => tag.to_string(),
    }
}

/// How a vernacular file's language relates to the active tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageMatch {
    Exact,
    Prefix,
}

/// Match a file's language against the active tag.
pub fn match_language(file_language: &str, active: &str) -> Option<LanguageMatch> {
    if file_language == active {
        Some(LanguageMatch::Exact)
    } else if file_language.len() < active.len() && active.starts_with(file_language) {
        Some(LanguageMatch::Prefix)
    } else {
        None
    }
}

/// Tidy a vernacular name for display.
///
/// Drops a trailing `[paraphyletic]` marker and capitalizes words separated by
/// hyphens or spaces, except `and` and abbreviations ending in `.`.
pub fn beautify_common_name(name: &str) -> String {
    let name = name.strip_suffix(PARAPHYLETIC_SUFFIX).unwrap_or(name);
    let hyphenated = name.split('-').map(capitalize).collect::<Vec<_>>().join("-");
    hyphenated
        .split_whitespace()
        .map(|word| {
            if word == "and" || word.ends_with('.') {
                word.to_string()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Read common names in `language` for the taxa in `wanted`.
///
/// With `all_names` every match is kept, joined with `"; "`; otherwise only the
/// first name found for each taxon.
pub fn read_common_names(
    path: &Path,
    language: &str,
    wanted: &HashSet<TaxonId>,
    all_names: bool,
) -> Result<HashMap<TaxonId, String>, NatureIdError> {
    let start = Instant::now();
    let mut zip = open_archive(path)?;

    let mut exact = Vec::new();
    let mut prefix = Vec::new();
    for index in 0..zip.len() {
        let member = zip.by_index(index)?;
        let name = member.name().to_string();
        if !(name.starts_with(VERNACULAR_PREFIX) && name.ends_with(".csv")) {
            continue;
        }
        let file_language = first_row_language(member)?;
        match file_language.as_deref().and_then(|l| match_language(l, language)) {
            Some(LanguageMatch::Exact) => exact.push(name),
            Some(LanguageMatch::Prefix) => prefix.push(name),
            None => {}
        }
    }

    if exact.is_empty() && prefix.is_empty() {
        tracing::warn!("Cannot find common names for language '{}'.", language);
        return Ok(HashMap::new());
    }

    let mut names: HashMap<TaxonId, String> = HashMap::new();
    let mut total = 0usize;
    for member_name in exact.iter().chain(prefix.iter()) {
        tracing::debug!("Reading common names from {:?} member '{}'", path, member_name);
        let member = zip.by_name(member_name)?;
        let mut csv = csv::Reader::from_reader(member);
        let headers = csv.headers()?.clone();
        let id_col = headers.iter().position(|h| h == "id");
        let name_col = headers.iter().position(|h| h == "vernacularName");
        let (Some(id_col), Some(name_col)) = (id_col, name_col) else {
            tracing::warn!("Skipping '{}': missing id or vernacularName column", member_name);
            continue;
        };

        for row in csv.records() {
            let row = row?;
            total += 1;
            let Some(id) = row.get(id_col).and_then(|s| s.trim().parse::<TaxonId>().ok()) else {
                continue;
            };
            if !wanted.contains(&id) {
                continue;
            }
            let vernacular = beautify_common_name(row.get(name_col).unwrap_or_default());
            match names.get_mut(&id) {
                None => {
                    names.insert(id, vernacular);
                }
                Some(existing) if all_names => {
                    existing.push_str("; ");
                    existing.push_str(&vernacular);
                }
                Some(_) => {}
            }
        }
    }

    tracing::info!(
        "Read {} common names in {:.1} secs, loaded {} for {} taxa in language \"{}\".",
        total,
        start.elapsed().as_secs_f64(),
        names.len(),
        wanted.len(),
        language
    );
    Ok(names)
}

/// Attach common names from the archive to every node of `tree`.
///
/// Failures are logged and leave the names unset.
pub fn annotate_common_names(tree: &mut TaxonTree, path: &Path, language: &str, all_names: bool) {
    if !path.is_file() {
        tracing::warn!("Cannot load common names, archive {:?} does not exist.", path);
        return;
    }
    let wanted: HashSet<TaxonId> = tree.ids().filter(|id| *id >= 0).collect();
    match read_common_names(path, language, &wanted, all_names) {
        Ok(names) => tree.set_common_names(&names),
        Err(e) => tracing::warn!("Cannot load common names from archive {:?}: {}", path, e),
    }
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>, NatureIdError> {
    let file = File::open(path).map_err(|e| TaxonomyError::Archive {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    zip::ZipArchive::new(file).map_err(|e| {
        TaxonomyError::Archive {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
        .into()
    })
}

fn first_row_language<R: Read>(reader: R) -> Result<Option<String>, NatureIdError> {
    let mut csv = csv::Reader::from_reader(reader);
    let Some(column) = csv.headers()?.iter().position(|h| h == "language") else {
        return Ok(None);
    };
    match csv.records().next() {
        Some(row) => Ok(row?.get(column).map(str::to_string)),
        None => Ok(None),
    }
}
