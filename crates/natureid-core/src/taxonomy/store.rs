//! In-memory index of the reference taxonomy.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use crate::api::RemoteTaxonClient;
use crate::error::{NatureIdError, TaxonomyError};

use super::archive;
use super::rank::{RankLevel, RankRegistry};
use super::{TaxonId, ROOT_TAXON_ID};

/// Guard against parent cycles in corrupt archives.
const MAX_LINEAGE_DEPTH: usize = 64;

/// A taxon of the reference taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTaxon {
    pub id: TaxonId,
    /// `None` only for the root
    pub parent_id: Option<TaxonId>,
    /// Scientific name
    pub name: String,
    pub rank_level: RankLevel,
}

/// One row of `taxa.csv`, before rank and parent resolution.
#[derive(Debug, Clone)]
pub struct TaxonRecord {
    pub id: TaxonId,
    /// URL or id of the parent; the id is the last `/`-separated segment
    pub parent_name_usage_id: String,
    pub scientific_name: String,
    pub taxon_rank: String,
}

impl TaxonRecord {
    pub fn new(id: TaxonId, parent: &str, name: &str, rank: &str) -> Self {
        Self {
            id,
            parent_name_usage_id: parent.to_string(),
            scientific_name: name.to_string(),
            taxon_rank: rank.to_string(),
        }
    }
}

/// Reference taxa indexed by id and by scientific name, plus the rank registry
/// that was extended while loading them.
#[derive(Debug, Default)]
pub struct ReferenceTaxonomy {
    ranks: RankRegistry,
    by_id: HashMap<TaxonId, ReferenceTaxon>,
    /// Homonyms are kept in encounter order
    by_name: HashMap<String, Vec<TaxonId>>,
}

impl ReferenceTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `taxa.csv` from a Darwin Core archive.
    ///
    /// See [`ReferenceTaxonomy::load_records`] for the loading rules.
    pub async fn load_archive(
        &mut self,
        path: &Path,
        client: Option<&mut RemoteTaxonClient>,
    ) -> Result<(), NatureIdError> {
        if !self.is_empty() {
            return Ok(());
        }
        tracing::info!("Loading reference taxonomy from {:?}...", path);
        let records = archive::read_taxon_records(path).map_err(|e| {
            tracing::error!("Cannot load taxonomy 'taxa.csv' from archive {:?}: {}", path, e);
            e
        })?;
        self.load_records(records, client).await
    }

    /// Index reference taxa.
    ///
    /// A second load while taxa are present is a no-op. Ranks missing from the
    /// registry are looked up remotely through `client` and registered. On any
    /// error the store stays empty.
    pub async fn load_records<I>(
        &mut self,
        records: I,
        mut client: Option<&mut RemoteTaxonClient>,
    ) -> Result<(), NatureIdError>
    where
        I: IntoIterator<Item = TaxonRecord>,
    {
        if !self.is_empty() {
            return Ok(());
        }

        let start = Instant::now();
        let mut ranks = self.ranks.clone();
        let mut by_id: HashMap<TaxonId, ReferenceTaxon> = HashMap::new();
        let mut by_name: HashMap<String, Vec<TaxonId>> = HashMap::new();

        for (index, record) in records.into_iter().enumerate() {
            let parent_id = parse_parent_id(&record, index as u64 + 1)?;

            if !ranks.contains(&record.taxon_rank) {
                extend_ranks(&mut ranks, &record, client.as_deref_mut()).await;
            }
            let rank_level = ranks.rank_level(&record.taxon_rank)?;

            if by_id.contains_key(&record.id) {
                return Err(TaxonomyError::DuplicateTaxon(record.id).into());
            }
            by_name
                .entry(record.scientific_name.clone())
                .or_default()
                .push(record.id);
            by_id.insert(
                record.id,
                ReferenceTaxon {
                    id: record.id,
                    parent_id,
                    name: record.scientific_name,
                    rank_level,
                },
            );
        }

        if !by_id.contains_key(&ROOT_TAXON_ID) {
            return Err(TaxonomyError::MissingRoot(ROOT_TAXON_ID).into());
        }

        tracing::info!(
            "Loaded reference taxonomy of {} taxa in {:.1} secs.",
            by_id.len(),
            start.elapsed().as_secs_f64()
        );
        self.ranks = ranks;
        self.by_id = by_id;
        self.by_name = by_name;
        Ok(())
    }

    pub fn get(&self, id: TaxonId) -> Option<&ReferenceTaxon> {
        self.by_id.get(&id)
    }

    /// All taxa carrying `name`, in archive order.
    pub fn by_name(&self, name: &str) -> Vec<&ReferenceTaxon> {
        self.by_name
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, taxon: &ReferenceTaxon) -> Option<&ReferenceTaxon> {
        taxon.parent_id.and_then(|id| self.by_id.get(&id))
    }

    /// Ancestor chain of `id`, from its kingdom down to and including `id`.
    ///
    /// The root and anything coarser than kingdom are excluded. When a parent
    /// is missing the chain below it is returned.
    pub fn lineage(&self, id: TaxonId) -> Vec<&ReferenceTaxon> {
        let mut chain = Vec::new();
        let mut current = self.by_id.get(&id);

        while let Some(taxon) = current {
            if taxon.id != ROOT_TAXON_ID && taxon.rank_level <= RankLevel::KINGDOM {
                chain.push(taxon);
            }
            if !taxon.rank_level.is_below_kingdom() {
                break;
            }
            if chain.len() >= MAX_LINEAGE_DEPTH {
                tracing::warn!("Lineage of taxon {} exceeds {} ranks", id, MAX_LINEAGE_DEPTH);
                break;
            }
            current = match self.parent(taxon) {
                Some(parent) => Some(parent),
                None => {
                    tracing::debug!("Parent of taxon {} missing from reference taxonomy", taxon.id);
                    None
                }
            };
        }

        chain.reverse();
        chain
    }

    pub fn ranks(&self) -> &RankRegistry {
        &self.ranks
    }

    /// Rank name of a taxon, `"clade"` for unnamed levels.
    pub fn rank_name(&self, taxon: &ReferenceTaxon) -> &str {
        self.ranks.rank_name(taxon.rank_level)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Register the rank of `record`, asking the remote service for its level.
async fn extend_ranks(
    ranks: &mut RankRegistry,
    record: &TaxonRecord,
    client: Option<&mut RemoteTaxonClient>,
) {
    let rank = record.taxon_rank.as_str();
    let reported = match client {
        Some(client) => client
            .fetch_by_ids(&[record.id])
            .await
            .and_then(|response| response.results.into_iter().next())
            .and_then(|taxon| taxon.rank_level),
        None => None,
    };

    match reported {
        Some(level) => {
            let level = RankLevel::new(level);
            ranks.register(rank, level);
            tracing::warn!(
                "Please add rank '{}' to the base rank table, numeric value {}.",
                rank,
                level
            );
        }
        None => {
            ranks.register_unknown(rank);
            tracing::warn!(
                "Rank '{}' of taxon {} is unknown; treating it as finest. \
                 Please add it to the base rank table.",
                rank,
                record.id
            );
        }
    }
}

fn parse_parent_id(record: &TaxonRecord, position: u64) -> Result<Option<TaxonId>, TaxonomyError> {
    let segment = record
        .parent_name_usage_id
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim();

    if segment.is_empty() {
        return Ok((record.id != ROOT_TAXON_ID).then_some(ROOT_TAXON_ID));
    }

    segment
        .parse::<TaxonId>()
        .map(Some)
        .map_err(|e| TaxonomyError::Parse {
            record: position,
            message: format!("invalid parent id '{}': {}", record.parent_name_usage_id, e),
        })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! A small slice of the tree of life shared by taxonomy and prediction tests.

    use super::TaxonRecord;

    const BASE: &str = "https://www.inaturalist.org/taxa/";

    fn record(id: i64, parent: Option<i64>, name: &str, rank: &str) -> TaxonRecord {
        let parent = parent.map(|p| format!("{BASE}{p}")).unwrap_or_default();
        TaxonRecord::new(id, &parent, name, rank)
    }

    /// Life > Animalia > Chordata > Aves > Passeriformes > Paridae >
    /// {Parus > Parus major, Cyanistes > Cyanistes caeruleus}, plus Plantae
    /// and a genus homonym "Morus" in both kingdoms.
    pub fn records() -> Vec<TaxonRecord> {
        vec![
            record(48460, None, "Life", "stateofmatter"),
            record(1, None, "Animalia", "kingdom"),
            record(2, Some(1), "Chordata", "phylum"),
            record(3, Some(2), "Aves", "class"),
            record(7251, Some(3), "Passeriformes", "order"),
            record(13684, Some(7251), "Paridae", "family"),
            record(203153, Some(13684), "Parus", "genus"),
            record(203154, Some(203153), "Parus major", "species"),
            record(144849, Some(13684), "Cyanistes", "genus"),
            record(144850, Some(144849), "Cyanistes caeruleus", "species"),
            record(47157, None, "Plantae", "kingdom"),
            record(47126, Some(47157), "Tracheophyta", "phylum"),
            record(53179, Some(47126), "Morus", "genus"),
            record(71251, Some(3), "Morus", "genus"),
            record(71252, Some(71251), "Morus bassanus", "species"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::records;
    use super::*;
    use crate::api::cache::DEFAULT_TTL;
    use crate::api::client::testing::ScriptedTransport;
    use crate::api::ApiCache;
    use crate::config::ApiConfig;

    async fn loaded() -> ReferenceTaxonomy {
        let mut store = ReferenceTaxonomy::new();
        store.load_records(records(), None).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_load_indexes_by_id_and_name() {
        let store = loaded().await;
        assert_eq!(store.len(), records().len());
        assert_eq!(store.get(203154).unwrap().name, "Parus major");
        assert_eq!(store.by_name("Morus").len(), 2);
        // Encounter order preserved
        assert_eq!(store.by_name("Morus")[0].id, 53179);
    }

    #[tokio::test]
    async fn test_parent_rules() {
        let store = loaded().await;
        assert_eq!(store.get(ROOT_TAXON_ID).unwrap().parent_id, None);
        assert_eq!(store.get(1).unwrap().parent_id, Some(ROOT_TAXON_ID));
        assert_eq!(store.get(3).unwrap().parent_id, Some(2));
    }

    #[tokio::test]
    async fn test_second_load_is_noop() {
        let mut store = loaded().await;
        store
            .load_records(vec![TaxonRecord::new(99, "", "Other", "kingdom")], None)
            .await
            .unwrap();
        assert!(store.get(99).is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_discards_everything() {
        let mut records = records();
        records.push(TaxonRecord::new(3, "2", "Aves again", "class"));

        let mut store = ReferenceTaxonomy::new();
        let err = store.load_records(records, None).await.unwrap_err();
        assert!(matches!(
            err,
            NatureIdError::Taxonomy(TaxonomyError::DuplicateTaxon(3))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_rank_registry() {
        let mut records = records();
        records.push(TaxonRecord::new(500, "3", "Neornithes", "megaclass"));
        records.push(TaxonRecord::new(3, "2", "Aves again", "class"));

        let mut store = ReferenceTaxonomy::new();
        assert!(store.load_records(records, None).await.is_err());
        assert!(store.is_empty());
        assert!(!store.ranks().contains("megaclass"));
        assert_eq!(store.ranks().len(), RankRegistry::default().len());
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let records: Vec<_> = records().into_iter().filter(|r| r.id != ROOT_TAXON_ID).collect();
        let mut store = ReferenceTaxonomy::new();
        let err = store.load_records(records, None).await.unwrap_err();
        assert!(matches!(
            err,
            NatureIdError::Taxonomy(TaxonomyError::MissingRoot(ROOT_TAXON_ID))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_bad_parent_id_is_parse_error() {
        let mut records = records();
        records.push(TaxonRecord::new(5, "taxa/abc", "Broken", "species"));
        let mut store = ReferenceTaxonomy::new();
        let err = store.load_records(records, None).await.unwrap_err();
        assert!(matches!(
            err,
            NatureIdError::Taxonomy(TaxonomyError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_lineage_runs_from_kingdom_down() {
        let store = loaded().await;
        let names: Vec<&str> = store.lineage(203154).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Animalia", "Chordata", "Aves", "Passeriformes", "Paridae", "Parus", "Parus major"]
        );
    }

    #[tokio::test]
    async fn test_lineage_of_kingdom_and_root() {
        let store = loaded().await;
        let kingdom: Vec<TaxonId> = store.lineage(1).iter().map(|t| t.id).collect();
        assert_eq!(kingdom, vec![1]);
        assert!(store.lineage(ROOT_TAXON_ID).is_empty());
        assert!(store.lineage(424242).is_empty());
    }

    #[tokio::test]
    async fn test_lineage_stops_at_missing_parent() {
        let mut records = records();
        records.push(TaxonRecord::new(900, "899", "Orphan", "species"));
        let mut store = ReferenceTaxonomy::new();
        store.load_records(records, None).await.unwrap();

        let lineage: Vec<TaxonId> = store.lineage(900).iter().map(|t| t.id).collect();
        assert_eq!(lineage, vec![900]);
    }

    #[tokio::test]
    async fn test_unknown_rank_without_client_is_sentinel() {
        let mut records = records();
        records.push(TaxonRecord::new(500, "3", "Neornithes", "megaclass"));
        let mut store = ReferenceTaxonomy::new();
        store.load_records(records, None).await.unwrap();

        assert_eq!(store.get(500).unwrap().rank_level, RankLevel::UNKNOWN);
        assert_eq!(store.ranks().rank_level("megaclass").unwrap(), RankLevel::UNKNOWN);
    }

    #[tokio::test]
    async fn test_unknown_rank_is_looked_up_remotely() {
        let transport = ScriptedTransport::default();
        transport.respond(
            "https://api.inaturalist.org/v1/taxa/500",
            200,
            r#"{"results": [{"id": 500, "rank_level": 51, "rank": "megaclass"}]}"#,
        );
        let mut client = RemoteTaxonClient::new(
            Box::new(transport.clone()),
            ApiCache::in_memory(DEFAULT_TTL),
            &ApiConfig::default(),
        );

        let mut records = records();
        records.push(TaxonRecord::new(500, "3", "Neornithes", "megaclass"));
        records.push(TaxonRecord::new(501, "500", "Neognathae", "megaclass"));
        let mut store = ReferenceTaxonomy::new();
        store.load_records(records, Some(&mut client)).await.unwrap();

        assert_eq!(store.get(501).unwrap().rank_level, RankLevel::new(51.0));
        assert_eq!(store.ranks().rank_name(RankLevel::new(51.0)), "megaclass");
        // Registered once, so only the first record triggers a lookup
        assert_eq!(transport.request_count(), 1);
    }
}
