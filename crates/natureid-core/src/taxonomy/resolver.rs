//! Resolve label names to reference taxa.
//!
//! Local exact matches win. Names missing locally (usually renamed taxa) are
//! searched remotely across all historical names; when that yields several
//! taxa they are replaced by their lowest common ancestor.

use crate::api::{RemoteTaxon, RemoteTaxonClient};

use super::store::{ReferenceTaxon, ReferenceTaxonomy};

/// Ranks preferred when a name is carried by several taxa.
pub const DEFAULT_DESIRED_RANKS: &[&str] = &["species", "subspecies"];

/// A resolved label: the taxon and its ancestors from the kingdom down.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub taxon: ReferenceTaxon,
    /// Empty for kingdoms and coarser taxa
    pub ancestors: Vec<ReferenceTaxon>,
}

/// Resolves label names against a loaded [`ReferenceTaxonomy`].
pub struct LabelResolver<'a> {
    store: &'a ReferenceTaxonomy,
    client: Option<&'a mut RemoteTaxonClient>,
    desired_ranks: Vec<String>,
}

impl<'a> LabelResolver<'a> {
    pub fn new(store: &'a ReferenceTaxonomy, client: Option<&'a mut RemoteTaxonClient>) -> Self {
        Self {
            store,
            client,
            desired_ranks: DEFAULT_DESIRED_RANKS.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Override the ranks preferred among homonyms.
    pub fn with_desired_ranks(mut self, ranks: &[&str]) -> Self {
        self.desired_ranks = ranks.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn store(&self) -> &ReferenceTaxonomy {
        self.store
    }

    /// Resolve `name`, or `None` when neither the store nor the remote service
    /// knows it. An empty store resolves nothing.
    pub async fn resolve(&mut self, name: &str) -> Option<Resolution> {
        if self.store.is_empty() {
            return None;
        }

        let taxon = match self.resolve_local(name) {
            Some(taxon) => taxon,
            None => self.resolve_remote(name).await?,
        };

        if taxon.name != name {
            tracing::info!(
                "Taxon '{}' changed to '{}', taxon id {}.",
                name,
                taxon.name,
                taxon.id
            );
        }

        Some(self.resolution(taxon))
    }

    fn resolution(&self, taxon: &ReferenceTaxon) -> Resolution {
        let ancestors = match (taxon.rank_level.is_below_kingdom(), taxon.parent_id) {
            (true, Some(parent)) => self.store.lineage(parent).into_iter().cloned().collect(),
            _ => Vec::new(),
        };
        Resolution {
            taxon: taxon.clone(),
            ancestors,
        }
    }

    fn resolve_local(&self, name: &str) -> Option<&'a ReferenceTaxon> {
        let store: &'a ReferenceTaxonomy = self.store;
        let candidates = store.by_name(name);
        match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            all => {
                let chosen = all
                    .iter()
                    .copied()
                    .find(|t| self.desired_ranks.iter().any(|r| r == store.rank_name(t)))
                    .unwrap_or(all[0]);
                let listed = all
                    .iter()
                    .map(|t| format!("{} {}", store.rank_name(t), t.id))
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::warn!(
                    "Multiple taxa named '{}': {}; choosing {} {}.",
                    name,
                    listed,
                    store.rank_name(chosen),
                    chosen.id
                );
                Some(chosen)
            }
        }
    }

    async fn resolve_remote(&mut self, name: &str) -> Option<&'a ReferenceTaxon> {
        let store: &'a ReferenceTaxonomy = self.store;
        let client = self.client.as_deref_mut()?;
        let Some(response) = client.fetch_by_name(name, true).await else {
            tracing::warn!("API lookup for name '{}' failed.", name);
            return None;
        };

        let exact: Vec<&RemoteTaxon> = response
            .results
            .iter()
            .filter(|t| t.had_scientific_name(name))
            .collect();
        let remote: Vec<&RemoteTaxon> = if exact.is_empty() {
            response.results.iter().collect()
        } else {
            exact
        };

        let mut candidates: Vec<&'a ReferenceTaxon> = Vec::new();
        for taxon in remote.iter().filter_map(|t| store.get(t.id)) {
            push_unique(&mut candidates, taxon);
        }
        if candidates.is_empty() {
            tracing::debug!("No local taxa among API results for '{}'", name);
            return None;
        }

        lowest_common_ancestor(store, candidates, name)
    }
}

/// Replace the finest candidates by their parents until one taxon remains.
fn lowest_common_ancestor<'a>(
    store: &'a ReferenceTaxonomy,
    mut candidates: Vec<&'a ReferenceTaxon>,
    name: &str,
) -> Option<&'a ReferenceTaxon> {
    while candidates.len() > 1 {
        let finest = candidates.iter().map(|t| t.rank_level).min()?;
        let mut next = Vec::with_capacity(candidates.len());
        for taxon in candidates {
            let taxon = if taxon.rank_level == finest {
                match store.parent(taxon) {
                    Some(parent) => parent,
                    None => {
                        tracing::warn!(
                            "Cannot find common ancestor for '{}': parent of taxon {} missing.",
                            name,
                            taxon.id
                        );
                        return None;
                    }
                }
            } else {
                taxon
            };
            push_unique(&mut next, taxon);
        }
        candidates = next;
    }
    candidates.pop()
}

fn push_unique<'a>(taxa: &mut Vec<&'a ReferenceTaxon>, taxon: &'a ReferenceTaxon) {
    if !taxa.iter().any(|t| t.id == taxon.id) {
        taxa.push(taxon);
    }
}
