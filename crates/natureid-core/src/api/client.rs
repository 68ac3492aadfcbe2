//! Cached, throttled client for the remote taxa service.
//!
//! Used when a label's scientific name is missing from the reference archive
//! (usually after a taxonomic revision) and when the archive mentions a rank
//! the registry does not know. Lookups never fail with an error: anything other
//! than a usable response is logged and reported as `None`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::error::NatureIdError;
use crate::taxonomy::TaxonId;

use super::cache::{unix_now, ApiCache};
use super::retry::backoff_duration;
use super::throttle::Throttle;
use super::transport::{HttpTransport, TaxaTransport};

/// Body of a `/taxa` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxaResponse {
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub results: Vec<RemoteTaxon>,
}

/// One taxon as reported by the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteTaxon {
    pub id: TaxonId,
    #[serde(default)]
    pub rank_level: Option<f64>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// All known names, scientific ones under locale `sci`
    #[serde(default)]
    pub names: Vec<RemoteName>,
}

impl RemoteTaxon {
    /// Whether this taxon has ever carried `name` as a scientific name.
    pub fn had_scientific_name(&self, name: &str) -> bool {
        self.names
            .iter()
            .any(|n| n.locale == "sci" && n.name == name)
    }
}

/// A localized name variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteName {
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub name: String,
}

/// Query value for `/taxa?...` requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Text(String),
    Flag(bool),
}

impl QueryValue {
    fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Flag(true) => "true".to_string(),
            Self::Flag(false) => "false".to_string(),
        }
    }
}

/// Client for `/taxa/{ids}` and `/taxa?{params}` lookups.
pub struct RemoteTaxonClient {
    base_url: String,
    transport: Box<dyn TaxaTransport>,
    cache: ApiCache,
    throttle: Throttle,
    rate_limit_delay: Duration,
}

impl RemoteTaxonClient {
    /// Create a client from explicit parts.
    pub fn new(transport: Box<dyn TaxaTransport>, cache: ApiCache, config: &ApiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            transport,
            cache,
            throttle: Throttle::new(config.max_calls, Duration::from_secs(config.interval_secs)),
            rate_limit_delay: Duration::from_secs(config.rate_limit_delay_secs),
        }
    }

    /// Create an HTTP client with the persistent cache at `cache_path`.
    pub fn from_config(
        config: &ApiConfig,
        cache_path: &std::path::Path,
    ) -> Result<Self, NatureIdError> {
        let cache = ApiCache::open(cache_path, config.cache_ttl())?;
        let transport = HttpTransport::new(Duration::from_secs(config.request_timeout_secs));
        Ok(Self::new(Box::new(transport), cache, config))
    }

    /// Look up one or more taxa by id.
    pub async fn fetch_by_ids(&mut self, ids: &[TaxonId]) -> Option<TaxaResponse> {
        if ids.is_empty() {
            return None;
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("%2C");
        let url = format!("{}/taxa/{}", self.base_url, joined);
        self.fetch(url.clone(), url, Vec::new()).await
    }

    /// Search taxa with arbitrary query parameters.
    pub async fn fetch_by_query(
        &mut self,
        params: &BTreeMap<String, QueryValue>,
    ) -> Option<TaxaResponse> {
        let url = format!("{}/taxa", self.base_url);
        let query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.render()))
            .collect();
        let signature = match serde_json::to_string(params) {
            Ok(s) => format!("{url}?{s}"),
            Err(e) => {
                tracing::warn!("Cannot serialize query parameters: {e}");
                return None;
            }
        };
        self.fetch(signature, url, query).await
    }

    /// Search taxa by name, optionally matching historical and vernacular names.
    pub async fn fetch_by_name(&mut self, name: &str, all_names: bool) -> Option<TaxaResponse> {
        let mut params = BTreeMap::new();
        params.insert("q".to_string(), QueryValue::Text(name.to_string()));
        params.insert("all_names".to_string(), QueryValue::Flag(all_names));
        self.fetch_by_query(&params).await
    }

    async fn fetch(
        &mut self,
        signature: String,
        url: String,
        query: Vec<(String, String)>,
    ) -> Option<TaxaResponse> {
        let now = unix_now();
        if let Some(payload) = self.cache.get(&signature, now) {
            if let Some(response) = Self::decode(payload, &url) {
                tracing::trace!("API cache hit: {signature}");
                return Some(response);
            }
            tracing::debug!("Refetching {} over an undecodable cache entry", url);
        }

        let mut attempt = 0;
        let response = loop {
            self.throttle.wait().await;
            tracing::debug!("GET {} via {}", url, self.transport.name());
            let response = match self.transport.get(&url, &query).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("{e}");
                    return None;
                }
            };
            if !response.is_rate_limited() {
                break response;
            }
            let delay = backoff_duration(attempt, self.rate_limit_delay);
            tracing::warn!(
                "Too many API calls, retrying {} in {} seconds.",
                url,
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
            attempt = attempt.saturating_add(1);
        };

        if !response.is_success() {
            tracing::warn!(
                "API lookup {} failed with HTTP {}: {}",
                url,
                response.status,
                response.body
            );
            return None;
        }

        let payload: serde_json::Value = match serde_json::from_str(&response.body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("API response for {} is not JSON: {}", url, e);
                return None;
            }
        };
        let parsed = Self::decode(&payload, &url)?;
        self.cache.insert(signature, now, payload);
        Some(parsed)
    }

    fn decode(payload: &serde_json::Value, url: &str) -> Option<TaxaResponse> {
        match TaxaResponse::deserialize(payload) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!("Unexpected API response for {}: {}", url, e);
                None
            }
        }
    }

    /// Write the response cache to disk.
    pub fn flush(&mut self) -> Result<(), NatureIdError> {
        self.cache.flush()
    }

    pub fn cache(&self) -> &ApiCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ApiCache {
        &mut self.cache
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::api::cache::DEFAULT_TTL;
    use tokio::time::Instant;

    const BASE: &str = "https://api.inaturalist.org/v1";

    fn client(transport: &ScriptedTransport) -> RemoteTaxonClient {
        RemoteTaxonClient::new(
            Box::new(transport.clone()),
            ApiCache::in_memory(DEFAULT_TTL),
            &ApiConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_fetch_by_id_parses_results() {
        let transport = ScriptedTransport::default();
        transport.respond(
            &format!("{BASE}/taxa/3"),
            200,
            r#"{"total_results": 1, "results": [{"id": 3, "rank_level": 50, "rank": "class", "name": "Aves"}]}"#,
        );
        let mut client = client(&transport);

        let response = client.fetch_by_ids(&[3]).await.unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, 3);
        assert_eq!(response.results[0].rank_level, Some(50.0));
    }

    #[tokio::test]
    async fn test_fetch_by_ids_joins_with_encoded_comma() {
        let transport = ScriptedTransport::default();
        transport.respond(&format!("{BASE}/taxa/1%2C2%2C3"), 200, r#"{"results": []}"#);
        let mut client = client(&transport);

        assert!(client.fetch_by_ids(&[1, 2, 3]).await.is_some());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let transport = ScriptedTransport::default();
        transport.respond(&format!("{BASE}/taxa/3"), 200, r#"{"results": [{"id": 3}]}"#);
        let mut client = client(&transport);

        client.fetch_by_ids(&[3]).await.unwrap();
        client.fetch_by_ids(&[3]).await.unwrap();
        assert_eq!(transport.request_count(), 1);
        assert_eq!(client.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let transport = ScriptedTransport::default();
        let url = format!("{BASE}/taxa/3");
        transport.respond(&url, 200, r#"{"results": [{"id": 3, "name": "new"}]}"#);
        let mut client = client(&transport);

        // Fetched 15 days ago.
        let stale = unix_now() - 15 * 24 * 3600;
        client
            .cache_mut()
            .insert(url.clone(), stale, serde_json::json!({"results": [{"id": 3, "name": "old"}]}));

        let response = client.fetch_by_ids(&[3]).await.unwrap();
        assert_eq!(response.results[0].name.as_deref(), Some("new"));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_from_cache() {
        let transport = ScriptedTransport::default();
        let url = format!("{BASE}/taxa/3");
        let mut client = client(&transport);

        let recent = unix_now() - 13 * 24 * 3600;
        client
            .cache_mut()
            .insert(url, recent, serde_json::json!({"results": [{"id": 3, "name": "old"}]}));

        let response = client.fetch_by_ids(&[3]).await.unwrap();
        assert_eq!(response.results[0].name.as_deref(), Some("old"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_refetched() {
        let transport = ScriptedTransport::default();
        let url = format!("{BASE}/taxa/3");
        transport.respond(&url, 200, r#"{"results": [{"id": 3, "name": "Aves"}]}"#);
        let mut client = client(&transport);

        client
            .cache_mut()
            .insert(url.clone(), unix_now(), serde_json::json!({"results": "garbled"}));

        let response = client.fetch_by_ids(&[3]).await.unwrap();
        assert_eq!(response.results[0].name.as_deref(), Some("Aves"));
        assert_eq!(transport.request_count(), 1);

        // The refetched response replaced the broken entry
        client.fetch_by_ids(&[3]).await.unwrap();
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_error_status_returns_none_and_is_not_cached() {
        let transport = ScriptedTransport::default();
        transport.respond(&format!("{BASE}/taxa/9"), 404, r#"{"error": "not found"}"#);
        let mut client = client(&transport);

        assert!(client.fetch_by_ids(&[9]).await.is_none());
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_returns_none() {
        let transport = ScriptedTransport::default();
        let mut client = client(&transport);
        assert!(client.fetch_by_ids(&[12345]).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_returns_none() {
        let transport = ScriptedTransport::default();
        transport.respond(&format!("{BASE}/taxa/3"), 200, "<html>");
        let mut client = client(&transport);
        assert!(client.fetch_by_ids(&[3]).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backs_off_exponentially() {
        let transport = ScriptedTransport::default();
        let url = format!("{BASE}/taxa/3");
        transport.respond(&url, 429, "slow down");
        transport.respond(&url, 429, "slow down");
        transport.respond(&url, 200, r#"{"results": [{"id": 3}]}"#);
        let mut client = client(&transport);

        let start = Instant::now();
        let response = client.fetch_by_ids(&[3]).await;
        assert!(response.is_some());
        assert_eq!(transport.request_count(), 3);
        // 60s then 120s.
        assert!(start.elapsed() >= Duration::from_secs(180));
        assert!(start.elapsed() < Duration::from_secs(181));
    }

    #[tokio::test]
    async fn test_fetch_by_name_sends_flags() {
        let transport = ScriptedTransport::default();
        transport.respond(&format!("{BASE}/taxa"), 200, r#"{"results": []}"#);
        let mut client = client(&transport);

        client.fetch_by_name("Parus major", true).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        let (_, query) = &requests[0];
        assert!(query.contains(&("q".to_string(), "Parus major".to_string())));
        assert!(query.contains(&("all_names".to_string(), "true".to_string())));
    }

    #[tokio::test]
    async fn test_queries_are_cached_per_parameter_set() {
        let transport = ScriptedTransport::default();
        transport.respond(&format!("{BASE}/taxa"), 200, r#"{"results": []}"#);
        let mut client = client(&transport);

        client.fetch_by_name("Parus major", true).await;
        client.fetch_by_name("Parus major", true).await;
        client.fetch_by_name("Parus minor", true).await;
        client.fetch_by_name("Parus major", false).await;

        assert_eq!(transport.request_count(), 3);
        assert_eq!(client.cache().len(), 3);
    }

    #[test]
    fn test_had_scientific_name() {
        let taxon: RemoteTaxon = serde_json::from_str(
            r#"{"id": 1, "names": [
                {"locale": "sci", "name": "Parus caeruleus"},
                {"locale": "en", "name": "Blue Tit"}
            ]}"#,
        )
        .unwrap();
        assert!(taxon.had_scientific_name("Parus caeruleus"));
        assert!(!taxon.had_scientific_name("Blue Tit"));
    }
}
