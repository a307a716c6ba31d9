//! Registry search client
//!
//! Queries the GLEIF lei-records endpoint over an escalating strategy
//! ladder: exact legal-name match, then wildcard fuzzy match, then fuzzy
//! match filtered by the jurisdiction inferred from the domain's TLD. The
//! ladder short-circuits on the first non-empty result; escalation across
//! strategies is the whole retry policy, with no retries within one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::model::gleif::LeiRecordsResponse;
use crate::model::{Candidate, LookupTables, RegistryConfig};
use crate::service::scorer::score_candidate;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Exact,
    Fuzzy,
    Geographic,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStrategy::Exact => write!(f, "exact"),
            SearchStrategy::Fuzzy => write!(f, "fuzzy"),
            SearchStrategy::Geographic => write!(f, "geographic"),
        }
    }
}

/// One outbound registry query, fully determined by strategy + inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryQuery {
    pub strategy: SearchStrategy,
    pub name: String,
    /// Jurisdiction filter, only set for the geographic strategy
    pub country: Option<String>,
}

/// Transport seam for the registry, mockable in tests
#[async_trait]
pub trait LeiRecordSource: Send + Sync {
    async fn fetch(&self, query: &RegistryQuery) -> Result<LeiRecordsResponse, RegistryError>;
}

/// HTTP source backed by the GLEIF JSON:API
pub struct GleifApiSource {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl GleifApiSource {
    pub fn new(config: &RegistryConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size,
        }
    }
}

#[async_trait]
impl LeiRecordSource for GleifApiSource {
    async fn fetch(&self, query: &RegistryQuery) -> Result<LeiRecordsResponse, RegistryError> {
        let url = format!("{}/lei-records", self.base_url);
        let page_size = self.page_size.to_string();

        let name_filter = match query.strategy {
            SearchStrategy::Exact => query.name.clone(),
            SearchStrategy::Fuzzy | SearchStrategy::Geographic => format!("*{}*", query.name),
        };

        let mut params = vec![
            ("filter[entity.legalName]", name_filter),
            ("page[size]", page_size),
        ];
        if let Some(ref country) = query.country {
            params.push(("filter[entity.legalAddress.country]", country.clone()));
        }

        tracing::debug!(strategy = %query.strategy, url = %url, "Querying GLEIF registry");

        let response = self.client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::ParseError(format!(
                "Unexpected status {}: {}",
                status, body
            )));
        }

        response
            .json::<LeiRecordsResponse>()
            .await
            .map_err(|e| RegistryError::ParseError(format!("Failed to deserialize response: {}", e)))
    }
}

/// Outcome of one registry search run
#[derive(Debug, Clone)]
pub struct RegistrySearchOutcome {
    pub candidates: Vec<Candidate>,
    /// Strategy that produced the candidates; None if every rung came back
    /// empty or failed
    pub search_method: Option<SearchStrategy>,
    pub total_matches: usize,
}

/// Registry search client with the escalating strategy ladder
pub struct RegistrySearchClient {
    source: Arc<dyn LeiRecordSource>,
    tables: LookupTables,
}

impl RegistrySearchClient {
    pub fn new(config: &RegistryConfig, tables: LookupTables) -> Self {
        Self {
            source: Arc::new(GleifApiSource::new(config)),
            tables,
        }
    }

    /// Construct with an explicit record source; used by tests
    pub fn with_source(source: Arc<dyn LeiRecordSource>, tables: LookupTables) -> Self {
        Self { source, tables }
    }

    /// Search the registry, escalating exact → fuzzy → geographic and
    /// short-circuiting on the first non-empty result.
    ///
    /// Upstream failure in one strategy degrades to the next rung rather
    /// than aborting the search.
    pub async fn search(
        &self,
        suspected_name: &str,
        domain: Option<&str>,
    ) -> RegistrySearchOutcome {
        for query in self.ladder(suspected_name, domain) {
            match self.source.fetch(&query).await {
                Ok(response) if !response.data.is_empty() => {
                    let total_matches = response.total_matches();
                    let candidates: Vec<Candidate> = response
                        .data
                        .into_iter()
                        .enumerate()
                        .map(|(i, record)| {
                            let claim = record.into_claim(i as u32 + 1);
                            score_candidate(claim, suspected_name, domain, &self.tables)
                        })
                        .collect();

                    tracing::info!(
                        strategy = %query.strategy,
                        candidates = candidates.len(),
                        total_matches = total_matches,
                        "Registry search succeeded"
                    );

                    return RegistrySearchOutcome {
                        candidates,
                        search_method: Some(query.strategy),
                        total_matches,
                    };
                }
                Ok(_) => {
                    tracing::debug!(strategy = %query.strategy, "No registry matches, escalating");
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = %query.strategy,
                        error = %e,
                        "Registry request failed, escalating"
                    );
                }
            }
        }

        tracing::info!(name = %suspected_name, "Registry search exhausted all strategies");
        RegistrySearchOutcome {
            candidates: Vec::new(),
            search_method: None,
            total_matches: 0,
        }
    }

    /// The strategy ladder for one search. Geographic is only present when
    /// the domain's TLD maps to a known jurisdiction.
    fn ladder(&self, suspected_name: &str, domain: Option<&str>) -> Vec<RegistryQuery> {
        let mut queries = vec![
            RegistryQuery {
                strategy: SearchStrategy::Exact,
                name: suspected_name.to_string(),
                country: None,
            },
            RegistryQuery {
                strategy: SearchStrategy::Fuzzy,
                name: suspected_name.to_string(),
                country: None,
            },
        ];

        if let Some(country) = domain.and_then(|d| self.tables.tld_jurisdiction(d)) {
            queries.push(RegistryQuery {
                strategy: SearchStrategy::Geographic,
                name: suspected_name.to_string(),
                country: Some(country),
            });
        }

        queries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock source recording every query and replaying canned responses
    struct MockSource {
        calls: Mutex<Vec<RegistryQuery>>,
        exact_calls: AtomicUsize,
        fuzzy_calls: AtomicUsize,
        geographic_calls: AtomicUsize,
        respond_on: Option<SearchStrategy>,
        fail_exact: bool,
    }

    impl MockSource {
        fn new(respond_on: Option<SearchStrategy>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                exact_calls: AtomicUsize::new(0),
                fuzzy_calls: AtomicUsize::new(0),
                geographic_calls: AtomicUsize::new(0),
                respond_on,
                fail_exact: false,
            }
        }

        fn record_response() -> LeiRecordsResponse {
            serde_json::from_value(serde_json::json!({
                "data": [{
                    "id": "LEI-TEST-1",
                    "attributes": {
                        "lei": "LEI-TEST-1",
                        "entity": {
                            "legalName": { "name": "Apple Inc." },
                            "status": "ACTIVE",
                            "jurisdiction": "US"
                        }
                    }
                }]
            }))
            .unwrap()
        }
    }

    #[async_trait]
    impl LeiRecordSource for MockSource {
        async fn fetch(&self, query: &RegistryQuery) -> Result<LeiRecordsResponse, RegistryError> {
            self.calls.lock().unwrap().push(query.clone());
            let counter = match query.strategy {
                SearchStrategy::Exact => &self.exact_calls,
                SearchStrategy::Fuzzy => &self.fuzzy_calls,
                SearchStrategy::Geographic => &self.geographic_calls,
            };
            counter.fetch_add(1, Ordering::SeqCst);

            if self.fail_exact && query.strategy == SearchStrategy::Exact {
                return Err(RegistryError::ParseError("boom".to_string()));
            }

            if self.respond_on == Some(query.strategy) {
                Ok(Self::record_response())
            } else {
                Ok(LeiRecordsResponse::default())
            }
        }
    }

    fn client_with(source: Arc<MockSource>) -> RegistrySearchClient {
        RegistrySearchClient::with_source(source, LookupTables::default())
    }

    #[tokio::test]
    async fn test_exact_hit_short_circuits() {
        let source = Arc::new(MockSource::new(Some(SearchStrategy::Exact)));
        let client = client_with(Arc::clone(&source));

        let outcome = client.search("Apple Inc.", Some("apple.us")).await;

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.search_method, Some(SearchStrategy::Exact));
        assert_eq!(source.exact_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.fuzzy_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.geographic_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_escalates_to_fuzzy_then_stops() {
        let source = Arc::new(MockSource::new(Some(SearchStrategy::Fuzzy)));
        let client = client_with(Arc::clone(&source));

        let outcome = client.search("Apple", Some("apple.us")).await;

        assert_eq!(outcome.search_method, Some(SearchStrategy::Fuzzy));
        assert_eq!(source.exact_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.fuzzy_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.geographic_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_geographic_requires_known_tld() {
        // .com has no jurisdiction mapping: only two rungs on the ladder
        let source = Arc::new(MockSource::new(None));
        let client = client_with(Arc::clone(&source));

        let outcome = client.search("Unknown Startup LLC", Some("unknown.com")).await;

        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.search_method, None);
        assert_eq!(source.exact_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.fuzzy_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.geographic_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_geographic_carries_tld_country() {
        let source = Arc::new(MockSource::new(Some(SearchStrategy::Geographic)));
        let client = client_with(Arc::clone(&source));

        let outcome = client.search("Siemens", Some("siemens.de")).await;

        assert_eq!(outcome.search_method, Some(SearchStrategy::Geographic));
        let calls = source.calls.lock().unwrap();
        let geo = calls
            .iter()
            .find(|q| q.strategy == SearchStrategy::Geographic)
            .unwrap();
        assert_eq!(geo.country.as_deref(), Some("DE"));
    }

    #[tokio::test]
    async fn test_strategy_failure_degrades_not_aborts() {
        let mut mock = MockSource::new(Some(SearchStrategy::Fuzzy));
        mock.fail_exact = true;
        let source = Arc::new(mock);
        let client = client_with(Arc::clone(&source));

        let outcome = client.search("Apple", None).await;

        assert_eq!(outcome.search_method, Some(SearchStrategy::Fuzzy));
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_candidates_are_scored_and_numbered() {
        let source = Arc::new(MockSource::new(Some(SearchStrategy::Exact)));
        let client = client_with(source);

        let outcome = client.search("Apple Inc.", Some("apple.us")).await;
        let candidate = &outcome.candidates[0];

        assert_eq!(candidate.claim.claim_number, 1);
        assert_eq!(candidate.name_match_score, 100);
        assert_eq!(candidate.jurisdiction_score, 100);
        assert!(candidate.claim.confidence > 0.0);
    }
}
