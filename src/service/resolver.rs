//! End-to-end resolution pipeline
//!
//! Composes normalization, registry search, the conditional web-search
//! fallback and arbitration into one run per domain. Runs for different
//! domains share no mutable state and are safe to execute concurrently.

use std::sync::Arc;

use serde_json::Value;

use crate::model::{ArbitrationResult, ArbitrationStatus, BiasProfile, Config};
use crate::service::arbitration::ArbitrationEngine;
use crate::service::fallback::{should_use_fallback, EntitySearch, WebSearchClient};
use crate::service::normalizer;
use crate::service::profile_store::BiasProfileStore;
use crate::service::registry::RegistrySearchClient;

pub struct Resolver {
    registry: RegistrySearchClient,
    fallback: Arc<dyn EntitySearch>,
    engine: ArbitrationEngine,
    profiles: Arc<dyn BiasProfileStore>,
}

impl Resolver {
    pub fn new(config: &Config, profiles: Arc<dyn BiasProfileStore>) -> Self {
        Self::with_sources(
            config,
            RegistrySearchClient::new(&config.registry, config.lookup.clone()),
            Arc::new(WebSearchClient::new(config.fallback.clone())),
            profiles,
        )
    }

    /// Construct with explicit registry and fallback sources; used by tests
    pub fn with_sources(
        config: &Config,
        registry: RegistrySearchClient,
        fallback: Arc<dyn EntitySearch>,
        profiles: Arc<dyn BiasProfileStore>,
    ) -> Self {
        Self {
            registry,
            fallback,
            engine: ArbitrationEngine::new(config.arbitration.clone(), config.lookup.clone()),
            profiles,
        }
    }

    /// Resolve the legal entity behind `domain` from a raw website claim
    /// record, as produced by the extraction subsystem.
    ///
    /// Profile resolution falls back to the default profile when the named
    /// profile does not exist.
    pub async fn resolve(
        &self,
        domain: &str,
        website_claim_record: &Value,
        profile_name: Option<&str>,
    ) -> ArbitrationResult {
        let outcome = normalizer::normalize(std::slice::from_ref(website_claim_record));
        for warning in &outcome.warnings {
            tracing::warn!(domain = %domain, warning = %warning, "Website claim normalization warning");
        }

        let website_claim = match outcome.claims.into_iter().next() {
            Some(claim) => claim,
            None => {
                let detail = outcome
                    .errors
                    .first()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "website claim could not be normalized".to_string());
                tracing::error!(domain = %domain, error = %detail, "Cannot arbitrate without a website claim");
                return ArbitrationResult {
                    status: ArbitrationStatus::Failed,
                    ranked_entities: Vec::new(),
                    reasoning: String::new(),
                    citations: Vec::new(),
                    processing_time_ms: 0,
                    error: Some(detail),
                };
            }
        };

        let profile = match profile_name {
            Some(name) => match self.profiles.load(name).await {
                Some(profile) => profile,
                None => {
                    tracing::warn!(profile = %name, "Bias profile not found, using default");
                    BiasProfile::default()
                }
            },
            None => BiasProfile::default(),
        };

        let search = self
            .registry
            .search(&website_claim.entity_name, Some(domain))
            .await;

        let fallback_claims = if should_use_fallback(&search.candidates) {
            self.fallback
                .search_for_entity(domain, Some(&website_claim.entity_name))
                .await
        } else {
            Vec::new()
        };

        self.engine
            .arbitrate(website_claim, search.candidates, fallback_claims, &profile)
    }
}
