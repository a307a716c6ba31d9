//! Web-search fallback
//!
//! Last-resort candidate generation when the registry has nothing usable.
//! One request to an LLM-backed search API with a fixed extraction prompt,
//! constrained to a strict JSON response shape. Strictly additive: any
//! failure on this path yields an empty result and never blocks arbitration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::model::{Claim, ClaimMetadata, ClaimType, FallbackConfig};

/// Registry confidence below which the fallback is still worth consulting
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Citations kept from the search API response
const MAX_CITATIONS: usize = 3;

const FALLBACK_SYSTEM_PROMPT: &str = r#"You are a corporate registry analyst. Identify the legal entity that operates a given website domain.

Rules:
- Report the registered legal name, not a brand or trade name.
- Only report facts you can support with evidence from your search results.
- If the operating entity cannot be determined, set legal_name to an empty string.

Respond with a single JSON object and nothing else:
{
  "legal_name": "registered legal name",
  "legal_form": "legal form, e.g. LLC, GmbH, or empty",
  "jurisdiction": "ISO 3166 country code or empty",
  "headquarters": "city, country or empty",
  "confidence": 0.0,
  "evidence": ["short supporting statements"]
}"#;

fn build_fallback_prompt(domain: &str, base_entity_name: Option<&str>) -> String {
    match base_entity_name {
        Some(name) => format!(
            "Which legal entity operates the domain {}? The website itself claims to be operated by \"{}\"; verify or correct that claim.",
            domain, name
        ),
        None => format!("Which legal entity operates the domain {}?", domain),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("No extractable JSON in model output")]
    NoJson,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

// Response models - only the fields we need
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Strict extraction shape the model is instructed to return
#[derive(Debug, Deserialize)]
struct ExtractedEntity {
    legal_name: String,
    #[serde(default)]
    legal_form: Option<String>,
    #[serde(default)]
    jurisdiction: Option<String>,
    #[serde(default)]
    headquarters: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    evidence: Vec<String>,
}

/// Whether the registry outcome is weak enough to consult the fallback:
/// zero candidates, or a best confidence below the low-confidence threshold
pub fn should_use_fallback(candidates: &[crate::model::Candidate]) -> bool {
    let best = candidates
        .iter()
        .map(|c| c.claim.confidence)
        .fold(f64::NEG_INFINITY, f64::max);
    candidates.is_empty() || best < LOW_CONFIDENCE_THRESHOLD
}

/// Seam for the fallback search, mockable in tests
#[async_trait]
pub trait EntitySearch: Send + Sync {
    /// Produce at most one synthetic claim for the entity behind `domain`.
    async fn search_for_entity(&self, domain: &str, base_entity_name: Option<&str>) -> Vec<Claim>;
}

/// Client for the LLM-backed web-search API
pub struct WebSearchClient {
    client: Client,
    config: FallbackConfig,
}

impl WebSearchClient {
    pub fn new(config: FallbackConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }
}

#[async_trait]
impl EntitySearch for WebSearchClient {
    /// Missing API key disables the path; network or parse failures are
    /// logged and yield an empty sequence.
    async fn search_for_entity(&self, domain: &str, base_entity_name: Option<&str>) -> Vec<Claim> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) => key,
            None => {
                tracing::info!("Web-search fallback disabled: no API key configured");
                return Vec::new();
            }
        };

        match self.request_entity(api_key, domain, base_entity_name).await {
            Ok(Some(claim)) => {
                tracing::info!(
                    domain = %domain,
                    entity = %claim.entity_name,
                    "Web-search fallback produced a candidate"
                );
                vec![claim]
            }
            Ok(None) => {
                tracing::info!(domain = %domain, "Web-search fallback found no entity");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "Web-search fallback failed");
                Vec::new()
            }
        }
    }
}

impl WebSearchClient {
    async fn request_entity(
        &self,
        api_key: &str,
        domain: &str,
        base_entity_name: Option<&str>,
    ) -> Result<Option<Claim>, FallbackError> {
        let prompt = build_fallback_prompt(domain, base_entity_name);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: FALLBACK_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(domain = %domain, url = %url, model = %self.config.model, "Issuing web-search request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FallbackError::ParseError(format!(
                "Unexpected status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| FallbackError::ParseError(format!("Failed to deserialize response: {}", e)))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        let extracted = parse_extracted_entity(content)?;
        Ok(build_claim(extracted, &chat.citations))
    }
}

/// Pull the JSON object out of the model output, tolerating surrounding
/// prose or code fences
fn parse_extracted_entity(content: &str) -> Result<ExtractedEntity, FallbackError> {
    let start = content.find('{').ok_or(FallbackError::NoJson)?;
    let end = content.rfind('}').ok_or(FallbackError::NoJson)?;
    if end < start {
        return Err(FallbackError::NoJson);
    }

    serde_json::from_str(&content[start..=end])
        .map_err(|e| FallbackError::ParseError(format!("Malformed extraction JSON: {}", e)))
}

fn build_claim(extracted: ExtractedEntity, citations: &[String]) -> Option<Claim> {
    let entity_name = extracted.legal_name.trim().to_string();
    if entity_name.is_empty() {
        return None;
    }

    let confidence = match extracted.confidence {
        Some(raw) if raw > 1.0 => (raw / 100.0).clamp(0.0, 1.0),
        Some(raw) => raw.clamp(0.0, 1.0),
        None => 0.5,
    };

    let kept_citations: Vec<String> = citations.iter().take(MAX_CITATIONS).cloned().collect();
    let mut search_evidence = extracted.evidence;
    search_evidence.extend(kept_citations.iter().cloned());

    let (headquarters_city, headquarters_country) = match extracted.headquarters {
        Some(hq) => {
            let mut parts = hq.splitn(2, ',').map(|p| p.trim().to_string());
            let city = parts.next().filter(|s| !s.is_empty());
            let country = parts.next().filter(|s| !s.is_empty());
            (city, country)
        }
        None => (None, None),
    };

    Some(Claim {
        claim_number: 1,
        claim_type: ClaimType::WebSearchCandidate,
        entity_name,
        // Web search never yields an authoritative identifier
        registry_id: None,
        confidence,
        source: ClaimType::WebSearchCandidate.default_source().to_string(),
        metadata: ClaimMetadata {
            jurisdiction: extracted.jurisdiction.filter(|s| !s.is_empty()),
            legal_form: extracted.legal_form.filter(|s| !s.is_empty()),
            headquarters_city,
            headquarters_country,
            search_evidence,
            citations: kept_citations,
            ..ClaimMetadata::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Candidate, ClaimType, LookupTables};
    use crate::service::scorer::score_candidate;

    fn candidate_with_confidence(confidence: f64) -> Candidate {
        let claim = Claim {
            claim_number: 1,
            claim_type: ClaimType::RegistryCandidate,
            entity_name: "Some Entity".to_string(),
            registry_id: Some("LEI1".to_string()),
            confidence,
            source: "registry_search".to_string(),
            metadata: ClaimMetadata::default(),
        };
        let mut candidate = score_candidate(claim, "zzz", None, &LookupTables::default());
        // Pin the confidence after scoring for threshold tests
        candidate.claim.confidence = confidence;
        candidate
    }

    #[test]
    fn test_fallback_triggers_on_empty() {
        assert!(should_use_fallback(&[]));
    }

    #[test]
    fn test_fallback_triggers_below_threshold() {
        assert!(should_use_fallback(&[candidate_with_confidence(0.25)]));
    }

    #[test]
    fn test_fallback_not_triggered_on_confident_candidate() {
        assert!(!should_use_fallback(&[
            candidate_with_confidence(0.25),
            candidate_with_confidence(0.8),
        ]));
    }

    #[test]
    fn test_parse_extraction_with_surrounding_prose() {
        let content = r#"Here is the result:
```json
{"legal_name": "Unknown Startup LLC", "jurisdiction": "US", "confidence": 0.7, "evidence": ["Registered in Delaware"]}
```"#;
        let extracted = parse_extracted_entity(content).unwrap();
        assert_eq!(extracted.legal_name, "Unknown Startup LLC");
        assert_eq!(extracted.jurisdiction.as_deref(), Some("US"));
    }

    #[test]
    fn test_parse_missing_json_is_error() {
        assert!(matches!(
            parse_extracted_entity("no json here"),
            Err(FallbackError::NoJson)
        ));
    }

    #[test]
    fn test_build_claim_shape() {
        let extracted = ExtractedEntity {
            legal_name: "Unknown Startup LLC".to_string(),
            legal_form: Some("LLC".to_string()),
            jurisdiction: Some("US".to_string()),
            headquarters: Some("Austin, US".to_string()),
            confidence: Some(70.0),
            evidence: vec!["Registered in Delaware".to_string()],
        };
        let citations = vec![
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
            "https://example.com/c".to_string(),
            "https://example.com/d".to_string(),
        ];

        let claim = build_claim(extracted, &citations).unwrap();

        assert_eq!(claim.claim_number, 1);
        assert_eq!(claim.claim_type, ClaimType::WebSearchCandidate);
        assert!(claim.registry_id.is_none());
        assert_eq!(claim.source, "web_search_fallback");
        assert!((claim.confidence - 0.7).abs() < 1e-9);
        // First 3 citations kept, appended to the model's evidence
        assert_eq!(claim.metadata.citations.len(), 3);
        assert_eq!(claim.metadata.search_evidence.len(), 4);
        assert_eq!(claim.metadata.headquarters_city.as_deref(), Some("Austin"));
        assert_eq!(claim.metadata.headquarters_country.as_deref(), Some("US"));
    }

    #[test]
    fn test_empty_legal_name_yields_nothing() {
        let extracted = ExtractedEntity {
            legal_name: "  ".to_string(),
            legal_form: None,
            jurisdiction: None,
            headquarters: None,
            confidence: None,
            evidence: vec![],
        };
        assert!(build_claim(extracted, &[]).is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_disables_path() {
        let client = WebSearchClient::new(FallbackConfig::default());
        let claims = client.search_for_entity("unknown.com", None).await;
        assert!(claims.is_empty());
    }
}
