use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provenance of a claim about the entity behind a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    WebsiteClaim,
    RegistryCandidate,
    WebSearchCandidate,
}

impl ClaimType {
    /// Default provenance tag for claims of this type
    pub fn default_source(&self) -> &'static str {
        match self {
            ClaimType::WebsiteClaim => "website_extraction",
            ClaimType::RegistryCandidate => "registry_search",
            ClaimType::WebSearchCandidate => "web_search_fallback",
        }
    }
}

// Describes a single assertion about the legal entity operating a domain
// - claim_number: 0 is reserved for the website-derived claim
// - entity_name: resolved during normalization, never empty afterwards
// - confidence: always on the unit interval regardless of source scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub claim_number: u32,
    pub claim_type: ClaimType,
    pub entity_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_id: Option<String>,
    pub confidence: f64,
    pub source: String,
    #[serde(default)]
    pub metadata: ClaimMetadata,
}

/// Open bag of entity attributes attached to a claim
///
/// Field names accept both snake_case and camelCase on the way in; serialized
/// output is always snake_case. Unknown fields are preserved in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimMetadata {
    #[serde(default, alias = "legalName", skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(default, alias = "legalForm", skip_serializing_if = "Option::is_none")]
    pub legal_form: Option<String>,
    #[serde(default, alias = "entityStatus", skip_serializing_if = "Option::is_none")]
    pub entity_status: Option<String>,
    #[serde(
        default,
        alias = "registrationStatus",
        skip_serializing_if = "Option::is_none"
    )]
    pub registration_status: Option<String>,
    #[serde(
        default,
        alias = "headquartersCity",
        skip_serializing_if = "Option::is_none"
    )]
    pub headquarters_city: Option<String>,
    #[serde(
        default,
        alias = "headquartersCountry",
        skip_serializing_if = "Option::is_none"
    )]
    pub headquarters_country: Option<String>,
    #[serde(
        default,
        alias = "legalAddressCity",
        skip_serializing_if = "Option::is_none"
    )]
    pub legal_address_city: Option<String>,
    #[serde(
        default,
        alias = "legalAddressCountry",
        skip_serializing_if = "Option::is_none"
    )]
    pub legal_address_country: Option<String>,
    #[serde(
        default,
        alias = "lastUpdateDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_update_date: Option<DateTime<Utc>>,
    #[serde(default, alias = "otherNames", skip_serializing_if = "Vec::is_empty")]
    pub other_names: Vec<String>,
    #[serde(
        default,
        alias = "identifierCodes",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub identifier_codes: Vec<String>,
    #[serde(
        default,
        alias = "validationSource",
        skip_serializing_if = "Option::is_none"
    )]
    pub validation_source: Option<String>,
    #[serde(
        default,
        alias = "searchEvidence",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub search_evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A claim specialized with registry sub-scores and the default-weighting
/// composite. Immutable after scoring; the arbitration engine derives a
/// separate bias-adjusted score rather than overwriting the base one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub claim: Claim,
    pub name_match_score: u32,
    pub prominence_score: u32,
    pub jurisdiction_score: u32,
    pub completeness_score: u32,
    pub weighted_total_score: u32,
    pub selection_reason: String,
}

impl Candidate {
    /// Wrap a claim that never went through the registry scorer.
    ///
    /// Sub-scores are zero; the base score falls back to the claim's own
    /// source confidence so the entry remains comparable during ranking.
    pub fn unscored(claim: Claim) -> Self {
        let base = (claim.confidence * 100.0).round() as u32;
        let selection_reason = match claim.claim_type {
            ClaimType::WebsiteClaim => "Website extraction".to_string(),
            ClaimType::WebSearchCandidate => "Web search result".to_string(),
            ClaimType::RegistryCandidate => "Basic entity match".to_string(),
        };
        Self {
            claim,
            name_match_score: 0,
            prominence_score: 0,
            jurisdiction_score: 0,
            completeness_score: 0,
            weighted_total_score: base,
            selection_reason,
        }
    }
}

/// Letter-grade bucketing of the primary selection's base score.
/// Display only, never affects ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionGrade {
    A,
    B,
    C,
    D,
}

impl AcquisitionGrade {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            AcquisitionGrade::A
        } else if score >= 75 {
            AcquisitionGrade::B
        } else if score >= 60 {
            AcquisitionGrade::C
        } else {
            AcquisitionGrade::D
        }
    }
}

impl fmt::Display for AcquisitionGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionGrade::A => write!(f, "A"),
            AcquisitionGrade::B => write!(f, "B"),
            AcquisitionGrade::C => write!(f, "C"),
            AcquisitionGrade::D => write!(f, "D"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One entry of the final ranking. Rank 1 is the primary selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntity {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub rank: u32,
    pub bias_adjusted_score: f64,
    pub acquisition_grade: AcquisitionGrade,
}

/// Output of one arbitration run. Created once, immutable thereafter;
/// re-running arbitration produces a new result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrationResult {
    pub status: ArbitrationStatus,
    pub ranked_entities: Vec<RankedEntity>,
    pub reasoning: String,
    pub citations: Vec<String>,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_buckets() {
        assert_eq!(AcquisitionGrade::from_score(95), AcquisitionGrade::A);
        assert_eq!(AcquisitionGrade::from_score(90), AcquisitionGrade::A);
        assert_eq!(AcquisitionGrade::from_score(89), AcquisitionGrade::B);
        assert_eq!(AcquisitionGrade::from_score(75), AcquisitionGrade::B);
        assert_eq!(AcquisitionGrade::from_score(60), AcquisitionGrade::C);
        assert_eq!(AcquisitionGrade::from_score(59), AcquisitionGrade::D);
        assert_eq!(AcquisitionGrade::from_score(0), AcquisitionGrade::D);
    }

    #[test]
    fn test_metadata_accepts_both_casings() {
        let camel: ClaimMetadata = serde_json::from_value(serde_json::json!({
            "legalName": "Acme Corp",
            "entityStatus": "ACTIVE",
            "headquartersCountry": "US"
        }))
        .unwrap();
        assert_eq!(camel.legal_name.as_deref(), Some("Acme Corp"));
        assert_eq!(camel.entity_status.as_deref(), Some("ACTIVE"));
        assert_eq!(camel.headquarters_country.as_deref(), Some("US"));

        let snake: ClaimMetadata = serde_json::from_value(serde_json::json!({
            "legal_name": "Acme Corp",
            "entity_status": "ACTIVE",
            "headquarters_country": "US"
        }))
        .unwrap();
        assert_eq!(snake.legal_name.as_deref(), Some("Acme Corp"));
        assert_eq!(snake.entity_status.as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn test_unscored_candidate_base_score_from_confidence() {
        let claim = Claim {
            claim_number: 0,
            claim_type: ClaimType::WebsiteClaim,
            entity_name: "Acme Corp".to_string(),
            registry_id: None,
            confidence: 0.73,
            source: "website_extraction".to_string(),
            metadata: ClaimMetadata::default(),
        };
        let candidate = Candidate::unscored(claim);
        assert_eq!(candidate.weighted_total_score, 73);
        assert_eq!(candidate.name_match_score, 0);
    }
}
