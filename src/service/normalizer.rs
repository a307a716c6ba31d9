//! Claim normalization boundary
//!
//! Inbound claim records arrive with unknown field casing, confidence on
//! either a 0–1 or 0–100 scale, and the entity name sometimes buried in
//! metadata. Everything is converted to the canonical `Claim` type exactly
//! once, here; downstream components never touch raw maps.

use serde_json::Value;
use std::fmt;

use crate::model::{Claim, ClaimMetadata, ClaimType};

/// A record that could not be normalized. Non-fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationError {
    /// Index of the offending record in the input sequence
    pub index: usize,
    /// Field that could not be resolved
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "claim {} field {}: {}", self.index, self.field, self.message)
    }
}

/// Counts of per-field fallbacks used, for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationStats {
    pub total_records: usize,
    pub normalized: usize,
    /// Records whose entity name came from metadata.legal_name
    pub metadata_name_fallbacks: usize,
    /// Records whose confidence arrived on a 0–100 scale
    pub confidence_rescaled: usize,
    /// Records with no confidence at all (defaulted to 0)
    pub confidence_missing: usize,
    /// Records numbered positionally because no claim number was present
    pub positional_claim_numbers: usize,
    /// Records whose claim type contradicted the reserved position 0
    pub claim_type_corrections: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizationOutcome {
    pub claims: Vec<Claim>,
    pub stats: NormalizationStats,
    pub warnings: Vec<String>,
    pub errors: Vec<NormalizationError>,
}

/// Normalize a batch of untyped claim records into canonical claims.
///
/// Best-effort: a record that cannot be normalized is reported in `errors`
/// and skipped, without aborting the rest of the batch.
pub fn normalize(raw_records: &[Value]) -> NormalizationOutcome {
    let mut outcome = NormalizationOutcome {
        stats: NormalizationStats {
            total_records: raw_records.len(),
            ..NormalizationStats::default()
        },
        ..NormalizationOutcome::default()
    };

    for (index, record) in raw_records.iter().enumerate() {
        match normalize_record(index, record, &mut outcome) {
            Some(claim) => {
                outcome.stats.normalized += 1;
                outcome.claims.push(claim);
            }
            None => {
                tracing::debug!(index = index, "Record skipped during normalization");
            }
        }
    }

    tracing::debug!(
        total = outcome.stats.total_records,
        normalized = outcome.stats.normalized,
        errors = outcome.errors.len(),
        warnings = outcome.warnings.len(),
        "Claim normalization complete"
    );

    outcome
}

fn normalize_record(
    index: usize,
    record: &Value,
    outcome: &mut NormalizationOutcome,
) -> Option<Claim> {
    // Resolution order: direct field, then metadata legal name, then error.
    // A nameless claim must never reach arbitration.
    let entity_name = match resolve_entity_name(record) {
        Some((name, used_fallback)) => {
            if used_fallback {
                outcome.stats.metadata_name_fallbacks += 1;
            }
            name
        }
        None => {
            outcome.errors.push(NormalizationError {
                index,
                field: "entity_name",
                message: "no entity name found in record or metadata".to_string(),
            });
            return None;
        }
    };

    let claim_number = match field(record, &["claim_number", "claimNumber"]).and_then(Value::as_u64)
    {
        Some(n) => n as u32,
        None => {
            outcome.stats.positional_claim_numbers += 1;
            index as u32
        }
    };

    let confidence = match field(record, &["confidence"]).and_then(Value::as_f64) {
        Some(raw) if raw > 1.0 => {
            outcome.stats.confidence_rescaled += 1;
            outcome.warnings.push(format!(
                "claim {}: confidence {} rescaled from percentage",
                index, raw
            ));
            (raw / 100.0).clamp(0.0, 1.0)
        }
        Some(raw) => raw.clamp(0.0, 1.0),
        None => {
            outcome.stats.confidence_missing += 1;
            0.0
        }
    };

    let declared_type = field(record, &["claim_type", "claimType"])
        .and_then(Value::as_str)
        .and_then(parse_claim_type);

    // Position 0 is contractually reserved for the website claim,
    // regardless of an inconsistent claim_type field.
    let claim_type = if claim_number == 0 {
        if let Some(declared) = declared_type {
            if declared != ClaimType::WebsiteClaim {
                outcome.stats.claim_type_corrections += 1;
                outcome.warnings.push(format!(
                    "claim {}: claim 0 declared as {:?}, forced to website_claim",
                    index, declared
                ));
            }
        }
        ClaimType::WebsiteClaim
    } else {
        declared_type.unwrap_or_else(|| infer_claim_type(record))
    };

    let registry_id = field(record, &["registry_id", "registryId"])
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let metadata = match record.get("metadata") {
        Some(raw_metadata) => match serde_json::from_value::<ClaimMetadata>(raw_metadata.clone()) {
            Ok(metadata) => metadata,
            Err(e) => {
                outcome
                    .warnings
                    .push(format!("claim {}: unparseable metadata: {}", index, e));
                ClaimMetadata::default()
            }
        },
        None => ClaimMetadata::default(),
    };

    let source = field(record, &["source"])
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| claim_type.default_source().to_string());

    Some(Claim {
        claim_number,
        claim_type,
        entity_name,
        registry_id,
        confidence,
        source,
        metadata,
    })
}

/// Resolve the entity name; returns the name and whether the metadata
/// fallback was used
fn resolve_entity_name(record: &Value) -> Option<(String, bool)> {
    if let Some(name) = field(record, &["entity_name", "entityName"])
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Some((name.to_string(), false));
    }

    record
        .get("metadata")
        .and_then(|m| field(m, &["legal_name", "legalName"]))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| (name.to_string(), true))
}

/// First present field among the given key spellings
fn field<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| record.get(k)).filter(|v| !v.is_null())
}

fn parse_claim_type(raw: &str) -> Option<ClaimType> {
    match raw {
        "website_claim" => Some(ClaimType::WebsiteClaim),
        "registry_candidate" => Some(ClaimType::RegistryCandidate),
        "web_search_candidate" => Some(ClaimType::WebSearchCandidate),
        _ => None,
    }
}

/// Infer the claim type from the provenance tag when no type was declared
fn infer_claim_type(record: &Value) -> ClaimType {
    match field(record, &["source"]).and_then(Value::as_str) {
        Some(source) if source.contains("web_search") => ClaimType::WebSearchCandidate,
        _ => ClaimType::RegistryCandidate,
    }
}
