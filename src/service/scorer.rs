//! Candidate scoring
//!
//! Pure, deterministic functions of (candidate, query context). Sub-scores
//! are on a 0–100 scale; the composite uses the default, profile-independent
//! weighting. Bias re-weighting happens later in the arbitration engine and
//! never mutates the scores computed here.

use crate::model::{Candidate, Claim, ClaimMetadata, LookupTables};

const NAME_WEIGHT: f64 = 0.40;
const PROMINENCE_WEIGHT: f64 = 0.25;
const JURISDICTION_WEIGHT: f64 = 0.20;
const COMPLETENESS_WEIGHT: f64 = 0.15;

/// Sub-scores above this threshold contribute to the selection reason
const REASON_THRESHOLD: u32 = 75;

/// Score a registry or fallback claim against the suspected name and domain.
///
/// The claim's confidence is set from the composite so downstream fallback
/// triggering and ranking see a unit-interval value.
pub fn score_candidate(
    mut claim: Claim,
    suspected_name: &str,
    domain: Option<&str>,
    tables: &LookupTables,
) -> Candidate {
    let name_match_score = name_match_score(&claim.entity_name, suspected_name);
    let prominence_score = prominence_score(&claim.entity_name, &tables.prominent_fragments);

    let tld_country = domain.and_then(|d| tables.tld_jurisdiction(d));
    let jurisdiction_score = jurisdiction_score(&claim.metadata, tld_country.as_deref());

    let completeness_score = completeness_score(&claim.metadata);

    let weighted_total_score = (NAME_WEIGHT * name_match_score as f64
        + PROMINENCE_WEIGHT * prominence_score as f64
        + JURISDICTION_WEIGHT * jurisdiction_score as f64
        + COMPLETENESS_WEIGHT * completeness_score as f64)
        .round() as u32;

    let selection_reason = selection_reason(
        name_match_score,
        prominence_score,
        jurisdiction_score,
        completeness_score,
    );

    claim.confidence = weighted_total_score as f64 / 100.0;

    tracing::debug!(
        entity = %claim.entity_name,
        name = name_match_score,
        prominence = prominence_score,
        jurisdiction = jurisdiction_score,
        completeness = completeness_score,
        composite = weighted_total_score,
        "Scored candidate"
    );

    Candidate {
        claim,
        name_match_score,
        prominence_score,
        jurisdiction_score,
        completeness_score,
        weighted_total_score,
        selection_reason,
    }
}

/// Name match: exact > containment > normalized edit distance.
///
/// The graceful degradation avoids over-penalizing minor formatting
/// differences (an "Inc." suffix) while still separating unrelated names.
pub fn name_match_score(candidate_name: &str, suspected_name: &str) -> u32 {
    let candidate = candidate_name.trim().to_lowercase();
    let suspected = suspected_name.trim().to_lowercase();

    if candidate.is_empty() || suspected.is_empty() {
        return 0;
    }
    if candidate == suspected {
        return 100;
    }
    if candidate.contains(&suspected) || suspected.contains(&candidate) {
        return 80;
    }

    let distance = strsim::levenshtein(&candidate, &suspected);
    let longer = candidate.chars().count().max(suspected.chars().count());
    if longer == 0 {
        return 0;
    }
    let similarity = 1.0 - distance as f64 / longer as f64;
    (similarity * 100.0).round().max(0.0) as u32
}

/// Coarse tie-breaker: 100 when the legal name contains a well-known
/// company fragment, else 0
pub fn prominence_score(candidate_name: &str, fragments: &[String]) -> u32 {
    let name = candidate_name.to_lowercase();
    if fragments.iter().any(|f| name.contains(&f.to_lowercase())) {
        100
    } else {
        0
    }
}

/// Alignment between the candidate's registered locations and the
/// jurisdiction implied by the domain's TLD
pub fn jurisdiction_score(metadata: &ClaimMetadata, tld_country: Option<&str>) -> u32 {
    let tld_country = match tld_country {
        Some(c) => c,
        // Unknown TLD: neutral, not penalized
        None => return 50,
    };

    if country_matches(metadata.jurisdiction.as_deref(), tld_country) {
        100
    } else if country_matches(metadata.headquarters_country.as_deref(), tld_country) {
        90
    } else if country_matches(metadata.legal_address_country.as_deref(), tld_country) {
        80
    } else {
        20
    }
}

/// Compare a possibly region-qualified jurisdiction ("US-DE") against a
/// bare country code
fn country_matches(jurisdiction: Option<&str>, country: &str) -> bool {
    match jurisdiction {
        Some(j) => j
            .split('-')
            .next()
            .map(|c| c.eq_ignore_ascii_case(country))
            .unwrap_or(false),
        None => false,
    }
}

/// Additive point system rewarding well-populated registry records,
/// a weak proxy for data reliability. Capped at 100.
pub fn completeness_score(metadata: &ClaimMetadata) -> u32 {
    let mut score = 0u32;

    if metadata
        .entity_status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("ACTIVE"))
        .unwrap_or(false)
    {
        score += 20;
    }
    if metadata.legal_form.is_some() {
        score += 15;
    }
    let has_city = metadata.headquarters_city.is_some() || metadata.legal_address_city.is_some();
    let has_country =
        metadata.headquarters_country.is_some() || metadata.legal_address_country.is_some();
    if has_city && has_country {
        score += 20;
    }
    if metadata
        .registration_status
        .as_deref()
        .map(|s| s.eq_ignore_ascii_case("ISSUED"))
        .unwrap_or(false)
    {
        score += 15;
    }
    if !metadata.other_names.is_empty() {
        score += 10;
    }
    if !metadata.identifier_codes.is_empty() {
        score += 10;
    }
    if metadata.validation_source.is_some() {
        score += 10;
    }

    score.min(100)
}

fn selection_reason(name: u32, prominence: u32, jurisdiction: u32, completeness: u32) -> String {
    let mut reasons = Vec::new();
    if name > REASON_THRESHOLD {
        reasons.push("Strong name match");
    }
    if prominence > REASON_THRESHOLD {
        reasons.push("Fortune-500-class company");
    }
    if jurisdiction > REASON_THRESHOLD {
        reasons.push("Jurisdiction alignment");
    }
    if completeness > REASON_THRESHOLD {
        reasons.push("Complete entity profile");
    }

    if reasons.is_empty() {
        "Basic entity match".to_string()
    } else {
        reasons.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClaimType, LookupTables};

    fn claim_with_metadata(name: &str, metadata: ClaimMetadata) -> Claim {
        Claim {
            claim_number: 1,
            claim_type: ClaimType::RegistryCandidate,
            entity_name: name.to_string(),
            registry_id: Some("LEI123".to_string()),
            confidence: 0.0,
            source: "registry_search".to_string(),
            metadata,
        }
    }

    #[test]
    fn test_name_match_exact_case_insensitive() {
        assert_eq!(name_match_score("Apple Inc.", "apple inc."), 100);
    }

    #[test]
    fn test_name_match_containment() {
        assert_eq!(name_match_score("Apple Inc.", "Apple"), 80);
        assert_eq!(name_match_score("Apple", "Apple Inc."), 80);
    }

    #[test]
    fn test_name_match_edit_distance() {
        // "appel" vs "apple": distance 2 over length 5 -> 60
        assert_eq!(name_match_score("appel", "apple"), 60);
        // Unrelated names score low
        assert!(name_match_score("Globex Corporation", "Initech") < 40);
    }

    #[test]
    fn test_prominence() {
        let tables = LookupTables::default();
        assert_eq!(prominence_score("Netflix, Inc.", &tables.prominent_fragments), 100);
        assert_eq!(
            prominence_score("Unknown Startup LLC", &tables.prominent_fragments),
            0
        );
    }

    #[test]
    fn test_jurisdiction_score_ladder() {
        let metadata = ClaimMetadata {
            jurisdiction: Some("US-DE".to_string()),
            headquarters_country: Some("US".to_string()),
            legal_address_country: Some("US".to_string()),
            ..ClaimMetadata::default()
        };
        assert_eq!(jurisdiction_score(&metadata, Some("US")), 100);

        let hq_only = ClaimMetadata {
            headquarters_country: Some("DE".to_string()),
            ..ClaimMetadata::default()
        };
        assert_eq!(jurisdiction_score(&hq_only, Some("DE")), 90);

        let legal_only = ClaimMetadata {
            legal_address_country: Some("FR".to_string()),
            ..ClaimMetadata::default()
        };
        assert_eq!(jurisdiction_score(&legal_only, Some("FR")), 80);

        // Unknown TLD is neutral
        assert_eq!(jurisdiction_score(&hq_only, None), 50);

        // Known TLD but no alignment is a mismatch
        assert_eq!(jurisdiction_score(&hq_only, Some("JP")), 20);
    }

    #[test]
    fn test_completeness_cap() {
        let full = ClaimMetadata {
            entity_status: Some("ACTIVE".to_string()),
            legal_form: Some("XTIQ".to_string()),
            headquarters_city: Some("Cupertino".to_string()),
            headquarters_country: Some("US".to_string()),
            registration_status: Some("ISSUED".to_string()),
            other_names: vec!["Apple".to_string()],
            identifier_codes: vec!["BIC1".to_string()],
            validation_source: Some("RA000598".to_string()),
            ..ClaimMetadata::default()
        };
        assert_eq!(completeness_score(&full), 100);
        assert_eq!(completeness_score(&ClaimMetadata::default()), 0);
    }

    #[test]
    fn test_composite_and_reason() {
        let tables = LookupTables::default();
        let metadata = ClaimMetadata {
            jurisdiction: Some("US".to_string()),
            entity_status: Some("ACTIVE".to_string()),
            legal_form: Some("XTIQ".to_string()),
            headquarters_city: Some("Cupertino".to_string()),
            headquarters_country: Some("US".to_string()),
            registration_status: Some("ISSUED".to_string()),
            other_names: vec!["Apple".to_string()],
            identifier_codes: vec!["BIC1".to_string()],
            validation_source: Some("RA000598".to_string()),
            ..ClaimMetadata::default()
        };
        let claim = claim_with_metadata("Apple Inc.", metadata);
        let candidate = score_candidate(claim, "Apple Inc.", Some("apple.us"), &tables);

        assert_eq!(candidate.name_match_score, 100);
        assert_eq!(candidate.prominence_score, 100);
        assert_eq!(candidate.jurisdiction_score, 100);
        assert_eq!(candidate.completeness_score, 100);
        assert_eq!(candidate.weighted_total_score, 100);
        assert!((candidate.claim.confidence - 1.0).abs() < 1e-9);
        assert!(candidate.selection_reason.contains("Strong name match"));
        assert!(candidate.selection_reason.contains("Jurisdiction alignment"));
        assert!(candidate.selection_reason.contains("Complete entity profile"));
    }

    #[test]
    fn test_basic_match_reason() {
        let tables = LookupTables::default();
        let claim = claim_with_metadata("Initech LLC", ClaimMetadata::default());
        let candidate = score_candidate(claim, "Globex", Some("globex.com"), &tables);
        assert_eq!(candidate.selection_reason, "Basic entity match");
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let tables = LookupTables::default();
        let claim = claim_with_metadata("Netflix, Inc.", ClaimMetadata::default());
        let a = score_candidate(claim.clone(), "Netflix", Some("netflix.com"), &tables);
        let b = score_candidate(claim, "Netflix", Some("netflix.com"), &tables);
        assert_eq!(a.weighted_total_score, b.weighted_total_score);
        assert_eq!(a.selection_reason, b.selection_reason);
    }
}
