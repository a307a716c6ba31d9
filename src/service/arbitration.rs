//! Arbitration engine
//!
//! Merges the website claim with registry and fallback candidates,
//! deduplicates them, re-weights the field under the active bias profile,
//! and emits a ranked, explainable result. Pure over its inputs; scored
//! candidates are never mutated, the bias-adjusted score lives alongside
//! the base composite.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::model::{
    AcquisitionGrade, ArbitrationConfig, ArbitrationResult, ArbitrationStatus, BiasProfile,
    Candidate, Claim, ClaimMetadata, LookupTables, NormalizedWeights, RankedEntity,
};

#[derive(Debug, thiserror::Error)]
pub enum ArbitrationError {
    #[error("No claims survived merge and deduplication")]
    NoSurvivingClaims,
}

pub struct ArbitrationEngine {
    config: ArbitrationConfig,
    tables: LookupTables,
}

impl ArbitrationEngine {
    pub fn new(config: ArbitrationConfig, tables: LookupTables) -> Self {
        Self { config, tables }
    }

    /// Run one arbitration over the website claim and all candidates.
    ///
    /// Always returns a result; invariant violations surface as
    /// `status: failed` with a descriptive error rather than a panic.
    pub fn arbitrate(
        &self,
        website_claim: Claim,
        registry_candidates: Vec<Candidate>,
        fallback_claims: Vec<Claim>,
        profile: &BiasProfile,
    ) -> ArbitrationResult {
        let started = Instant::now();

        // Merge: claim #0 first, always
        let mut merged: Vec<Candidate> = Vec::with_capacity(1 + registry_candidates.len() + 1);
        merged.push(Candidate::unscored(website_claim));
        merged.extend(registry_candidates);
        merged.extend(fallback_claims.into_iter().map(Candidate::unscored));

        let before_dedup = merged.len();
        let survivors = self.deduplicate(merged);
        tracing::debug!(
            before = before_dedup,
            after = survivors.len(),
            "Deduplicated claims"
        );

        if survivors.is_empty() {
            let error = ArbitrationError::NoSurvivingClaims;
            tracing::error!(error = %error, "Arbitration invariant violation");
            return ArbitrationResult {
                status: ArbitrationStatus::Failed,
                ranked_entities: Vec::new(),
                reasoning: String::new(),
                citations: Vec::new(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                error: Some(error.to_string()),
            };
        }

        let weights = profile.normalized_weights();
        let now = Utc::now();

        // Rank by bias-adjusted score; deterministic tie-breaks
        let mut scored: Vec<(Candidate, f64)> = survivors
            .into_iter()
            .map(|c| {
                let adjusted = self.bias_adjusted_score(&c, profile, &weights, now);
                (c, adjusted)
            })
            .collect();

        scored.sort_by(|(a, a_score), (b, b_score)| {
            b_score
                .total_cmp(a_score)
                .then_with(|| b.weighted_total_score.cmp(&a.weighted_total_score))
                .then_with(|| {
                    b.claim
                        .registry_id
                        .is_some()
                        .cmp(&a.claim.registry_id.is_some())
                })
                .then_with(|| a.claim.claim_number.cmp(&b.claim.claim_number))
        });

        // Each entity is graded on its own composite; grading never
        // affects ranking
        let ranked_entities: Vec<RankedEntity> = scored
            .into_iter()
            .enumerate()
            .map(|(i, (candidate, bias_adjusted_score))| RankedEntity {
                rank: i as u32 + 1,
                bias_adjusted_score,
                acquisition_grade: AcquisitionGrade::from_score(candidate.weighted_total_score),
                candidate,
            })
            .collect();

        let reasoning = self.explain(&ranked_entities, profile);
        let citations = collect_citations(&ranked_entities);

        tracing::info!(
            winner = %ranked_entities[0].candidate.claim.entity_name,
            grade = %ranked_entities[0].acquisition_grade,
            entities = ranked_entities.len(),
            "Arbitration complete"
        );

        ArbitrationResult {
            status: ArbitrationStatus::Completed,
            ranked_entities,
            reasoning,
            citations,
            processing_time_ms: started.elapsed().as_millis() as u64,
            error: None,
        }
    }

    /// Deduplicate candidates representing the same entity.
    ///
    /// Two claims are the same entity when their suffix-stripped legal
    /// names are equal after case folding, or when both carry the same
    /// registry identifier. The survivor is the higher-scoring duplicate;
    /// only evidence and citations from the loser are merged in.
    fn deduplicate(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut survivors: Vec<Candidate> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let duplicate_of = survivors
                .iter()
                .position(|existing| self.same_entity(existing, &candidate));

            match duplicate_of {
                Some(idx) => {
                    let existing = &mut survivors[idx];
                    if candidate.weighted_total_score > existing.weighted_total_score {
                        let loser = std::mem::replace(existing, candidate);
                        merge_evidence(&mut existing.claim.metadata, &loser.claim.metadata);
                        tracing::debug!(
                            survivor = %existing.claim.entity_name,
                            absorbed = %loser.claim.entity_name,
                            "Duplicate replaced by higher-scoring claim"
                        );
                    } else {
                        merge_evidence(&mut existing.claim.metadata, &candidate.claim.metadata);
                        tracing::debug!(
                            survivor = %existing.claim.entity_name,
                            absorbed = %candidate.claim.entity_name,
                            "Duplicate absorbed into existing claim"
                        );
                    }
                }
                None => survivors.push(candidate),
            }
        }

        survivors
    }

    fn same_entity(&self, a: &Candidate, b: &Candidate) -> bool {
        if let (Some(id_a), Some(id_b)) = (&a.claim.registry_id, &b.claim.registry_id) {
            if id_a == id_b {
                return true;
            }
        }

        let name_a = normalize_legal_name(&a.claim.entity_name, &self.tables.legal_suffixes);
        let name_b = normalize_legal_name(&b.claim.entity_name, &self.tables.legal_suffixes);
        !name_a.is_empty() && name_a == name_b
    }

    /// Blend the base composite with the profile-weighted criteria.
    ///
    /// The base keeps half the weight so match quality still dominates;
    /// the bias half is a convex combination of the five criteria under
    /// the normalized profile weights.
    fn bias_adjusted_score(
        &self,
        candidate: &Candidate,
        profile: &BiasProfile,
        weights: &NormalizedWeights,
        now: DateTime<Utc>,
    ) -> f64 {
        let metadata = &candidate.claim.metadata;

        let parent = self.parent_criterion(candidate, profile);
        let jurisdiction = jurisdiction_criterion(metadata, profile);
        let status = status_criterion(metadata);
        let legal_form = if metadata.legal_form.is_some() { 100.0 } else { 0.0 };
        let recency = self.recency_criterion(metadata, now);

        let bias_component = weights.parent * parent
            + weights.jurisdiction * jurisdiction
            + weights.entity_status * status
            + weights.legal_form * legal_form
            + weights.recency * recency;

        0.5 * candidate.weighted_total_score as f64 + 0.5 * bias_component
    }

    /// Parent/subsidiary preference. Ultimate parents are detected
    /// heuristically via absence of subsidiary-indicating tokens in the
    /// legal form or name; neutral when the profile has no preference.
    fn parent_criterion(&self, candidate: &Candidate, profile: &BiasProfile) -> f64 {
        if !profile.prefer_parent {
            return 50.0;
        }
        if self.looks_like_parent(candidate) {
            100.0
        } else {
            20.0
        }
    }

    fn looks_like_parent(&self, candidate: &Candidate) -> bool {
        let name = candidate.claim.entity_name.to_lowercase();
        let form = candidate
            .claim
            .metadata
            .legal_form
            .as_deref()
            .unwrap_or("")
            .to_lowercase();

        !self
            .config
            .subsidiary_form_tokens
            .iter()
            .any(|token| {
                let token = token.to_lowercase();
                name.contains(&token) || form.contains(&token)
            })
    }

    /// Registration recency, decayed linearly over the configured horizon
    fn recency_criterion(&self, metadata: &ClaimMetadata, now: DateTime<Utc>) -> f64 {
        let last_update = match metadata.last_update_date {
            Some(ts) => ts,
            None => return 0.0,
        };

        let age_days = (now - last_update).num_days().max(0);
        let horizon = self.config.recency_horizon_days.max(1);
        let fraction = 1.0 - age_days as f64 / horizon as f64;
        (fraction * 100.0).clamp(0.0, 100.0)
    }

    /// Synthesize the reasoning text for why rank 1 won over the runner-up
    fn explain(&self, ranked: &[RankedEntity], profile: &BiasProfile) -> String {
        let winner = &ranked[0];
        let winner_name = &winner.candidate.claim.entity_name;

        match ranked.get(1) {
            Some(runner_up) => {
                let gap = winner.bias_adjusted_score - runner_up.bias_adjusted_score;
                format!(
                    "Selected \"{}\" (bias-adjusted score {:.1}, base {}) over \"{}\" ({:.1}) by {:.1} points under profile \"{}\". {}.",
                    winner_name,
                    winner.bias_adjusted_score,
                    winner.candidate.weighted_total_score,
                    runner_up.candidate.claim.entity_name,
                    runner_up.bias_adjusted_score,
                    gap,
                    profile.profile_name,
                    winner.candidate.selection_reason,
                )
            }
            None => format!(
                "Selected \"{}\" (bias-adjusted score {:.1}, base {}) as the only surviving claim under profile \"{}\". {}.",
                winner_name,
                winner.bias_adjusted_score,
                winner.candidate.weighted_total_score,
                profile.profile_name,
                winner.candidate.selection_reason,
            ),
        }
    }
}

fn jurisdiction_criterion(metadata: &ClaimMetadata, profile: &BiasProfile) -> f64 {
    let primary = match profile.jurisdiction_primary.as_deref() {
        Some(p) if !p.is_empty() => p,
        // No preference configured: neutral
        _ => return 50.0,
    };

    let country = metadata
        .jurisdiction
        .as_deref()
        .or(metadata.headquarters_country.as_deref())
        .and_then(|j| j.split('-').next());

    match country {
        Some(c) if c.eq_ignore_ascii_case(primary) => 100.0,
        Some(c)
            if profile
                .jurisdiction_secondary
                .iter()
                .any(|s| s.eq_ignore_ascii_case(c)) =>
        {
            75.0
        }
        Some(_) => 30.0,
        None => 0.0,
    }
}

fn status_criterion(metadata: &ClaimMetadata) -> f64 {
    match metadata.entity_status.as_deref() {
        Some(s) if s.eq_ignore_ascii_case("ACTIVE") => 100.0,
        _ => 0.0,
    }
}

/// Case-fold, drop punctuation, strip trailing legal-suffix tokens
fn normalize_legal_name(name: &str, suffixes: &[String]) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        if suffixes.iter().any(|s| s == last) {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ")
}

/// Evidence-only merge policy: the survivor keeps all its own fields,
/// gaining only the duplicate's evidence and citations
fn merge_evidence(survivor: &mut ClaimMetadata, absorbed: &ClaimMetadata) {
    for item in &absorbed.search_evidence {
        if !survivor.search_evidence.contains(item) {
            survivor.search_evidence.push(item.clone());
        }
    }
    for citation in &absorbed.citations {
        if !survivor.citations.contains(citation) {
            survivor.citations.push(citation.clone());
        }
    }
}

/// All claims' citation URLs, deduplicated, order preserved by rank
fn collect_citations(ranked: &[RankedEntity]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    for entity in ranked {
        for citation in &entity.candidate.claim.metadata.citations {
            if seen.insert(citation.clone()) {
                citations.push(citation.clone());
            }
        }
    }
    citations
}
