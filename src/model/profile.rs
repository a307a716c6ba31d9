use serde::{Deserialize, Serialize};

/// Named, user-editable weighting configuration applied during arbitration.
///
/// The five weights SHOULD sum to 1.0 but profiles stored by a UI frequently
/// don't; `normalized_weights` repairs the sum before use so re-ranking is
/// always a well-formed convex combination. Immutable during a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasProfile {
    pub profile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction_primary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jurisdiction_secondary: Vec<String>,
    #[serde(default)]
    pub prefer_parent: bool,
    pub parent_weight: f64,
    pub jurisdiction_weight: f64,
    pub entity_status_weight: f64,
    pub legal_form_weight: f64,
    pub recency_weight: f64,
}

/// The five profile weights after normalization, in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedWeights {
    pub parent: f64,
    pub jurisdiction: f64,
    pub entity_status: f64,
    pub legal_form: f64,
    pub recency: f64,
}

impl NormalizedWeights {
    pub fn sum(&self) -> f64 {
        self.parent + self.jurisdiction + self.entity_status + self.legal_form + self.recency
    }
}

impl BiasProfile {
    /// Normalize the five weights to sum to exactly 1.0.
    ///
    /// A non-positive raw sum (all zeros, or malformed negatives) falls back
    /// to equal weights rather than rejecting the profile.
    pub fn normalized_weights(&self) -> NormalizedWeights {
        let raw_sum = self.parent_weight
            + self.jurisdiction_weight
            + self.entity_status_weight
            + self.legal_form_weight
            + self.recency_weight;

        if raw_sum <= 0.0 {
            return NormalizedWeights {
                parent: 0.2,
                jurisdiction: 0.2,
                entity_status: 0.2,
                legal_form: 0.2,
                recency: 0.2,
            };
        }

        NormalizedWeights {
            parent: self.parent_weight / raw_sum,
            jurisdiction: self.jurisdiction_weight / raw_sum,
            entity_status: self.entity_status_weight / raw_sum,
            legal_form: self.legal_form_weight / raw_sum,
            recency: self.recency_weight / raw_sum,
        }
    }
}

impl Default for BiasProfile {
    fn default() -> Self {
        Self {
            profile_name: "default".to_string(),
            jurisdiction_primary: None,
            jurisdiction_secondary: Vec::new(),
            prefer_parent: false,
            parent_weight: 0.2,
            jurisdiction_weight: 0.2,
            entity_status_weight: 0.2,
            legal_form_weight: 0.2,
            recency_weight: 0.2,
        }
    }
}
