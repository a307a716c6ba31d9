//! GLEIF lei-records API response models
//!
//! Deserialization only, restricted to the fields the scorer and the
//! candidate conversion actually read. The API speaks JSON:API with
//! camelCase attribute names.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::claim::{Claim, ClaimMetadata, ClaimType};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeiRecordsResponse {
    #[serde(default)]
    pub data: Vec<LeiRecord>,
    #[serde(default)]
    pub meta: Option<LeiMeta>,
}

impl LeiRecordsResponse {
    /// Total matches reported by the registry, falling back to page size
    pub fn total_matches(&self) -> usize {
        self.meta
            .as_ref()
            .and_then(|m| m.pagination.as_ref())
            .and_then(|p| p.total)
            .map(|t| t as usize)
            .unwrap_or(self.data.len())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeiMeta {
    #[serde(default)]
    pub pagination: Option<LeiPagination>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeiPagination {
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeiRecord {
    pub id: String,
    pub attributes: LeiAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeiAttributes {
    #[serde(default)]
    pub lei: Option<String>,
    pub entity: LeiEntity,
    #[serde(default)]
    pub registration: Option<LeiRegistration>,
    /// BIC codes associated with the entity, when present
    #[serde(default)]
    pub bic: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeiEntity {
    pub legal_name: LeiName,
    #[serde(default)]
    pub other_names: Vec<LeiName>,
    #[serde(default)]
    pub status: Option<String>,
    /// ISO 3166 country code, possibly with a region suffix ("US-DE")
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub legal_form: Option<LeiLegalForm>,
    #[serde(default)]
    pub legal_address: Option<LeiAddress>,
    #[serde(default)]
    pub headquarters_address: Option<LeiAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeiName {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeiLegalForm {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeiAddress {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeiRegistration {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_update_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub corroboration_level: Option<String>,
    #[serde(default)]
    pub validated_at: Option<LeiValidationAuthority>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeiValidationAuthority {
    #[serde(default)]
    pub id: Option<String>,
}

impl LeiRecord {
    /// Convert a registry record into an unscored registry candidate claim
    pub fn into_claim(self, claim_number: u32) -> Claim {
        let attrs = self.attributes;
        let entity = attrs.entity;
        let registration = attrs.registration;

        let metadata = ClaimMetadata {
            legal_name: Some(entity.legal_name.name.clone()),
            jurisdiction: entity.jurisdiction,
            legal_form: entity.legal_form.and_then(|f| f.id),
            entity_status: entity.status,
            registration_status: registration.as_ref().and_then(|r| r.status.clone()),
            headquarters_city: entity
                .headquarters_address
                .as_ref()
                .and_then(|a| a.city.clone()),
            headquarters_country: entity
                .headquarters_address
                .as_ref()
                .and_then(|a| a.country.clone()),
            legal_address_city: entity.legal_address.as_ref().and_then(|a| a.city.clone()),
            legal_address_country: entity
                .legal_address
                .as_ref()
                .and_then(|a| a.country.clone()),
            last_update_date: registration.as_ref().and_then(|r| r.last_update_date),
            other_names: entity.other_names.into_iter().map(|n| n.name).collect(),
            identifier_codes: attrs.bic,
            validation_source: registration.as_ref().and_then(|r| {
                r.validated_at
                    .as_ref()
                    .and_then(|v| v.id.clone())
                    .or_else(|| r.corroboration_level.clone())
            }),
            ..ClaimMetadata::default()
        };

        Claim {
            claim_number,
            claim_type: ClaimType::RegistryCandidate,
            entity_name: entity.legal_name.name,
            registry_id: Some(attrs.lei.unwrap_or(self.id)),
            confidence: 0.0,
            source: ClaimType::RegistryCandidate.default_source().to_string(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record_json() -> serde_json::Value {
        serde_json::json!({
            "id": "HWUPKR0MPOU8FGXBT394",
            "attributes": {
                "lei": "HWUPKR0MPOU8FGXBT394",
                "entity": {
                    "legalName": { "name": "Apple Inc." },
                    "otherNames": [ { "name": "Apple" } ],
                    "status": "ACTIVE",
                    "jurisdiction": "US-CA",
                    "legalForm": { "id": "XTIQ" },
                    "legalAddress": { "city": "Cupertino", "country": "US" },
                    "headquartersAddress": { "city": "Cupertino", "country": "US" }
                },
                "registration": {
                    "status": "ISSUED",
                    "lastUpdateDate": "2024-05-13T21:31:00Z",
                    "corroborationLevel": "FULLY_CORROBORATED",
                    "validatedAt": { "id": "RA000598" }
                }
            }
        })
    }

    #[test]
    fn test_deserialize_lei_record() {
        let record: LeiRecord = serde_json::from_value(sample_record_json()).unwrap();
        assert_eq!(record.attributes.entity.legal_name.name, "Apple Inc.");
        assert_eq!(
            record.attributes.entity.jurisdiction.as_deref(),
            Some("US-CA")
        );
    }

    #[test]
    fn test_record_into_claim() {
        let record: LeiRecord = serde_json::from_value(sample_record_json()).unwrap();
        let claim = record.into_claim(1);

        assert_eq!(claim.claim_number, 1);
        assert_eq!(claim.claim_type, ClaimType::RegistryCandidate);
        assert_eq!(claim.entity_name, "Apple Inc.");
        assert_eq!(claim.registry_id.as_deref(), Some("HWUPKR0MPOU8FGXBT394"));
        assert_eq!(claim.source, "registry_search");
        assert_eq!(claim.metadata.entity_status.as_deref(), Some("ACTIVE"));
        assert_eq!(claim.metadata.registration_status.as_deref(), Some("ISSUED"));
        assert_eq!(claim.metadata.headquarters_country.as_deref(), Some("US"));
        assert_eq!(claim.metadata.validation_source.as_deref(), Some("RA000598"));
        assert_eq!(claim.metadata.other_names, vec!["Apple".to_string()]);
    }

    #[test]
    fn test_total_matches_prefers_pagination() {
        let response: LeiRecordsResponse = serde_json::from_value(serde_json::json!({
            "data": [],
            "meta": { "pagination": { "total": 42 } }
        }))
        .unwrap();
        assert_eq!(response.total_matches(), 42);

        let bare: LeiRecordsResponse = serde_json::from_value(serde_json::json!({
            "data": [sample_record_json()]
        }))
        .unwrap();
        assert_eq!(bare.total_matches(), 1);
    }
}
