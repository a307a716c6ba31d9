pub mod claim;
pub mod config;
pub mod gleif;
pub mod profile;

pub use claim::{
    AcquisitionGrade, ArbitrationResult, ArbitrationStatus, Candidate, Claim, ClaimMetadata,
    ClaimType, RankedEntity,
};
pub use config::{ArbitrationConfig, Config, FallbackConfig, LookupTables, RegistryConfig};
pub use profile::{BiasProfile, NormalizedWeights};
