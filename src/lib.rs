//! Domain → legal-entity resolution core
//!
//! Given a domain name and a website-derived claim about the legal entity
//! operating it, resolves the true entity by reconciling the claim against
//! the GLEIF registry and, when the registry yields nothing usable, a
//! web-search fallback. Produces a single ranked, explainable answer with a
//! confidence score.

pub mod model;
pub mod service;
