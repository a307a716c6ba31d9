pub mod arbitration;
pub mod fallback;
pub mod normalizer;
pub mod profile_store;
pub mod registry;
pub mod resolver;
pub mod scorer;

pub use arbitration::ArbitrationEngine;
pub use fallback::{EntitySearch, WebSearchClient};
pub use profile_store::{BiasProfileStore, InMemoryProfileStore};
pub use registry::RegistrySearchClient;
pub use resolver::Resolver;
