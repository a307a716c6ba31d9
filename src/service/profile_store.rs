//! Bias profile storage seam
//!
//! Profiles are loaded once at the start of an arbitration run and never
//! mutated mid-run. Durable backends live behind the trait; the in-memory
//! store covers tests and single-process use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::BiasProfile;

#[async_trait]
pub trait BiasProfileStore: Send + Sync {
    /// Load a profile by name; None when no such profile exists
    async fn load(&self, name: &str) -> Option<BiasProfile>;

    /// All stored profiles
    async fn list(&self) -> Vec<BiasProfile>;

    /// Create or replace a profile under its name
    async fn save(&self, profile: BiasProfile);
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, BiasProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BiasProfileStore for InMemoryProfileStore {
    async fn load(&self, name: &str) -> Option<BiasProfile> {
        self.profiles.read().await.get(name).cloned()
    }

    async fn list(&self) -> Vec<BiasProfile> {
        self.profiles.read().await.values().cloned().collect()
    }

    async fn save(&self, profile: BiasProfile) {
        tracing::debug!(profile = %profile.profile_name, "Saving bias profile");
        self.profiles
            .write()
            .await
            .insert(profile.profile_name.clone(), profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = InMemoryProfileStore::new();
        store
            .save(BiasProfile {
                profile_name: "eu-focus".to_string(),
                jurisdiction_primary: Some("DE".to_string()),
                ..BiasProfile::default()
            })
            .await;

        let loaded = store.load("eu-focus").await.unwrap();
        assert_eq!(loaded.jurisdiction_primary.as_deref(), Some("DE"));
        assert!(store.load("missing").await.is_none());
        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_save_replaces_existing() {
        let store = InMemoryProfileStore::new();
        store.save(BiasProfile::default()).await;
        store
            .save(BiasProfile {
                prefer_parent: true,
                ..BiasProfile::default()
            })
            .await;

        assert_eq!(store.list().await.len(), 1);
        assert!(store.load("default").await.unwrap().prefer_parent);
    }
}
