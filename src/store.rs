//! # External Collaborator Traits
//!
//! The three upstream interfaces this crate consumes but does not own the
//! lifecycle of (spec §6): the spec cache backing store, the learning store's
//! persistence, and credential-at-rest decryption. Concrete in-memory
//! defaults are provided so the crate and its tests run without any external
//! service, matching spec §9's "concrete defaults are provided (in-memory map
//! with mutex)" — realized here with `dashmap` rather than `Mutex<HashMap>`,
//! consistent with the rest of the crate's concurrency choices.

use crate::learning::DiscoveryPattern;
use crate::spec::cache::CachedSpec;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Backing store for parsed, cached OpenAPI specs, keyed by spec URL.
/// Implementations must be safe for concurrent callers.
#[async_trait]
pub trait OpenAPICache: Send + Sync {
    async fn get(&self, url: &str) -> Option<CachedSpec>;
    async fn set(&self, url: &str, spec: CachedSpec, ttl: Duration);
}

/// Backing store for learned discovery patterns, keyed by domain.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn save_pattern(&self, pattern: DiscoveryPattern);
    async fn load_patterns(&self) -> HashMap<String, DiscoveryPattern>;
    async fn get_pattern_by_domain(&self, domain: &str) -> Option<DiscoveryPattern>;
}

/// Decrypts credential-at-rest blobs. The core treats the decrypted object as
/// opaque JSON per spec §3; it never interprets tenant-specific envelope
/// formats itself.
#[async_trait]
pub trait EncryptionService: Send + Sync {
    async fn decrypt_json(
        &self,
        blob: &[u8],
        tenant_id: &str,
    ) -> Result<serde_json::Value, String>;
}

/// In-memory [`OpenAPICache`] good enough to run every test and the CLI
/// without a real cache service.
#[derive(Default)]
pub struct InMemorySpecCache {
    entries: DashMap<String, CachedSpec>,
}

impl InMemorySpecCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OpenAPICache for InMemorySpecCache {
    async fn get(&self, url: &str) -> Option<CachedSpec> {
        self.entries.get(url).map(|e| e.clone())
    }

    async fn set(&self, url: &str, spec: CachedSpec, _ttl: Duration) {
        // second writer wins: a plain insert satisfies the idempotence
        // contract without singleflighting concurrent fills (spec §5).
        self.entries.insert(url.to_string(), spec);
    }
}

/// In-memory [`PatternStore`].
#[derive(Default)]
pub struct InMemoryPatternStore {
    patterns: DashMap<String, DiscoveryPattern>,
}

impl InMemoryPatternStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn save_pattern(&self, pattern: DiscoveryPattern) {
        self.patterns.insert(pattern.domain.clone(), pattern);
    }

    async fn load_patterns(&self) -> HashMap<String, DiscoveryPattern> {
        self.patterns
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    async fn get_pattern_by_domain(&self, domain: &str) -> Option<DiscoveryPattern> {
        self.patterns.get(domain).map(|e| e.value().clone())
    }
}

/// An [`EncryptionService`] that treats the blob as already-decrypted UTF-8
/// JSON — the default for local development and tests where no real
/// encryption-at-rest layer is wired in.
#[derive(Default)]
pub struct NoopEncryptionService;

#[async_trait]
impl EncryptionService for NoopEncryptionService {
    async fn decrypt_json(
        &self,
        blob: &[u8],
        _tenant_id: &str,
    ) -> Result<serde_json::Value, String> {
        serde_json::from_slice(blob).map_err(|e| e.to_string())
    }
}

/// Convenience constructor bundle so callers that want every default at once
/// don't have to `Arc::new` each trait object individually.
#[must_use]
pub fn default_collaborators() -> (
    Arc<dyn OpenAPICache>,
    Arc<dyn PatternStore>,
    Arc<dyn EncryptionService>,
) {
    (
        Arc::new(InMemorySpecCache::new()),
        Arc::new(InMemoryPatternStore::new()),
        Arc::new(NoopEncryptionService),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_encryption_round_trips_json() {
        let svc = NoopEncryptionService;
        let blob = br#"{"token":"abc"}"#;
        let v = svc.decrypt_json(blob, "tenant-1").await.unwrap();
        assert_eq!(v["token"], "abc");
    }

    #[tokio::test]
    async fn pattern_store_round_trips_by_domain() {
        let store = InMemoryPatternStore::new();
        let pattern = DiscoveryPattern::new("api.example.com");
        store.save_pattern(pattern.clone()).await;
        let found = store.get_pattern_by_domain("api.example.com").await;
        assert!(found.is_some());
        assert!(store.get_pattern_by_domain("other.com").await.is_none());
    }
}
