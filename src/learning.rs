//! # Learning Store (C6)
//!
//! Records successful discovery patterns by domain and feeds suggestions
//! back to C5's discovery ladder, so a second bind against a previously-seen
//! host skips straight to the path that worked last time.

use crate::discovery::{DiscoveryResult, DiscoveryStatus};
use crate::store::PatternStore;
use std::sync::Arc;
use url::Url;

/// (domain, successful-paths, auth-method, api-format, last-updated, success-count).
#[derive(Debug, Clone)]
pub struct DiscoveryPattern {
    pub domain: String,
    pub successful_paths: Vec<String>,
    pub auth_method: Option<String>,
    pub api_format: Option<String>,
    pub last_updated: std::time::SystemTime,
    pub success_count: u32,
}

impl DiscoveryPattern {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            successful_paths: Vec::new(),
            auth_method: None,
            api_format: None,
            last_updated: std::time::SystemTime::now(),
            success_count: 0,
        }
    }
}

/// Facade over an injected [`PatternStore`] implementing `learn`/`suggest`.
pub struct LearningStore {
    store: Arc<dyn PatternStore>,
}

impl LearningStore {
    #[must_use]
    pub fn new(store: Arc<dyn PatternStore>) -> Self {
        Self { store }
    }

    /// Record a successful discovery. A no-op unless `result.status ==
    /// Success` (spec §4.6).
    pub async fn learn(&self, base_url: &str, result: &DiscoveryResult) {
        if result.status != DiscoveryStatus::Success {
            return;
        }
        let Some(domain) = host_of(base_url) else {
            return;
        };
        let Some(spec_url) = result.spec_url.as_deref() else {
            return;
        };
        let relative = relative_path(base_url, spec_url);

        let mut pattern = self
            .store
            .get_pattern_by_domain(&domain)
            .await
            .unwrap_or_else(|| DiscoveryPattern::new(domain.clone()));

        if !pattern.successful_paths.iter().any(|p| p == &relative) {
            pattern.successful_paths.push(relative);
        }
        if let Some(auth) = result.metadata.get("auth_method") {
            pattern.auth_method = Some(auth.clone());
        }
        if let Some(fmt) = result.metadata.get("api_format") {
            pattern.api_format = Some(fmt.clone());
        }
        pattern.success_count += 1;
        pattern.last_updated = std::time::SystemTime::now();

        self.store.save_pattern(pattern).await;
    }

    /// Suggested candidate paths for `base_url`: an exact-domain match first,
    /// else the union of paths from domains sharing a registrable suffix
    /// (after stripping `www.`/`api.`), deduplicated, original order
    /// preserved per source.
    pub async fn suggest(&self, base_url: &str) -> Vec<String> {
        let Some(domain) = host_of(base_url) else {
            return Vec::new();
        };
        if let Some(pattern) = self.store.get_pattern_by_domain(&domain).await {
            if !pattern.successful_paths.is_empty() {
                return pattern.successful_paths;
            }
        }

        let registrable = strip_common_prefixes(&domain);
        let all = self.store.load_patterns().await;
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        let mut domains: Vec<&String> = all.keys().collect();
        domains.sort();
        for d in domains {
            if strip_common_prefixes(d) == registrable {
                if let Some(pattern) = all.get(d) {
                    for p in &pattern.successful_paths {
                        if seen.insert(p.clone()) {
                            out.push(p.clone());
                        }
                    }
                }
            }
        }
        out
    }

    /// The stored auth method for the exact domain, if any.
    pub async fn learned_auth(&self, base_url: &str) -> Option<String> {
        let domain = host_of(base_url)?;
        self.store
            .get_pattern_by_domain(&domain)
            .await
            .and_then(|p| p.auth_method)
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

fn strip_common_prefixes(domain: &str) -> String {
    domain
        .strip_prefix("www.")
        .or_else(|| domain.strip_prefix("api."))
        .unwrap_or(domain)
        .to_string()
}

fn relative_path(base_url: &str, spec_url: &str) -> String {
    match (Url::parse(base_url), Url::parse(spec_url)) {
        (Ok(_), Ok(s)) => {
            let mut path = s.path().to_string();
            if let Some(q) = s.query() {
                path.push('?');
                path.push_str(q);
            }
            path
        }
        _ => spec_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPatternStore;
    use std::collections::HashMap;

    fn success(spec_url: &str) -> DiscoveryResult {
        DiscoveryResult {
            status: DiscoveryStatus::Success,
            spec_url: Some(spec_url.to_string()),
            parsed: None,
            discovered_urls: vec![],
            metadata: HashMap::new(),
            suggested_actions: vec![],
        }
    }

    #[tokio::test]
    fn learn_is_noop_unless_success() {
        let learning = LearningStore::new(Arc::new(InMemoryPatternStore::new()));
        let mut failed = success("http://api.x.com/v2/openapi.yaml");
        failed.status = DiscoveryStatus::Failed;
        learning.learn("http://api.x.com", &failed).await;
        assert!(learning.suggest("http://api.x.com").await.is_empty());
    }

    #[tokio::test]
    fn suggest_returns_path_beginning_with_learned_entry() {
        let learning = LearningStore::new(Arc::new(InMemoryPatternStore::new()));
        learning
            .learn("http://api.x.com", &success("http://api.x.com/v2/openapi.yaml"))
            .await;
        let suggestions = learning.suggest("http://api.x.com").await;
        assert_eq!(suggestions.first().map(String::as_str), Some("/v2/openapi.yaml"));
    }

    #[tokio::test]
    fn suggest_falls_back_to_similar_domain() {
        let learning = LearningStore::new(Arc::new(InMemoryPatternStore::new()));
        learning
            .learn("http://api.example.com", &success("http://api.example.com/v1/spec.json"))
            .await;
        let suggestions = learning.suggest("http://www.example.com").await;
        assert_eq!(suggestions, vec!["/v1/spec.json".to_string()]);
    }
}
