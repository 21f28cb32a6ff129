//! # Discovery Engine (C5)
//!
//! Locates a spec given a base URL by walking a strategy ladder (single-spec
//! mode) or fanning strategies out concurrently to enumerate every API a
//! documentation portal advertises (multi-spec mode).

pub mod hints;
pub mod portal;
pub mod result;
mod strategies;

pub use hints::DiscoveryHints;
pub use result::{ApiDefinition, DiscoveryResult, DiscoveryStatus, MultiDiscoveryResult};

use crate::auth::Credential;
use crate::config::CoreConfig;
use crate::error::{AttemptedUrl, CoreError, CoreResult};
use crate::learning::LearningStore;
use crate::url_validate::{self, UrlPolicy};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};
use url::Url;

/// Accumulates [`AttemptedUrl`] records outside any one strategy's stack
/// frame, so a record survives even when `tokio::time::timeout` drops the
/// future that produced it (S8: a timed-out discovery must still report what
/// it tried).
pub(crate) type SharedAttempts = Arc<Mutex<Vec<AttemptedUrl>>>;

fn snapshot_attempts(shared: &SharedAttempts) -> Vec<AttemptedUrl> {
    shared.lock().unwrap().clone()
}

fn credential_headers(credential: &Credential) -> Vec<(String, String)> {
    crate::auth::apply(credential, &[])
        .map(|app| app.headers)
        .unwrap_or_default()
}

fn merge_headers(base: &[(String, String)], overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = base.to_vec();
    for (k, v) in overrides {
        if let Some(existing) = merged.iter_mut().find(|(ek, _)| ek.eq_ignore_ascii_case(k)) {
            existing.1 = v.clone();
        } else {
            merged.push((k.clone(), v.clone()));
        }
    }
    merged
}

fn auth_method_name(credential: &Credential) -> &'static str {
    match credential {
        Credential::None => "none",
        Credential::Token(_) => "token",
        Credential::ApiKey { .. } => "api-key",
        Credential::Basic { .. } => "basic",
        Credential::Bearer(_) => "bearer",
        Credential::OAuth { .. } => "oauth",
        Credential::Custom(_) => "custom",
    }
}

/// Locate a single spec for `base_url`. Runs the strategy ladder in order;
/// the first strategy to yield a parsed model wins.
pub async fn discover_single(
    base_url: &str,
    credential: &Credential,
    hints: &DiscoveryHints,
    config: &CoreConfig,
    policy: &UrlPolicy,
    learning: &LearningStore,
) -> CoreResult<DiscoveryResult> {
    let parsed_base = url_validate::validate(base_url, policy)?;
    let base_headers = merge_headers(&credential_headers(credential), &hints.auth_headers);
    let learned_paths = learning.suggest(base_url).await;

    let attempted: SharedAttempts = Arc::new(Mutex::new(Vec::new()));

    let run = async {
        if let Some((url, spec)) =
            strategies::direct_hint(&parsed_base, hints, config, policy, &attempted).await
        {
            return success(url, spec, credential, "direct_hint", snapshot_attempts(&attempted));
        }
        if let Some((url, spec)) = strategies::common_paths(
            &parsed_base,
            hints,
            &learned_paths,
            &base_headers,
            config,
            policy,
            &attempted,
        )
        .await
        {
            return success(url, spec, credential, "common_paths", snapshot_attempts(&attempted));
        }
        if let Some((url, spec)) = strategies::subdomain_sweep(
            &parsed_base,
            hints,
            &base_headers,
            config,
            policy,
            &attempted,
        )
        .await
        {
            return success(url, spec, credential, "subdomain_sweep", snapshot_attempts(&attempted));
        }
        if let Some((url, spec)) =
            strategies::html_crawl(&parsed_base, &base_headers, config, policy, &attempted).await
        {
            return success(url, spec, credential, "html_crawl", snapshot_attempts(&attempted));
        }
        if let Some((url, spec)) =
            strategies::well_known(&parsed_base, &base_headers, config, policy, &attempted).await
        {
            return success(url, spec, credential, "well_known", snapshot_attempts(&attempted));
        }

        not_found(snapshot_attempts(&attempted), hints)
    };

    match tokio::time::timeout(config.discovery_deadline, run).await {
        Ok(result) => {
            learning.learn(base_url, &result).await;
            Ok(result)
        }
        Err(_) => Err(CoreError::DiscoveryTimeout {
            attempted: snapshot_attempts(&attempted),
        }),
    }
}

fn success(
    url: String,
    spec: Arc<oas3::OpenApiV3Spec>,
    credential: &Credential,
    strategy: &str,
    discovered_urls: Vec<AttemptedUrl>,
) -> DiscoveryResult {
    let mut metadata = HashMap::new();
    metadata.insert("strategy".to_string(), strategy.to_string());
    metadata.insert("auth_method".to_string(), auth_method_name(credential).to_string());
    DiscoveryResult {
        status: DiscoveryStatus::Success,
        spec_url: Some(url),
        parsed: Some(spec),
        discovered_urls,
        metadata,
        suggested_actions: Vec::new(),
    }
}

fn not_found(attempted: Vec<AttemptedUrl>, hints: &DiscoveryHints) -> DiscoveryResult {
    let mut suggestions = Vec::new();
    if hints.openapi_url.is_none() {
        suggestions.push("Provide an explicit OpenAPI URL".to_string());
    }
    if let Some(doc_url) = &hints.documentation_url {
        suggestions.push(format!("Check documentation at {doc_url}"));
    }

    let any_candidate_fetched = attempted
        .iter()
        .any(|a| a.outcome.starts_with("fetched but failed to parse") || a.outcome == "parsed");

    if attempted.is_empty() {
        DiscoveryResult::manual_needed(suggestions)
    } else if any_candidate_fetched {
        DiscoveryResult::partial(attempted, suggestions)
    } else {
        DiscoveryResult::manual_needed(suggestions)
    }
}

/// Enumerate every API a documentation portal advertises. Strategies fan out
/// to bounded concurrent tasks; results are deduplicated by spec URL.
pub async fn discover_multi(
    portal_url: &str,
    credential: &Credential,
    hints: &DiscoveryHints,
    config: &CoreConfig,
    policy: &UrlPolicy,
) -> CoreResult<MultiDiscoveryResult> {
    let parsed_base = url_validate::validate(portal_url, policy)?;
    let base_headers = merge_headers(&credential_headers(credential), &hints.auth_headers);

    let attempted: SharedAttempts = Arc::new(Mutex::new(Vec::new()));

    let run = async {
        let mut candidates: Vec<String> = Vec::new();

        if let Some(html) = fetch_text(&parsed_base, &base_headers, config, policy).await {
            candidates.extend(strategies_extract_links(&parsed_base, &html));
        }
        for path in strategies::COMMON_PATHS {
            if let Some(joined) = parsed_base.join(path).ok() {
                candidates.push(joined.to_string());
            }
        }
        candidates.sort();
        candidates.dedup();

        let semaphore = Arc::new(Semaphore::new(config.discovery_concurrency));
        let (tx, mut rx) = mpsc::channel::<Option<ApiDefinition>>(candidates.len().max(1));

        for candidate in candidates {
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let headers = base_headers.clone();
            let config = config.clone();
            let policy = policy.clone();
            let attempted = Arc::clone(&attempted);
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let api = strategies::fetch_candidate(&candidate, &headers, &config, &policy, &attempted)
                    .await
                    .map(|spec| ApiDefinition {
                        spec_url: candidate.clone(),
                        parsed: spec,
                    });
                let _ = tx.send(api).await;
            });
        }

        // portal-specific glob patterns (strategy 6) run as their own task so
        // they fan out alongside the generic candidates above.
        {
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();
            let headers = base_headers.clone();
            let config = config.clone();
            let policy = policy.clone();
            let attempted = Arc::clone(&attempted);
            let base = parsed_base.clone();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                for (url, spec) in strategies::portal_patterns(&base, &headers, &config, &policy, &attempted).await
                {
                    let _ = tx.send(Some(ApiDefinition { spec_url: url, parsed: spec })).await;
                }
            });
        }
        drop(tx);

        let mut discovered: Vec<ApiDefinition> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        while let Some(maybe_api) = rx.recv().await {
            if let Some(api) = maybe_api {
                if seen.insert(api.spec_url.clone()) {
                    discovered.push(api);
                }
            }
        }
        discovered
    };

    match tokio::time::timeout(config.discovery_deadline, run).await {
        Ok(discovered) => {
            let status = if discovered.is_empty() {
                DiscoveryStatus::ManualNeeded
            } else {
                DiscoveryStatus::Success
            };
            Ok(MultiDiscoveryResult {
                base_url: portal_url.to_string(),
                discovered_apis: discovered,
                status,
                method: "portal".to_string(),
                errors: Vec::new(),
            })
        }
        Err(_) => Err(CoreError::DiscoveryTimeout {
            attempted: snapshot_attempts(&attempted),
        }),
    }
}

async fn fetch_text(
    url: &Url,
    headers: &[(String, String)],
    config: &CoreConfig,
    policy: &UrlPolicy,
) -> Option<String> {
    url_validate::validate(url.as_str(), policy).ok()?;
    let client = crate::http_client::shared_client(config.http_timeout);
    let mut req = client.get(url.as_str());
    for (k, v) in headers {
        req = req.header(k.as_str(), v.as_str());
    }
    match tokio::time::timeout(config.http_timeout, req.send()).await {
        Ok(Ok(resp)) if resp.status().is_success() => resp.text().await.ok(),
        _ => None,
    }
}

fn strategies_extract_links(base: &Url, html: &str) -> Vec<String> {
    let re = regex::Regex::new(r#"(?is)<a\s+[^>]*href\s*=\s*["']([^"']+)["']"#)
        .expect("anchor regex is static");
    const TOKENS: &[&str] = &["api", "swagger", "openapi", "docs", "spec"];
    re.captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .filter(|href| TOKENS.iter().any(|t| href.to_ascii_lowercase().contains(t)))
        .filter_map(|href| base.join(&href).ok().map(|u| u.to_string()))
        .collect()
}
