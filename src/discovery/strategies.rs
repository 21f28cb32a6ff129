//! Strategy ladder for single-spec discovery (C5, spec §4.5).
//!
//! Each strategy returns `Some(spec)` on the first candidate that fetches
//! and parses cleanly; every URL it tries (parsed or not) is appended to
//! `attempted` so a caller can distinguish Partial (candidates found, none
//! parsed) from ManualNeeded (nothing found at all).

use crate::config::CoreConfig;
use crate::discovery::hints::DiscoveryHints;
use crate::discovery::SharedAttempts;
use crate::error::AttemptedUrl;
use crate::url_validate::{self, UrlPolicy};
use oas3::OpenApiV3Spec;
use regex::Regex;
use std::sync::Arc;
use url::Url;

/// Built-in ordered list of canonical spec paths, tried in declaration order
/// with `hints.extra_paths` prepended.
pub const COMMON_PATHS: &[&str] = &[
    "/openapi.json",
    "/openapi.yaml",
    "/openapi.yml",
    "/swagger.json",
    "/swagger.yaml",
    "/api-docs",
    "/api-docs.json",
    "/v1/api-docs",
    "/v2/api-docs",
    "/v3/api-docs",
    "/swagger/v1/swagger.json",
    "/swagger/v2/swagger.json",
    "/.well-known/openapi.json",
    "/api/openapi.json",
    "/api/swagger.json",
    "/api/v1/openapi.json",
    "/api/v1/swagger.json",
    "/docs/openapi.json",
    "/docs/swagger.json",
    "/spec/openapi.json",
    "/spec.json",
    "/spec.yaml",
    "/api.json",
    "/schema.json",
    "/redoc/openapi.json",
];

/// Subdomains swept in strategy 3, tried against the first 5 common paths.
pub const COMMON_SUBDOMAINS: &[&str] = &[
    "api", "docs", "apidocs", "api-docs", "developer", "developers", "dev", "openapi",
];

const HTML_LINK_TOKENS: &[&str] = &[
    "api", "swagger", "openapi", "docs", "documentation", "developer", "reference", "rest",
    "spec", "specification",
];

fn record(attempted: &SharedAttempts, url: &str, outcome: impl Into<String>) {
    attempted.lock().unwrap().push(AttemptedUrl::new(url, outcome));
}

/// Fetch, size-check, and parse one candidate URL, recording the outcome into
/// `attempted` regardless of whether it succeeds. `attempted` is shared (not
/// owned by the caller's stack frame) so a record survives even if the
/// enclosing future is dropped by an outer `tokio::time::timeout`.
pub(super) async fn fetch_candidate(
    url: &str,
    headers: &[(String, String)],
    config: &CoreConfig,
    policy: &UrlPolicy,
    attempted: &SharedAttempts,
) -> Option<Arc<OpenApiV3Spec>> {
    if url_validate::validate(url, policy).is_err() {
        record(attempted, url, "rejected by URL policy");
        return None;
    }

    let client = crate::http_client::shared_client(config.http_timeout);
    let mut req = client
        .get(url)
        .header("Accept", "application/json, application/yaml, text/yaml");
    for (k, v) in headers {
        req = req.header(k.as_str(), v.as_str());
    }

    let resp = match tokio::time::timeout(config.http_timeout, req.send()).await {
        Ok(Ok(r)) if r.status().is_success() => r,
        Ok(Ok(r)) => {
            record(attempted, url, format!("HTTP {}", r.status()));
            return None;
        }
        Ok(Err(e)) => {
            record(attempted, url, format!("transport error: {e}"));
            return None;
        }
        Err(_) => {
            record(attempted, url, "timed out");
            return None;
        }
    };

    let bytes = match resp.bytes().await {
        Ok(b) if b.len() <= config.max_spec_bytes => b,
        Ok(_) => {
            record(attempted, url, "response too large");
            return None;
        }
        Err(e) => {
            record(attempted, url, format!("read error: {e}"));
            return None;
        }
    };

    match crate::spec::load_from_bytes(&bytes, url) {
        Ok((spec, _raw, _issues)) => {
            record(attempted, url, "parsed");
            Some(Arc::new(spec))
        }
        Err(e) => {
            record(attempted, url, format!("fetched but failed to parse: {e}"));
            None
        }
    }
}

fn join(base: &Url, path: &str) -> Option<String> {
    base.join(path).ok().map(|u| u.to_string())
}

/// Strategy 1: the caller's explicit hint.
pub async fn direct_hint(
    base_url: &Url,
    hints: &DiscoveryHints,
    config: &CoreConfig,
    policy: &UrlPolicy,
    attempted: &SharedAttempts,
) -> Option<(String, Arc<OpenApiV3Spec>)> {
    let candidate = hints.openapi_url.as_ref()?;
    let _ = base_url;
    let headers = hints.auth_headers.clone();
    fetch_candidate(candidate, &headers, config, policy, attempted)
        .await
        .map(|spec| (candidate.clone(), spec))
}

/// Strategy 2: built-in common paths, with `hints.extra_paths` prepended.
pub async fn common_paths(
    base_url: &Url,
    hints: &DiscoveryHints,
    learned_paths: &[String],
    credential_headers: &[(String, String)],
    config: &CoreConfig,
    policy: &UrlPolicy,
    attempted: &SharedAttempts,
) -> Option<(String, Arc<OpenApiV3Spec>)> {
    let mut candidates: Vec<String> = Vec::new();
    candidates.extend(learned_paths.iter().cloned());
    candidates.extend(hints.extra_paths.iter().cloned());
    candidates.extend(COMMON_PATHS.iter().map(|s| s.to_string()));

    for path in candidates {
        let Some(url) = join(base_url, &path) else { continue };
        if let Some(spec) = fetch_candidate(&url, credential_headers, config, policy, attempted).await {
            return Some((url, spec));
        }
    }
    None
}

fn rewrite_host(base_url: &Url, subdomain: &str) -> Option<Url> {
    let host = base_url.host_str()?;
    let parts: Vec<&str> = host.split('.').collect();
    let new_host = if parts.len() <= 2 {
        format!("{subdomain}.{host}")
    } else {
        let mut rest = parts[1..].to_vec();
        rest.insert(0, subdomain);
        rest.join(".")
    };
    let mut rewritten = base_url.clone();
    rewritten.set_host(Some(&new_host)).ok()?;
    Some(rewritten)
}

/// Strategy 3: subdomain sweep against the first 5 common paths.
pub async fn subdomain_sweep(
    base_url: &Url,
    hints: &DiscoveryHints,
    credential_headers: &[(String, String)],
    config: &CoreConfig,
    policy: &UrlPolicy,
    attempted: &SharedAttempts,
) -> Option<(String, Arc<OpenApiV3Spec>)> {
    let mut subdomains: Vec<String> = COMMON_SUBDOMAINS.iter().map(|s| s.to_string()).collect();
    subdomains.extend(hints.extra_subdomains.iter().cloned());

    for subdomain in subdomains {
        let Some(rewritten) = rewrite_host(base_url, &subdomain) else { continue };
        for path in COMMON_PATHS.iter().take(5) {
            let Some(url) = join(&rewritten, path) else { continue };
            if let Some(spec) = fetch_candidate(&url, credential_headers, config, policy, attempted).await {
                return Some((url, spec));
            }
        }
    }
    None
}

fn extract_anchor_hrefs(html: &str) -> Vec<String> {
    let re = Regex::new(r#"(?is)<a\s+[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#)
        .expect("anchor regex is static");
    let mut out = Vec::new();
    for caps in re.captures_iter(html) {
        let href = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let text = caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_ascii_lowercase();
        let href_lower = href.to_ascii_lowercase();
        if HTML_LINK_TOKENS.iter().any(|t| href_lower.contains(t) || text.contains(t)) {
            out.push(href.to_string());
        }
    }
    out
}

/// Strategy 4: crawl the base URL's HTML for likely documentation links.
pub async fn html_crawl(
    base_url: &Url,
    credential_headers: &[(String, String)],
    config: &CoreConfig,
    policy: &UrlPolicy,
    attempted: &SharedAttempts,
) -> Option<(String, Arc<OpenApiV3Spec>)> {
    url_validate::validate(base_url.as_str(), policy).ok()?;
    let client = crate::http_client::shared_client(config.http_timeout);
    let mut req = client.get(base_url.as_str());
    for (k, v) in credential_headers {
        req = req.header(k.as_str(), v.as_str());
    }
    let html = match tokio::time::timeout(config.http_timeout, req.send()).await {
        Ok(Ok(resp)) if resp.status().is_success() => resp.text().await.ok()?,
        _ => return None,
    };

    for href in extract_anchor_hrefs(&html) {
        let Some(resolved) = base_url.join(&href).ok() else { continue };
        let url = resolved.to_string();
        if let Some(spec) = fetch_candidate(&url, credential_headers, config, policy, attempted).await {
            return Some((url, spec));
        }
    }
    None
}

/// Strategy 5: well-known paths.
pub async fn well_known(
    base_url: &Url,
    credential_headers: &[(String, String)],
    config: &CoreConfig,
    policy: &UrlPolicy,
    attempted: &SharedAttempts,
) -> Option<(String, Arc<OpenApiV3Spec>)> {
    const PATHS: &[&str] = &[
        "/.well-known/openapi.json",
        "/.well-known/api-documentation",
        "/catalog.json",
        "/api-catalog.json",
    ];
    for path in PATHS {
        let Some(url) = join(base_url, path) else { continue };
        if let Some(spec) = fetch_candidate(&url, credential_headers, config, policy, attempted).await {
            return Some((url, spec));
        }
    }
    None
}

/// Strategy 6 (multi-API mode only): portal-specific glob patterns.
pub async fn portal_patterns(
    base_url: &Url,
    credential_headers: &[(String, String)],
    config: &CoreConfig,
    policy: &UrlPolicy,
    attempted: &SharedAttempts,
) -> Vec<(String, Arc<OpenApiV3Spec>)> {
    let profile = super::portal::PortalProfile::for_host(base_url.host_str().unwrap_or_default());
    let mut found = Vec::new();
    for path in profile.expand_candidates() {
        let Some(url) = join(base_url, &path) else { continue };
        if let Some(spec) = fetch_candidate(&url, credential_headers, config, policy, attempted).await {
            found.push((url, spec));
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_anchors_matching_doc_tokens() {
        let html = r#"<a href="/developer/swagger.json">API docs</a><a href="/about">About us</a>"#;
        let hrefs = extract_anchor_hrefs(html);
        assert_eq!(hrefs, vec!["/developer/swagger.json".to_string()]);
    }

    #[test]
    fn rewrites_bare_domain_by_prepending_subdomain() {
        let base = Url::parse("https://example.com").unwrap();
        let rewritten = rewrite_host(&base, "api").unwrap();
        assert_eq!(rewritten.host_str(), Some("api.example.com"));
    }

    #[test]
    fn rewrites_existing_subdomain_by_replacing_it() {
        let base = Url::parse("https://www.example.com").unwrap();
        let rewritten = rewrite_host(&base, "api").unwrap();
        assert_eq!(rewritten.host_str(), Some("api.example.com"));
    }
}
