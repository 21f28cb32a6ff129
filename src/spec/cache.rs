//! # Spec Loader & Cache (C4)
//!
//! Fetches, size-bounds, parses, validates, and TTL-caches OpenAPI models
//! keyed by spec URL. The cache itself is a thin wrapper over the injected
//! [`crate::store::OpenAPICache`] trait; this module owns the fetch/retry/
//! parse pipeline that fills it.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult, SpecFetchCause};
use crate::http_client::shared_client;
use crate::store::OpenAPICache;
use crate::url_validate::{self, UrlPolicy};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Metadata recorded alongside a cached, parsed spec.
#[derive(Debug, Clone)]
pub struct SpecDescriptor {
    pub url: String,
    pub fetched_at: Instant,
    pub ttl: Duration,
    pub source_format: crate::format::Format,
    pub converted_from: Option<crate::format::Format>,
    pub byte_size: usize,
    pub validation_fixes: Vec<String>,
}

impl SpecDescriptor {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() >= self.ttl
    }
}

/// A parsed spec plus the descriptor describing how it was obtained. `raw`
/// retains the sanitized-but-untyped document for callers that need fields
/// the typed `oas3` model doesn't expose uniformly (webhooks/callbacks, C12).
#[derive(Clone)]
pub struct CachedSpec {
    pub spec: Arc<OpenApiV3Spec>,
    pub raw: Arc<Value>,
    pub descriptor: SpecDescriptor,
}

/// Facade over an injected [`OpenAPICache`] that owns the fetch-parse-cache
/// pipeline. Reads are lock-free on a hit; a fill on miss is not
/// singleflighted — the contract only requires idempotence, and the second
/// writer winning is acceptable (spec §5).
pub struct SpecCache {
    store: Arc<dyn OpenAPICache>,
}

impl SpecCache {
    #[must_use]
    pub fn new(store: Arc<dyn OpenAPICache>) -> Self {
        Self { store }
    }

    /// Fetch `url`, serving from cache when a fresh entry exists.
    pub async fn load(
        &self,
        url: &str,
        headers: &[(String, String)],
        config: &CoreConfig,
        policy: &UrlPolicy,
    ) -> CoreResult<CachedSpec> {
        if let Some(cached) = self.store.get(url).await {
            if !cached.descriptor.is_expired() {
                debug!(url, "spec cache hit");
                return Ok(cached);
            }
            debug!(url, "spec cache entry expired");
        }

        let cached = self.fetch_and_parse(url, headers, config, policy).await?;
        self.store.set(url, cached.clone(), config.cache_ttl).await;
        Ok(cached)
    }

    async fn fetch_and_parse(
        &self,
        url: &str,
        headers: &[(String, String)],
        config: &CoreConfig,
        policy: &UrlPolicy,
    ) -> CoreResult<CachedSpec> {
        url_validate::validate(url, policy)?;

        let client = shared_client(config.http_timeout);
        let mut attempt: u32 = 0;
        let mut last_cause = SpecFetchCause::Timeout;

        loop {
            attempt += 1;
            let mut req = client
                .get(url)
                .header("Accept", "application/json, application/yaml, text/yaml");
            for (k, v) in headers {
                req = req.header(k.as_str(), v.as_str());
            }

            let outcome = tokio::time::timeout(config.http_timeout, req.send()).await;
            match outcome {
                Err(_) => last_cause = SpecFetchCause::Timeout,
                Ok(Err(e)) => last_cause = SpecFetchCause::Transport(e.to_string()),
                Ok(Ok(resp)) => {
                    let status = resp.status();
                    if !status.is_success() {
                        last_cause = SpecFetchCause::Status(status.as_u16());
                    } else {
                        match read_bounded(resp, config.max_spec_bytes).await {
                            Ok(bytes) => {
                                let (fixed_bytes, byte_issues) =
                                    crate::sanitize::sanitize_bytes(&bytes);
                                let format = crate::format::detect(&fixed_bytes);
                                let converted = crate::format::convert_to_openapi(
                                    &fixed_bytes,
                                    format,
                                    base_of(url),
                                )?;
                                let report = crate::sanitize::sanitize_model(converted);
                                let mut fixes: Vec<String> =
                                    byte_issues.into_iter().map(|i| i.description).collect();
                                return match crate::spec::parse_strict(report.value.clone()) {
                                    Ok(spec) => {
                                        fixes.extend(
                                            report.issues.into_iter().map(|i| i.description),
                                        );
                                        Ok(CachedSpec {
                                            spec: Arc::new(spec),
                                            raw: Arc::new(report.value),
                                            descriptor: SpecDescriptor {
                                                url: url.to_string(),
                                                fetched_at: Instant::now(),
                                                ttl: config.cache_ttl,
                                                source_format: format,
                                                converted_from: if format
                                                    == crate::format::Format::OpenApi3
                                                {
                                                    None
                                                } else {
                                                    Some(format)
                                                },
                                                byte_size: bytes.len(),
                                                validation_fixes: fixes,
                                            },
                                        })
                                    }
                                    Err(remaining_issues) => {
                                        Err(CoreError::SpecParseFailed { remaining_issues })
                                    }
                                };
                            }
                            Err(e) => last_cause = e,
                        }
                    }
                }
            }

            if attempt >= config.max_retries {
                warn!(url, attempt, %last_cause, "spec fetch exhausted retries");
                return Err(CoreError::SpecFetchFailed {
                    attempts: attempt,
                    cause: last_cause,
                });
            }
            let backoff = std::cmp::min(
                config.backoff_base.saturating_mul(1 << (attempt - 1)),
                config.backoff_max,
            );
            tokio::time::sleep(backoff).await;
        }
    }
}

fn base_of(url: &str) -> &str {
    url.split_once("://")
        .map(|(scheme, rest)| {
            let host_end = rest.find('/').unwrap_or(rest.len());
            &url[..scheme.len() + 3 + host_end]
        })
        .unwrap_or(url)
}

async fn read_bounded(resp: reqwest::Response, max_bytes: usize) -> Result<Vec<u8>, SpecFetchCause> {
    if let Some(len) = resp.content_length() {
        if len as usize > max_bytes {
            return Err(SpecFetchCause::TooLarge { limit: max_bytes });
        }
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| SpecFetchCause::Transport(e.to_string()))?;
    if bytes.len() > max_bytes {
        return Err(SpecFetchCause::TooLarge { limit: max_bytes });
    }
    Ok(bytes.to_vec())
}
