//! Discovery Hints — spec §3. An optional bag of caller-supplied shortcuts;
//! absent fields mean "no hint", not "empty string".

/// Caller-supplied hints that let C5 skip straight to a known-good strategy.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryHints {
    pub openapi_url: Option<String>,
    pub extra_paths: Vec<String>,
    pub extra_subdomains: Vec<String>,
    pub auth_headers: Vec<(String, String)>,
    pub api_format: Option<String>,
    pub documentation_url: Option<String>,
    pub example_endpoint: Option<String>,
}

impl DiscoveryHints {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_openapi_url(url: impl Into<String>) -> Self {
        Self {
            openapi_url: Some(url.into()),
            ..Self::default()
        }
    }
}
