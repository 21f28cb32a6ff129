//! Discovery result types — spec §4.5.

use crate::error::AttemptedUrl;
use oas3::OpenApiV3Spec;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStatus {
    Success,
    Partial,
    ManualNeeded,
    Failed,
}

/// Outcome of a single-spec discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    pub status: DiscoveryStatus,
    pub spec_url: Option<String>,
    pub parsed: Option<Arc<OpenApiV3Spec>>,
    pub discovered_urls: Vec<AttemptedUrl>,
    pub metadata: HashMap<String, String>,
    pub suggested_actions: Vec<String>,
}

impl DiscoveryResult {
    #[must_use]
    pub fn failed(discovered_urls: Vec<AttemptedUrl>, suggested_actions: Vec<String>) -> Self {
        DiscoveryResult {
            status: DiscoveryStatus::Failed,
            spec_url: None,
            parsed: None,
            discovered_urls,
            metadata: HashMap::new(),
            suggested_actions,
        }
    }

    #[must_use]
    pub fn manual_needed(suggested_actions: Vec<String>) -> Self {
        DiscoveryResult {
            status: DiscoveryStatus::ManualNeeded,
            spec_url: None,
            parsed: None,
            discovered_urls: Vec::new(),
            metadata: HashMap::new(),
            suggested_actions,
        }
    }

    #[must_use]
    pub fn partial(discovered_urls: Vec<AttemptedUrl>, suggested_actions: Vec<String>) -> Self {
        DiscoveryResult {
            status: DiscoveryStatus::Partial,
            spec_url: None,
            parsed: None,
            discovered_urls,
            metadata: HashMap::new(),
            suggested_actions,
        }
    }
}

/// One API definition discovered in multi-API (portal) mode.
#[derive(Debug, Clone)]
pub struct ApiDefinition {
    pub spec_url: String,
    pub parsed: Arc<OpenApiV3Spec>,
}

/// Outcome of a portal discovery run.
#[derive(Debug, Clone)]
pub struct MultiDiscoveryResult {
    pub base_url: String,
    pub discovered_apis: Vec<ApiDefinition>,
    pub status: DiscoveryStatus,
    pub method: String,
    pub errors: Vec<String>,
}
