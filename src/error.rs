//! # Error Module
//!
//! The closed error taxonomy every public entry point in this crate returns.
//!
//! Transient failures encountered while *discovering* a spec are not surfaced
//! through this type — they are swallowed and recorded on the
//! [`crate::discovery::DiscoveryResult`] instead (see `discovery.rs`). This
//! type is for failures that stop a single operation: loading a spec,
//! resolving an action, executing a request.

use std::fmt;

/// A single discovery attempt recorded for diagnostics, independent of whether it
/// succeeded. Used to populate `attempted` fields so a caller can tell a `Partial`
/// result (candidates found but none parsed) from a `ManualNeeded` one (nothing found).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptedUrl {
    pub url: String,
    pub outcome: String,
}

impl AttemptedUrl {
    pub fn new(url: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outcome: outcome.into(),
        }
    }
}

/// Why a spec fetch ultimately failed after exhausting retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecFetchCause {
    Status(u16),
    Transport(String),
    Timeout,
    TooLarge { limit: usize },
}

impl fmt::Display for SpecFetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecFetchCause::Status(code) => write!(f, "HTTP {code}"),
            SpecFetchCause::Transport(msg) => write!(f, "transport error: {msg}"),
            SpecFetchCause::Timeout => write!(f, "timed out"),
            SpecFetchCause::TooLarge { limit } => write!(f, "response exceeded {limit} bytes"),
        }
    }
}

/// The closed error taxonomy from the component design (§7).
///
/// `#[non_exhaustive]` so adding a variant is not a breaking change for
/// downstream `match` arms that already carry a wildcard.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("discovery failed after trying {} candidate URL(s)", attempted.len())]
    DiscoveryFailed { attempted: Vec<AttemptedUrl> },

    #[error("discovery timed out after trying {} candidate URL(s)", attempted.len())]
    DiscoveryTimeout { attempted: Vec<AttemptedUrl> },

    #[error("failed to fetch spec after {attempts} attempt(s): {cause}")]
    SpecFetchFailed {
        attempts: u32,
        cause: SpecFetchCause,
    },

    #[error("spec failed to parse/validate: {remaining_issues:?}")]
    SpecParseFailed { remaining_issues: Vec<String> },

    #[error("unsupported API description format: {0}")]
    UnsupportedFormat(String),

    #[error("unknown action {action_id:?}, did you mean: {suggestions:?}")]
    UnknownAction {
        action_id: String,
        suggestions: Vec<String>,
    },

    #[error("missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("permission denied for operation {operation_id}")]
    PermissionDenied { operation_id: String },

    #[error("invalid binding: {0}")]
    InvalidBinding(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

// `execute()` never returns a 4xx/5xx/transport/cancellation variant here: per
// spec, an `ExecutionOutcome` must always carry its `duration`/`started_at`
// even on failure, so request-level failures (and retry exhaustion) stay
// inside `ExecutionOutcome.error_kind` where that timing metadata lives,
// rather than being re-thrown as a duration-less `CoreError`. `CoreError` is
// reserved for failures that prevent an outcome from existing at all
// (discovery, parsing, resolution, auth).
