//! # Spec Module
//!
//! OpenAPI 3 parsing, normalization, and TTL-caching for remote specs.
//!
//! This module is responsible for:
//! - Strict parsing of an OpenAPI 3 document into [`oas3::OpenApiV3Spec`]
//! - Normalizing the parsed spec into [`Operation`] entries for C7's index
//! - Fetching, validating, and caching specs by URL (`cache`, C4)
//!
//! Non-OpenAPI formats are converted upstream by [`crate::format`]; byte- and
//! model-level repairs are applied upstream by [`crate::sanitize`] before a
//! document reaches [`parse_strict`].

pub mod cache;
pub mod model;

pub use cache::{SpecCache, SpecDescriptor};
pub use model::{build_operations, Operation, ParameterLocation, ParameterMeta, ResponseSpec, Responses};
pub use oas3::spec::{SecurityRequirement, SecurityScheme};

use crate::error::{CoreError, CoreResult};
use oas3::OpenApiV3Spec;
use serde_json::Value;

/// Strictly parse a sanitized JSON document into an [`OpenApiV3Spec`], then
/// apply the minimal structural checks `oas3`'s typed model doesn't itself
/// enforce (non-empty `paths`, non-empty `info.title`/`info.version`).
pub fn parse_strict(value: Value) -> Result<OpenApiV3Spec, Vec<String>> {
    let spec: OpenApiV3Spec = serde_json::from_value(value).map_err(|e| vec![e.to_string()])?;

    let mut issues = Vec::new();
    if spec.info.title.trim().is_empty() {
        issues.push("info.title is empty".to_string());
    }
    if spec.info.version.trim().is_empty() {
        issues.push("info.version is empty".to_string());
    }
    if spec.paths.as_ref().map(|p| p.is_empty()).unwrap_or(true) {
        issues.push("paths is empty".to_string());
    }

    if issues.is_empty() {
        Ok(spec)
    } else {
        Err(issues)
    }
}

/// Run the full byte-to-model pipeline: sanitize bytes, strict-parse,
/// sanitize model, re-validate. Remaining issues after both sanitizer passes
/// downgrade the result to lenient rather than failing outright, per
/// spec §4.3 — callers decide whether lenient is acceptable.
pub fn load_from_bytes(bytes: &[u8], base_url: &str) -> CoreResult<(OpenApiV3Spec, Value, Vec<String>)> {
    let (fixed_bytes, byte_issues) = crate::sanitize::sanitize_bytes(bytes);
    let format = crate::format::detect(&fixed_bytes);
    let converted = crate::format::convert_to_openapi(&fixed_bytes, format, base_url)?;
    let report = crate::sanitize::sanitize_model(converted);
    let mut issues: Vec<String> = byte_issues.into_iter().map(|i| i.description).collect();

    match parse_strict(report.value.clone()) {
        Ok(spec) => {
            issues.extend(report.issues.into_iter().map(|i| i.description));
            Ok((spec, report.value, issues))
        }
        Err(parse_issues) => {
            // retry once more after a second sanitize pass in case the first
            // pass's fixes unlocked further coercions (e.g. a depth-capped
            // branch that was itself the only structural problem).
            let retried = crate::sanitize::sanitize_model(report.value);
            match parse_strict(retried.value.clone()) {
                Ok(spec) => {
                    issues.extend(report.issues.into_iter().map(|i| i.description));
                    issues.extend(retried.issues.into_iter().map(|i| i.description));
                    Ok((spec, retried.value, issues))
                }
                Err(mut remaining) => {
                    remaining.extend(parse_issues);
                    Err(CoreError::SpecParseFailed {
                        remaining_issues: remaining,
                    })
                }
            }
        }
    }
}
