//! # Resource Scope Resolver (C8)
//!
//! Derives a tool's resource type from its name and projects an indexed spec
//! down to the operations relevant to that one type, so an agent bound to
//! `github_issues` sees `listIssues`/`createIssue` rather than every
//! operation in the GitHub API. Grounded on the teacher's tag-based route
//! grouping (`RouteMeta.tags`, used by the generator to bucket handlers into
//! controller modules) generalized from "group for codegen" to "filter for
//! an agent-visible catalog".

use crate::spec::Operation;
use once_cell::sync::Lazy;
use regex::Regex;

/// A tool's resource projection: which resource type it's scoped to, plus
/// the path/tag fragments that identify operations belonging to it.
#[derive(Debug, Clone)]
pub struct ResourceScope {
    pub resource_type: String,
    pub path_patterns: Vec<String>,
    pub tag_patterns: Vec<String>,
}

impl ResourceScope {
    /// An unscoped projection: every operation in the spec passes the filter.
    /// The Open Question in spec §9 resolves the unscoped/permissive variant
    /// as "subsumed by setting an empty scope" — this is that empty scope.
    #[must_use]
    pub fn none() -> Self {
        ResourceScope {
            resource_type: String::new(),
            path_patterns: Vec::new(),
            tag_patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resource_type.is_empty()
    }
}

static PLURAL_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(ies|ses|s)$").expect("static regex"));

fn looks_plural(segment: &str) -> bool {
    segment.len() > 2 && PLURAL_SUFFIX.is_match(segment)
}

fn singularize(segment: &str) -> String {
    let lower = segment.to_ascii_lowercase();
    if let Some(stem) = lower.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = lower.strip_suffix("ses") {
        format!("{stem}s")
    } else if let Some(stem) = lower.strip_suffix('s') {
        stem.to_string()
    } else {
        lower
    }
}

/// Derive a [`ResourceScope`] from a tool name, per spec §4.8: split on
/// underscores, take the last plural-looking segment as the resource type.
/// A tool name with no plural-looking segment yields an empty scope (no
/// filtering — every operation is in scope).
#[must_use]
pub fn extract_scope(tool_name: &str) -> ResourceScope {
    let segments: Vec<&str> = tool_name.split('_').filter(|s| !s.is_empty()).collect();
    let Some(resource_segment) = segments.iter().rev().find(|s| looks_plural(s)) else {
        return ResourceScope::none();
    };

    let plural = resource_segment.to_ascii_lowercase();
    let singular = singularize(resource_segment);

    ResourceScope {
        resource_type: plural.clone(),
        path_patterns: vec![format!("/{plural}"), format!("/{singular}")],
        tag_patterns: vec![plural, singular],
    }
}

/// Retain an operation iff its path contains `/{resourceType}` or
/// `/{resourceType-singular}` as a segment, or any of its tags
/// case-insensitively equals the resource type (singular or plural).
#[must_use]
pub fn filter<'a>(operations: &'a [Operation], scope: &ResourceScope) -> Vec<&'a Operation> {
    if scope.is_empty() {
        return operations.iter().collect();
    }
    operations
        .iter()
        .filter(|op| operation_in_scope(op, scope))
        .collect()
}

fn operation_in_scope(op: &Operation, scope: &ResourceScope) -> bool {
    let path_lower = op.path.to_ascii_lowercase();
    let path_match = scope
        .path_patterns
        .iter()
        .any(|p| path_lower.split('/').any(|seg| seg.eq_ignore_ascii_case(p.trim_start_matches('/'))));
    if path_match {
        return true;
    }
    op.tags
        .iter()
        .any(|t| scope.tag_patterns.iter().any(|p| t.eq_ignore_ascii_case(p)))
}

/// Strip the resource-type prefix from an operation id so agents see
/// `listIssues` rather than `repos_issues_list`. Tries, in order: a leading
/// `{resourceType}_`/`{singular}_` segment, a trailing one, and finally
/// leaves the id untouched if neither affix is present.
#[must_use]
pub fn simplify_action_name(operation_id: &str, resource_type: &str) -> String {
    if resource_type.is_empty() {
        return operation_id.to_string();
    }
    let singular = resource_type.trim_end_matches('s');
    for affix in [resource_type, singular] {
        let prefix = format!("{affix}_");
        if let Some(stripped) = operation_id.strip_prefix(&prefix) {
            return stripped.to_string();
        }
        let suffix = format!("_{affix}");
        if let Some(stripped) = operation_id.strip_suffix(&suffix) {
            return stripped.to_string();
        }
    }
    operation_id.to_string()
}
