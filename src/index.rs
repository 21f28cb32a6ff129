//! # Operation Indexer / Resolver (C7)
//!
//! Builds cross-cutting lookup indices over a spec's [`Operation`]s on first
//! use, then resolves a caller-supplied action ID plus parameter context back
//! to a concrete operation. Grounded on the teacher's `router::Router`
//! (regex-based path matching keyed by a routing table built once from
//! `RouteMeta`) generalized from "match an inbound HTTP request" to "match an
//! agent-supplied action ID and parameter bag".

use crate::spec::Operation;
use std::collections::HashMap;

/// A spec's operations, indexed every way C7's resolver needs: exact and
/// normalized operation id, method+path, tag×verb, and parameter
/// fingerprint. Built once per (spec URL, scope fingerprint) pair and
/// reused across resolutions (spec §5: "C7 index build is done once per
/// (spec, scope) pair under a write lock").
#[derive(Debug, Clone)]
pub struct OperationIndex {
    operations: Vec<Operation>,
    by_operation_id: HashMap<String, usize>,
    by_normalized_id: HashMap<String, usize>,
    by_method_path: HashMap<String, usize>,
    by_tag_verb: HashMap<(String, String), Vec<usize>>,
    by_parameter_fingerprint: HashMap<Vec<String>, Vec<usize>>,
}

/// Why [`OperationIndex::resolve`] could not find an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub suggestions: Vec<String>,
}

/// A resolved operation plus the concrete path/method a caller should act
/// against — a thin wrapper so callers don't need to re-derive anything from
/// the index.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub operation: &'a Operation,
}

fn normalize_id(id: &str) -> String {
    id.replace(['/', '\\'], "-").to_ascii_lowercase()
}

fn parameter_fingerprint(names: &[&str]) -> Vec<String> {
    let mut v: Vec<String> = names.iter().map(|s| s.to_ascii_lowercase()).collect();
    v.sort();
    v
}

impl OperationIndex {
    /// Build every index over `operations` in one pass.
    #[must_use]
    pub fn build(operations: Vec<Operation>) -> Self {
        let mut by_operation_id = HashMap::new();
        let mut by_normalized_id = HashMap::new();
        let mut by_method_path = HashMap::new();
        let mut by_tag_verb: HashMap<(String, String), Vec<usize>> = HashMap::new();
        let mut by_parameter_fingerprint: HashMap<Vec<String>, Vec<usize>> = HashMap::new();

        for (idx, op) in operations.iter().enumerate() {
            by_operation_id.insert(op.operation_id.clone(), idx);
            by_normalized_id.insert(normalize_id(&op.operation_id), idx);
            by_method_path.insert(format!("{}_{}", op.method.to_ascii_lowercase(), op.path), idx);

            let verb = op.method.to_ascii_lowercase();
            for tag in &op.tags {
                by_tag_verb
                    .entry((tag.to_ascii_lowercase(), verb.clone()))
                    .or_default()
                    .push(idx);
            }

            let required: Vec<&str> = op.required_parameter_names();
            if !required.is_empty() {
                by_parameter_fingerprint
                    .entry(parameter_fingerprint(&required))
                    .or_default()
                    .push(idx);
            }
        }

        OperationIndex {
            operations,
            by_operation_id,
            by_normalized_id,
            by_method_path,
            by_tag_verb,
            by_parameter_fingerprint,
        }
    }

    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn by_index(&self, idx: usize) -> Resolved<'_> {
        Resolved {
            operation: &self.operations[idx],
        }
    }

    /// Resolve `action_id` against `context`'s keys, per spec §4.7's
    /// resolution order: exact id; normalized id variants; method_path
    /// split; fuzzy parameter-fingerprint match filtered by resource type
    /// when `context` carries `__resource_type`. Ties break on: required
    /// params all present in context, then shorter path template, then
    /// alphabetical path.
    pub fn resolve(
        &self,
        action_id: &str,
        context: &HashMap<String, String>,
    ) -> Result<Resolved<'_>, NotFound> {
        if let Some(&idx) = self.by_operation_id.get(action_id) {
            return Ok(self.by_index(idx));
        }
        if let Some(&idx) = self.by_normalized_id.get(&normalize_id(action_id)) {
            return Ok(self.by_index(idx));
        }
        if let Some(&idx) = self.by_method_path.get(&normalize_id(action_id)) {
            return Ok(self.by_index(idx));
        }

        let context_keys: Vec<&str> = context
            .keys()
            .map(String::as_str)
            .filter(|k| *k != "__resource_type")
            .collect();
        if !context_keys.is_empty() {
            if let Some(resolved) = self.resolve_by_fingerprint(&context_keys, context) {
                return Ok(resolved);
            }
        }

        Err(NotFound {
            suggestions: self.suggest(action_id),
        })
    }

    fn resolve_by_fingerprint(
        &self,
        context_keys: &[&str],
        context: &HashMap<String, String>,
    ) -> Option<Resolved<'_>> {
        let resource_type = context.get("__resource_type").map(String::as_str);
        let fingerprint = parameter_fingerprint(context_keys);

        let mut candidates: Vec<usize> = self
            .by_parameter_fingerprint
            .get(&fingerprint)
            .cloned()
            .unwrap_or_default();

        if candidates.is_empty() {
            // No exact fingerprint match — fall back to "every required
            // param the operation declares is present in context", which
            // tolerates a context with extra keys the operation ignores.
            candidates = self
                .operations
                .iter()
                .enumerate()
                .filter(|(_, op)| {
                    let required = op.required_parameter_names();
                    !required.is_empty()
                        && required
                            .iter()
                            .all(|r| context_keys.iter().any(|k| k.eq_ignore_ascii_case(r)))
                })
                .map(|(i, _)| i)
                .collect();
        }

        if let Some(rt) = resource_type {
            let scoped: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&i| operation_matches_resource_type(&self.operations[i], rt))
                .collect();
            if !scoped.is_empty() {
                candidates = scoped;
            }
        }

        candidates.sort_by(|&a, &b| {
            let op_a = &self.operations[a];
            let op_b = &self.operations[b];
            let all_present_a = all_required_present(op_a, context_keys);
            let all_present_b = all_required_present(op_b, context_keys);
            all_present_b
                .cmp(&all_present_a)
                .then_with(|| op_a.path.len().cmp(&op_b.path.len()))
                .then_with(|| op_a.path.cmp(&op_b.path))
        });

        candidates.first().map(|&idx| self.by_index(idx))
    }

    /// Human-readable "did you mean" candidates for an unresolved action id.
    fn suggest(&self, action_id: &str) -> Vec<String> {
        let needle = normalize_id(action_id);
        let mut scored: Vec<(usize, &str)> = self
            .operations
            .iter()
            .map(|op| (edit_distance(&needle, &normalize_id(&op.operation_id)), op.operation_id.as_str()))
            .collect();
        scored.sort_by_key(|(dist, _)| *dist);
        scored
            .into_iter()
            .take(3)
            .map(|(_, id)| id.to_string())
            .collect()
    }
}

fn all_required_present(op: &Operation, context_keys: &[&str]) -> bool {
    op.required_parameter_names()
        .iter()
        .all(|r| context_keys.iter().any(|k| k.eq_ignore_ascii_case(r)))
}

fn operation_matches_resource_type(op: &Operation, resource_type: &str) -> bool {
    let singular = resource_type.trim_end_matches('s');
    let path_lower = op.path.to_ascii_lowercase();
    if path_lower.contains(&format!("/{resource_type}")) || path_lower.contains(&format!("/{singular}")) {
        return true;
    }
    op.tags.iter().any(|t| t.eq_ignore_ascii_case(resource_type) || t.eq_ignore_ascii_case(singular))
}

/// Small Levenshtein distance for "did you mean" suggestions — inputs here
/// are operation ids, never unbounded user text, so quadratic cost is fine.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ParameterLocation, ParameterMeta};
    use std::collections::HashMap as Map;

    fn op(id: &str, path: &str, method: &str, required: &[&str], tags: &[&str]) -> Operation {
        Operation {
            operation_id: id.to_string(),
            path: path.to_string(),
            method: method.to_string(),
            parameters: required
                .iter()
                .map(|n| ParameterMeta {
                    name: (*n).to_string(),
                    location: ParameterLocation::Path,
                    required: true,
                    schema: None,
                })
                .collect(),
            request_schema: None,
            request_body_required: false,
            response_schema: None,
            response_example: None,
            responses: Map::new(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            security: Vec::new(),
        }
    }

    #[test]
    fn resolves_by_exact_operation_id() {
        let idx = OperationIndex::build(vec![op("listIssues", "/repos/{o}/{r}/issues", "get", &["o", "r"], &["issues"])]);
        let resolved = idx.resolve("listIssues", &Map::new()).unwrap();
        assert_eq!(resolved.operation.operation_id, "listIssues");
    }

    #[test]
    fn resolves_by_normalized_id_variant() {
        let idx = OperationIndex::build(vec![op("list-issues", "/issues", "get", &[], &[])]);
        let resolved = idx.resolve("list/issues", &Map::new()).unwrap();
        assert_eq!(resolved.operation.operation_id, "list-issues");
    }

    #[test]
    fn resolves_by_parameter_fingerprint() {
        let idx = OperationIndex::build(vec![
            op("listIssues", "/repos/{owner}/{repo}/issues", "get", &["owner", "repo"], &["issues"]),
            op("getUser", "/users/{user}", "get", &["user"], &["users"]),
        ]);
        let mut ctx = Map::new();
        ctx.insert("owner".to_string(), "octocat".to_string());
        ctx.insert("repo".to_string(), "hello".to_string());
        let resolved = idx.resolve("some_unknown_action", &ctx).unwrap();
        assert_eq!(resolved.operation.operation_id, "listIssues");
    }

    #[test]
    fn resource_type_filters_fingerprint_ties() {
        let idx = OperationIndex::build(vec![
            op("a", "/widgets/{id}", "get", &["id"], &["widgets"]),
            op("b", "/gadgets/{id}", "get", &["id"], &["gadgets"]),
        ]);
        let mut ctx = Map::new();
        ctx.insert("id".to_string(), "1".to_string());
        ctx.insert("__resource_type".to_string(), "gadgets".to_string());
        let resolved = idx.resolve("unknown", &ctx).unwrap();
        assert_eq!(resolved.operation.operation_id, "b");
    }

    #[test]
    fn unknown_action_returns_suggestions() {
        let idx = OperationIndex::build(vec![op("listIssues", "/issues", "get", &[], &[])]);
        let err = idx.resolve("listIssuess", &Map::new()).unwrap_err();
        assert!(err.suggestions.contains(&"listIssues".to_string()));
    }

    #[test]
    fn shorter_path_wins_tiebreak() {
        let idx = OperationIndex::build(vec![
            op("a", "/a/{id}/long/path", "get", &["id"], &[]),
            op("b", "/b/{id}", "get", &["id"], &[]),
        ]);
        let mut ctx = Map::new();
        ctx.insert("id".to_string(), "1".to_string());
        let resolved = idx.resolve("unknown", &ctx).unwrap();
        assert_eq!(resolved.operation.operation_id, "b");
    }
}
