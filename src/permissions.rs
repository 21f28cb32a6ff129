//! # Permission Discoverer (C9)
//!
//! Probes the live API with the bound credential to determine which scopes
//! it was actually granted, then marks each operation as allowed or denied
//! by matching its declared security requirements against what was
//! discovered. Grounded on the teacher's `security::remote_api_key`'s
//! TTL-cached remote verification call, generalized from "is this one
//! credential valid" to "what can this credential do".

use crate::auth::Credential;
use crate::config::CoreConfig;
use crate::spec::{Operation, SecurityRequirement};
use crate::url_validate::{self, UrlPolicy};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Low-cost, read-only endpoints tried in order until one responds; the
/// first to return 2xx (or an informative 401/403 challenge) ends the probe.
const PROBE_PATHS: &[&str] = &["/", "/me", "/user", "/whoami"];

/// Response headers known to carry scope information.
const SCOPE_HEADERS: &[&str] = &["X-OAuth-Scopes", "X-Accepted-OAuth-Scopes", "WWW-Authenticate"];

/// A live-discovered description of what the current credential may do.
#[derive(Debug, Clone)]
pub struct PermissionSnapshot {
    pub discovered_at: SystemTime,
    pub scopes: HashSet<String>,
    pub raw_headers: HashMap<String, String>,
    pub allowed_operations: HashMap<String, bool>,
}

impl PermissionSnapshot {
    /// An absent/empty snapshot means "do not filter" (spec §3).
    #[must_use]
    pub fn empty() -> Self {
        PermissionSnapshot {
            discovered_at: SystemTime::UNIX_EPOCH,
            scopes: HashSet::new(),
            raw_headers: HashMap::new(),
            allowed_operations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty() && self.allowed_operations.is_empty()
    }
}

fn parse_scopes_header(value: &str) -> HashSet<String> {
    // covers both `X-OAuth-Scopes: repo, user` and a WWW-Authenticate
    // challenge carrying `scope="repo user"`.
    if let Some(start) = value.find("scope=") {
        let rest = &value[start + "scope=".len()..];
        let trimmed = rest.trim_matches('"');
        return trimmed
            .split_whitespace()
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .collect();
    }
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Probe `base_url` with `credential` applied and derive a
/// [`PermissionSnapshot`] from whatever scope-bearing headers come back.
/// Every probe path is tried in order; the first response (success or an
/// informative 4xx) stops the probe — a probe that never responds leaves an
/// empty snapshot, which is treated permissively downstream.
pub async fn discover(
    base_url: &str,
    credential: &Credential,
    config: &CoreConfig,
    policy: &UrlPolicy,
) -> PermissionSnapshot {
    let Ok(parsed_base) = url_validate::validate(base_url, policy) else {
        return PermissionSnapshot::empty();
    };

    let auth = crate::auth::apply(credential, &[]).unwrap_or_default();
    let client = crate::http_client::shared_client(config.http_timeout);

    for path in PROBE_PATHS {
        let Ok(url) = parsed_base.join(path) else {
            continue;
        };
        let mut req = client.get(url.as_str());
        for (k, v) in &auth.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        for (k, v) in &auth.query {
            req = req.query(&[(k, v)]);
        }

        let Ok(Ok(resp)) = tokio::time::timeout(config.http_timeout, req.send()).await else {
            continue;
        };
        if !resp.status().is_success() && !matches!(resp.status().as_u16(), 401 | 403) {
            continue;
        }

        let mut raw_headers = HashMap::new();
        let mut scopes = HashSet::new();
        for name in SCOPE_HEADERS {
            if let Some(value) = resp.headers().get(*name).and_then(|v| v.to_str().ok()) {
                raw_headers.insert((*name).to_string(), value.to_string());
                scopes.extend(parse_scopes_header(value));
            }
        }

        debug!(url = %url, scopes = ?scopes, "permission probe responded");
        return PermissionSnapshot {
            discovered_at: SystemTime::now(),
            scopes,
            raw_headers,
            allowed_operations: HashMap::new(),
        };
    }

    PermissionSnapshot::empty()
}

fn security_requirement_satisfied(req: &SecurityRequirement, scopes: &HashSet<String>) -> Option<bool> {
    if req.is_empty() {
        return Some(true);
    }
    for required_scopes in req.values() {
        if required_scopes.is_empty() {
            continue;
        }
        if required_scopes.iter().any(|s| scopes.contains(s)) {
            return Some(true);
        }
        return Some(false);
    }
    None
}

/// Walk every operation, evaluate its declared security requirements
/// against `snapshot.scopes`; record allow/deny. Permissive default: when
/// the mapping from scopes to operations is ambiguous (snapshot has no
/// scopes recorded at all, or the operation declares no security
/// requirement), mark allowed — the filter is a UX optimization, not a
/// security boundary (spec §9).
#[must_use]
pub fn filter(operations: &[Operation], snapshot: &PermissionSnapshot) -> HashMap<String, bool> {
    let mut allowed = HashMap::new();
    if snapshot.scopes.is_empty() {
        for op in operations {
            allowed.insert(op.operation_id.clone(), true);
        }
        return allowed;
    }

    for op in operations {
        if op.security.is_empty() {
            allowed.insert(op.operation_id.clone(), true);
            continue;
        }
        let any_satisfied = op
            .security
            .iter()
            .filter_map(|req| security_requirement_satisfied(req, &snapshot.scopes))
            .collect::<Vec<_>>();
        let decision = if any_satisfied.is_empty() {
            true
        } else {
            any_satisfied.into_iter().any(|ok| ok)
        };
        allowed.insert(op.operation_id.clone(), decision);
    }
    allowed
}

/// A permission refresh is bounded by a minimum interval so a caller
/// hammering `RefreshPermissions` in a loop doesn't re-probe the live API
/// every call.
#[must_use]
pub fn should_refresh(snapshot: &PermissionSnapshot, min_interval: Duration) -> bool {
    snapshot.is_empty()
        || snapshot
            .discovered_at
            .elapsed()
            .map(|elapsed| elapsed >= min_interval)
            .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ParameterMeta;
    use std::collections::HashMap as Map;

    fn op_with_security(id: &str, security: Vec<SecurityRequirement>) -> Operation {
        Operation {
            operation_id: id.to_string(),
            path: "/x".to_string(),
            method: "get".to_string(),
            parameters: Vec::<ParameterMeta>::new(),
            request_schema: None,
            request_body_required: false,
            response_schema: None,
            response_example: None,
            responses: Map::new(),
            tags: Vec::new(),
            security,
        }
    }

    #[test]
    fn empty_scopes_means_do_not_filter() {
        let ops = vec![op_with_security(
            "createIssue",
            vec![HashMap::from([("oauth".to_string(), vec!["write:issues".to_string()])])],
        )];
        let snapshot = PermissionSnapshot::empty();
        let allowed = filter(&ops, &snapshot);
        assert_eq!(allowed["createIssue"], true);
    }

    #[test]
    fn operation_requiring_ungranted_scope_is_denied() {
        let ops = vec![op_with_security(
            "createIssue",
            vec![HashMap::from([("oauth".to_string(), vec!["write:issues".to_string()])])],
        )];
        let mut scopes = HashSet::new();
        scopes.insert("read:issues".to_string());
        let snapshot = PermissionSnapshot {
            discovered_at: SystemTime::now(),
            scopes,
            raw_headers: HashMap::new(),
            allowed_operations: HashMap::new(),
        };
        let allowed = filter(&ops, &snapshot);
        assert_eq!(allowed["createIssue"], false);
    }

    #[test]
    fn operation_with_granted_scope_is_allowed() {
        let ops = vec![op_with_security(
            "listIssues",
            vec![HashMap::from([("oauth".to_string(), vec!["read:issues".to_string()])])],
        )];
        let mut scopes = HashSet::new();
        scopes.insert("read:issues".to_string());
        let snapshot = PermissionSnapshot {
            discovered_at: SystemTime::now(),
            scopes,
            raw_headers: HashMap::new(),
            allowed_operations: HashMap::new(),
        };
        let allowed = filter(&ops, &snapshot);
        assert_eq!(allowed["listIssues"], true);
    }

    #[test]
    fn operation_with_no_security_requirement_is_allowed() {
        let ops = vec![op_with_security("publicPing", vec![])];
        let mut scopes = HashSet::new();
        scopes.insert("read:issues".to_string());
        let snapshot = PermissionSnapshot {
            discovered_at: SystemTime::now(),
            scopes,
            raw_headers: HashMap::new(),
            allowed_operations: HashMap::new(),
        };
        assert_eq!(filter(&ops, &snapshot)["publicPing"], true);
    }

    #[test]
    fn parses_oauth_scopes_header() {
        let scopes = parse_scopes_header("repo, user, read:org");
        assert!(scopes.contains("repo"));
        assert!(scopes.contains("user"));
        assert!(scopes.contains("read:org"));
    }

    #[test]
    fn parses_www_authenticate_scope_challenge() {
        let scopes = parse_scopes_header(r#"Bearer realm="api", scope="repo user""#);
        assert!(scopes.contains("repo"));
        assert!(scopes.contains("user"));
    }

    #[test]
    fn should_refresh_when_snapshot_empty() {
        assert!(should_refresh(&PermissionSnapshot::empty(), Duration::from_secs(60)));
    }
}
