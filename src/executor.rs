//! # Action Executor (C11)
//!
//! Binds caller-supplied parameters into a concrete HTTP request, sends it
//! with bounded retries, and classifies the response into a structured
//! [`ExecutionOutcome`]. Grounded on the teacher's `RemoteApiKeyProvider`'s
//! TTL-cache-then-network pattern and the crate-wide convention of sharing
//! one `reqwest::Client` per process.

use crate::auth::Credential;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::spec::Operation;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Tool-name fragments that signal the "nested parameters" body convention:
/// the caller passes a single `parameters` object as the request body
/// rather than letting the executor assemble one from unconsumed params.
const NESTED_PARAMETER_TOOLS: &[&str] = &["workflow", "pipeline", "automation"];

/// Outcome of a single [`execute`] call, always populated with timing
/// information for audit even on failure (spec §7).
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub status_code: Option<u16>,
    pub headers: HashMap<String, String>,
    pub parsed_body: Option<Value>,
    pub raw_body: Option<String>,
    pub error_kind: Option<String>,
    pub duration: Duration,
    pub started_at: SystemTime,
}

impl ExecutionOutcome {
    fn failed(started_at: SystemTime, duration: Duration, error_kind: &str) -> Self {
        ExecutionOutcome {
            success: false,
            status_code: None,
            headers: HashMap::new(),
            parsed_body: None,
            raw_body: None,
            error_kind: Some(error_kind.to_string()),
            duration,
            started_at,
        }
    }
}

/// A caller-supplied parameter bag: values keyed by parameter name, plus
/// optional structured conveniences (`body`, `parameters`) consulted by the
/// body-construction step.
pub type ActionParams = HashMap<String, Value>;

pub(crate) fn param_as_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Execute `operation` against `base_url`, authenticating with `credential`,
/// per spec §4.11's eight-step procedure.
pub async fn execute(
    base_url: &str,
    operation: &Operation,
    params: &ActionParams,
    credential: &Credential,
    tool_name: &str,
    config: &CoreConfig,
) -> CoreResult<ExecutionOutcome> {
    let started_at = SystemTime::now();
    let start = Instant::now();

    // Step: required parameter missing -> MissingParameter before any I/O.
    for required in operation.required_parameter_names() {
        if !params.contains_key(required) {
            return Err(CoreError::MissingParameter {
                name: required.to_string(),
            });
        }
    }

    let mut consumed: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut path = operation.path.clone();
    let mut query: Vec<(String, String)> = Vec::new();
    let mut extra_headers: Vec<(String, String)> = Vec::new();

    for p in &operation.parameters {
        let Some(value) = params.get(&p.name) else {
            continue;
        };
        consumed.insert(p.name.clone());
        let rendered = param_as_string(value);
        match p.location {
            crate::spec::ParameterLocation::Path => {
                let placeholder = format!("{{{}}}", p.name);
                path = path.replace(&placeholder, &urlencoding::encode(&rendered));
            }
            crate::spec::ParameterLocation::Query => {
                query.push((p.name.clone(), rendered));
            }
            crate::spec::ParameterLocation::Header => {
                extra_headers.push((p.name.clone(), rendered));
            }
            crate::spec::ParameterLocation::Cookie => {
                extra_headers.push(("Cookie".to_string(), format!("{}={}", p.name, rendered)));
            }
        }
    }

    let is_write_method = matches!(
        operation.method.to_ascii_uppercase().as_str(),
        "POST" | "PUT" | "PATCH" | "DELETE"
    );
    let body = if is_write_method {
        build_request_body(tool_name, params, &consumed)
    } else {
        None
    };

    let mut url = format!("{}{}", base_url.trim_end_matches('/'), path);
    if !query.is_empty() {
        let qs: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        url.push('?');
        url.push_str(&qs.join("&"));
    }

    let auth = crate::auth::apply(credential, &[]).map_err(|_| CoreError::AuthenticationFailed)?;
    for (k, v) in &auth.query {
        let sep = if url.contains('?') { '&' } else { '?' };
        url.push(sep);
        url.push_str(&format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)));
    }

    let client = crate::http_client::shared_client(config.http_timeout);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let mut req = client.request(
            reqwest::Method::from_bytes(operation.method.to_ascii_uppercase().as_bytes())
                .unwrap_or(reqwest::Method::GET),
            &url,
        );
        for (k, v) in &auth.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        for (k, v) in &extra_headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some(b) = &body {
            req = req.header("Content-Type", "application/json").json(b);
        }

        let sent = tokio::time::timeout(config.http_timeout, req.send()).await;
        match sent {
            Err(_) => {
                if attempt >= config.max_retries {
                    return Ok(ExecutionOutcome::failed(started_at, start.elapsed(), "transport_timeout"));
                }
            }
            Ok(Err(e)) => {
                if attempt >= config.max_retries {
                    warn!(url = %url, error = %e, "execution transport error exhausted retries");
                    return Ok(ExecutionOutcome::failed(started_at, start.elapsed(), "transport_error"));
                }
            }
            Ok(Ok(resp)) => {
                let status = resp.status();
                let retryable_server_error = status.is_server_error();
                let headers: HashMap<String, String> = resp
                    .headers()
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                    .collect();
                let content_type = headers
                    .get("content-type")
                    .cloned()
                    .unwrap_or_default();

                let raw = resp.text().await.unwrap_or_default();
                let (parsed_body, raw_body) = if content_type.contains("json") {
                    match serde_json::from_str::<Value>(&raw) {
                        Ok(v) => (Some(v), None),
                        Err(_) => (None, Some(raw)),
                    }
                } else {
                    (None, Some(raw))
                };

                if status.is_success() {
                    debug!(url = %url, status = status.as_u16(), "execution succeeded");
                    return Ok(ExecutionOutcome {
                        success: true,
                        status_code: Some(status.as_u16()),
                        headers,
                        parsed_body,
                        raw_body,
                        error_kind: None,
                        duration: start.elapsed(),
                        started_at,
                    });
                }

                let should_retry = retryable_server_error
                    || matches!(status.as_u16(), 408 | 429);
                if !should_retry || attempt >= config.max_retries {
                    let kind = if status.is_client_error() {
                        "client_error"
                    } else {
                        "server_error"
                    };
                    return Ok(ExecutionOutcome {
                        success: false,
                        status_code: Some(status.as_u16()),
                        headers,
                        parsed_body,
                        raw_body,
                        error_kind: Some(kind.to_string()),
                        duration: start.elapsed(),
                        started_at,
                    });
                }
            }
        }

        let backoff = backoff_with_jitter(config, attempt);
        tokio::time::sleep(backoff).await;
    }
}

fn backoff_with_jitter(config: &CoreConfig, attempt: u32) -> Duration {
    let base = config
        .backoff_base
        .saturating_mul(1 << attempt.saturating_sub(1).min(20))
        .min(config.backoff_max);
    let jitter_frac = rand::thread_rng().gen_range(-0.2..=0.2);
    let millis = base.as_millis() as f64 * (1.0 + jitter_frac);
    Duration::from_millis(millis.max(0.0) as u64)
}

/// Build the write-method request body per spec §4.11 step 4: a
/// "nested-parameters" tool uses `params["parameters"]` verbatim; otherwise
/// an explicit `params["body"]` object is used as-is; otherwise unconsumed
/// params (those not already bound to path/query/header) become the JSON
/// body object.
fn build_request_body(
    tool_name: &str,
    params: &ActionParams,
    consumed: &std::collections::HashSet<String>,
) -> Option<Value> {
    let tool_lower = tool_name.to_ascii_lowercase();
    if NESTED_PARAMETER_TOOLS.iter().any(|t| tool_lower.contains(t)) {
        if let Some(nested) = params.get("parameters") {
            return Some(nested.clone());
        }
    }
    if let Some(Value::Object(obj)) = params.get("body") {
        return Some(Value::Object(obj.clone()));
    }

    let mut remaining = serde_json::Map::new();
    for (k, v) in params {
        if k == "body" || k == "parameters" || consumed.contains(k) {
            continue;
        }
        remaining.insert(k.clone(), v.clone());
    }
    if remaining.is_empty() {
        None
    } else {
        Some(Value::Object(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ParameterLocation, ParameterMeta};
    use std::collections::HashSet;

    fn get_op(id: &str, path: &str, required: &[&str]) -> Operation {
        Operation {
            operation_id: id.to_string(),
            path: path.to_string(),
            method: "get".to_string(),
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
            responses: HashMap::new(),
            tags: Vec::new(),
            security: Vec::new(),
        }
    }

    #[tokio::test]
    async fn missing_required_param_fails_before_network_io() {
        let op = get_op("getUser", "/users/{id}", &["id"]);
        let err = execute(
            "http://127.0.0.1:1",
            &op,
            &ActionParams::new(),
            &Credential::None,
            "tool",
            &CoreConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingParameter { name } if name == "id"));
    }

    #[test]
    fn nested_parameters_convention_uses_parameters_key_as_body() {
        let mut params = ActionParams::new();
        params.insert("parameters".to_string(), serde_json::json!({"a": 1}));
        let body = build_request_body("github_workflow_dispatch", &params, &HashSet::new());
        assert_eq!(body, Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn explicit_body_object_takes_precedence_over_unconsumed_params() {
        let mut params = ActionParams::new();
        params.insert("body".to_string(), serde_json::json!({"title": "hi"}));
        params.insert("extra".to_string(), serde_json::json!("ignored by this path"));
        let body = build_request_body("tool", &params, &HashSet::new());
        assert_eq!(body, Some(serde_json::json!({"title": "hi"})));
    }

    #[test]
    fn unconsumed_params_become_json_body() {
        let mut params = ActionParams::new();
        params.insert("id".to_string(), serde_json::json!("123"));
        params.insert("title".to_string(), serde_json::json!("hi"));
        let mut consumed = HashSet::new();
        consumed.insert("id".to_string());
        let body = build_request_body("tool", &params, &consumed);
        assert_eq!(body, Some(serde_json::json!({"title": "hi"})));
    }

    #[test]
    fn backoff_stays_within_configured_bounds() {
        let config = CoreConfig::default();
        for attempt in 1..=5 {
            let d = backoff_with_jitter(&config, attempt);
            assert!(d <= config.backoff_max + Duration::from_millis(1));
        }
    }
}
