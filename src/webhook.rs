//! # Webhook Config Extractor (C12)
//!
//! Extracts a tool's webhook contract — which events it can raise, how the
//! payload is signed, which header carries the signature — from whatever
//! signals the spec actually carries: the OpenAPI 3.1 `webhooks` map,
//! per-operation `callbacks` (3.0), security schemes whose name mentions
//! "webhook"/"signature", and free-text hints in `info.description`.
//! Enabled only when at least one such signal is found (spec §4.12); the
//! signature itself is the caller's responsibility (spec §9 Open Question).

use once_cell::sync::Lazy;
use regex::Regex;

/// One event a tool's webhook contract can raise, with an optional schema
/// reference (`$ref` into `components.schemas`) describing its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub name: String,
    pub schema_ref: Option<String>,
}

/// The extracted webhook contract for a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub endpoint_path: String,
    pub auth_type: Option<String>,
    pub signature_header: Option<String>,
    pub signature_algorithm: Option<String>,
    pub events: Vec<WebhookEvent>,
}

static HMAC_ALGO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)hmac[-_]?(sha1|sha256|sha384|sha512)").expect("static regex"));
static SIGNATURE_HEADER_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(X-Hub-Signature(?:-256)?|X-[\w-]*-Signature)").expect("static regex"));

fn endpoint_path(tool_id: &str) -> String {
    format!("/api/webhooks/tools/{tool_id}")
}

fn events_from_webhooks_map(webhooks: &serde_json::Value) -> Vec<WebhookEvent> {
    let Some(obj) = webhooks.as_object() else {
        return Vec::new();
    };
    obj.keys()
        .map(|name| WebhookEvent {
            name: name.clone(),
            schema_ref: webhooks
                .get(name)
                .and_then(|item| item.get("post"))
                .and_then(|op| op.get("requestBody"))
                .and_then(|rb| rb.get("content"))
                .and_then(|c| c.get("application/json"))
                .and_then(|mt| mt.get("schema"))
                .and_then(|s| s.get("$ref"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

fn events_from_callbacks(spec_json: &serde_json::Value) -> Vec<WebhookEvent> {
    let mut out = Vec::new();
    let Some(paths) = spec_json.get("paths").and_then(serde_json::Value::as_object) else {
        return out;
    };
    for path_item in paths.values() {
        let Some(methods) = path_item.as_object() else {
            continue;
        };
        for operation in methods.values() {
            let Some(callbacks) = operation.get("callbacks").and_then(serde_json::Value::as_object)
            else {
                continue;
            };
            for name in callbacks.keys() {
                out.push(WebhookEvent {
                    name: name.clone(),
                    schema_ref: None,
                });
            }
        }
    }
    out
}

fn find_webhook_security_scheme(spec_json: &serde_json::Value) -> Option<(String, String)> {
    let schemes = spec_json
        .get("components")?
        .get("securitySchemes")?
        .as_object()?;
    for (name, scheme) in schemes {
        let lower = name.to_ascii_lowercase();
        if lower.contains("webhook") || lower.contains("signature") {
            let auth_type = scheme
                .get("type")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("apiKey")
                .to_string();
            return Some((name.clone(), auth_type));
        }
    }
    None
}

fn scan_description_hints(description: &str) -> (Option<String>, Option<String>) {
    let algo = HMAC_ALGO
        .captures(description)
        .map(|c| format!("HMAC-{}", c[1].to_ascii_uppercase()));
    let header = SIGNATURE_HEADER_HINT
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    (algo, header)
}

/// Extract a tool's webhook config from its bound spec, represented here as
/// the raw `serde_json::Value` document (the shape both the 3.0 `callbacks`
/// map and the 3.1 `webhooks` top-level map need to be read from, neither of
/// which the `oas3` typed model exposes uniformly).
#[must_use]
pub fn extract(spec_json: &serde_json::Value, tool_id: &str) -> Option<WebhookConfig> {
    let mut events = Vec::new();
    if let Some(webhooks) = spec_json.get("webhooks") {
        events.extend(events_from_webhooks_map(webhooks));
    }
    events.extend(events_from_callbacks(spec_json));

    let security_signal = find_webhook_security_scheme(spec_json);
    let description = spec_json
        .get("info")
        .and_then(|i| i.get("description"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    let (description_algo, description_header) = scan_description_hints(description);

    let auth_type = security_signal.as_ref().map(|(_, ty)| ty.clone());
    let signature_header = security_signal
        .as_ref()
        .map(|(name, _)| name.clone())
        .or(description_header);
    let signature_algorithm = description_algo;

    let has_signal = !events.is_empty()
        || auth_type.is_some()
        || signature_header.is_some()
        || signature_algorithm.is_some();

    if !has_signal {
        return None;
    }

    Some(WebhookConfig {
        enabled: true,
        endpoint_path: endpoint_path(tool_id),
        auth_type,
        signature_header,
        signature_algorithm,
        events,
    })
}
