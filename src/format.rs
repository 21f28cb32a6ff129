//! # Format Detector (C2)
//!
//! Classifies a byte blob as one of the API description formats the
//! discovery engine might encounter, and converts the ones that can be
//! turned into an OpenAPI 3 document into one.

use crate::error::{CoreError, CoreResult};
use serde_json::Value;

/// The API description format a candidate byte blob was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    OpenApi3,
    Swagger2,
    CustomJson,
    Postman,
    Insomnia,
    Raml,
    ApiBlueprint,
    GraphQl,
    Unknown,
}

impl Format {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::OpenApi3 => "openapi3",
            Format::Swagger2 => "swagger2",
            Format::CustomJson => "custom-json",
            Format::Postman => "postman",
            Format::Insomnia => "insomnia",
            Format::Raml => "raml",
            Format::ApiBlueprint => "api-blueprint",
            Format::GraphQl => "graphql",
            Format::Unknown => "unknown",
        }
    }
}

/// Inspect a parsed JSON/YAML value and return the first matching format, if any.
fn classify_value(v: &Value) -> Option<Format> {
    if let Some(openapi) = v.get("openapi").and_then(Value::as_str) {
        if openapi.starts_with("3.") {
            return Some(Format::OpenApi3);
        }
    }
    if v.get("swagger").and_then(Value::as_str) == Some("2.0") {
        return Some(Format::Swagger2);
    }
    let schema_mentions_postman = v
        .get("info")
        .and_then(|i| i.get("schema"))
        .and_then(Value::as_str)
        .map(|s| s.contains("postman"))
        .unwrap_or(false);
    if schema_mentions_postman || v.get("_postman_id").is_some() {
        return Some(Format::Postman);
    }
    if v.get("_type")
        .and_then(Value::as_str)
        .map(|s| s.contains("export"))
        .unwrap_or(false)
    {
        return Some(Format::Insomnia);
    }
    for key in ["webServices", "apis", "endpoints", "services"] {
        if matches!(v.get(key), Some(Value::Array(_))) {
            return Some(Format::CustomJson);
        }
    }
    None
}

/// Detect the format of a candidate byte blob.
///
/// Detection order, first match wins: JSON-parse and inspect; YAML-parse and
/// apply the same rules; plain-text signatures for RAML, API Blueprint, and
/// GraphQL; otherwise [`Format::Unknown`].
#[must_use]
pub fn detect(bytes: &[u8]) -> Format {
    if let Ok(v) = serde_json::from_slice::<Value>(bytes) {
        if let Some(fmt) = classify_value(&v) {
            return fmt;
        }
    }
    if let Ok(v) = serde_yaml::from_slice::<Value>(bytes) {
        if let Some(fmt) = classify_value(&v) {
            return fmt;
        }
    }
    let text = String::from_utf8_lossy(bytes);
    if text.trim_start().starts_with("#%RAML") {
        return Format::Raml;
    }
    if text.contains("FORMAT:") && text.contains("HOST:") {
        return Format::ApiBlueprint;
    }
    if text.contains("type Query") || text.contains("schema {") {
        return Format::GraphQl;
    }
    Format::Unknown
}

/// A single entry in a custom-JSON API catalog, the shape this crate knows
/// how to synthesize into an OpenAPI path item.
#[derive(Debug, Clone)]
struct CustomCatalogEntry {
    name: String,
    path: String,
    method: String,
    params: Vec<String>,
}

fn extract_custom_entries(v: &Value) -> Vec<CustomCatalogEntry> {
    let mut out = Vec::new();
    for key in ["webServices", "apis", "endpoints", "services"] {
        let Some(Value::Array(items)) = v.get(key) else {
            continue;
        };
        for item in items {
            let name = item
                .get("name")
                .or_else(|| item.get("id"))
                .and_then(Value::as_str)
                .unwrap_or("unnamed")
                .to_string();
            let path = item
                .get("path")
                .or_else(|| item.get("url"))
                .or_else(|| item.get("endpoint"))
                .and_then(Value::as_str)
                .unwrap_or("/")
                .to_string();
            let method = item
                .get("method")
                .or_else(|| item.get("verb"))
                .and_then(Value::as_str)
                .unwrap_or("get")
                .to_ascii_lowercase();
            let params = item
                .get("params")
                .or_else(|| item.get("parameters"))
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(|p| {
                            p.as_str()
                                .map(str::to_string)
                                .or_else(|| p.get("name").and_then(Value::as_str).map(str::to_string))
                        })
                        .collect()
                })
                .unwrap_or_default();
            out.push(CustomCatalogEntry {
                name,
                path,
                method,
                params,
            });
        }
    }
    out
}

/// Convert a detected-format byte blob into an OpenAPI 3 JSON document.
///
/// `OpenApi3` passes through unchanged (still round-tripped through
/// `serde_json::Value` so whitespace/formatting differences don't matter).
/// `Swagger2` is handed to the caller's strict loader as-is — that loader
/// (the `oas3` crate) already promotes Swagger 2 documents. `CustomJson` is
/// synthesized into a document whose paths come from each catalog entry.
/// `Postman` and `Raml` are explicitly unsupported. All conversions attach
/// `base_url` as the first server entry when the source lacks one.
pub fn convert_to_openapi(bytes: &[u8], format: Format, base_url: &str) -> CoreResult<Value> {
    match format {
        Format::OpenApi3 | Format::Swagger2 => {
            let mut v: Value = serde_json::from_slice(bytes)
                .or_else(|_| serde_yaml::from_slice(bytes))
                .map_err(|e| CoreError::SpecParseFailed {
                    remaining_issues: vec![e.to_string()],
                })?;
            ensure_server(&mut v, base_url);
            Ok(v)
        }
        Format::CustomJson => {
            let v: Value = serde_json::from_slice(bytes)
                .or_else(|_| serde_yaml::from_slice(bytes))
                .map_err(|e| CoreError::SpecParseFailed {
                    remaining_issues: vec![e.to_string()],
                })?;
            let entries = extract_custom_entries(&v);
            Ok(synthesize_openapi(&entries, base_url))
        }
        Format::Postman | Format::Raml => Err(CoreError::UnsupportedFormat(format!(
            "{:?} conversion is not supported",
            format
        ))),
        Format::Insomnia | Format::ApiBlueprint | Format::GraphQl | Format::Unknown => Err(
            CoreError::UnsupportedFormat(format!("{:?} conversion is not supported", format)),
        ),
    }
}

fn ensure_server(v: &mut Value, base_url: &str) {
    let obj = match v.as_object_mut() {
        Some(o) => o,
        None => return,
    };
    let needs_server = match obj.get("servers") {
        Some(Value::Array(arr)) => arr.is_empty(),
        _ => true,
    };
    if needs_server {
        obj.insert(
            "servers".to_string(),
            serde_json::json!([{ "url": base_url }]),
        );
    }
}

fn synthesize_openapi(entries: &[CustomCatalogEntry], base_url: &str) -> Value {
    let mut paths = serde_json::Map::new();
    for entry in entries {
        let parameters: Vec<Value> = entry
            .params
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p,
                    "in": "query",
                    "required": false,
                    "schema": { "type": "string" }
                })
            })
            .collect();
        let operation = serde_json::json!({
            "operationId": entry.name,
            "parameters": parameters,
            "responses": {
                "200": { "description": "ok" }
            }
        });
        let path_item = paths
            .entry(entry.path.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(methods) = path_item {
            methods.insert(entry.method.clone(), operation);
        }
    }

    serde_json::json!({
        "openapi": "3.0.0",
        "info": { "title": "Converted custom API", "version": "1.0" },
        "servers": [{ "url": base_url }],
        "paths": Value::Object(paths),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_openapi3() {
        let bytes = br#"{"openapi":"3.0.0","info":{},"paths":{}}"#;
        assert_eq!(detect(bytes), Format::OpenApi3);
    }

    #[test]
    fn detects_swagger2() {
        let bytes = br#"{"swagger":"2.0","info":{},"paths":{}}"#;
        assert_eq!(detect(bytes), Format::Swagger2);
    }

    #[test]
    fn detects_postman_by_marker_field() {
        let bytes = br#"{"_postman_id":"abc","info":{"name":"x"}}"#;
        assert_eq!(detect(bytes), Format::Postman);
    }

    #[test]
    fn detects_custom_json_catalog() {
        let bytes = br#"{"endpoints":[{"name":"listThings","path":"/things","method":"get"}]}"#;
        assert_eq!(detect(bytes), Format::CustomJson);
    }

    #[test]
    fn detects_raml_by_hash_marker() {
        let bytes = b"#%RAML 1.0\ntitle: My API\n";
        assert_eq!(detect(bytes), Format::Raml);
    }

    #[test]
    fn detects_graphql_schema() {
        let bytes = b"schema {\n  query: Query\n}\ntype Query { hello: String }";
        assert_eq!(detect(bytes), Format::GraphQl);
    }

    #[test]
    fn unrecognized_bytes_are_unknown() {
        assert_eq!(detect(b"not a spec at all"), Format::Unknown);
    }

    #[test]
    fn custom_json_conversion_yields_one_path_per_entry() {
        let bytes = br#"{"endpoints":[
            {"name":"listThings","path":"/things","method":"get"},
            {"name":"createThing","path":"/things","method":"post","params":["name"]}
        ]}"#;
        let doc = convert_to_openapi(bytes, Format::CustomJson, "https://api.example.com").unwrap();
        let paths = doc["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 1);
        let things = paths["/things"].as_object().unwrap();
        assert!(things.contains_key("get"));
        assert!(things.contains_key("post"));
        assert_eq!(doc["servers"][0]["url"], "https://api.example.com");
    }

    #[test]
    fn postman_conversion_is_unsupported() {
        let bytes = br#"{"_postman_id":"abc","info":{"name":"x"}}"#;
        let err = convert_to_openapi(bytes, Format::Postman, "https://api.example.com").unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedFormat(_)));
    }
}
