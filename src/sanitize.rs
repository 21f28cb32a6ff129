//! # Spec Sanitizer (C3)
//!
//! Repairs common validation defects so a strict OpenAPI loader accepts a
//! candidate spec, per the component design's two-phase contract: byte-level
//! fixes run on the raw response body before any JSON/YAML parsing is
//! attempted ([`sanitize_bytes`]); model-level fixes run on the parsed value
//! after [`crate::format`] has converted it to an OpenAPI-3-shaped document
//! ([`sanitize_model`]). Both phases are bounded — byte size is capped
//! upstream by [`check_size`], nesting depth is capped here — so a
//! pathological or malicious input cannot exhaust the process (spec §9).

use crate::error::{CoreError, CoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Hard cap on `$ref`/object nesting depth during the model walk.
const MAX_DEPTH: usize = 200;

/// A single thing the sanitizer changed, surfaced to the caller rather than
/// silently discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeIssue {
    pub path: String,
    pub description: String,
}

impl SanitizeIssue {
    fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }
}

/// Result of sanitizing a raw document: the cleaned value plus everything
/// that was changed along the way.
#[derive(Debug, Clone)]
pub struct SanitizeReport {
    pub value: Value,
    pub issues: Vec<SanitizeIssue>,
}

/// Enforce the byte-size cap before any parsing is attempted.
pub fn check_size(bytes: &[u8], max_bytes: usize) -> CoreResult<()> {
    if bytes.len() > max_bytes {
        return Err(CoreError::SpecFetchFailed {
            attempts: 1,
            cause: crate::error::SpecFetchCause::TooLarge { limit: max_bytes },
        });
    }
    Ok(())
}

static HAS_OPENAPI_OR_SWAGGER_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:openapi|swagger)"\s*:"#).expect("static regex"));

// Anchored, non-greedy, bounded: matches a `"type":"string"` sibling
// immediately followed (same object, adjacent key) by a bare numeric
// `"example"` value, in either declaration order.
static STRING_TYPE_THEN_EXAMPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"("type"\s*:\s*"string"\s*,\s*"example"\s*:\s*)(-?\d+(?:\.\d+)?)(\s*[,}])"#)
        .expect("static regex")
});
static EXAMPLE_THEN_STRING_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"("example"\s*:\s*)(-?\d+(?:\.\d+)?)(\s*,\s*"type"\s*:\s*"string")"#)
        .expect("static regex")
});

/// Byte-level fixes, applied to the raw response body before any JSON/YAML
/// parsing is attempted:
///
/// - insert `"openapi":"3.0.0"` into the document object when neither
///   `openapi` nor `swagger` is present;
/// - quote numeric values appearing as `"example"` under a sibling
///   declaring `"type":"string"`.
///
/// Non-JSON-looking input (YAML, RAML, etc.) is returned unchanged — those
/// formats are handled by [`crate::format`] before reaching this stage, and
/// this sanitizer only ever grows the byte count by a small, bounded amount
/// (spec §8 invariant 4: size-non-increasing within a 2x factor).
#[must_use]
pub fn sanitize_bytes(bytes: &[u8]) -> (Vec<u8>, Vec<SanitizeIssue>) {
    let mut issues = Vec::new();
    let Ok(text) = std::str::from_utf8(bytes) else {
        return (bytes.to_vec(), issues);
    };
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return (bytes.to_vec(), issues);
    }

    let mut fixed = text.to_string();

    if !HAS_OPENAPI_OR_SWAGGER_KEY.is_match(&fixed) {
        if let Some(brace_pos) = fixed.find('{') {
            let insert_at = brace_pos + 1;
            fixed.insert_str(insert_at, r#""openapi":"3.0.0","#);
            issues.push(SanitizeIssue::new(
                "#",
                "inserted missing openapi version declaration",
            ));
        }
    }

    let before = fixed.clone();
    fixed = STRING_TYPE_THEN_EXAMPLE
        .replace_all(&fixed, |caps: &regex::Captures<'_>| {
            format!("{}\"{}\"{}", &caps[1], &caps[2], &caps[3])
        })
        .into_owned();
    fixed = EXAMPLE_THEN_STRING_TYPE
        .replace_all(&fixed, |caps: &regex::Captures<'_>| {
            format!("{}\"{}\"{}", &caps[1], &caps[2], &caps[3])
        })
        .into_owned();
    if fixed != before {
        issues.push(SanitizeIssue::new("#", "quoted numeric examples"));
    }

    (fixed.into_bytes(), issues)
}

/// Model-level fixes, applied after the document has parsed as JSON but
/// before it is strictly validated against the OpenAPI model:
///
/// - coerce `example` values to the schema's declared scalar type, and
///   recursively into object/array examples against their item/property
///   schemas;
/// - coerce `enum` values to the declared type;
/// - fill missing required `info.title`/`info.version` with defaults;
/// - allocate an empty `paths` object if missing;
/// - break `$ref` cycles and cap recursion depth so a pathological document
///   cannot exhaust the process.
#[must_use]
pub fn sanitize_model(mut value: Value) -> SanitizeReport {
    let mut issues = Vec::new();
    break_ref_cycles(&mut value, &mut Vec::new(), "#", &mut issues);
    cap_depth(&mut value, 0, "#", &mut issues);
    coerce_schema_scalars(&mut value, "#", &mut issues);
    fill_info_defaults(&mut value, &mut issues);
    ensure_paths(&mut value, &mut issues);
    SanitizeReport { value, issues }
}

/// Back-compat convenience wrapper running both phases on an already-parsed
/// value (byte-level fixes are a no-op here since there are no raw bytes to
/// patch).
#[must_use]
pub fn sanitize(value: Value) -> SanitizeReport {
    sanitize_model(value)
}

fn break_ref_cycles(
    value: &mut Value,
    ancestors: &mut Vec<String>,
    path: &str,
    issues: &mut Vec<SanitizeIssue>,
) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(r)) = map.get("$ref") {
                let target = r.clone();
                if ancestors.contains(&target) {
                    issues.push(SanitizeIssue::new(
                        path,
                        format!("broke $ref cycle back to {target}"),
                    ));
                    *map = Map::new();
                    map.insert(
                        "description".into(),
                        Value::String("cyclic reference removed".into()),
                    );
                    return;
                }
                ancestors.push(target);
                for (k, v) in map.iter_mut() {
                    break_ref_cycles(v, ancestors, &format!("{path}/{k}"), issues);
                }
                ancestors.pop();
            } else {
                for (k, v) in map.iter_mut() {
                    break_ref_cycles(v, ancestors, &format!("{path}/{k}"), issues);
                }
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter_mut().enumerate() {
                break_ref_cycles(v, ancestors, &format!("{path}/{i}"), issues);
            }
        }
        _ => {}
    }
}

fn cap_depth(value: &mut Value, depth: usize, path: &str, issues: &mut Vec<SanitizeIssue>) {
    if depth >= MAX_DEPTH {
        if !matches!(value, Value::Null) {
            issues.push(SanitizeIssue::new(
                path,
                format!("truncated at depth {MAX_DEPTH}"),
            ));
            *value = Value::Null;
        }
        return;
    }
    match value {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                cap_depth(v, depth + 1, &format!("{path}/{k}"), issues);
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter_mut().enumerate() {
                cap_depth(v, depth + 1, &format!("{path}/{i}"), issues);
            }
        }
        _ => {}
    }
}

/// Coerce a scalar `Value` to `declared_type`, returning whether it changed.
/// Only unambiguous coercions are performed — a boolean is never guessed
/// from a number, for instance.
fn coerce_scalar(value: &mut Value, declared_type: &str) -> bool {
    match (declared_type, &*value) {
        ("string", Value::Number(n)) => {
            *value = Value::String(n.to_string());
            true
        }
        ("string", Value::Bool(b)) => {
            *value = Value::String(b.to_string());
            true
        }
        ("number", Value::String(s)) => {
            if let Ok(f) = s.parse::<f64>() {
                if let Some(n) = serde_json::Number::from_f64(f) {
                    *value = Value::Number(n);
                    return true;
                }
            }
            false
        }
        ("integer", Value::String(s)) => {
            if let Ok(i) = s.parse::<i64>() {
                *value = Value::Number(i.into());
                return true;
            }
            false
        }
        ("integer", Value::Number(n)) => {
            // float64 whole numbers -> int64, per spec §4.3.
            if let Some(f) = n.as_f64() {
                if n.as_i64().is_none() && f.fract() == 0.0 {
                    *value = Value::Number((f as i64).into());
                    return true;
                }
            }
            false
        }
        ("boolean", Value::String(s)) => match s.as_str() {
            "true" => {
                *value = Value::Bool(true);
                true
            }
            "false" => {
                *value = Value::Bool(false);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Recursively coerce an object/array example against its property/item
/// schemas, returning whether anything changed.
fn coerce_composite_example(example: &mut Value, schema: &Value) -> bool {
    let mut changed = false;
    let declared_type = schema.get("type").and_then(Value::as_str);
    match (declared_type, example) {
        (Some("object") | None, Value::Object(example_obj)) => {
            if let Some(Value::Object(props)) = schema.get("properties") {
                for (key, sub_schema) in props {
                    if let Some(val) = example_obj.get_mut(key) {
                        if let Some(ty) = sub_schema.get("type").and_then(Value::as_str) {
                            changed |= coerce_scalar(val, ty);
                        }
                        changed |= coerce_composite_example(val, sub_schema);
                    }
                }
            }
        }
        (Some("array") | None, Value::Array(items)) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items.iter_mut() {
                    if let Some(ty) = item_schema.get("type").and_then(Value::as_str) {
                        changed |= coerce_scalar(item, ty);
                    }
                    changed |= coerce_composite_example(item, item_schema);
                }
            }
        }
        _ => {}
    }
    changed
}

/// Walk every schema-shaped object in the document and coerce its
/// `example`/`enum` values against its own declared `type`.
fn coerce_schema_scalars(value: &mut Value, path: &str, issues: &mut Vec<SanitizeIssue>) {
    if let Value::Object(map) = value {
        let keys: Vec<String> = map.keys().cloned().collect();
        for k in &keys {
            if let Some(v) = map.get_mut(k) {
                coerce_schema_scalars(v, &format!("{path}/{k}"), issues);
            }
        }

        let declared_type = map.get("type").and_then(Value::as_str).map(str::to_string);
        let schema_snapshot = Value::Object(map.clone());

        if let Some(ty) = declared_type.as_deref() {
            if let Some(example) = map.get_mut("example") {
                let scalar_changed = coerce_scalar(example, ty);
                let composite_changed = coerce_composite_example(example, &schema_snapshot);
                if scalar_changed || composite_changed {
                    issues.push(SanitizeIssue::new(
                        format!("{path}/example"),
                        format!("coerced example to declared type {ty}"),
                    ));
                }
            }
            if let Some(Value::Array(variants)) = map.get_mut("enum") {
                let mut any = false;
                for v in variants.iter_mut() {
                    any |= coerce_scalar(v, ty);
                }
                if any {
                    issues.push(SanitizeIssue::new(
                        format!("{path}/enum"),
                        format!("coerced enum values to declared type {ty}"),
                    ));
                }
            }
        }
    }
}

fn fill_info_defaults(value: &mut Value, issues: &mut Vec<SanitizeIssue>) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    let info = obj
        .entry("info")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(info_obj) = info.as_object_mut() else {
        return;
    };

    let title_missing = info_obj
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .map(str::is_empty)
        .unwrap_or(true);
    if title_missing {
        info_obj.insert("title".into(), Value::String("Untitled API".into()));
        issues.push(SanitizeIssue::new("#/info/title", "filled missing info.title"));
    }

    let version_missing = info_obj
        .get("version")
        .and_then(Value::as_str)
        .map(str::trim)
        .map(str::is_empty)
        .unwrap_or(true);
    if version_missing {
        info_obj.insert("version".into(), Value::String("0.0.0".into()));
        issues.push(SanitizeIssue::new(
            "#/info/version",
            "filled missing info.version",
        ));
    }
}

fn ensure_paths(value: &mut Value, issues: &mut Vec<SanitizeIssue>) {
    let Some(obj) = value.as_object_mut() else {
        return;
    };
    if !matches!(obj.get("paths"), Some(Value::Object(_))) {
        obj.insert("paths".into(), Value::Object(Map::new()));
        issues.push(SanitizeIssue::new("#/paths", "allocated empty paths object"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_size_rejects_oversized_blobs() {
        let bytes = vec![0u8; 100];
        assert!(check_size(&bytes, 50).is_err());
        assert!(check_size(&bytes, 200).is_ok());
    }

    #[test]
    fn quotes_numeric_example_next_to_string_type() {
        let bytes = br#"{"openapi":"3.0.0","type":"string","example":20.04}"#;
        let (fixed, issues) = sanitize_bytes(bytes);
        let text = String::from_utf8(fixed).unwrap();
        assert!(text.contains(r#""example":"20.04""#));
        assert!(issues.iter().any(|i| i.description.contains("quoted numeric")));
    }

    #[test]
    fn inserts_missing_openapi_version() {
        let bytes = br#"{"info":{"title":"t","version":"1"},"paths":{}}"#;
        let (fixed, issues) = sanitize_bytes(bytes);
        let v: Value = serde_json::from_slice(&fixed).unwrap();
        assert_eq!(v["openapi"], "3.0.0");
        assert!(issues.iter().any(|i| i.description.contains("openapi version")));
    }

    #[test]
    fn leaves_swagger_documents_untouched() {
        let bytes = br#"{"swagger":"2.0","info":{},"paths":{}}"#;
        let (fixed, issues) = sanitize_bytes(bytes);
        assert_eq!(fixed, bytes);
        assert!(issues.is_empty());
    }

    #[test]
    fn coerces_integer_example_given_as_string() {
        let doc = serde_json::json!({
            "type": "integer",
            "example": "42"
        });
        let report = sanitize_model(doc);
        assert_eq!(report.value["example"], 42);
    }

    #[test]
    fn coerces_whole_float_example_to_int64_for_integer_type() {
        let doc = serde_json::json!({ "type": "integer", "example": 7.0 });
        let report = sanitize_model(doc);
        assert_eq!(report.value["example"], 7);
    }

    #[test]
    fn coerces_nested_object_example_against_properties() {
        let doc = serde_json::json!({
            "type": "object",
            "properties": {
                "age": { "type": "integer" }
            },
            "example": { "age": "30" }
        });
        let report = sanitize_model(doc);
        assert_eq!(report.value["example"]["age"], 30);
    }

    #[test]
    fn coerces_enum_values_to_declared_type() {
        let doc = serde_json::json!({
            "type": "integer",
            "enum": ["1", "2", "3"]
        });
        let report = sanitize_model(doc);
        assert_eq!(report.value["enum"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn fills_missing_info_title_and_version() {
        let doc = serde_json::json!({ "openapi": "3.0.0" });
        let report = sanitize_model(doc);
        assert_eq!(report.value["info"]["title"], "Untitled API");
        assert_eq!(report.value["info"]["version"], "0.0.0");
    }

    #[test]
    fn allocates_empty_paths_when_missing() {
        let doc = serde_json::json!({ "openapi": "3.0.0", "info": { "title": "t", "version": "1" } });
        let report = sanitize_model(doc);
        assert!(report.value["paths"].as_object().unwrap().is_empty());
    }

    #[test]
    fn breaks_direct_ref_cycle() {
        let doc = serde_json::json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "child": { "$ref": "#/components/schemas/Node" }
                        }
                    }
                }
            }
        });
        let report = sanitize_model(doc);
        assert!(!report.issues.is_empty());
        let child = &report.value["components"]["schemas"]["Node"]["properties"]["child"];
        assert!(child.get("$ref").is_none());
    }

    #[test]
    fn caps_pathological_nesting() {
        let mut deep = Value::String("leaf".into());
        for _ in 0..(MAX_DEPTH + 10) {
            let mut m = Map::new();
            m.insert("nested".into(), deep);
            deep = Value::Object(m);
        }
        let report = sanitize_model(deep);
        assert!(!report.issues.is_empty());
    }
}
