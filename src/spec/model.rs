//! # Operation Model
//!
//! The normalized view of an OpenAPI operation this crate indexes, resolves,
//! and executes against — grounded on the teacher's route-metadata extraction
//! (`resolve_schema_ref`, `expand_schema_refs`, `extract_request_schema`,
//! `extract_response_schema_and_example`, `extract_parameters`,
//! `extract_security_schemes`), generalized from building a code-generator's
//! `RouteMeta` into building an executable `Operation`.

use oas3::spec::{MediaTypeExamples, ObjectOrReference, Parameter, SecurityRequirement};
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
        }
    }
}

impl From<oas3::spec::ParameterIn> for ParameterLocation {
    fn from(loc: oas3::spec::ParameterIn) -> Self {
        match loc {
            oas3::spec::ParameterIn::Path => ParameterLocation::Path,
            oas3::spec::ParameterIn::Query => ParameterLocation::Query,
            oas3::spec::ParameterIn::Header => ParameterLocation::Header,
            oas3::spec::ParameterIn::Cookie => ParameterLocation::Cookie,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub schema: Option<Value>,
    pub example: Option<Value>,
}

pub type Responses = HashMap<u16, HashMap<String, ResponseSpec>>;

/// A single OpenAPI path+method unit, normalized for indexing and execution.
#[derive(Debug, Clone)]
pub struct Operation {
    pub operation_id: String,
    pub path: String,
    pub method: String,
    pub parameters: Vec<ParameterMeta>,
    pub request_schema: Option<Value>,
    pub request_body_required: bool,
    pub response_schema: Option<Value>,
    pub response_example: Option<Value>,
    pub responses: Responses,
    pub tags: Vec<String>,
    pub security: Vec<SecurityRequirement>,
}

impl Operation {
    /// Required path/query parameter names, the fingerprint C7's
    /// parameter-index keys resolution candidates on.
    #[must_use]
    pub fn required_parameter_names(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// Resolve a JSON Schema `$ref` against `components.schemas`.
pub fn resolve_schema_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::ObjectSchema> {
    let name = ref_path.strip_prefix("#/components/schemas/")?;
    spec.components
        .as_ref()?
        .schemas
        .get(name)
        .and_then(|schema_ref| match schema_ref {
            ObjectOrReference::Object(schema) => Some(schema),
            ObjectOrReference::Ref { .. } => None,
        })
}

/// Recursively expand `$ref` nodes in a JSON value tree in place.
pub fn expand_schema_refs(spec: &OpenApiV3Spec, value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(Value::as_str) {
                if let Some(schema) = resolve_schema_ref(spec, ref_path) {
                    if let Ok(mut expanded) = serde_json::to_value(schema) {
                        expand_schema_refs(spec, &mut expanded);
                        *value = expanded;
                        return;
                    }
                }
            }
            for v in obj.values_mut() {
                expand_schema_refs(spec, v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_schema_refs(spec, v);
            }
        }
        _ => {}
    }
}

fn resolve_parameter_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::Parameter> {
    let name = ref_path.strip_prefix("#/components/parameters/")?;
    spec.components
        .as_ref()?
        .parameters
        .get(name)
        .and_then(|param_ref| match param_ref {
            ObjectOrReference::Object(param) => Some(param),
            ObjectOrReference::Ref { .. } => None,
        })
}

fn extract_parameters(
    spec: &OpenApiV3Spec,
    params: &[ObjectOrReference<Parameter>],
) -> Vec<ParameterMeta> {
    let mut out = Vec::new();
    for p in params {
        let param = match p {
            ObjectOrReference::Object(obj) => Some(obj),
            ObjectOrReference::Ref { ref_path } => resolve_parameter_ref(spec, ref_path),
        };
        let Some(param) = param else { continue };
        let schema = param.schema.as_ref().and_then(|s| match s {
            ObjectOrReference::Object(obj) => serde_json::to_value(obj).ok(),
            ObjectOrReference::Ref { ref_path } => {
                resolve_schema_ref(spec, ref_path).and_then(|sch| serde_json::to_value(sch).ok())
            }
        });
        out.push(ParameterMeta {
            name: param.name.clone(),
            location: ParameterLocation::from(param.location),
            required: param.required.unwrap_or(false),
            schema,
        });
    }
    out
}

fn extract_request_schema(
    spec: &OpenApiV3Spec,
    operation: &oas3::spec::Operation,
) -> (Option<Value>, bool) {
    let mut required = false;
    let mut schema = operation.request_body.as_ref().and_then(|r| match r {
        ObjectOrReference::Object(req_body) => {
            required = req_body.required.unwrap_or(false);
            req_body.content.get("application/json").and_then(|media| {
                match media.schema.as_ref()? {
                    ObjectOrReference::Object(schema_obj) => serde_json::to_value(schema_obj).ok(),
                    ObjectOrReference::Ref { ref_path } => {
                        resolve_schema_ref(spec, ref_path).and_then(|s| serde_json::to_value(s).ok())
                    }
                }
            })
        }
        ObjectOrReference::Ref { .. } => None,
    });
    if let Some(val) = schema.as_mut() {
        expand_schema_refs(spec, val);
    }
    (schema, required)
}

fn extract_response_schema_and_example(
    spec: &OpenApiV3Spec,
    operation: &oas3::spec::Operation,
) -> (Option<Value>, Option<Value>, Responses) {
    let mut all: Responses = HashMap::new();
    let mut default_schema = None;
    let mut default_example = None;

    if let Some(responses_map) = operation.responses.as_ref() {
        for (status_str, resp_ref) in responses_map {
            let Ok(status) = status_str.parse::<u16>() else {
                continue;
            };
            let ObjectOrReference::Object(resp_obj) = resp_ref else {
                continue;
            };
            for (mt, media) in &resp_obj.content {
                let example = match &media.examples {
                    Some(MediaTypeExamples::Example { example }) => Some(example.clone()),
                    Some(MediaTypeExamples::Examples { examples }) => {
                        examples.iter().find_map(|(_, v)| match v {
                            ObjectOrReference::Object(obj) => obj.value.clone(),
                            ObjectOrReference::Ref { .. } => None,
                        })
                    }
                    None => None,
                };

                let mut schema = match media.schema.as_ref() {
                    Some(ObjectOrReference::Object(schema_obj)) => serde_json::to_value(schema_obj).ok(),
                    Some(ObjectOrReference::Ref { ref_path }) => {
                        resolve_schema_ref(spec, ref_path).and_then(|s| serde_json::to_value(s).ok())
                    }
                    None => None,
                };
                if let Some(val) = schema.as_mut() {
                    expand_schema_refs(spec, val);
                }

                all.entry(status).or_default().insert(
                    mt.clone(),
                    ResponseSpec {
                        schema: schema.clone(),
                        example: example.clone(),
                    },
                );

                if status == 200 && mt == "application/json" {
                    default_schema = schema;
                    default_example = example;
                }
            }
        }
    }

    if default_schema.is_none() {
        let mut statuses: Vec<u16> = all.keys().copied().collect();
        statuses.sort_unstable();
        if let Some((schema, example)) = statuses
            .iter()
            .filter(|s| (200..300).contains(*s))
            .find_map(|s| all.get(s).and_then(|m| m.get("application/json")))
            .map(|r| (r.schema.clone(), r.example.clone()))
        {
            default_schema = schema;
            default_example = example;
        }
    }

    if default_schema.is_none() {
        let mut statuses: Vec<u16> = all.keys().copied().collect();
        statuses.sort_unstable();
        'outer: for s in statuses.iter().filter(|s| (200..300).contains(*s)) {
            if let Some(mt_map) = all.get(s) {
                for r in mt_map.values() {
                    if r.schema.is_some() || r.example.is_some() {
                        default_schema = r.schema.clone();
                        default_example = r.example.clone();
                        break 'outer;
                    }
                }
            }
        }
    }

    (default_schema, default_example, all)
}

fn synthesize_operation_id(method: &str, path: &str) -> String {
    let slug = path
        .trim_matches('/')
        .replace(['/', '{', '}'], "_")
        .replace("__", "_");
    format!("{}_{}", method.to_ascii_lowercase(), slug)
}

/// Build an `Operation` entry for every path+method in a parsed spec,
/// synthesizing an operation id (`<method>_<path-with-/-and-braces-to->_>`)
/// wherever the spec omits one.
#[must_use]
pub fn build_operations(spec: &OpenApiV3Spec) -> Vec<Operation> {
    let mut operations = Vec::new();
    let Some(paths_map) = spec.paths.as_ref() else {
        return operations;
    };

    for (path, item) in paths_map {
        for (method_str, operation) in item.methods() {
            let method = method_str.to_string();
            let operation_id = operation
                .operation_id
                .clone()
                .unwrap_or_else(|| synthesize_operation_id(&method, path));

            let (request_schema, request_body_required) = extract_request_schema(spec, operation);
            let (response_schema, response_example, responses) =
                extract_response_schema_and_example(spec, operation);

            let security = if !operation.security.is_empty() {
                operation.security.clone()
            } else {
                spec.security.clone()
            };

            let mut parameters = Vec::new();
            parameters.extend(extract_parameters(spec, &item.parameters));
            parameters.extend(extract_parameters(spec, &operation.parameters));

            operations.push(Operation {
                operation_id,
                path: path.clone(),
                method,
                parameters,
                request_schema,
                request_body_required,
                response_schema,
                response_example,
                responses,
                tags: operation.tags.clone(),
                security,
            });
        }
    }

    operations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> OpenApiV3Spec {
        serde_json::from_value(json).expect("test spec should parse")
    }

    #[test]
    fn synthesizes_missing_operation_id() {
        let spec = parse(serde_json::json!({
            "openapi": "3.0.0",
            "info": { "title": "t", "version": "1" },
            "paths": {
                "/users/{id}": {
                    "get": { "responses": { "200": { "description": "ok" } } }
                }
            }
        }));
        let ops = build_operations(&spec);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation_id, "get_users_id");
    }

    #[test]
    fn keeps_explicit_operation_id() {
        let spec = parse(serde_json::json!({
            "openapi": "3.0.0",
            "info": { "title": "t", "version": "1" },
            "paths": {
                "/ping": {
                    "get": { "operationId": "ping", "responses": { "200": { "description": "ok" } } }
                }
            }
        }));
        let ops = build_operations(&spec);
        assert_eq!(ops[0].operation_id, "ping");
    }

    #[test]
    fn extracts_required_path_parameter() {
        let spec = parse(serde_json::json!({
            "openapi": "3.0.0",
            "info": { "title": "t", "version": "1" },
            "paths": {
                "/repos/{owner}/{repo}/issues": {
                    "get": {
                        "operationId": "listIssues",
                        "parameters": [
                            { "name": "owner", "in": "path", "required": true, "schema": { "type": "string" } },
                            { "name": "repo", "in": "path", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            }
        }));
        let ops = build_operations(&spec);
        let names = ops[0].required_parameter_names();
        assert_eq!(names, vec!["owner", "repo"]);
    }
}
