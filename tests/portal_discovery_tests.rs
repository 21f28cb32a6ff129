//! # Multi-API portal discovery end-to-end scenario
//!
//! # Test Coverage
//! Exercises [`dyntool_core::ToolBinding::discover_portal`] (C5's multi-API
//! mode) against a portal page that links to two distinct specs.
//!
//! # Test Strategy
//! A single [`common::MockServer`] plays both the portal page and the two
//! linked specs; `discover_portal` fans out concurrently and is expected to
//! return both, deduplicated by spec URL.
mod common;

use common::{MockResponse, MockServer};
use dyntool_core::{Credential, DiscoveryStatus, ToolBinding, UrlPolicy};

fn local_policy() -> UrlPolicy {
    UrlPolicy::allowing(["127.0.0.1"])
}

const SPEC_A: &str = r#"{
    "openapi": "3.0.0",
    "info": { "title": "A", "version": "1" },
    "paths": { "/a-ping": { "get": { "operationId": "aPing", "responses": { "200": { "description": "ok" } } } } }
}"#;

const SPEC_B: &str = r#"{
    "openapi": "3.0.0",
    "info": { "title": "B", "version": "1" },
    "paths": { "/b-ping": { "get": { "operationId": "bPing", "responses": { "200": { "description": "ok" } } } } }
}"#;

/// S7: a portal page linking to `/a/swagger.json` and `/b/swagger.json`
/// yields both APIs, deduplicated by spec URL, with overall status Success.
#[tokio::test]
async fn portal_page_yields_both_linked_apis() {
    let server = MockServer::start();
    server.route(
        "GET",
        "/",
        MockResponse::html(
            200,
            r#"<html><body>
                <a href="/a/swagger.json">API A</a>
                <a href="/a/swagger.json">API A (duplicate link)</a>
                <a href="/b/swagger.json">API B</a>
            </body></html>"#,
        ),
    );
    server.route("GET", "/a/swagger.json", MockResponse::json(200, SPEC_A));
    server.route("GET", "/b/swagger.json", MockResponse::json(200, SPEC_B));

    let binding = ToolBinding::new_with_policy(
        "portal",
        server.base_url(),
        Credential::None,
        local_policy(),
    );

    let result = binding
        .discover_portal()
        .await
        .expect("discover_portal should not error");

    assert_eq!(result.status, DiscoveryStatus::Success);
    assert_eq!(result.discovered_apis.len(), 2);

    let mut urls: Vec<&str> = result
        .discovered_apis
        .iter()
        .map(|api| api.spec_url.as_str())
        .collect();
    urls.sort_unstable();
    assert_eq!(
        urls,
        vec![
            format!("{}/a/swagger.json", server.base_url()),
            format!("{}/b/swagger.json", server.base_url()),
        ]
    );
}

/// A portal page with no matching links and no specs at any common path
/// yields `ManualNeeded`, not a spurious success.
#[tokio::test]
async fn portal_with_no_links_yields_manual_needed() {
    let server = MockServer::start();
    server.route("GET", "/", MockResponse::html(200, "<html><body>nothing here</body></html>"));

    let binding = ToolBinding::new_with_policy(
        "portal",
        server.base_url(),
        Credential::None,
        local_policy(),
    );

    let result = binding
        .discover_portal()
        .await
        .expect("discover_portal should not error");

    assert_eq!(result.status, DiscoveryStatus::ManualNeeded);
    assert!(result.discovered_apis.is_empty());
}
