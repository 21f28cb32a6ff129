//! # Resource scope and permission filtering end-to-end
//!
//! # Test Coverage
//! S4 (resource-scope filtering narrows a `github_issues`-style binding's
//! action catalog to one resource type) and S5 (a live permission probe that
//! only grants `read:issues` hides the write operation from both
//! `list_actions` and `execute_action`).
//!
//! # Test Fixtures
//! A single mock server serving [`common::GITHUB_LIKE_SPEC`], optionally with
//! a gated `/me` probe endpoint that returns scope headers.
mod common;

use common::{GITHUB_LIKE_SPEC, MockResponse, MockServer};
use dyntool_core::{Credential, CoreError, ToolBinding, UrlPolicy};

fn local_policy() -> UrlPolicy {
    UrlPolicy::allowing(["127.0.0.1"])
}

async fn bound_and_discovered(server: &MockServer, tool_name: &str) -> ToolBinding {
    server.route("GET", "/swagger.json", MockResponse::json(200, GITHUB_LIKE_SPEC));
    let binding = ToolBinding::new_with_policy(tool_name, server.base_url(), Credential::None, local_policy());
    binding.discover().await.expect("discover should succeed");
    binding
}

/// S4: a tool named `github_issues` only sees issue operations, not `/users/{user}`.
#[tokio::test]
async fn resource_scope_narrows_catalog_to_one_resource_type() {
    let server = MockServer::start();
    let binding = bound_and_discovered(&server, "github_issues").await;

    let catalog = binding.list_actions().await.expect("list_actions");
    let operation_ids: Vec<&str> = catalog.iter().map(|e| e.operation_id.as_str()).collect();

    assert!(operation_ids.contains(&"repos_issues_list"));
    assert!(operation_ids.contains(&"repos_issues_create"));
    assert!(!operation_ids.contains(&"users_get"));
}

/// An unscoped tool name (no plural segment) sees every operation, including
/// the one a scoped binding would have filtered out.
#[tokio::test]
async fn unscoped_tool_name_sees_every_operation() {
    let server = MockServer::start();
    let binding = bound_and_discovered(&server, "github_api").await;

    let catalog = binding.list_actions().await.expect("list_actions");
    let operation_ids: Vec<&str> = catalog.iter().map(|e| e.operation_id.as_str()).collect();
    assert!(operation_ids.contains(&"users_get"));
}

/// S5: a credential that only probes as `read:issues` hides the
/// `write:issues`-gated create operation from the catalog, and executing it
/// directly is rejected with `PermissionDenied` rather than attempted.
#[tokio::test]
async fn permission_probe_hides_and_blocks_ungranted_write_operation() {
    let server = MockServer::start();
    let binding = bound_and_discovered(&server, "github_issues").await;

    server.route(
        "GET",
        "/me",
        MockResponse::json(200, "{}").with_header("X-OAuth-Scopes", "read:issues"),
    );
    let snapshot = binding.refresh_permissions().await.expect("refresh_permissions");
    assert!(snapshot.scopes.contains("read:issues"));

    let catalog = binding.list_actions().await.expect("list_actions");
    let create_entry = catalog
        .iter()
        .find(|e| e.operation_id == "repos_issues_create")
        .expect("create entry still present in the catalog");
    assert!(!create_entry.allowed, "create should be marked not-allowed, not hidden entirely");

    let list_entry = catalog
        .iter()
        .find(|e| e.operation_id == "repos_issues_list")
        .expect("list entry present");
    assert!(list_entry.allowed);

    let mut params = dyntool_core::ActionParams::new();
    params.insert("owner".to_string(), serde_json::json!("acme"));
    params.insert("repo".to_string(), serde_json::json!("widgets"));
    let err = binding
        .execute_action(&create_entry.action_id, &params)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PermissionDenied { .. }));
}
