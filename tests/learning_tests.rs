//! # Learning store end-to-end
//!
//! # Test Coverage
//! S6: after one binding discovers a spec at a non-default path, a second
//! fresh binding against the same host and pattern store finds it via the
//! learned path alone — the server only exposes that one path, none of the
//! built-in common paths.
mod common;

use common::{MockResponse, MockServer, PING_SPEC};
use dyntool_core::{Credential, DiscoveryHints, DiscoveryStatus, ToolBinding, UrlPolicy};
use std::sync::Arc;

fn local_policy() -> UrlPolicy {
    UrlPolicy::allowing(["127.0.0.1"])
}

#[tokio::test]
async fn second_binding_reuses_first_bindings_learned_path() {
    let server = MockServer::start();
    let learned_path = "/v2/openapi.yaml";
    server.route("GET", learned_path, MockResponse::json(200, PING_SPEC));

    let pattern_store = Arc::new(dyntool_core::store::InMemoryPatternStore::new());
    let hinted_url = format!("{}{}", server.base_url(), learned_path);

    let first = ToolBinding::with_collaborators_and_policy(
        "widgets",
        server.base_url(),
        Credential::None,
        DiscoveryHints::with_openapi_url(hinted_url),
        dyntool_core::CoreConfig::default(),
        Arc::new(dyntool_core::store::InMemorySpecCache::new()),
        Arc::clone(&pattern_store),
        local_policy(),
    );
    let first_result = first.discover().await.expect("first discover");
    assert_eq!(first_result.status, DiscoveryStatus::Success);

    // A second, independent binding with no hint at all, sharing only the
    // pattern store: the mock server exposes nothing at any built-in common
    // path, so success here can only come from the learned path.
    let second = ToolBinding::with_collaborators_and_policy(
        "widgets",
        server.base_url(),
        Credential::None,
        DiscoveryHints::none(),
        dyntool_core::CoreConfig::default(),
        Arc::new(dyntool_core::store::InMemorySpecCache::new()),
        Arc::clone(&pattern_store),
        local_policy(),
    );
    let second_result = second.discover().await.expect("second discover");
    assert_eq!(second_result.status, DiscoveryStatus::Success);
    assert_eq!(
        second_result.spec_url,
        Some(format!("{}{}", server.base_url(), learned_path))
    );
    assert_eq!(second_result.metadata.get("strategy").map(String::as_str), Some("common_paths"));
}
