use std::sync::Arc;

use async_trait::async_trait;

use super::decision::{AccessRequest, AuthzResult, Decision};
use super::legacy::NamespaceResolver;
use super::principal::Principal;
use super::resolver::{validate_request, GraphResolver, Resolver};
use crate::db::graph::GraphStore;
use crate::errors::AppError;

/// Which resolver the service runs with. Chosen once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzMode {
    /// Evaluate the graph and namespace grants (production).
    Enforce,
    /// Allow every well-formed request (local development).
    AllowAll,
    /// Evaluate every request as the given external id (local development).
    FixedPrincipal(String),
}

impl AuthzMode {
    pub fn parse(mode: &str, fixed_principal: Option<&str>) -> Result<Self, AppError> {
        match mode.trim().to_lowercase().as_str() {
            "" | "enforce" | "strict" => Ok(AuthzMode::Enforce),
            "allow-all" | "off" => Ok(AuthzMode::AllowAll),
            "fixed-principal" => fixed_principal
                .filter(|p| !p.trim().is_empty())
                .map(|p| AuthzMode::FixedPrincipal(p.trim().to_string()))
                .ok_or_else(|| {
                    AppError::configuration(
                        "AUTHZ_FIXED_PRINCIPAL must be set when AUTHZ_MODE=fixed-principal",
                    )
                }),
            other => Err(AppError::configuration(format!(
                "unknown AUTHZ_MODE '{other}'"
            ))),
        }
    }
}

/// Sends namespace requests to the legacy resolver and everything else to
/// the graph resolver. The two models are never mixed in one decision.
#[derive(Debug, Clone)]
pub struct RoutingResolver {
    graph: GraphResolver,
    namespace: NamespaceResolver,
}

impl RoutingResolver {
    pub fn new(store: GraphStore) -> Self {
        Self {
            graph: GraphResolver::new(store.clone()),
            namespace: NamespaceResolver::new(store),
        }
    }
}

#[async_trait]
impl Resolver for RoutingResolver {
    async fn resolve(&self, principal: &Principal, request: &AccessRequest) -> AuthzResult<Decision> {
        match request {
            AccessRequest::Namespace { .. } => self.namespace.resolve(principal, request).await,
            _ => self.graph.resolve(principal, request).await,
        }
    }
}

/// Allows every request that passes shape validation.
#[derive(Debug, Clone, Default)]
pub struct AllowAllResolver;

#[async_trait]
impl Resolver for AllowAllResolver {
    async fn resolve(&self, principal: &Principal, request: &AccessRequest) -> AuthzResult<Decision> {
        validate_request(request)?;
        tracing::debug!(principal = %principal, request = ?request, "allow-all bypass");
        Ok(Decision::Allowed)
    }
}

/// Ignores the caller and evaluates every request as one configured principal.
#[derive(Clone)]
pub struct FixedPrincipalResolver {
    principal: Principal,
    inner: Arc<dyn Resolver>,
}

impl FixedPrincipalResolver {
    pub fn new(principal: Principal, inner: Arc<dyn Resolver>) -> Self {
        Self { principal, inner }
    }
}

#[async_trait]
impl Resolver for FixedPrincipalResolver {
    async fn resolve(&self, principal: &Principal, request: &AccessRequest) -> AuthzResult<Decision> {
        tracing::debug!(caller = %principal, acting_as = %self.principal, "fixed principal substitution");
        self.inner.resolve(&self.principal, request).await
    }
}

pub fn build_resolver(mode: &AuthzMode, store: GraphStore) -> Arc<dyn Resolver> {
    match mode {
        AuthzMode::Enforce => Arc::new(RoutingResolver::new(store)),
        AuthzMode::AllowAll => {
            tracing::warn!("authorization disabled: AUTHZ_MODE=allow-all");
            Arc::new(AllowAllResolver)
        }
        AuthzMode::FixedPrincipal(external_id) => {
            tracing::warn!(external_id = %external_id, "authorization pinned to a fixed principal");
            Arc::new(FixedPrincipalResolver::new(
                Principal::new(external_id.clone()),
                Arc::new(RoutingResolver::new(store)),
            ))
        }
    }
}
