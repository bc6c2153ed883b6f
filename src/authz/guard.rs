//! Request guards: turn an inbound call into an [`AccessRequest`], ask the
//! resolver, and either stop the request or hand the cleared scope on.
//!
//! Division routes use [`require_division_permission`] as a route layer; game
//! routes wrap each handler with [`require_game_permissions`]. Both insert an
//! [`Authorized`] extension for the handler.

use std::collections::HashMap;

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::catalog::Permission;
use super::decision::{AccessRequest, AuthzError, Decision};
use super::principal::{Authorized, Principal, ResourceScope};
use super::resolver::Resolver;
use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::principal_from_headers;

/// Evaluate one request and map the outcome onto the HTTP error surface.
///
/// Denials become `Forbidden`; evaluation failures keep their own status so
/// "denied by policy" and "could not evaluate" stay distinguishable.
pub async fn authorize(
    resolver: &dyn Resolver,
    principal: &Principal,
    request: AccessRequest,
) -> AppResult<Authorized> {
    match resolver.resolve(principal, &request).await {
        Ok(Decision::Allowed) => Ok(Authorized {
            principal: principal.clone(),
            scope: ResourceScope::from(&request),
        }),
        Ok(Decision::Denied { reason }) => {
            tracing::info!(
                principal = %principal,
                kind = request.kind(),
                request = ?request,
                reason = %reason,
                "authorization denied"
            );
            Err(AppError::forbidden(reason))
        }
        Err(err @ AuthzError::StoreUnavailable(_)) => {
            tracing::error!(principal = %principal, request = ?request, error = %err, "authorization could not be evaluated");
            Err(err.into())
        }
        Err(err) => {
            tracing::warn!(principal = %principal, request = ?request, error = %err, "authorization request rejected");
            Err(err.into())
        }
    }
}

fn path_id(params: &HashMap<String, String>, name: &str) -> AppResult<i64> {
    let raw = params
        .get(name)
        .ok_or_else(|| AppError::internal(format!("route has no :{name} parameter")))?;
    raw.parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("{name} must be an integer, got '{raw}'")))
}

#[derive(Clone)]
pub struct DivisionGuard {
    state: AppState,
    permission: Permission,
}

impl DivisionGuard {
    pub fn new(state: AppState, permission: Permission) -> Self {
        Self { state, permission }
    }
}

/// Requires the caller to hold a division-scoped permission in `:division_id`.
pub async fn require_division_permission(
    State(guard): State<DivisionGuard>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = principal_from_headers(request.headers(), &guard.state.jwt)?;
    let division_id = path_id(&params, "division_id")?;

    let authorized = authorize(
        guard.state.resolver.as_ref(),
        &principal,
        AccessRequest::Division {
            permission: guard.permission,
            division_id,
        },
    )
    .await?;

    request.extensions_mut().insert(authorized);
    Ok(next.run(request).await)
}

#[derive(Clone)]
pub struct GameGuard {
    state: AppState,
    permissions: &'static [Permission],
}

impl GameGuard {
    pub fn new(state: AppState, permissions: &'static [Permission]) -> Self {
        Self { state, permissions }
    }
}

/// Requires one role to grant every guarded permission on the game in `:id`.
pub async fn require_game_permissions(
    State(guard): State<GameGuard>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = principal_from_headers(request.headers(), &guard.state.jwt)?;
    let game_id = path_id(&params, "id")?;

    let authorized = authorize(
        guard.state.resolver.as_ref(),
        &principal,
        AccessRequest::Resource {
            game_id,
            permissions: guard.permissions.to_vec(),
        },
    )
    .await?;

    request.extensions_mut().insert(authorized);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::authz::AuthzResult;

    struct Fixed(AuthzResult<Decision>);

    #[async_trait]
    impl Resolver for Fixed {
        async fn resolve(&self, _: &Principal, _: &AccessRequest) -> AuthzResult<Decision> {
            self.0.clone()
        }
    }

    fn game_request() -> AccessRequest {
        AccessRequest::Resource {
            game_id: 7,
            permissions: vec![Permission::Read],
        }
    }

    #[tokio::test]
    async fn test_allow_attaches_scope() {
        let principal = Principal::new("ada@example.com");
        let authorized = authorize(&Fixed(Ok(Decision::Allowed)), &principal, game_request())
            .await
            .unwrap();
        assert_eq!(authorized.principal, principal);
        assert_eq!(authorized.scope, ResourceScope::Game { game_id: 7 });
    }

    #[tokio::test]
    async fn test_outcomes_stay_distinguishable() {
        let principal = Principal::new("ada@example.com");

        let denied = authorize(&Fixed(Ok(Decision::denied("nope"))), &principal, game_request()).await;
        assert!(matches!(denied, Err(AppError::Forbidden(reason)) if reason == "nope"));

        let missing = authorize(
            &Fixed(Err(AuthzError::PrincipalNotFound("ada@example.com".into()))),
            &principal,
            game_request(),
        )
        .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let down = authorize(
            &Fixed(Err(AuthzError::StoreUnavailable("timeout".into()))),
            &principal,
            game_request(),
        )
        .await;
        assert!(matches!(down, Err(AppError::Unavailable(_))));
    }

    #[test]
    fn test_path_id_parsing() {
        let mut params = HashMap::new();
        params.insert("division_id".to_string(), "12".to_string());
        params.insert("id".to_string(), "civ6".to_string());

        assert_eq!(path_id(&params, "division_id").unwrap(), 12);
        assert!(matches!(path_id(&params, "id"), Err(AppError::BadRequest(_))));
        assert!(matches!(path_id(&params, "game_id"), Err(AppError::Internal(_))));
    }
}
