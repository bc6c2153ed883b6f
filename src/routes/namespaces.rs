use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::app::AppState;
use crate::authz::{Decision, NamespaceAction};
use crate::errors::AppResult;
use crate::jwt::AuthUser;

#[derive(Debug, Deserialize, IntoParams)]
pub struct NamespaceCheckQuery {
    /// Resource path, e.g. `/firaxis/games/civ6`
    pub path: String,
    pub action: NamespaceAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NamespaceCheckResponse {
    pub principal: String,
    pub path: String,
    pub action: NamespaceAction,
    #[serde(flatten)]
    pub decision: Decision,
}

/// Legacy namespace decision. A denial is a normal 200 answer here.
#[utoipa::path(
    get,
    path = "/namespaces/check",
    tag = "Namespaces",
    params(NamespaceCheckQuery),
    responses(
        (status = 200, description = "Decision for the path", body = NamespaceCheckResponse),
        (status = 400, description = "Malformed path"),
        (status = 404, description = "Token subject is not a known user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn check(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NamespaceCheckQuery>,
) -> AppResult<Json<NamespaceCheckResponse>> {
    let decision = state
        .resolver
        .namespace_permission(&auth.principal, query.action, &query.path)
        .await?;

    tracing::debug!(
        principal = %auth.principal,
        path = %query.path,
        action = ?query.action,
        allowed = decision.is_allowed(),
        "namespace check"
    );

    Ok(Json(NamespaceCheckResponse {
        principal: auth.principal.external_id,
        path: query.path,
        action: query.action,
        decision,
    }))
}
