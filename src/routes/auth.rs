use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::AuthzError;
use crate::errors::AppResult;
use crate::jwt::AuthUser;
use crate::models::access::AccessSummary;

/// Who-am-I: the caller's groups, each with the roles it grants.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current principal and its access", body = AccessSummary),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Token subject is not a known user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<AccessSummary>> {
    let summary = state
        .graph
        .access_summary(&auth.principal.external_id)
        .await?
        .ok_or_else(|| AuthzError::PrincipalNotFound(auth.principal.external_id.clone()))?;
    Ok(Json(summary))
}
