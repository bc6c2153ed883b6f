//! User accounts of one division. Requires `account-admin`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get},
    Extension, Json, Router,
};

use crate::app::AppState;
use crate::authz::guard::{require_division_permission, DivisionGuard};
use crate::authz::{Authorized, Permission};
use crate::db::admin;
use crate::errors::AppError;
use crate::events::log_activity;
use crate::models::user::{User, UserCreateRequest};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:user_id", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(
            DivisionGuard::new(state, Permission::AccountAdmin),
            require_division_permission,
        ))
}

#[utoipa::path(
    get,
    path = "/divisions/{division_id}/users",
    tag = "Accounts",
    params(("division_id" = i64, Path, description = "Division id")),
    responses((status = 200, description = "Users owned by the division", body = Vec<User>)),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Path(division_id): Path<i64>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(admin::list_users(&state.pool, division_id).await?))
}

/// Register a user; the external id must be unique across all divisions.
#[utoipa::path(
    post,
    path = "/divisions/{division_id}/users",
    tag = "Accounts",
    params(("division_id" = i64, Path, description = "Division id")),
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 409, description = "External id already registered"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path(division_id): Path<i64>,
    Json(req): Json<UserCreateRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = admin::create_user(&state.pool, division_id, &req).await?;
    log_activity(
        &state.event_bus,
        "created",
        Some(authorized.principal.external_id.as_str()),
        &user,
    );
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    delete,
    path = "/divisions/{division_id}/users/{user_id}",
    tag = "Accounts",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("user_id" = i64, Path, description = "User id"),
    ),
    responses(
        (status = 204, description = "User and its memberships deleted"),
        (status = 400, description = "User belongs to another division"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, user_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let user = admin::delete_user(&state.pool, division_id, user_id).await?;
    log_activity(
        &state.event_bus,
        "deleted",
        Some(authorized.principal.external_id.as_str()),
        &user,
    );
    Ok(StatusCode::NO_CONTENT)
}
