//! RBAC Admin API Routes
//!
//! Groups, roles, role grants, memberships and legacy namespace grants of one
//! division. Every route requires `rbac-admin` in that division, and every
//! change is logged to the audit trail with Critical severity.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Extension, Json, Router,
};

use crate::app::AppState;
use crate::authz::guard::{require_division_permission, DivisionGuard};
use crate::authz::{Authorized, Permission};
use crate::db::admin;
use crate::errors::AppError;
use crate::events::log_activity;
use crate::models::rbac::*;
use crate::models::user::User;

// =============================================================================
// ROUTER
// =============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", delete(delete_division))
        // Groups
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/:group_id", delete(delete_group))
        .route("/groups/:group_id/members", get(list_members).post(add_member))
        .route("/groups/:group_id/members/:user_id", delete(remove_member))
        .route("/groups/:group_id/roles", post(assign_role))
        .route("/groups/:group_id/roles/:role_id", delete(unassign_role))
        // Roles
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:role_id", delete(delete_role))
        .route("/roles/:role_id/grants", get(get_role_grants).put(set_role_grants))
        .route("/roles/:role_id/permissions", post(grant_permission))
        .route("/roles/:role_id/permissions/:permission", delete(revoke_permission))
        .route("/roles/:role_id/games", post(assign_game))
        .route("/roles/:role_id/games/:game_id", delete(unassign_game))
        // Legacy namespace grants
        .route(
            "/users/:user_id/namespace-grants",
            get(list_namespace_grants).post(add_namespace_grant),
        )
        .route(
            "/users/:user_id/namespace-grants/:grant_id",
            delete(remove_namespace_grant),
        )
        .route_layer(middleware::from_fn_with_state(
            DivisionGuard::new(state, Permission::RbacAdmin),
            require_division_permission,
        ))
}

fn actor(authorized: &Authorized) -> Option<&str> {
    Some(authorized.principal.external_id.as_str())
}

// =============================================================================
// DIVISION
// =============================================================================

/// Delete the division and everything it owns
#[utoipa::path(
    delete,
    path = "/divisions/{division_id}",
    tag = "RBAC",
    params(("division_id" = i64, Path, description = "Division id")),
    responses(
        (status = 204, description = "Division deleted"),
        (status = 403, description = "Caller lacks rbac-admin"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_division(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path(division_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let division = admin::delete_division(&state.pool, division_id).await?;
    log_activity(&state.event_bus, "deleted", actor(&authorized), &division);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// GROUP ENDPOINTS
// =============================================================================

/// List the division's groups
#[utoipa::path(
    get,
    path = "/divisions/{division_id}/groups",
    tag = "RBAC",
    params(("division_id" = i64, Path, description = "Division id")),
    responses((status = 200, description = "Groups", body = Vec<Group>)),
    security(("bearerAuth" = []))
)]
pub async fn list_groups(
    State(state): State<AppState>,
    Path(division_id): Path<i64>,
) -> Result<Json<Vec<Group>>, AppError> {
    Ok(Json(admin::list_groups(&state.pool, division_id).await?))
}

/// Create a group
#[utoipa::path(
    post,
    path = "/divisions/{division_id}/groups",
    tag = "RBAC",
    params(("division_id" = i64, Path, description = "Division id")),
    request_body = GroupCreateRequest,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 409, description = "Group name already exists in the division"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path(division_id): Path<i64>,
    Json(req): Json<GroupCreateRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    let group = admin::create_group(&state.pool, division_id, &req.name).await?;
    log_activity(&state.event_bus, "created", actor(&authorized), &group);
    Ok((StatusCode::CREATED, Json(group)))
}

/// Delete a group
#[utoipa::path(
    delete,
    path = "/divisions/{division_id}/groups/{group_id}",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("group_id" = i64, Path, description = "Group id"),
    ),
    responses((status = 204, description = "Group deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, group_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let group = admin::delete_group(&state.pool, division_id, group_id).await?;
    log_activity(&state.event_bus, "deleted", actor(&authorized), &group);
    Ok(StatusCode::NO_CONTENT)
}

/// List a group's members
#[utoipa::path(
    get,
    path = "/divisions/{division_id}/groups/{group_id}/members",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("group_id" = i64, Path, description = "Group id"),
    ),
    responses((status = 200, description = "Members", body = Vec<User>)),
    security(("bearerAuth" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    Path((division_id, group_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(
        admin::list_group_members(&state.pool, division_id, group_id).await?,
    ))
}

/// Add a user to a group
#[utoipa::path(
    post,
    path = "/divisions/{division_id}/groups/{group_id}/members",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("group_id" = i64, Path, description = "Group id"),
    ),
    request_body = MemberRequest,
    responses(
        (status = 201, description = "Member added"),
        (status = 400, description = "User belongs to another division"),
        (status = 409, description = "Already a member"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_member(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, group_id)): Path<(i64, i64)>,
    Json(req): Json<MemberRequest>,
) -> Result<StatusCode, AppError> {
    let assoc = admin::add_user_to_group(&state.pool, division_id, group_id, req.user_id).await?;
    log_activity(&state.event_bus, "added", actor(&authorized), &assoc);
    Ok(StatusCode::CREATED)
}

/// Remove a user from a group
#[utoipa::path(
    delete,
    path = "/divisions/{division_id}/groups/{group_id}/members/{user_id}",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("group_id" = i64, Path, description = "Group id"),
        ("user_id" = i64, Path, description = "User id"),
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 404, description = "Not a member"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, group_id, user_id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode, AppError> {
    let assoc = admin::remove_user_from_group(&state.pool, division_id, group_id, user_id).await?;
    log_activity(&state.event_bus, "removed", actor(&authorized), &assoc);
    Ok(StatusCode::NO_CONTENT)
}

/// Assign a role to a group
#[utoipa::path(
    post,
    path = "/divisions/{division_id}/groups/{group_id}/roles",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("group_id" = i64, Path, description = "Group id"),
    ),
    request_body = RoleAssignmentRequest,
    responses(
        (status = 201, description = "Role assigned"),
        (status = 409, description = "Role already assigned"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn assign_role(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, group_id)): Path<(i64, i64)>,
    Json(req): Json<RoleAssignmentRequest>,
) -> Result<StatusCode, AppError> {
    let assoc = admin::assign_role_to_group(&state.pool, division_id, group_id, req.role_id).await?;
    log_activity(&state.event_bus, "added", actor(&authorized), &assoc);
    Ok(StatusCode::CREATED)
}

/// Remove a role from a group
#[utoipa::path(
    delete,
    path = "/divisions/{division_id}/groups/{group_id}/roles/{role_id}",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("group_id" = i64, Path, description = "Group id"),
        ("role_id" = i64, Path, description = "Role id"),
    ),
    responses((status = 204, description = "Role removed from group")),
    security(("bearerAuth" = []))
)]
pub async fn unassign_role(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, group_id, role_id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode, AppError> {
    let assoc = admin::unassign_role_from_group(&state.pool, division_id, group_id, role_id).await?;
    log_activity(&state.event_bus, "removed", actor(&authorized), &assoc);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// ROLE ENDPOINTS
// =============================================================================

/// List the division's roles
#[utoipa::path(
    get,
    path = "/divisions/{division_id}/roles",
    tag = "RBAC",
    params(("division_id" = i64, Path, description = "Division id")),
    responses((status = 200, description = "Roles", body = Vec<Role>)),
    security(("bearerAuth" = []))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    Path(division_id): Path<i64>,
) -> Result<Json<Vec<Role>>, AppError> {
    Ok(Json(admin::list_roles(&state.pool, division_id).await?))
}

/// Create a role
#[utoipa::path(
    post,
    path = "/divisions/{division_id}/roles",
    tag = "RBAC",
    params(("division_id" = i64, Path, description = "Division id")),
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role name already exists in the division"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path(division_id): Path<i64>,
    Json(req): Json<RoleCreateRequest>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let role = admin::create_role(&state.pool, division_id, &req).await?;
    log_activity(&state.event_bus, "created", actor(&authorized), &role);
    Ok((StatusCode::CREATED, Json(role)))
}

/// Delete a role
#[utoipa::path(
    delete,
    path = "/divisions/{division_id}/roles/{role_id}",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("role_id" = i64, Path, description = "Role id"),
    ),
    responses((status = 204, description = "Role deleted")),
    security(("bearerAuth" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, role_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let role = admin::delete_role(&state.pool, division_id, role_id).await?;
    log_activity(&state.event_bus, "deleted", actor(&authorized), &role);
    Ok(StatusCode::NO_CONTENT)
}

/// A role's permission set and game set
#[utoipa::path(
    get,
    path = "/divisions/{division_id}/roles/{role_id}/grants",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("role_id" = i64, Path, description = "Role id"),
    ),
    responses((status = 200, description = "Role grants", body = RoleGrants)),
    security(("bearerAuth" = []))
)]
pub async fn get_role_grants(
    State(state): State<AppState>,
    Path((division_id, role_id)): Path<(i64, i64)>,
) -> Result<Json<RoleGrants>, AppError> {
    Ok(Json(admin::role_grants(&state.pool, division_id, role_id).await?))
}

/// Replace a role's permission set and game set
#[utoipa::path(
    put,
    path = "/divisions/{division_id}/roles/{role_id}/grants",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("role_id" = i64, Path, description = "Role id"),
    ),
    request_body = RoleGrants,
    responses(
        (status = 200, description = "Stored grants", body = RoleGrants),
        (status = 400, description = "A game belongs to another division"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_role_grants(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, role_id)): Path<(i64, i64)>,
    Json(req): Json<RoleGrants>,
) -> Result<Json<RoleGrants>, AppError> {
    let stored = admin::set_role_grants(&state.pool, division_id, role_id, &req).await?;
    let assoc = Association {
        kind: "role_grants",
        left_id: role_id,
        right: serde_json::to_string(&stored).unwrap_or_default(),
        created_at: chrono::Utc::now(),
    };
    log_activity(&state.event_bus, "updated", actor(&authorized), &assoc);
    Ok(Json(stored))
}

/// Grant one permission to a role
#[utoipa::path(
    post,
    path = "/divisions/{division_id}/roles/{role_id}/permissions",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("role_id" = i64, Path, description = "Role id"),
    ),
    request_body = PermissionGrantRequest,
    responses(
        (status = 201, description = "Permission granted"),
        (status = 400, description = "Unknown permission"),
        (status = 409, description = "Role already carries the permission"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_permission(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, role_id)): Path<(i64, i64)>,
    Json(req): Json<PermissionGrantRequest>,
) -> Result<StatusCode, AppError> {
    let permission = Permission::parse(&req.permission)?;
    let assoc = admin::grant_permission_to_role(&state.pool, division_id, role_id, permission).await?;
    log_activity(&state.event_bus, "added", actor(&authorized), &assoc);
    Ok(StatusCode::CREATED)
}

/// Revoke one permission from a role
#[utoipa::path(
    delete,
    path = "/divisions/{division_id}/roles/{role_id}/permissions/{permission}",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("role_id" = i64, Path, description = "Role id"),
        ("permission" = String, Path, description = "Catalog permission name"),
    ),
    responses((status = 204, description = "Permission revoked")),
    security(("bearerAuth" = []))
)]
pub async fn revoke_permission(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, role_id, permission)): Path<(i64, i64, String)>,
) -> Result<StatusCode, AppError> {
    let permission = Permission::parse(&permission)?;
    let assoc = admin::revoke_permission_from_role(&state.pool, division_id, role_id, permission).await?;
    log_activity(&state.event_bus, "removed", actor(&authorized), &assoc);
    Ok(StatusCode::NO_CONTENT)
}

/// Assign a game to a role
#[utoipa::path(
    post,
    path = "/divisions/{division_id}/roles/{role_id}/games",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("role_id" = i64, Path, description = "Role id"),
    ),
    request_body = GameAssignmentRequest,
    responses(
        (status = 201, description = "Game assigned"),
        (status = 400, description = "Game belongs to another division"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn assign_game(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, role_id)): Path<(i64, i64)>,
    Json(req): Json<GameAssignmentRequest>,
) -> Result<StatusCode, AppError> {
    let assoc = admin::assign_game_to_role(&state.pool, division_id, role_id, req.game_id).await?;
    log_activity(&state.event_bus, "added", actor(&authorized), &assoc);
    Ok(StatusCode::CREATED)
}

/// Remove a game from a role
#[utoipa::path(
    delete,
    path = "/divisions/{division_id}/roles/{role_id}/games/{game_id}",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("role_id" = i64, Path, description = "Role id"),
        ("game_id" = i64, Path, description = "Game id"),
    ),
    responses((status = 204, description = "Game removed from role")),
    security(("bearerAuth" = []))
)]
pub async fn unassign_game(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, role_id, game_id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode, AppError> {
    let assoc = admin::unassign_game_from_role(&state.pool, division_id, role_id, game_id).await?;
    log_activity(&state.event_bus, "removed", actor(&authorized), &assoc);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// LEGACY NAMESPACE GRANTS
// =============================================================================

/// List a user's namespace grants
#[utoipa::path(
    get,
    path = "/divisions/{division_id}/users/{user_id}/namespace-grants",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("user_id" = i64, Path, description = "User id"),
    ),
    responses((status = 200, description = "Namespace grants", body = Vec<NamespaceGrant>)),
    security(("bearerAuth" = []))
)]
pub async fn list_namespace_grants(
    State(state): State<AppState>,
    Path((division_id, user_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<NamespaceGrant>>, AppError> {
    Ok(Json(
        admin::list_namespace_grants(&state.pool, division_id, user_id).await?,
    ))
}

/// Grant a wildcard namespace to a user through one of the division's roles
#[utoipa::path(
    post,
    path = "/divisions/{division_id}/users/{user_id}/namespace-grants",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("user_id" = i64, Path, description = "User id"),
    ),
    request_body = NamespaceGrantRequest,
    responses(
        (status = 201, description = "Grant added", body = NamespaceGrant),
        (status = 400, description = "Malformed namespace"),
        (status = 409, description = "Grant already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_namespace_grant(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, user_id)): Path<(i64, i64)>,
    Json(req): Json<NamespaceGrantRequest>,
) -> Result<(StatusCode, Json<NamespaceGrant>), AppError> {
    let grant = admin::add_namespace_grant(&state.pool, division_id, user_id, &req).await?;
    log_activity(&state.event_bus, "created", actor(&authorized), &grant);
    Ok((StatusCode::CREATED, Json(grant)))
}

/// Remove a namespace grant
#[utoipa::path(
    delete,
    path = "/divisions/{division_id}/users/{user_id}/namespace-grants/{grant_id}",
    tag = "RBAC",
    params(
        ("division_id" = i64, Path, description = "Division id"),
        ("user_id" = i64, Path, description = "User id"),
        ("grant_id" = i64, Path, description = "Grant id"),
    ),
    responses((status = 204, description = "Grant removed")),
    security(("bearerAuth" = []))
)]
pub async fn remove_namespace_grant(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path((division_id, user_id, grant_id)): Path<(i64, i64, i64)>,
) -> Result<StatusCode, AppError> {
    let grant = admin::remove_namespace_grant(&state.pool, division_id, user_id, grant_id).await?;
    log_activity(&state.event_bus, "deleted", actor(&authorized), &grant);
    Ok(StatusCode::NO_CONTENT)
}
