//! Games: division-level catalogue management (`game-admin`) and
//! per-game resource endpoints guarded by resource-scoped permissions.

use axum::{
    extract::{Path, State},
    handler::Handler,
    http::StatusCode,
    middleware,
    routing::{get, put},
    Extension, Json, Router,
};

use crate::app::AppState;
use crate::authz::guard::{
    require_division_permission, require_game_permissions, DivisionGuard, GameGuard,
};
use crate::authz::{Authorized, Permission};
use crate::db::admin;
use crate::errors::AppError;
use crate::events::log_activity;
use crate::models::rbac::{Game, GameCreateRequest, GameUpdateRequest, ProductionUpdateRequest};

const READ: &[Permission] = &[Permission::Read];
const UPDATE: &[Permission] = &[Permission::Update];
const DELETE: &[Permission] = &[Permission::Delete];
/// Both must come from one role.
const CHANGE_PRODUCTION: &[Permission] = &[Permission::Update, Permission::ChangeProduction];

pub fn division_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route_layer(middleware::from_fn_with_state(
            DivisionGuard::new(state, Permission::GameAdmin),
            require_division_permission,
        ))
}

pub fn resource_routes(state: AppState) -> Router<AppState> {
    let guard = |permissions| GameGuard::new(state.clone(), permissions);

    Router::new()
        .route(
            "/:id",
            get(get_game.layer(middleware::from_fn_with_state(
                guard(READ),
                require_game_permissions,
            )))
            .put(update_game.layer(middleware::from_fn_with_state(
                guard(UPDATE),
                require_game_permissions,
            )))
            .delete(delete_game.layer(middleware::from_fn_with_state(
                guard(DELETE),
                require_game_permissions,
            ))),
        )
        .route(
            "/:id/production",
            put(set_production.layer(middleware::from_fn_with_state(
                guard(CHANGE_PRODUCTION),
                require_game_permissions,
            ))),
        )
}

fn actor(authorized: &Authorized) -> Option<&str> {
    Some(authorized.principal.external_id.as_str())
}

#[utoipa::path(
    get,
    path = "/divisions/{division_id}/games",
    tag = "Games",
    params(("division_id" = i64, Path, description = "Division id")),
    responses((status = 200, description = "Games owned by the division", body = Vec<Game>)),
    security(("bearerAuth" = []))
)]
pub async fn list_games(
    State(state): State<AppState>,
    Path(division_id): Path<i64>,
) -> Result<Json<Vec<Game>>, AppError> {
    Ok(Json(admin::list_games(&state.pool, division_id).await?))
}

#[utoipa::path(
    post,
    path = "/divisions/{division_id}/games",
    tag = "Games",
    params(("division_id" = i64, Path, description = "Division id")),
    request_body = GameCreateRequest,
    responses(
        (status = 201, description = "Game created", body = Game),
        (status = 409, description = "Game name already exists in the division"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_game(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path(division_id): Path<i64>,
    Json(req): Json<GameCreateRequest>,
) -> Result<(StatusCode, Json<Game>), AppError> {
    let game = admin::create_game(&state.pool, division_id, &req.name).await?;
    log_activity(&state.event_bus, "created", actor(&authorized), &game);
    Ok((StatusCode::CREATED, Json(game)))
}

/// Requires `read` on the game.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "Games",
    params(("id" = i64, Path, description = "Game id")),
    responses(
        (status = 200, description = "Game detail", body = Game),
        (status = 403, description = "No role grants read on this game"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Game>, AppError> {
    Ok(Json(admin::get_game(&state.pool, id).await?))
}

/// Requires `update` on the game.
#[utoipa::path(
    put,
    path = "/games/{id}",
    tag = "Games",
    params(("id" = i64, Path, description = "Game id")),
    request_body = GameUpdateRequest,
    responses(
        (status = 200, description = "Game updated", body = Game),
        (status = 403, description = "No role grants update on this game"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_game(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path(id): Path<i64>,
    Json(req): Json<GameUpdateRequest>,
) -> Result<Json<Game>, AppError> {
    let game = admin::rename_game(&state.pool, id, &req.name).await?;
    log_activity(&state.event_bus, "updated", actor(&authorized), &game);
    Ok(Json(game))
}

/// Requires one role granting both `update` and `change-production` on the game.
#[utoipa::path(
    put,
    path = "/games/{id}/production",
    tag = "Games",
    params(("id" = i64, Path, description = "Game id")),
    request_body = ProductionUpdateRequest,
    responses(
        (status = 200, description = "Production flag updated", body = Game),
        (status = 403, description = "No single role grants update and change-production"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_production(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path(id): Path<i64>,
    Json(req): Json<ProductionUpdateRequest>,
) -> Result<Json<Game>, AppError> {
    let game = admin::set_game_production(&state.pool, id, req.in_production).await?;
    log_activity(&state.event_bus, "updated", actor(&authorized), &game);
    Ok(Json(game))
}

/// Requires `delete` on the game.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "Games",
    params(("id" = i64, Path, description = "Game id")),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 403, description = "No role grants delete on this game"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_game(
    State(state): State<AppState>,
    Extension(authorized): Extension<Authorized>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let game = admin::delete_game(&state.pool, id).await?;
    log_activity(&state.event_bus, "deleted", actor(&authorized), &game);
    Ok(StatusCode::NO_CONTENT)
}
