use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{build_resolver, Resolver};
use crate::config::AppConfig;
use crate::db::graph::GraphStore;
use crate::errors::AppError;
use crate::events::{init_event_bus, start_audit_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{accounts, auth, catalog, games, health, namespaces, rbac};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub resolver: Arc<dyn Resolver>,
    pub graph: GraphStore,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &AppConfig, event_bus: EventBus) -> Self {
        let graph = GraphStore::new(pool.clone(), config.store_timeout);
        let resolver = build_resolver(&config.authz_mode, graph.clone());
        Self {
            pool,
            jwt: Arc::new(config.jwt.clone()),
            resolver,
            graph,
            event_bus,
        }
    }

    /// Swap the resolver, keeping everything else.
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AppConfig::from_env()?;
    create_app_with_config(pool, &config).await
}

pub async fn create_app_with_config(pool: SqlitePool, config: &AppConfig) -> Result<Router, AppError> {
    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_audit_listener(rx, pool.clone()));

    let state = AppState::new(pool, config, event_bus);
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    // Each admin area is guarded by its own division-scoped permission.
    let division_routes = Router::new()
        .merge(rbac::routes(state.clone()))
        .merge(accounts::routes(state.clone()))
        .merge(games::division_routes(state.clone()));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/me", get(auth::me))
        .route("/permissions", get(catalog::list_permissions))
        .route("/namespaces/check", get(namespaces::check))
        .nest("/divisions/:division_id", division_routes)
        .nest("/games", games::resource_routes(state.clone()))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
