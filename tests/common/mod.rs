#![allow(dead_code)]

use std::time::Duration;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use publisher_api::db::admin;
use publisher_api::db::graph::GraphStore;
use publisher_api::models::rbac::{Division, Game, Group, Role, RoleCreateRequest, RoleGrants};
use publisher_api::models::user::{User, UserCreateRequest};
use publisher_api::authz::Permission;
use publisher_api::AppConfig;

pub const SECRET: &str = "test-secret";

/// Temp database with migrations applied. Keep `dir` alive for the test's duration.
pub struct TestDb {
    pub dir: TempDir,
    pub pool: SqlitePool,
}

pub async fn setup_db() -> Result<TestDb> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    Ok(TestDb { dir, pool })
}

pub fn store(pool: &SqlitePool) -> GraphStore {
    GraphStore::new(pool.clone(), Duration::from_secs(5))
}

pub fn config(extra: &[(&str, &str)]) -> Result<AppConfig> {
    let lookup = |key: &str| {
        if key == "JWT_SECRET" {
            return Some(SECRET.to_string());
        }
        extra
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    };
    Ok(AppConfig::from_lookup(lookup)?)
}

pub async fn app(pool: &SqlitePool) -> Result<Router> {
    let cfg = config(&[])?;
    Ok(publisher_api::create_app_with_config(pool.clone(), &cfg).await?)
}

pub fn token(external_id: &str) -> Result<String> {
    Ok(config(&[])?.jwt.encode(external_id)?)
}

pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok((status, value))
}

/// Civ6 scenario: `ada@firaxis.com` in group civ-devs of Firaxis, whose role
/// civ-editor grants read, update and delete on Civ6 only.
pub struct Firaxis {
    pub division: Division,
    pub ada: User,
    pub civ_devs: Group,
    pub civ_editor: Role,
    pub civ6: Game,
    pub xcom: Game,
}

pub async fn seed_firaxis(pool: &SqlitePool) -> Result<Firaxis> {
    let division = admin::create_division(pool, "Firaxis").await?;
    let ada = add_user(pool, division.id, "ada@firaxis.com").await?;
    let civ_devs = admin::create_group(pool, division.id, "civ-devs").await?;
    let civ6 = admin::create_game(pool, division.id, "Civilization VI").await?;
    let xcom = admin::create_game(pool, division.id, "XCOM 2").await?;
    let civ_editor = add_role(
        pool,
        division.id,
        "civ-editor",
        &[Permission::Read, Permission::Update, Permission::Delete],
        &[civ6.id],
    )
    .await?;

    admin::assign_role_to_group(pool, division.id, civ_devs.id, civ_editor.id).await?;
    admin::add_user_to_group(pool, division.id, civ_devs.id, ada.id).await?;

    Ok(Firaxis {
        division,
        ada,
        civ_devs,
        civ_editor,
        civ6,
        xcom,
    })
}

pub async fn add_user(pool: &SqlitePool, division_id: i64, external_id: &str) -> Result<User> {
    Ok(admin::create_user(
        pool,
        division_id,
        &UserCreateRequest {
            external_id: external_id.to_string(),
            name: external_id.to_string(),
        },
    )
    .await?)
}

pub async fn add_role(
    pool: &SqlitePool,
    division_id: i64,
    name: &str,
    permissions: &[Permission],
    game_ids: &[i64],
) -> Result<Role> {
    let role = admin::create_role(
        pool,
        division_id,
        &RoleCreateRequest {
            name: name.to_string(),
            description: None,
        },
    )
    .await?;
    admin::set_role_grants(
        pool,
        division_id,
        role.id,
        &RoleGrants {
            permissions: permissions.to_vec(),
            game_ids: game_ids.to_vec(),
        },
    )
    .await?;
    Ok(role)
}
