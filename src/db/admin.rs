//! Write side of the authorization graph.
//!
//! Every mutation runs in its own transaction. Associations are only allowed
//! between entities owned by the same division.

use std::collections::BTreeSet;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::authz::namespace::validate_pattern;
use crate::authz::Permission;
use crate::errors::{AppError, AppResult};
use crate::models::rbac::{
    Association, Division, Game, Group, NamespaceGrant, NamespaceGrantRequest, Role,
    RoleCreateRequest, RoleGrants,
};
use crate::models::user::{User, UserCreateRequest};

/// Entities that carry a `division_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owned {
    User,
    Group,
    Role,
    Game,
}

impl Owned {
    fn table(self) -> &'static str {
        match self {
            Owned::User => "users",
            Owned::Group => "access_groups",
            Owned::Role => "roles",
            Owned::Game => "games",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Owned::User => "user",
            Owned::Group => "group",
            Owned::Role => "role",
            Owned::Game => "game",
        }
    }
}

/// `NotFound` when the row is missing, `BadRequest` when another division owns it.
pub async fn ensure_owned(
    conn: &mut SqliteConnection,
    kind: Owned,
    id: i64,
    division_id: i64,
) -> AppResult<()> {
    let sql = format!("SELECT division_id FROM {} WHERE id = ?", kind.table());
    let owner: Option<i64> = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match owner {
        None => Err(AppError::not_found(format!("{} {} not found", kind.label(), id))),
        Some(owner) if owner != division_id => Err(AppError::bad_request(format!(
            "{} {} belongs to division {}, not {}",
            kind.label(),
            id,
            owner,
            division_id
        ))),
        Some(_) => Ok(()),
    }
}

async fn ensure_division(conn: &mut SqliteConnection, division_id: i64) -> AppResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM divisions WHERE id = ?")
        .bind(division_id)
        .fetch_optional(&mut *conn)
        .await?;
    exists
        .map(|_| ())
        .ok_or_else(|| AppError::not_found(format!("division {division_id} not found")))
}

async fn permission_id(conn: &mut SqliteConnection, permission: Permission) -> AppResult<i64> {
    sqlx::query_scalar("SELECT id FROM permissions WHERE name = ?")
        .bind(permission.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::internal(format!("permission '{permission}' is missing from the permissions table"))
        })
}

fn removed(rows: u64, what: String) -> AppResult<()> {
    if rows == 0 {
        Err(AppError::not_found(what))
    } else {
        Ok(())
    }
}

// =============================================================================
// DIVISIONS
// =============================================================================

pub async fn create_division(pool: &SqlitePool, name: &str) -> AppResult<Division> {
    let now = Utc::now();
    let id = sqlx::query("INSERT INTO divisions (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(now)
        .execute(pool)
        .await
        .map_err(|e| AppError::from_insert(e, format!("division '{name}'")))?
        .last_insert_rowid();

    Ok(Division {
        id,
        name: name.to_string(),
        created_at: now,
    })
}

pub async fn get_division(pool: &SqlitePool, division_id: i64) -> AppResult<Division> {
    sqlx::query_as::<_, Division>("SELECT id, name, created_at FROM divisions WHERE id = ?")
        .bind(division_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("division {division_id} not found")))
}

/// Removes the division and, through cascades, everything it owns.
pub async fn delete_division(pool: &SqlitePool, division_id: i64) -> AppResult<Division> {
    let division = get_division(pool, division_id).await?;
    sqlx::query("DELETE FROM divisions WHERE id = ?")
        .bind(division_id)
        .execute(pool)
        .await?;
    Ok(division)
}

// =============================================================================
// USERS
// =============================================================================

pub async fn create_user(
    pool: &SqlitePool,
    division_id: i64,
    req: &UserCreateRequest,
) -> AppResult<User> {
    if req.external_id.trim().is_empty() {
        return Err(AppError::bad_request("external_id must not be empty"));
    }

    let mut tx = pool.begin().await?;
    ensure_division(&mut tx, division_id).await?;

    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO users (division_id, external_id, name, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(division_id)
    .bind(&req.external_id)
    .bind(&req.name)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_insert(e, format!("user '{}'", req.external_id)))?
    .last_insert_rowid();

    tx.commit().await?;

    Ok(User {
        id,
        division_id,
        external_id: req.external_id.clone(),
        name: req.name.clone(),
        created_at: now,
    })
}

pub async fn list_users(pool: &SqlitePool, division_id: i64) -> AppResult<Vec<User>> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, division_id, external_id, name, created_at FROM users WHERE division_id = ? ORDER BY id",
    )
    .bind(division_id)
    .fetch_all(pool)
    .await?)
}

pub async fn delete_user(pool: &SqlitePool, division_id: i64, user_id: i64) -> AppResult<User> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::User, user_id, division_id).await?;

    let user = sqlx::query_as::<_, User>(
        "SELECT id, division_id, external_id, name, created_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(user)
}

// =============================================================================
// GROUPS
// =============================================================================

pub async fn create_group(pool: &SqlitePool, division_id: i64, name: &str) -> AppResult<Group> {
    let mut tx = pool.begin().await?;
    ensure_division(&mut tx, division_id).await?;

    let now = Utc::now();
    let id = sqlx::query("INSERT INTO access_groups (division_id, name, created_at) VALUES (?, ?, ?)")
        .bind(division_id)
        .bind(name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_insert(e, format!("group '{name}'")))?
        .last_insert_rowid();

    tx.commit().await?;

    Ok(Group {
        id,
        division_id,
        name: name.to_string(),
        created_at: now,
    })
}

pub async fn list_groups(pool: &SqlitePool, division_id: i64) -> AppResult<Vec<Group>> {
    Ok(sqlx::query_as::<_, Group>(
        "SELECT id, division_id, name, created_at FROM access_groups WHERE division_id = ? ORDER BY name",
    )
    .bind(division_id)
    .fetch_all(pool)
    .await?)
}

pub async fn delete_group(pool: &SqlitePool, division_id: i64, group_id: i64) -> AppResult<Group> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Group, group_id, division_id).await?;

    let group = sqlx::query_as::<_, Group>(
        "SELECT id, division_id, name, created_at FROM access_groups WHERE id = ?",
    )
    .bind(group_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM access_groups WHERE id = ?")
        .bind(group_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(group)
}

// =============================================================================
// ROLES
// =============================================================================

pub async fn create_role(
    pool: &SqlitePool,
    division_id: i64,
    req: &RoleCreateRequest,
) -> AppResult<Role> {
    let mut tx = pool.begin().await?;
    ensure_division(&mut tx, division_id).await?;

    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO roles (division_id, name, description, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(division_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_insert(e, format!("role '{}'", req.name)))?
    .last_insert_rowid();

    tx.commit().await?;

    Ok(Role {
        id,
        division_id,
        name: req.name.clone(),
        description: req.description.clone(),
        created_at: now,
    })
}

pub async fn list_roles(pool: &SqlitePool, division_id: i64) -> AppResult<Vec<Role>> {
    Ok(sqlx::query_as::<_, Role>(
        "SELECT id, division_id, name, description, created_at FROM roles WHERE division_id = ? ORDER BY name",
    )
    .bind(division_id)
    .fetch_all(pool)
    .await?)
}

pub async fn delete_role(pool: &SqlitePool, division_id: i64, role_id: i64) -> AppResult<Role> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Role, role_id, division_id).await?;

    let role = sqlx::query_as::<_, Role>(
        "SELECT id, division_id, name, description, created_at FROM roles WHERE id = ?",
    )
    .bind(role_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM roles WHERE id = ?")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(role)
}

/// Current permission set and game set of a role.
pub async fn role_grants(pool: &SqlitePool, division_id: i64, role_id: i64) -> AppResult<RoleGrants> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Role, role_id, division_id).await?;
    let grants = load_role_grants(&mut tx, role_id).await?;
    tx.commit().await?;
    Ok(grants)
}

async fn load_role_grants(conn: &mut SqliteConnection, role_id: i64) -> AppResult<RoleGrants> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT p.name
          FROM role_permissions rp
          JOIN permissions p ON p.id = rp.permission_id
         WHERE rp.role_id = ?
         ORDER BY p.id
        "#,
    )
    .bind(role_id)
    .fetch_all(&mut *conn)
    .await?;

    let permissions = names
        .iter()
        .map(|n| Permission::parse(n))
        .collect::<Result<Vec<_>, _>>()?;

    let game_ids: Vec<i64> =
        sqlx::query_scalar("SELECT game_id FROM role_games WHERE role_id = ? ORDER BY game_id")
            .bind(role_id)
            .fetch_all(&mut *conn)
            .await?;

    Ok(RoleGrants {
        permissions,
        game_ids,
    })
}

/// Replace a role's permission set and game set in one transaction.
///
/// Duplicates in the request collapse; every game must belong to the role's division.
pub async fn set_role_grants(
    pool: &SqlitePool,
    division_id: i64,
    role_id: i64,
    grants: &RoleGrants,
) -> AppResult<RoleGrants> {
    let permissions: BTreeSet<Permission> = grants.permissions.iter().copied().collect();
    let game_ids: BTreeSet<i64> = grants.game_ids.iter().copied().collect();

    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Role, role_id, division_id).await?;
    for game_id in &game_ids {
        ensure_owned(&mut tx, Owned::Game, *game_id, division_id).await?;
    }

    sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM role_games WHERE role_id = ?")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;

    let now = Utc::now();
    for permission in &permissions {
        let pid = permission_id(&mut tx, *permission).await?;
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id, created_at) VALUES (?, ?, ?)")
            .bind(role_id)
            .bind(pid)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }
    for game_id in &game_ids {
        sqlx::query("INSERT INTO role_games (role_id, game_id, created_at) VALUES (?, ?, ?)")
            .bind(role_id)
            .bind(game_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
    }

    let stored = load_role_grants(&mut tx, role_id).await?;
    tx.commit().await?;
    Ok(stored)
}

// =============================================================================
// GAMES
// =============================================================================

pub async fn create_game(pool: &SqlitePool, division_id: i64, name: &str) -> AppResult<Game> {
    let mut tx = pool.begin().await?;
    ensure_division(&mut tx, division_id).await?;

    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO games (division_id, name, in_production, created_at, updated_at) VALUES (?, ?, 0, ?, ?)",
    )
    .bind(division_id)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_insert(e, format!("game '{name}'")))?
    .last_insert_rowid();

    tx.commit().await?;

    Ok(Game {
        id,
        division_id,
        name: name.to_string(),
        in_production: false,
        created_at: now,
        updated_at: now,
    })
}

pub async fn list_games(pool: &SqlitePool, division_id: i64) -> AppResult<Vec<Game>> {
    Ok(sqlx::query_as::<_, Game>(
        "SELECT id, division_id, name, in_production, created_at, updated_at FROM games WHERE division_id = ? ORDER BY name",
    )
    .bind(division_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_game(pool: &SqlitePool, game_id: i64) -> AppResult<Game> {
    sqlx::query_as::<_, Game>(
        "SELECT id, division_id, name, in_production, created_at, updated_at FROM games WHERE id = ?",
    )
    .bind(game_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("game {game_id} not found")))
}

pub async fn rename_game(pool: &SqlitePool, game_id: i64, name: &str) -> AppResult<Game> {
    let result = sqlx::query("UPDATE games SET name = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(Utc::now())
        .bind(game_id)
        .execute(pool)
        .await
        .map_err(|e| AppError::from_insert(e, format!("game '{name}'")))?;
    removed(result.rows_affected(), format!("game {game_id} not found"))?;
    get_game(pool, game_id).await
}

pub async fn set_game_production(pool: &SqlitePool, game_id: i64, in_production: bool) -> AppResult<Game> {
    let result = sqlx::query("UPDATE games SET in_production = ?, updated_at = ? WHERE id = ?")
        .bind(in_production)
        .bind(Utc::now())
        .bind(game_id)
        .execute(pool)
        .await?;
    removed(result.rows_affected(), format!("game {game_id} not found"))?;
    get_game(pool, game_id).await
}

pub async fn delete_game(pool: &SqlitePool, game_id: i64) -> AppResult<Game> {
    let game = get_game(pool, game_id).await?;
    sqlx::query("DELETE FROM games WHERE id = ?")
        .bind(game_id)
        .execute(pool)
        .await?;
    Ok(game)
}

// =============================================================================
// ASSOCIATIONS
// =============================================================================

pub async fn add_user_to_group(
    pool: &SqlitePool,
    division_id: i64,
    group_id: i64,
    user_id: i64,
) -> AppResult<Association> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Group, group_id, division_id).await?;
    ensure_owned(&mut tx, Owned::User, user_id, division_id).await?;

    let now = Utc::now();
    sqlx::query("INSERT INTO user_groups (user_id, group_id, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(group_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_insert(e, format!("user {user_id} in group {group_id}")))?;
    tx.commit().await?;

    Ok(Association {
        kind: "user_group",
        left_id: group_id,
        right: user_id.to_string(),
        created_at: now,
    })
}

pub async fn remove_user_from_group(
    pool: &SqlitePool,
    division_id: i64,
    group_id: i64,
    user_id: i64,
) -> AppResult<Association> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Group, group_id, division_id).await?;

    let result = sqlx::query("DELETE FROM user_groups WHERE user_id = ? AND group_id = ?")
        .bind(user_id)
        .bind(group_id)
        .execute(&mut *tx)
        .await?;
    removed(
        result.rows_affected(),
        format!("user {user_id} is not a member of group {group_id}"),
    )?;
    tx.commit().await?;

    Ok(Association {
        kind: "user_group",
        left_id: group_id,
        right: user_id.to_string(),
        created_at: Utc::now(),
    })
}

pub async fn list_group_members(
    pool: &SqlitePool,
    division_id: i64,
    group_id: i64,
) -> AppResult<Vec<User>> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Group, group_id, division_id).await?;
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.division_id, u.external_id, u.name, u.created_at
          FROM users u
          JOIN user_groups ug ON ug.user_id = u.id
         WHERE ug.group_id = ?
         ORDER BY u.id
        "#,
    )
    .bind(group_id)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(users)
}

pub async fn assign_role_to_group(
    pool: &SqlitePool,
    division_id: i64,
    group_id: i64,
    role_id: i64,
) -> AppResult<Association> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Group, group_id, division_id).await?;
    ensure_owned(&mut tx, Owned::Role, role_id, division_id).await?;

    let now = Utc::now();
    sqlx::query("INSERT INTO group_roles (group_id, role_id, created_at) VALUES (?, ?, ?)")
        .bind(group_id)
        .bind(role_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_insert(e, format!("role {role_id} on group {group_id}")))?;
    tx.commit().await?;

    Ok(Association {
        kind: "group_role",
        left_id: group_id,
        right: role_id.to_string(),
        created_at: now,
    })
}

pub async fn unassign_role_from_group(
    pool: &SqlitePool,
    division_id: i64,
    group_id: i64,
    role_id: i64,
) -> AppResult<Association> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Group, group_id, division_id).await?;

    let result = sqlx::query("DELETE FROM group_roles WHERE group_id = ? AND role_id = ?")
        .bind(group_id)
        .bind(role_id)
        .execute(&mut *tx)
        .await?;
    removed(
        result.rows_affected(),
        format!("role {role_id} is not assigned to group {group_id}"),
    )?;
    tx.commit().await?;

    Ok(Association {
        kind: "group_role",
        left_id: group_id,
        right: role_id.to_string(),
        created_at: Utc::now(),
    })
}

pub async fn grant_permission_to_role(
    pool: &SqlitePool,
    division_id: i64,
    role_id: i64,
    permission: Permission,
) -> AppResult<Association> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Role, role_id, division_id).await?;
    let pid = permission_id(&mut tx, permission).await?;

    let now = Utc::now();
    sqlx::query("INSERT INTO role_permissions (role_id, permission_id, created_at) VALUES (?, ?, ?)")
        .bind(role_id)
        .bind(pid)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_insert(e, format!("'{permission}' on role {role_id}")))?;
    tx.commit().await?;

    Ok(Association {
        kind: "role_permission",
        left_id: role_id,
        right: permission.to_string(),
        created_at: now,
    })
}

pub async fn revoke_permission_from_role(
    pool: &SqlitePool,
    division_id: i64,
    role_id: i64,
    permission: Permission,
) -> AppResult<Association> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Role, role_id, division_id).await?;
    let pid = permission_id(&mut tx, permission).await?;

    let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND permission_id = ?")
        .bind(role_id)
        .bind(pid)
        .execute(&mut *tx)
        .await?;
    removed(
        result.rows_affected(),
        format!("role {role_id} does not carry '{permission}'"),
    )?;
    tx.commit().await?;

    Ok(Association {
        kind: "role_permission",
        left_id: role_id,
        right: permission.to_string(),
        created_at: Utc::now(),
    })
}

pub async fn assign_game_to_role(
    pool: &SqlitePool,
    division_id: i64,
    role_id: i64,
    game_id: i64,
) -> AppResult<Association> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Role, role_id, division_id).await?;
    ensure_owned(&mut tx, Owned::Game, game_id, division_id).await?;

    let now = Utc::now();
    sqlx::query("INSERT INTO role_games (role_id, game_id, created_at) VALUES (?, ?, ?)")
        .bind(role_id)
        .bind(game_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_insert(e, format!("game {game_id} on role {role_id}")))?;
    tx.commit().await?;

    Ok(Association {
        kind: "role_game",
        left_id: role_id,
        right: game_id.to_string(),
        created_at: now,
    })
}

pub async fn unassign_game_from_role(
    pool: &SqlitePool,
    division_id: i64,
    role_id: i64,
    game_id: i64,
) -> AppResult<Association> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::Role, role_id, division_id).await?;

    let result = sqlx::query("DELETE FROM role_games WHERE role_id = ? AND game_id = ?")
        .bind(role_id)
        .bind(game_id)
        .execute(&mut *tx)
        .await?;
    removed(
        result.rows_affected(),
        format!("game {game_id} is not assigned to role {role_id}"),
    )?;
    tx.commit().await?;

    Ok(Association {
        kind: "role_game",
        left_id: role_id,
        right: game_id.to_string(),
        created_at: Utc::now(),
    })
}

// =============================================================================
// LEGACY NAMESPACE GRANTS
// =============================================================================

pub async fn add_namespace_grant(
    pool: &SqlitePool,
    division_id: i64,
    user_id: i64,
    req: &NamespaceGrantRequest,
) -> AppResult<NamespaceGrant> {
    validate_pattern(&req.namespace)?;

    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::User, user_id, division_id).await?;
    ensure_owned(&mut tx, Owned::Role, req.role_id, division_id).await?;

    let now = Utc::now();
    let id = sqlx::query(
        "INSERT INTO user_role_resources (user_id, role_id, namespace, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(req.role_id)
    .bind(&req.namespace)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        AppError::from_insert(
            e,
            format!("grant '{}' for user {} via role {}", req.namespace, user_id, req.role_id),
        )
    })?
    .last_insert_rowid();
    tx.commit().await?;

    Ok(NamespaceGrant {
        id,
        user_id,
        role_id: req.role_id,
        namespace: req.namespace.clone(),
        created_at: now,
    })
}

pub async fn list_namespace_grants(
    pool: &SqlitePool,
    division_id: i64,
    user_id: i64,
) -> AppResult<Vec<NamespaceGrant>> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::User, user_id, division_id).await?;
    let grants = sqlx::query_as::<_, NamespaceGrant>(
        "SELECT id, user_id, role_id, namespace, created_at FROM user_role_resources WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(grants)
}

pub async fn remove_namespace_grant(
    pool: &SqlitePool,
    division_id: i64,
    user_id: i64,
    grant_id: i64,
) -> AppResult<NamespaceGrant> {
    let mut tx = pool.begin().await?;
    ensure_owned(&mut tx, Owned::User, user_id, division_id).await?;

    let grant = sqlx::query_as::<_, NamespaceGrant>(
        "SELECT id, user_id, role_id, namespace, created_at FROM user_role_resources WHERE id = ? AND user_id = ?",
    )
    .bind(grant_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found(format!("namespace grant {grant_id} not found for user {user_id}")))?;

    sqlx::query("DELETE FROM user_role_resources WHERE id = ?")
        .bind(grant_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(grant)
}
