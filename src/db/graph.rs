//! Read side of the authorization graph.
//!
//! Every public method runs its queries inside one transaction so a decision
//! sees a single snapshot of the graph, and is bounded by the store timeout.

use std::future::Future;
use std::time::Duration;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::authz::{AuthzError, AuthzResult, Permission};
use crate::db::row_parsers;
use crate::models::access::{AccessSummary, GraphSnapshot, GroupAccess, RoleGrant};
use crate::models::rbac::Group;
use crate::models::user::User;

const ROLE_GRANT_COLUMNS: &str = r#"
    SELECT gr.group_id AS group_id,
           r.id AS role_id,
           r.name AS role_name,
           (SELECT json_group_array(p.name)
              FROM role_permissions rp
              JOIN permissions p ON p.id = rp.permission_id
             WHERE rp.role_id = r.id) AS permissions,
           (SELECT json_group_array(rg.game_id)
              FROM role_games rg
             WHERE rg.role_id = r.id) AS game_ids
      FROM group_roles gr
      JOIN roles r ON r.id = gr.role_id
"#;

#[derive(Debug, Clone)]
pub struct GraphStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl GraphStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn bounded<T>(&self, work: impl Future<Output = AuthzResult<T>>) -> AuthzResult<T> {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(AuthzError::StoreUnavailable(format!(
                "graph query exceeded {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// The user plus every role reachable through groups owned by `division_id`.
    ///
    /// `None` when no user carries `external_id`.
    pub async fn division_snapshot(
        &self,
        external_id: &str,
        division_id: i64,
    ) -> AuthzResult<Option<GraphSnapshot>> {
        self.bounded(load_snapshot(&self.pool, external_id, Some(division_id)))
            .await
    }

    /// The user plus every role reachable through any of their groups.
    pub async fn resource_snapshot(&self, external_id: &str) -> AuthzResult<Option<GraphSnapshot>> {
        self.bounded(load_snapshot(&self.pool, external_id, None)).await
    }

    /// Legacy namespace grants of the user whose role carries `permission`.
    pub async fn namespace_grants(
        &self,
        external_id: &str,
        permission: Permission,
    ) -> AuthzResult<Option<(User, Vec<String>)>> {
        self.bounded(load_namespace_grants(&self.pool, external_id, permission))
            .await
    }

    /// Groups, roles, permissions and games of one user, for who-am-I views.
    pub async fn access_summary(&self, external_id: &str) -> AuthzResult<Option<AccessSummary>> {
        let Some(snapshot) = self
            .bounded(load_summary_parts(&self.pool, external_id))
            .await?
        else {
            return Ok(None);
        };
        let (user, groups, roles) = snapshot;

        let groups = groups
            .into_iter()
            .map(|group| GroupAccess {
                roles: roles
                    .iter()
                    .filter(|r| r.group_id == group.id)
                    .cloned()
                    .collect(),
                group,
            })
            .collect();

        Ok(Some(AccessSummary { user, groups }))
    }
}

async fn load_snapshot(
    pool: &SqlitePool,
    external_id: &str,
    division_id: Option<i64>,
) -> AuthzResult<Option<GraphSnapshot>> {
    let mut tx = pool.begin().await?;

    let Some(user) = find_user_by_external_id(&mut tx, external_id).await? else {
        return Ok(None);
    };
    let groups = list_groups_for_user(&mut tx, user.id, division_id).await?;
    let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
    let roles = list_roles_for_groups(&mut tx, &group_ids).await?;

    tx.commit().await?;
    Ok(Some(GraphSnapshot { user, roles }))
}

async fn load_namespace_grants(
    pool: &SqlitePool,
    external_id: &str,
    permission: Permission,
) -> AuthzResult<Option<(User, Vec<String>)>> {
    let mut tx = pool.begin().await?;

    let Some(user) = find_user_by_external_id(&mut tx, external_id).await? else {
        return Ok(None);
    };
    let namespaces: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT urr.namespace
          FROM user_role_resources urr
          JOIN role_permissions rp ON rp.role_id = urr.role_id
          JOIN permissions p ON p.id = rp.permission_id
         WHERE urr.user_id = ? AND p.name = ?
         ORDER BY urr.id
        "#,
    )
    .bind(user.id)
    .bind(permission.as_str())
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some((user, namespaces)))
}

type SummaryParts = (User, Vec<Group>, Vec<RoleGrant>);

async fn load_summary_parts(pool: &SqlitePool, external_id: &str) -> AuthzResult<Option<SummaryParts>> {
    let mut tx = pool.begin().await?;

    let Some(user) = find_user_by_external_id(&mut tx, external_id).await? else {
        return Ok(None);
    };
    let groups = list_groups_for_user(&mut tx, user.id, None).await?;
    let group_ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
    let roles = list_roles_for_groups(&mut tx, &group_ids).await?;

    tx.commit().await?;
    Ok(Some((user, groups, roles)))
}

pub async fn find_user_by_external_id(
    conn: &mut SqliteConnection,
    external_id: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, division_id, external_id, name, created_at FROM users WHERE external_id = ?",
    )
    .bind(external_id)
    .fetch_optional(conn)
    .await
}

/// Groups containing the user, optionally restricted to one owning division.
pub async fn list_groups_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    division_id: Option<i64>,
) -> Result<Vec<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT g.id, g.division_id, g.name, g.created_at
          FROM access_groups g
          JOIN user_groups ug ON ug.group_id = g.id
         WHERE ug.user_id = ?1
           AND (?2 IS NULL OR g.division_id = ?2)
         ORDER BY g.id
        "#,
    )
    .bind(user_id)
    .bind(division_id)
    .fetch_all(conn)
    .await
}

/// Roles assigned to any of `group_ids`, each with permissions and games loaded.
///
/// A role assigned to several of the groups appears once per group.
pub async fn list_roles_for_groups(
    conn: &mut SqliteConnection,
    group_ids: &[i64],
) -> AuthzResult<Vec<RoleGrant>> {
    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(ROLE_GRANT_COLUMNS);
    qb.push(" WHERE gr.group_id IN (");
    let mut ids = qb.separated(", ");
    for id in group_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY gr.group_id, r.id");

    let rows = qb.build().fetch_all(conn).await?;
    rows.iter().map(row_parsers::role_grant_from_row).collect()
}

/// Roles assigned to one group.
pub async fn list_roles_for_group(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> AuthzResult<Vec<RoleGrant>> {
    list_roles_for_groups(conn, &[group_id]).await
}
