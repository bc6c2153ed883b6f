use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::Permission;
use crate::events::{Loggable, Severity};

// =============================================================================
// DIVISION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Division {
    pub id: i64,
    #[schema(example = "Firaxis")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Division {
    fn entity_type() -> &'static str { "division" }
    fn subject_id(&self) -> i64 { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

// =============================================================================
// GROUP
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Group {
    pub id: i64,
    pub division_id: i64,
    #[schema(example = "civ-devs")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Group {
    fn entity_type() -> &'static str { "group" }
    fn subject_id(&self) -> i64 { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GroupCreateRequest {
    #[schema(example = "civ-devs")]
    pub name: String,
}

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: i64,
    pub division_id: i64,
    #[schema(example = "civ-editor")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Role {
    fn entity_type() -> &'static str { "role" }
    fn subject_id(&self) -> i64 { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleCreateRequest {
    #[schema(example = "civ-editor")]
    pub name: String,
    #[schema(example = "Edit Civilization titles")]
    pub description: Option<String>,
}

/// Full replacement of a role's permission set and game set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleGrants {
    pub permissions: Vec<Permission>,
    pub game_ids: Vec<i64>,
}

// =============================================================================
// GAME
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Game {
    pub id: i64,
    pub division_id: i64,
    #[schema(example = "Civilization VI")]
    pub name: String,
    pub in_production: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Game {
    fn entity_type() -> &'static str { "game" }
    fn subject_id(&self) -> i64 { self.id }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GameCreateRequest {
    #[schema(example = "Civilization VI")]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GameUpdateRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductionUpdateRequest {
    pub in_production: bool,
}

// =============================================================================
// ASSOCIATIONS
// =============================================================================

/// One row of an association table, as recorded in the audit log.
#[derive(Debug, Clone, Serialize)]
pub struct Association {
    /// `user_group`, `group_role`, `role_permission`, `role_game` or `namespace_grant`
    pub kind: &'static str,
    pub left_id: i64,
    pub right: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Association {
    fn entity_type() -> &'static str { "association" }
    fn subject_id(&self) -> i64 { self.left_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

// =============================================================================
// LEGACY NAMESPACE GRANT
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NamespaceGrant {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    #[schema(example = "/firaxis/games/*")]
    pub namespace: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for NamespaceGrant {
    fn entity_type() -> &'static str { "namespace_grant" }
    fn subject_id(&self) -> i64 { self.user_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NamespaceGrantRequest {
    pub role_id: i64,
    #[schema(example = "/firaxis/games/*")]
    pub namespace: String,
}

// =============================================================================
// ASSOCIATION REQUESTS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct MemberRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleAssignmentRequest {
    pub role_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionGrantRequest {
    /// Catalog name, e.g. `change-production`
    #[schema(example = "read")]
    pub permission: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GameAssignmentRequest {
    pub game_id: i64,
}
