use std::collections::BTreeSet;

use serde::Serialize;
use utoipa::ToSchema;

use crate::authz::Permission;
use crate::models::rbac::Group;
use crate::models::user::User;

/// A role as seen through one of the groups it is assigned to, with its
/// permission set and game set loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoleGrant {
    pub group_id: i64,
    pub role_id: i64,
    pub role_name: String,
    #[schema(value_type = Vec<Permission>)]
    pub permissions: BTreeSet<Permission>,
    #[schema(value_type = Vec<i64>)]
    pub game_ids: BTreeSet<i64>,
}

impl RoleGrant {
    pub fn carries_all(&self, permissions: &BTreeSet<Permission>) -> bool {
        permissions.is_subset(&self.permissions)
    }

    pub fn applies_to_game(&self, game_id: i64) -> bool {
        self.game_ids.contains(&game_id)
    }
}

/// The user's graph slice read for a single decision.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub user: User,
    pub roles: Vec<RoleGrant>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupAccess {
    pub group: Group,
    pub roles: Vec<RoleGrant>,
}

/// Who-am-I view: groups, their roles, and what each role grants.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessSummary {
    pub user: User,
    pub groups: Vec<GroupAccess>,
}
