//! Closed permission catalog.
//!
//! Every permission the resolver understands is listed here. Requests naming
//! anything else fail with [`AuthzError::UnknownPermission`] instead of being
//! quietly denied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthzError;

/// Bumped whenever a permission is added to or removed from [`Permission::ALL`].
pub const CATALOG_VERSION: u32 = 1;

/// Whether a permission is checked against a division or against one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    Division,
    Resource,
}

impl PermissionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionScope::Division => "division",
            PermissionScope::Resource => "resource",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// Manage groups, roles and grants of a division.
    RbacAdmin,
    /// Manage the user accounts of a division.
    AccountAdmin,
    /// Create and remove games in a division.
    GameAdmin,
    Create,
    Read,
    Update,
    Delete,
    /// Push a game's changes to production.
    ChangeProduction,
}

impl Permission {
    pub const ALL: [Permission; 8] = [
        Permission::RbacAdmin,
        Permission::AccountAdmin,
        Permission::GameAdmin,
        Permission::Create,
        Permission::Read,
        Permission::Update,
        Permission::Delete,
        Permission::ChangeProduction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::RbacAdmin => "rbac-admin",
            Permission::AccountAdmin => "account-admin",
            Permission::GameAdmin => "game-admin",
            Permission::Create => "create",
            Permission::Read => "read",
            Permission::Update => "update",
            Permission::Delete => "delete",
            Permission::ChangeProduction => "change-production",
        }
    }

    pub fn scope(&self) -> PermissionScope {
        match self {
            Permission::RbacAdmin | Permission::AccountAdmin | Permission::GameAdmin => {
                PermissionScope::Division
            }
            _ => PermissionScope::Resource,
        }
    }

    pub fn division_scoped() -> impl Iterator<Item = Permission> {
        Self::ALL
            .into_iter()
            .filter(|p| p.scope() == PermissionScope::Division)
    }

    pub fn resource_scoped() -> impl Iterator<Item = Permission> {
        Self::ALL
            .into_iter()
            .filter(|p| p.scope() == PermissionScope::Resource)
    }

    /// Look up a permission identifier, rejecting anything outside the catalog.
    pub fn parse(name: &str) -> Result<Self, AuthzError> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| AuthzError::UnknownPermission(name.to_string()))
    }

    /// Fails with `InvalidRequest` when the permission belongs to the other scope.
    pub fn expect_scope(&self, scope: PermissionScope) -> Result<(), AuthzError> {
        if self.scope() == scope {
            return Ok(());
        }
        Err(AuthzError::InvalidRequest(format!(
            "permission '{}' is {}-scoped, not {}-scoped",
            self.as_str(),
            self.scope().as_str(),
            scope.as_str()
        )))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Catalog entry as exposed by `GET /permissions`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogEntry {
    pub name: Permission,
    pub scope: PermissionScope,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Catalog {
    pub version: u32,
    pub permissions: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn current() -> Self {
        Self {
            version: CATALOG_VERSION,
            permissions: Permission::ALL
                .into_iter()
                .map(|p| CatalogEntry {
                    name: p,
                    scope: p.scope(),
                })
                .collect(),
        }
    }
}
