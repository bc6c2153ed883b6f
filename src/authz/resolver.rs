use std::collections::BTreeSet;

use async_trait::async_trait;

use super::catalog::{Permission, PermissionScope};
use super::decision::{AccessRequest, AuthzError, AuthzResult, Decision, NamespaceAction};
use super::principal::Principal;
use crate::db::graph::GraphStore;
use crate::models::access::RoleGrant;

/// Decides whether a principal may perform a request.
///
/// Implementations never turn an evaluation failure into a denial: store
/// errors, unknown principals and malformed requests come back as `Err`.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, principal: &Principal, request: &AccessRequest) -> AuthzResult<Decision>;

    /// Division-scoped check against groups owned by `division_id`.
    async fn division_permission(
        &self,
        principal: &Principal,
        permission: &str,
        division_id: i64,
    ) -> AuthzResult<Decision> {
        let permission = Permission::parse(permission)?;
        self.resolve(
            principal,
            &AccessRequest::Division {
                permission,
                division_id,
            },
        )
        .await
    }

    async fn resource_permission(
        &self,
        principal: &Principal,
        game_id: i64,
        permission: &str,
    ) -> AuthzResult<Decision> {
        self.resource_permission_all(principal, game_id, &[permission])
            .await
    }

    /// Allowed only when one role carries every permission and is assigned the game.
    async fn resource_permission_all(
        &self,
        principal: &Principal,
        game_id: i64,
        permissions: &[&str],
    ) -> AuthzResult<Decision> {
        if permissions.is_empty() {
            return Err(empty_permission_list());
        }
        let permissions = permissions
            .iter()
            .map(|p| Permission::parse(p))
            .collect::<AuthzResult<Vec<_>>>()?;
        self.resolve(
            principal,
            &AccessRequest::Resource {
                game_id,
                permissions,
            },
        )
        .await
    }

    async fn namespace_permission(
        &self,
        principal: &Principal,
        action: NamespaceAction,
        path: &str,
    ) -> AuthzResult<Decision> {
        self.resolve(
            principal,
            &AccessRequest::Namespace {
                action,
                path: path.to_string(),
            },
        )
        .await
    }

    async fn can_read_namespace(&self, principal: &Principal, path: &str) -> AuthzResult<bool> {
        Ok(self
            .namespace_permission(principal, NamespaceAction::Read, path)
            .await?
            .is_allowed())
    }

    async fn can_write_namespace(&self, principal: &Principal, path: &str) -> AuthzResult<bool> {
        Ok(self
            .namespace_permission(principal, NamespaceAction::Write, path)
            .await?
            .is_allowed())
    }
}

fn empty_permission_list() -> AuthzError {
    AuthzError::InvalidRequest("at least one permission must be requested".to_string())
}

/// Shape checks every resolver applies before deciding anything.
pub fn validate_request(request: &AccessRequest) -> AuthzResult<()> {
    match request {
        AccessRequest::Division { permission, .. } => {
            permission.expect_scope(PermissionScope::Division)
        }
        AccessRequest::Resource { permissions, .. } => {
            if permissions.is_empty() {
                return Err(empty_permission_list());
            }
            permissions
                .iter()
                .try_for_each(|p| p.expect_scope(PermissionScope::Resource))
        }
        AccessRequest::Namespace { path, .. } => {
            if path.starts_with('/') {
                Ok(())
            } else {
                Err(AuthzError::InvalidRequest(format!(
                    "resource path '{path}' must start with '/'"
                )))
            }
        }
    }
}

/// `roles` must already be limited to groups owned by the target division.
pub fn evaluate_division(roles: &[RoleGrant], permission: Permission) -> Decision {
    match roles.iter().find(|r| r.permissions.contains(&permission)) {
        Some(_) => Decision::Allowed,
        None => Decision::denied(format!(
            "no role in the division's groups carries '{permission}'"
        )),
    }
}

/// One role has to satisfy the whole request on its own; permissions spread
/// over several roles do not combine.
pub fn evaluate_resource(
    roles: &[RoleGrant],
    game_id: i64,
    required: &BTreeSet<Permission>,
) -> Decision {
    let satisfied = roles
        .iter()
        .any(|role| role.applies_to_game(game_id) && role.carries_all(required));
    if satisfied {
        return Decision::Allowed;
    }

    let names: Vec<&str> = required.iter().map(Permission::as_str).collect();
    Decision::denied(format!(
        "no single role grants [{}] on game {}",
        names.join(", "),
        game_id
    ))
}

/// Relational resolver over Division → Group → Role → Permission/Game.
#[derive(Debug, Clone)]
pub struct GraphResolver {
    store: GraphStore,
}

impl GraphResolver {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Resolver for GraphResolver {
    async fn resolve(&self, principal: &Principal, request: &AccessRequest) -> AuthzResult<Decision> {
        validate_request(request)?;

        let decision = match request {
            AccessRequest::Division {
                permission,
                division_id,
            } => {
                let snapshot = self
                    .store
                    .division_snapshot(&principal.external_id, *division_id)
                    .await?
                    .ok_or_else(|| AuthzError::PrincipalNotFound(principal.external_id.clone()))?;
                evaluate_division(&snapshot.roles, *permission)
            }
            AccessRequest::Resource {
                game_id,
                permissions,
            } => {
                let snapshot = self
                    .store
                    .resource_snapshot(&principal.external_id)
                    .await?
                    .ok_or_else(|| AuthzError::PrincipalNotFound(principal.external_id.clone()))?;
                let required: BTreeSet<Permission> = permissions.iter().copied().collect();
                evaluate_resource(&snapshot.roles, *game_id, &required)
            }
            AccessRequest::Namespace { .. } => {
                return Err(AuthzError::InvalidRequest(
                    "namespace requests are not served by the relational resolver".to_string(),
                ))
            }
        };

        tracing::debug!(
            principal = %principal,
            request = ?request,
            allowed = decision.is_allowed(),
            "graph decision"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CIV6: i64 = 1;
    const OTHER_GAME: i64 = 2;

    fn role(id: i64, permissions: &[Permission], games: &[i64]) -> RoleGrant {
        RoleGrant {
            group_id: 10,
            role_id: id,
            role_name: format!("role-{id}"),
            permissions: permissions.iter().copied().collect(),
            game_ids: games.iter().copied().collect(),
        }
    }

    fn set(permissions: &[Permission]) -> BTreeSet<Permission> {
        permissions.iter().copied().collect()
    }

    #[test]
    fn test_permissions_from_separate_roles_do_not_combine() {
        let roles = vec![
            role(1, &[Permission::Read], &[CIV6]),
            role(2, &[Permission::Update], &[CIV6]),
        ];

        assert!(!evaluate_resource(&roles, CIV6, &set(&[Permission::Read, Permission::Update])).is_allowed());
        assert!(evaluate_resource(&roles, CIV6, &set(&[Permission::Read])).is_allowed());
        assert!(evaluate_resource(&roles, CIV6, &set(&[Permission::Update])).is_allowed());
    }

    #[test]
    fn test_editor_scenario() {
        let roles = vec![role(
            1,
            &[Permission::Read, Permission::Update, Permission::Delete],
            &[CIV6],
        )];

        assert!(evaluate_resource(&roles, CIV6, &set(&[Permission::Read, Permission::Update])).is_allowed());
        assert!(!evaluate_resource(&roles, CIV6, &set(&[Permission::Read, Permission::ChangeProduction])).is_allowed());
        assert!(!evaluate_resource(&roles, OTHER_GAME, &set(&[Permission::Read])).is_allowed());
    }

    #[test]
    fn test_role_without_games_applies_to_nothing() {
        let roles = vec![role(1, &[Permission::Read], &[])];
        assert!(!evaluate_resource(&roles, CIV6, &set(&[Permission::Read])).is_allowed());
    }

    #[test]
    fn test_permission_and_game_must_be_on_the_same_role() {
        // Role 1 has the permission, role 2 has the game.
        let roles = vec![
            role(1, &[Permission::Read], &[OTHER_GAME]),
            role(2, &[Permission::Update], &[CIV6]),
        ];
        assert!(!evaluate_resource(&roles, CIV6, &set(&[Permission::Read])).is_allowed());
    }

    #[test]
    fn test_denial_names_the_request() {
        let decision = evaluate_resource(&[], CIV6, &set(&[Permission::Read]));
        match decision {
            Decision::Denied { reason } => assert!(reason.contains("read") && reason.contains("game 1")),
            Decision::Allowed => panic!("expected denial"),
        }
    }

    #[test]
    fn test_division_evaluation() {
        let roles = vec![role(1, &[Permission::AccountAdmin], &[])];
        assert!(evaluate_division(&roles, Permission::AccountAdmin).is_allowed());
        assert!(!evaluate_division(&roles, Permission::RbacAdmin).is_allowed());
        assert!(!evaluate_division(&[], Permission::RbacAdmin).is_allowed());
    }

    #[test]
    fn test_validate_request_shapes() {
        let empty = AccessRequest::Resource {
            game_id: CIV6,
            permissions: vec![],
        };
        assert!(matches!(validate_request(&empty), Err(AuthzError::InvalidRequest(_))));

        let wrong_scope = AccessRequest::Division {
            permission: Permission::Read,
            division_id: 1,
        };
        assert!(matches!(validate_request(&wrong_scope), Err(AuthzError::InvalidRequest(_))));

        let mixed = AccessRequest::Resource {
            game_id: CIV6,
            permissions: vec![Permission::Read, Permission::GameAdmin],
        };
        assert!(matches!(validate_request(&mixed), Err(AuthzError::InvalidRequest(_))));

        let relative_path = AccessRequest::Namespace {
            action: NamespaceAction::Read,
            path: "firaxis/games".to_string(),
        };
        assert!(matches!(validate_request(&relative_path), Err(AuthzError::InvalidRequest(_))));
    }
}
