//! Resolver for the legacy string-addressed resource model.
//!
//! Grants are wildcard namespaces attached to (user, role) pairs; a grant
//! counts only when its role carries the permission the action maps to.

use async_trait::async_trait;

use super::decision::{AccessRequest, AuthzError, AuthzResult, Decision};
use super::namespace::is_contained;
use super::principal::Principal;
use super::resolver::{validate_request, Resolver};
use crate::db::graph::GraphStore;

/// First grant whose namespace contains `path`, if any.
pub fn matching_grant<'a>(path: &str, grants: &'a [String]) -> AuthzResult<Option<&'a str>> {
    for grant in grants {
        if is_contained(path, grant)? {
            return Ok(Some(grant.as_str()));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone)]
pub struct NamespaceResolver {
    store: GraphStore,
}

impl NamespaceResolver {
    pub fn new(store: GraphStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Resolver for NamespaceResolver {
    async fn resolve(&self, principal: &Principal, request: &AccessRequest) -> AuthzResult<Decision> {
        let AccessRequest::Namespace { action, path } = request else {
            return Err(AuthzError::InvalidRequest(format!(
                "{} requests are not served by the namespace resolver",
                request.kind()
            )));
        };
        validate_request(request)?;

        let (_, grants) = self
            .store
            .namespace_grants(&principal.external_id, action.required_permission())
            .await?
            .ok_or_else(|| AuthzError::PrincipalNotFound(principal.external_id.clone()))?;

        let decision = match matching_grant(path, &grants)? {
            Some(grant) => {
                tracing::debug!(principal = %principal, path = %path, grant = %grant, "namespace grant match");
                Decision::Allowed
            }
            None => Decision::denied(format!(
                "no {:?} grant covers '{}'",
                action, path
            )),
        };
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_covering_grant_wins() {
        let grants = vec![
            "/firaxis/games/xcom".to_string(),
            "/firaxis/*".to_string(),
            "/*".to_string(),
        ];
        assert_eq!(
            matching_grant("/firaxis/games/civ6", &grants).unwrap(),
            Some("/firaxis/*")
        );
        assert_eq!(matching_grant("/2k/games/nba", &grants).unwrap(), Some("/*"));
    }

    #[test]
    fn test_no_grants_no_match() {
        assert_eq!(matching_grant("/firaxis", &[]).unwrap(), None);
    }
}
