use serde::Serialize;

use super::decision::AccessRequest;

/// Authenticated caller, identified by the external id carried in its token.
///
/// A principal is not yet known to exist: resolvers look it up and fail with
/// `PrincipalNotFound` when no user carries this external id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub external_id: String,
}

impl Principal {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.external_id)
    }
}

/// Scope a request was authorized for, handed to the handler after an allow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceScope {
    Division { division_id: i64 },
    Game { game_id: i64 },
    Namespace { path: String },
}

impl From<&AccessRequest> for ResourceScope {
    fn from(request: &AccessRequest) -> Self {
        match request {
            AccessRequest::Division { division_id, .. } => ResourceScope::Division {
                division_id: *division_id,
            },
            AccessRequest::Resource { game_id, .. } => ResourceScope::Game { game_id: *game_id },
            AccessRequest::Namespace { path, .. } => ResourceScope::Namespace { path: path.clone() },
        }
    }
}

/// Principal plus the scope it was cleared for.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub principal: Principal,
    pub scope: ResourceScope,
}
