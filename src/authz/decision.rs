use serde::Serialize;
use utoipa::ToSchema;

use super::catalog::Permission;

pub type AuthzResult<T> = Result<T, AuthzError>;

/// Failures to evaluate a policy. None of these is a denial.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("principal not found: {0}")]
    PrincipalNotFound(String),
    #[error("invalid authorization request: {0}")]
    InvalidRequest(String),
    #[error("unknown permission: {0}")]
    UnknownPermission(String),
    #[error("authorization store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<sqlx::Error> for AuthzError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// Outcome of a successfully evaluated policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    Allowed,
    Denied { reason: String },
}

impl Decision {
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Legacy namespace actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceAction {
    Read,
    Write,
}

impl NamespaceAction {
    /// Catalog permission a role must carry for this action.
    pub fn required_permission(&self) -> Permission {
        match self {
            NamespaceAction::Read => Permission::Read,
            NamespaceAction::Write => Permission::Update,
        }
    }
}

/// What a principal is asking to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequest {
    Division {
        permission: Permission,
        division_id: i64,
    },
    /// Every permission must be granted by one and the same role.
    Resource {
        game_id: i64,
        permissions: Vec<Permission>,
    },
    Namespace {
        action: NamespaceAction,
        path: String,
    },
}

impl AccessRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            AccessRequest::Division { .. } => "division",
            AccessRequest::Resource { .. } => "resource",
            AccessRequest::Namespace { .. } => "namespace",
        }
    }
}
