use std::collections::BTreeSet;

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::authz::{AuthzError, Permission};
use crate::models::access::RoleGrant;

fn missing(column: &str, e: sqlx::Error) -> AuthzError {
    AuthzError::StoreUnavailable(format!("missing {}: {}", column, e))
}

/// Decode a `json_group_array(...)` column of permission names.
///
/// A stored name outside the catalog is reported, never skipped.
pub fn parse_permission_array(raw: &str) -> Result<BTreeSet<Permission>, AuthzError> {
    let names: Vec<String> = serde_json::from_str(raw)
        .map_err(|e| AuthzError::StoreUnavailable(format!("invalid permission array: {}", e)))?;
    names.iter().map(|n| Permission::parse(n)).collect()
}

pub fn parse_id_array(raw: &str) -> Result<BTreeSet<i64>, AuthzError> {
    serde_json::from_str::<Vec<i64>>(raw)
        .map(|ids| ids.into_iter().collect())
        .map_err(|e| AuthzError::StoreUnavailable(format!("invalid id array: {}", e)))
}

pub fn role_grant_from_row(row: &SqliteRow) -> Result<RoleGrant, AuthzError> {
    let group_id: i64 = row.try_get("group_id").map_err(|e| missing("group_id", e))?;
    let role_id: i64 = row.try_get("role_id").map_err(|e| missing("role_id", e))?;
    let role_name: String = row.try_get("role_name").map_err(|e| missing("role_name", e))?;
    let permissions_s: String = row.try_get("permissions").map_err(|e| missing("permissions", e))?;
    let game_ids_s: String = row.try_get("game_ids").map_err(|e| missing("game_ids", e))?;

    Ok(RoleGrant {
        group_id,
        role_id,
        role_name,
        permissions: parse_permission_array(&permissions_s)?,
        game_ids: parse_id_array(&game_ids_s)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_array_deduplicates() {
        let parsed = parse_permission_array(r#"["read","update","read"]"#).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains(&Permission::Read));
        assert!(parsed.contains(&Permission::Update));
    }

    #[test]
    fn test_permission_array_reports_unknown_names() {
        let err = parse_permission_array(r#"["read","publish"]"#).unwrap_err();
        assert_eq!(err, AuthzError::UnknownPermission("publish".to_string()));
    }

    #[test]
    fn test_empty_arrays() {
        assert!(parse_permission_array("[]").unwrap().is_empty());
        assert!(parse_id_array("[]").unwrap().is_empty());
        assert_eq!(parse_id_array("[3,1,3]").unwrap().into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
