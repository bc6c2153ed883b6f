//! Hierarchical namespace matching for the legacy resource model.
//!
//! Resources and grants are `/`-delimited paths such as
//! `/division/games/civ6`. A `*` segment in a grant covers everything at and
//! below its position.

use super::AuthzError;

pub const WILDCARD: &str = "*";

/// Returns true when `resource` is covered by `pattern`.
///
/// Both arguments must start with `/`.
pub fn is_contained(resource: &str, pattern: &str) -> Result<bool, AuthzError> {
    require_leading_slash(resource, "resource")?;
    require_leading_slash(pattern, "namespace pattern")?;

    let resource_segments: Vec<&str> = resource.split('/').collect();

    // Index 0 is the empty string in front of the leading slash.
    for (depth, segment) in pattern.split('/').enumerate().skip(1) {
        if segment == WILDCARD {
            return Ok(true);
        }
        if resource_segments.get(depth) != Some(&segment) {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Stricter check applied when a namespace grant is stored: no empty
/// segments, and a wildcard may only appear as the final segment.
pub fn validate_pattern(pattern: &str) -> Result<(), AuthzError> {
    require_leading_slash(pattern, "namespace pattern")?;

    let segments: Vec<&str> = pattern.split('/').skip(1).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(AuthzError::InvalidRequest(format!(
            "namespace pattern '{pattern}' contains an empty segment"
        )));
    }
    if let Some(pos) = segments.iter().position(|s| *s == WILDCARD) {
        if pos != segments.len() - 1 {
            return Err(AuthzError::InvalidRequest(format!(
                "namespace pattern '{pattern}' has segments after '{WILDCARD}'"
            )));
        }
    }
    Ok(())
}

fn require_leading_slash(value: &str, what: &str) -> Result<(), AuthzError> {
    if value.starts_with('/') {
        Ok(())
    } else {
        Err(AuthzError::InvalidRequest(format!(
            "{what} '{value}' must start with '/'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contained(resource: &str, pattern: &str) -> bool {
        is_contained(resource, pattern).unwrap()
    }

    #[test]
    fn test_exact_path_contains_itself() {
        for path in ["/a", "/a/b", "/studio/games/civ6"] {
            assert!(contained(path, path), "{path} should contain itself");
        }
    }

    #[test]
    fn test_root_wildcard_covers_everything() {
        assert!(contained("/a", "/*"));
        assert!(contained("/a/b/c", "/*"));
        assert!(contained("/", "/*"));
    }

    #[test]
    fn test_wildcard_at_each_depth() {
        assert!(contained("/a/b/c", "/a/*"));
        assert!(contained("/a/b/c", "/a/b/*"));
        assert!(!contained("/a/b/c", "/x/*"));
        assert!(!contained("/a/b/c", "/a/x/*"));
    }

    #[test]
    fn test_wildcard_is_not_a_single_segment_glob() {
        // Segments after the wildcard are never inspected.
        assert!(contained("/a/b/c", "/a/*/zzz"));
    }

    #[test]
    fn test_exhausted_pattern_covers_deeper_resource() {
        assert!(contained("/a/b/c", "/a/b"));
        assert!(!contained("/a", "/a/b"));
    }

    #[test]
    fn test_missing_leading_slash_is_invalid_input() {
        assert!(matches!(
            is_contained("a/b", "/*"),
            Err(AuthzError::InvalidRequest(_))
        ));
        assert!(matches!(
            is_contained("/a/b", "*"),
            Err(AuthzError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_pattern() {
        assert!(validate_pattern("/studio/*").is_ok());
        assert!(validate_pattern("/studio/games/civ6").is_ok());
        assert!(validate_pattern("studio/*").is_err());
        assert!(validate_pattern("/studio//civ6").is_err());
        assert!(validate_pattern("/*/games").is_err());
    }
}
