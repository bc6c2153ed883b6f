use serde::{Deserialize, Serialize};

/// Severity levels for audit entries.
/// Controls retention policies and log filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Graph changes that alter who may do what: long-term retention
    Critical,
    #[default]
    Important,
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Entities whose administrative changes are written to the audit log.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of the event name, e.g. `role` in `role.created`
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> i64;

    fn severity(&self) -> Severity {
        Severity::Important
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" | "removed" => Severity::Critical,
            "created" | "updated" | "added" => self.severity(),
            _ => Severity::Important,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Widget;

    impl Loggable for Widget {
        fn entity_type() -> &'static str { "widget" }
        fn subject_id(&self) -> i64 { 7 }
    }

    #[test]
    fn test_deletes_are_always_critical() {
        assert_eq!(Widget.severity_for_action("deleted"), Severity::Critical);
        assert_eq!(Widget.severity_for_action("removed"), Severity::Critical);
        assert_eq!(Widget.severity_for_action("created"), Severity::Important);
        assert_eq!(Widget.severity_for_action("renamed"), Severity::Important);
    }
}
