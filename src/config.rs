use std::time::Duration;

use crate::authz::AuthzMode;
use crate::errors::AppError;
use crate::jwt::JwtConfig;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_JWT_EXP_HOURS: i64 = 24;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt: JwtConfig,
    pub authz_mode: AuthzMode,
    pub store_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::configuration("JWT_SECRET not set"))?;
        let exp_hours = parse_or(&lookup, "JWT_EXP_HOURS", DEFAULT_JWT_EXP_HOURS)?;
        let port = parse_or(&lookup, "APP_PORT", DEFAULT_PORT)?;
        let timeout_ms = parse_or(&lookup, "AUTHZ_STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(AppError::configuration(
                "AUTHZ_STORE_TIMEOUT_MS must be greater than zero",
            ));
        }

        let fixed_principal = lookup("AUTHZ_FIXED_PRINCIPAL");
        let authz_mode = AuthzMode::parse(
            lookup("AUTHZ_MODE").as_deref().unwrap_or(""),
            fixed_principal.as_deref(),
        )?;

        Ok(Self {
            database_url: lookup("DATABASE_URL"),
            port,
            jwt: JwtConfig::new(secret.into_bytes(), exp_hours),
            authz_mode,
            store_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::configuration(format!("{key} must be a valid integer"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("JWT_SECRET", "s")]).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.jwt.exp_hours, 24);
        assert_eq!(cfg.store_timeout, Duration::from_millis(2000));
        assert_eq!(cfg.authz_mode, AuthzMode::Enforce);
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn test_missing_secret_is_a_configuration_error() {
        assert!(matches!(config(&[]), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_bad_numbers_are_rejected() {
        let err = config(&[("JWT_SECRET", "s"), ("APP_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
        assert!(config(&[("JWT_SECRET", "s"), ("AUTHZ_STORE_TIMEOUT_MS", "-1")]).is_err());
    }

    #[test]
    fn test_zero_store_timeout_is_rejected() {
        let err = config(&[("JWT_SECRET", "s"), ("AUTHZ_STORE_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("AUTHZ_STORE_TIMEOUT_MS"));

        let cfg = config(&[("JWT_SECRET", "s"), ("AUTHZ_STORE_TIMEOUT_MS", "1")]).unwrap();
        assert_eq!(cfg.store_timeout, Duration::from_millis(1));
    }

    #[test]
    fn test_fixed_principal_mode() {
        let cfg = config(&[
            ("JWT_SECRET", "s"),
            ("AUTHZ_MODE", "fixed-principal"),
            ("AUTHZ_FIXED_PRINCIPAL", "dev@example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.authz_mode, AuthzMode::FixedPrincipal("dev@example.com".into()));

        assert!(config(&[("JWT_SECRET", "s"), ("AUTHZ_MODE", "fixed-principal")]).is_err());
    }
}
