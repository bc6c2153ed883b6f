use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_hours: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_hours,
        }
    }

    /// Sign a token whose subject is the caller's external id.
    pub fn encode(&self, external_id: &str) -> Result<String, AppError> {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = now + Duration::hours(self.exp_hours);

        let claims = Claims {
            sub: external_id.to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    /// External id of the principal
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Pull the bearer token out of the request headers and verify it.
pub fn principal_from_headers(headers: &HeaderMap, jwt: &JwtConfig) -> Result<Principal, AppError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("Authorization header missing"))?;

    let claims = jwt.decode(token)?;
    if claims.sub.trim().is_empty() {
        return Err(AppError::token("token subject is empty"));
    }

    Ok(Principal::new(claims.sub))
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let principal = principal_from_headers(&parts.headers, &state.jwt)?;
        Ok(AuthUser { principal })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_keeps_external_id() {
        let jwt = JwtConfig::new("test-secret", 1);
        let token = jwt.encode("ada@example.com").unwrap();
        let claims = jwt.decode(&token).unwrap();
        assert_eq!(claims.sub, "ada@example.com");
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = JwtConfig::new("one", 1).encode("ada@example.com").unwrap();
        assert!(matches!(
            JwtConfig::new("two", 1).decode(&token),
            Err(AppError::Token(_))
        ));
    }
}
