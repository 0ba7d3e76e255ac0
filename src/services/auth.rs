//! Bearer-token identity validation.

use axum::http::{HeaderMap, header};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Issuer written into and required from access tokens.
pub const TOKEN_ISSUER: &str = "tubely-access";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("authorization header is not a bearer token")]
    MalformedHeader,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("token subject is not a user id")]
    InvalidSubject,
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// Resolves a bearer token to the calling user.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<Uuid, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

/// HS256 JWT validator sharing a secret with the token issuer.
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
    #[cfg(test)]
    encoding_key: jsonwebtoken::EncodingKey,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            #[cfg(test)]
            encoding_key: jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Tokens are minted by the account service; tests mint their own.
#[cfg(test)]
impl JwtValidator {
    /// Mint a token for `user_id`, valid for `ttl`.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        ttl: std::time::Duration,
    ) -> Result<String, AuthError> {
        use jsonwebtoken::{Header, encode};

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: TOKEN_ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl.as_secs() as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

impl TokenValidator for JwtValidator {
    fn validate(&self, token: &str) -> Result<Uuid, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidSubject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::Duration;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer   xyz ")), Ok("xyz"));
    }

    #[test]
    fn rejects_missing_or_other_schemes() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingHeader));
        assert_eq!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::MalformedHeader)
        );
        assert_eq!(bearer_token(&headers("Bearer")), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn round_trips_user_id() {
        let validator = JwtValidator::new("s3cr3t");
        let user = Uuid::new_v4();
        let token = validator
            .issue_token(user, Duration::from_secs(3600))
            .unwrap();
        assert_eq!(validator.validate(&token), Ok(user));
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let user = Uuid::new_v4();
        let token = JwtValidator::new("one")
            .issue_token(user, Duration::from_secs(3600))
            .unwrap();
        assert!(matches!(
            JwtValidator::new("two").validate(&token),
            Err(AuthError::InvalidToken(_))
        ));

        let validator = JwtValidator::new("one");
        let expired = validator.issue_token(user, Duration::ZERO).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert!(matches!(
            validator.validate(&expired),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        let validator = JwtValidator::new("s3cr3t");
        assert!(validator.validate("not-a-jwt").is_err());
    }
}
