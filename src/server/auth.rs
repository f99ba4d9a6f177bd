use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // username
    #[serde(rename = "employeeId")]
    pub employee_id: String,
    pub iss: String,
    pub aud: String,
    pub exp: usize,
}

/// Issues and checks HS256 access tokens.
pub struct AuthService {
    enabled: bool,
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl_minutes: i64,
}

impl AuthService {
    pub fn new(config: &AuthConfig, secret: Option<String>) -> Self {
        let secret = match secret {
            Some(secret) => {
                if secret.len() < 32 {
                    tracing::warn!("JWT secret is shorter than 32 characters");
                }
                secret
            }
            None => generate_secret(),
        };

        Self {
            enabled: config.enabled,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl_minutes: config.access_token_minutes,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn create_token(&self, username: &str, employee_id: &str) -> ApiResult<String> {
        let exp = Utc::now()
            .checked_add_signed(chrono::Duration::minutes(self.ttl_minutes))
            .ok_or_else(|| ApiError::Internal("token expiry out of range".to_string()))?
            .timestamp() as usize;

        let claims = Claims {
            sub: username.to_string(),
            employee_id: employee_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::Unauthorized(format!("invalid token: {}", e)))
    }
}

fn generate_secret() -> String {
    let mut key_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut key_bytes);
    tracing::warn!("JWT_SECRET is not set; tokens will be invalid after restart");
    hex::encode(key_bytes)
}

/// Stored passwords are MD5 hex digests, compared case-insensitively.
pub fn verify_md5(password: &str, stored: &str) -> bool {
    let digest = format!("{:x}", md5::compute(password.as_bytes()));
    constant_time_eq(
        digest.as_bytes(),
        stored.trim().to_ascii_lowercase().as_bytes(),
    )
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.auth.enabled() {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let claims = state.auth.validate_token(token.trim())?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
