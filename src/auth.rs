use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const DEFAULT_LOGIN_EMAIL: &str = "team3si";
pub const DEFAULT_LOGIN_PASSWORD: &str = "Team3siRocks";

pub fn token_ttl() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issues and verifies dashboard tokens for the single configured login.
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    login_email: String,
    login_password: String,
}

impl Authenticator {
    pub fn new(secret: &str, login_email: &str, login_password: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            login_email: login_email.to_string(),
            login_password: login_password.to_string(),
        }
    }

    /// Checks a raw login body. Anything that does not parse as
    /// `{email, password}` with the configured values is rejected alike.
    pub fn login(&self, body: &[u8]) -> Result<String, AppError> {
        let request: LoginRequest =
            serde_json::from_slice(body).map_err(|_| AppError::InvalidCredentials)?;
        if request.email != self.login_email || request.password != self.login_password {
            tracing::info!("rejected login attempt");
            return Err(AppError::InvalidCredentials);
        }
        self.issue_token(&request.email)
    }

    pub fn issue_token(&self, email: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + token_ttl()).timestamp(),
            jti: Uuid::new_v4(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AppError::internal(format!("failed to sign token: {err}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "token rejected");
                AppError::InvalidToken
            })
    }
}

/// Token is the second space-separated part of `Authorization`, as in
/// `Bearer <token>`.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .split_whitespace()
        .nth(1)
}

pub async fn require_jwt(
    State(auth): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::MissingToken)?;
    let claims = auth.verify(token)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
