use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::{async_trait, RequestPartsExt};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::{RequestError, SessionError};
use crate::models::user::UserId;
use crate::server::state::AppState;

const DEV_SECRET: &str = "taskhub-development-secret-do-not-use-in-production";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies the HS256 tokens handed out after GitHub login.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        if config.jwt_secret.is_empty() {
            warn!("no jwt secret configured, falling back to the development secret");
            return Self::new(DEV_SECRET, config.token_ttl_secs);
        }
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    pub fn issue(&self, user_id: UserId) -> Result<String, RequestError> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    fn issue_at(&self, user_id: UserId, issued_at: i64) -> Result<String, RequestError> {
        let claims = Claims {
            user_id,
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl_secs),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SessionError::TokenExpired,
                _ => {
                    debug!("rejected bearer token: {e}");
                    SessionError::BadToken
                }
            })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Claims {
    type Rejection = SessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                debug!("malformed auth header token: {e}");
                SessionError::BadToken
            })?;
        state.tokens.verify(bearer.token())
    }
}
