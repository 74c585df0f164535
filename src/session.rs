// src/session.rs
//! Session identity for handlers. Handlers never read tokens directly;
//! they go through the [`SessionProvider`] trait so the identity source
//! can be swapped out in tests.

use actix_web::HttpRequest;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

// ==================== SESSION MODEL ====================

/// Who the caller is. Hospitals manage wards; users place bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSubject {
    Hospital(i64),
    User(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub subject: SessionSubject,
}

impl Session {
    pub fn hospital_id(&self) -> Option<i64> {
        match self.subject {
            SessionSubject::Hospital(id) => Some(id),
            SessionSubject::User(_) => None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self.subject {
            SessionSubject::User(id) => Some(id),
            SessionSubject::Hospital(_) => None,
        }
    }
}

// ==================== PROVIDER TRAIT ====================

/// Source of the caller's identity. The production implementation reads
/// bearer tokens; tests inject a fixed session instead.
pub trait SessionProvider: Send + Sync {
    fn current_session(&self, req: &HttpRequest) -> Option<Session>;

    /// Invalidate the caller's session. Stateless tokens have nothing to
    /// invalidate server-side; the default is a no-op and clients simply
    /// drop the token.
    fn clear_session(&self) {}
}

pub fn require_hospital(provider: &dyn SessionProvider, req: &HttpRequest) -> ApiResult<i64> {
    provider
        .current_session(req)
        .and_then(|session| session.hospital_id())
        .ok_or_else(ApiError::session_required)
}

pub fn require_user(provider: &dyn SessionProvider, req: &HttpRequest) -> ApiResult<i64> {
    provider
        .current_session(req)
        .and_then(|session| session.user_id())
        .ok_or_else(ApiError::session_required)
}

// ==================== JWT PROVIDER ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// `hospital_{id}` or `user_{id}`.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtSessionProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiration_hours: i64,
}

impl JwtSessionProvider {
    pub fn new(jwt_secret: &str, token_expiration_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_expiration_hours,
        }
    }

    pub fn issue_token(&self, subject: SessionSubject) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.token_expiration_hours);

        let sub = match subject {
            SessionSubject::Hospital(id) => format!("hospital_{}", id),
            SessionSubject::User(id) => format!("user_{}", id),
        };

        let claims = Claims {
            sub,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| ApiError::InternalServerError("Failed to generate token".to_string()))
    }

    fn verify_token(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| {
                log::warn!("Session token rejected: {}", err);
                err
            })
            .ok()
    }
}

impl SessionProvider for JwtSessionProvider {
    fn current_session(&self, req: &HttpRequest) -> Option<Session> {
        let header = req.headers().get("Authorization")?.to_str().ok()?;
        let token = header.strip_prefix("Bearer ")?;
        let claims = self.verify_token(token)?;
        let subject = parse_subject(&claims.sub)?;
        Some(Session { subject })
    }
}

fn parse_subject(sub: &str) -> Option<SessionSubject> {
    if let Some(id) = sub.strip_prefix("hospital_") {
        return id.parse().ok().map(SessionSubject::Hospital);
    }
    if let Some(id) = sub.strip_prefix("user_") {
        return id.parse().ok().map(SessionSubject::User);
    }
    None
}
