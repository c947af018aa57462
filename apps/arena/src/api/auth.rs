//! Bearer tokens, password hashing, and the authentication middleware.
//!
//! Token format: `base64url(payload) "." hex(hmac_sha256(secret, base64url(payload)))`
//! with payload `{"sub": "<user id>", "exp": <unix seconds>}`. Signatures
//! are compared in constant time.

use super::AppState;
use super::response::ApiError;
use arena_core::{Error as CoreError, User, UserId};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    exp: i64,
}

/// Issues and verifies bearer tokens with one shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// Token for `user_id`, valid for the configured TTL from `now`.
    pub fn issue(&self, user_id: UserId, now: i64) -> Result<String, ApiError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id,
            exp: now.saturating_add(ttl),
        };
        let payload = serde_json::to_vec(&claims).map_err(|e| ApiError::Internal(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.sign(&payload)?;
        Ok(format!("{payload}.{signature}"))
    }

    /// User id carried by a valid, unexpired token.
    pub fn verify(&self, token: &str, now: i64) -> Result<UserId, ApiError> {
        let invalid = || ApiError::unauthorized("invalid or expired token");
        let (payload, signature) = token.split_once('.').ok_or_else(invalid)?;
        let expected = self.sign(payload)?;
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(invalid());
        }
        let raw = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
        let claims: Claims = serde_json::from_slice(&raw).map_err(|_| invalid())?;
        if claims.exp <= now {
            return Err(invalid());
        }
        Ok(claims.sub)
    }

    fn sign(&self, payload: &str) -> Result<String, ApiError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

// =============================================================================
// PASSWORDS
// =============================================================================

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, CoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::Storage(format!("password hashing failed: {e}")))
}

/// True when `password` matches the stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// The authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }

    pub fn is_trainer(&self) -> bool {
        self.0.is_trainer()
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// Allowed when acting on one's own record, or as admin.
    pub fn require_self_or_admin(&self, owner: UserId) -> Result<(), ApiError> {
        if self.id() == owner || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    pub fn require_trainer_or_admin(&self) -> Result<(), ApiError> {
        if self.is_trainer() || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Reject requests without a valid token; otherwise load the caller fresh
/// from the store so role and activation changes apply immediately.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer(req.headers()).ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    let now = state.store.clock().now_utc().timestamp();
    let user_id = state.tokens.verify(token, now)?;
    let user = match state.run(move |store| store.user(user_id)).await {
        Ok(user) => user,
        Err(ApiError::Core(CoreError::NotFound(_))) => {
            return Err(ApiError::unauthorized("invalid or expired token"));
        }
        Err(err) => return Err(err),
    };
    if !user.is_active {
        return Err(ApiError::unauthorized("account is deactivated"));
    }
    debug!(user = %user.id, role = %user.role, "authenticated");
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
