pub(crate) use crate::auth::dto::{SessionClaims, SessionKeys};
use crate::auth::repo_types::Session;
use crate::error::ApiError;
use crate::state::AppState;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sid";
/// Fixed lifetime; activity does not extend it.
pub const SESSION_TTL_HOURS: i64 = 24;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let cfg = &state.config.session;
        SessionKeys::new(&cfg.secret, &cfg.issuer, cfg.cookie_secure)
    }
}

impl SessionKeys {
    pub fn new(secret: &str, issuer: &str, cookie_secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            cookie_secure,
        }
    }

    pub fn sign(&self, session: &Session) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::hours(SESSION_TTL_HOURS);
        let claims = SessionClaims {
            sub: session.user_id,
            sid: session.id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %session.user_id, session_id = %session.id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// `Set-Cookie` value establishing the session.
    pub fn cookie(&self, token: &str) -> String {
        let max_age = SESSION_TTL_HOURS * 60 * 60;
        format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; Max-Age={max_age}; {}",
            self.cookie_attrs()
        )
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clear_cookie(&self) -> String {
        format!(
            "{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0; {}",
            self.cookie_attrs()
        )
    }

    // SameSite=None is only honoured on Secure cookies.
    fn cookie_attrs(&self) -> &'static str {
        if self.cookie_secure {
            "SameSite=None; Secure"
        } else {
            "SameSite=Lax"
        }
    }
}

/// Value of the session cookie, if the request carries one.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

/// Creates a session row for the user and returns the `Set-Cookie` value.
pub async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let session = Session::create(&state.db, user_id, SESSION_TTL_HOURS).await?;
    let keys = SessionKeys::from_ref(state);
    let token = keys.sign(&session)?;
    Ok(keys.cookie(&token))
}

/// Resolves the request's session, if any. Invalid or stale tokens count as no session.
pub async fn current_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Session>, ApiError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    let claims = match SessionKeys::from_ref(state).verify(token) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "invalid or expired session token");
            return Ok(None);
        }
    };
    let session = Session::find_active(&state.db, claims.sid).await?;
    Ok(session.filter(|s| s.user_id == claims.sub))
}

/// Authenticated account id, resolved from the session cookie.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match current_session(state, &parts.headers).await? {
            Some(session) => Ok(AuthUser(session.user_id)),
            None => Err(ApiError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("p").unwrap();
        let b = hash_password("p").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        let msg = err.to_string();
        assert!(!msg.is_empty());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no at sign.com"));
        assert!(!is_valid_email(""));
    }
}
