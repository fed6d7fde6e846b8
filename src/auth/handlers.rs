use axum::{
    extract::{FromRef, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, SignupRequest, SuccessResponse},
        repo_types::{Session, User},
        services::{
            current_session, hash_password, is_valid_email, start_session, verify_password,
            AuthUser, SessionKeys,
        },
    },
    error::{ApiError, ApiJson},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }

    let hash = hash_password(&payload.password)?;
    let Some(user) = User::create(&state.db, &payload.email, &hash, payload.name.trim()).await? else {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::DuplicateAccount);
    };

    let cookie = start_session(&state, user.id).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(([(header::SET_COOKIE, cookie)], Json(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(mut payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let cookie = start_session(&state, user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok(([(header::SET_COOKIE, cookie)], Json(PublicUser::from(user))))
}

/// Always succeeds; a missing or stale session simply has nothing to destroy.
#[instrument(skip(state, headers))]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(session) = current_session(&state, &headers).await? {
        Session::delete(&state.db, session.id).await?;
        info!(user_id = %session.user_id, "user logged out");
    }
    let cookie = SessionKeys::from_ref(&state).clear_cookie();
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SuccessResponse { success: true }),
    ))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod me_tests {
    use super::*;

    #[test]
    fn public_user_hides_password_hash() {
        let response = PublicUser {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".to_string(),
            name: "Test".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["name"], "Test");
        assert!(json.get("password_hash").is_none());
    }
}
