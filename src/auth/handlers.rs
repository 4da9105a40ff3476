use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, MessageResponse, PublicUser, RegisterRequest, RegisterResponse,
            ResetRequest, ResetTokenResponse, SessionResponse, UpdatePasswordRequest,
        },
        error::AuthError,
        extractors::SessionUser,
        service::is_valid_email,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/sessions", post(login).delete(logout))
        .route("/reset_password", post(request_reset).put(update_password))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(profile))
}

fn auth_error(e: AuthError) -> (StatusCode, String) {
    match e {
        AuthError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
        AuthError::AccountExists => (StatusCode::CONFLICT, "Email already registered".into()),
        AuthError::AccountNotFound => (StatusCode::FORBIDDEN, "Unknown account".into()),
        AuthError::InvalidResetToken => (StatusCode::FORBIDDEN, "Invalid reset token".into()),
        other => {
            error!(error = %other, "auth service failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let user = state
        .auth()
        .register(&payload.email, &payload.password)
        .await
        .map_err(auth_error)?;

    Ok(Json(RegisterResponse {
        email: user.email,
        message: "user created".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    let auth = state.auth();
    let ok = auth
        .login(&payload.email, &payload.password)
        .await
        .map_err(auth_error)?;
    if !ok {
        warn!(email = %payload.email, "login rejected");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let session_id = auth
        .create_session(&payload.email)
        .await
        .map_err(auth_error)?;

    Ok(Json(SessionResponse {
        email: payload.email,
        session_id,
    }))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .auth()
        .destroy_session(user.id)
        .await
        .map_err(auth_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(user))]
pub async fn profile(SessionUser(user): SessionUser) -> Json<PublicUser> {
    Json(PublicUser {
        id: user.id,
        email: user.email,
    })
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetRequest>,
) -> Result<Json<ResetTokenResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    let reset_token = state
        .auth()
        .request_reset_token(&payload.email)
        .await
        .map_err(auth_error)?;

    Ok(Json(ResetTokenResponse {
        email: payload.email,
        reset_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    if payload.new_password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    state
        .auth()
        .update_password(&payload.reset_token, &payload.new_password)
        .await
        .map_err(auth_error)?;

    Ok(Json(MessageResponse {
        message: "Password updated".into(),
    }))
}
