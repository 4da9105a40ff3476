use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use tracing::error;

use crate::auth::repo_types::User;
use crate::state::AppState;

/// Extracts the bearer session ID and resolves it to a user through the
/// repository. Rejects with 401 when no credential is presented and 403
/// when the session is unknown or stale.
#[derive(Debug)]
pub struct SessionUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing Authorization header".into(),
            ))?;

        // Expect "Bearer <session_id>"
        let session_id = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        match state.auth().user_from_session_id(session_id).await {
            Ok(Some(user)) => Ok(SessionUser(user)),
            Ok(None) => Err((StatusCode::FORBIDDEN, "invalid session".into())),
            Err(e) => {
                error!(error = %e, "session lookup failed");
                Err((StatusCode::INTERNAL_SERVER_ERROR, "internal error".into()))
            }
        }
    }
}
