use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body to start a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Request body to complete a password reset.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub reset_token: String,
    pub new_password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub email: String,
    pub session_id: String,
}

/// Response carrying a freshly issued reset token.
#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub email: String,
    pub reset_token: String,
}

/// Confirmation returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub email: String,
    pub message: String,
}

/// Generic confirmation response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
