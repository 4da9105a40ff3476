use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                    // unique user ID
    pub email: String,               // user email, unique
    #[serde(skip_serializing)]
    pub password_hash: String,       // Argon2 hash, not exposed in JSON
    pub session_id: Option<String>,  // set while the user is logged in
    #[serde(skip_serializing)]
    pub reset_token: Option<String>, // outstanding password-reset token
    pub created_at: OffsetDateTime,  // creation timestamp
}

/// Closed set of lookups the auth service performs against the user table.
#[derive(Debug, Clone)]
pub enum UserLookup {
    ById(Uuid),
    ByEmail(String),
    BySessionId(String),
    ByResetToken(String),
}

/// Partial update of a user row. The outer `Option` selects which columns
/// to touch; for the nullable columns the inner `Option` distinguishes
/// setting a value from clearing it.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub password_hash: Option<String>,
    pub session_id: Option<Option<String>>,
    pub reset_token: Option<Option<String>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none() && self.session_id.is_none() && self.reset_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_hides_credentials() {
        let user = User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            session_id: Some("abc".to_string()),
            reset_token: Some("xyz".to_string()),
            created_at: OffsetDateTime::now_utc(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("reset_token"));
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            session_id: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
