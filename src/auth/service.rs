use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::auth::error::{AuthError, RepoError};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::UserRepository;
use crate::auth::repo_types::{User, UserLookup, UserPatch};
use crate::auth::token::generate_token;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Orchestrates registration, credential checks, session lifecycle and
/// password resets. Holds no durable state of its own; everything lives in
/// the repository, so the service is cheap to clone and safe to share
/// across tasks.
#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Register a new account. Fails with `AccountExists` when the email is
    /// already taken, including when a concurrent registration wins the
    /// race on `create`.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if email.is_empty() {
            return Err(AuthError::InvalidInput("email must not be empty"));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty"));
        }

        match self
            .repo
            .find_by(UserLookup::ByEmail(email.to_string()))
            .await
        {
            Ok(_) => return Err(AuthError::AccountExists),
            Err(RepoError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let hash = hash_password(password).map_err(AuthError::Hash)?;
        let user = self.repo.create(email, &hash).await.map_err(|e| match e {
            RepoError::DuplicateEmail => AuthError::AccountExists,
            other => AuthError::Repository(other),
        })?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Check credentials. Unknown emails and wrong passwords both come back
    /// as `false`, so callers cannot probe which addresses are registered.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        let user = match self
            .repo
            .find_by(UserLookup::ByEmail(email.to_string()))
            .await
        {
            Ok(user) => user,
            Err(RepoError::NotFound) => {
                debug!("login attempt for unknown email");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(verify_password(password, &user.password_hash))
    }

    /// Issue a fresh session ID for the account, replacing any session the
    /// user already had. The account must exist; repository `NotFound`
    /// propagates unchanged.
    #[instrument(skip(self))]
    pub async fn create_session(&self, email: &str) -> Result<String, AuthError> {
        let user = self
            .repo
            .find_by(UserLookup::ByEmail(email.to_string()))
            .await?;
        let session_id = generate_token();
        self.repo
            .update(
                user.id,
                UserPatch {
                    session_id: Some(Some(session_id.clone())),
                    ..Default::default()
                },
            )
            .await?;
        debug!(user_id = %user.id, "session created");
        Ok(session_id)
    }

    /// Resolve a session ID to its user. An empty or unknown ID is an
    /// expected outcome, reported as `None` rather than an error.
    pub async fn user_from_session_id(&self, session_id: &str) -> Result<Option<User>, AuthError> {
        if session_id.is_empty() {
            return Ok(None);
        }
        match self
            .repo
            .find_by(UserLookup::BySessionId(session_id.to_string()))
            .await
        {
            Ok(user) => Ok(Some(user)),
            Err(RepoError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Clear the user's session. Idempotent: clearing an already-clear
    /// session rewrites the column to NULL and is not an error.
    #[instrument(skip(self))]
    pub async fn destroy_session(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.repo
            .update(
                user_id,
                UserPatch {
                    session_id: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        debug!(user_id = %user_id, "session destroyed");
        Ok(())
    }

    /// Start a password reset, returning the token the caller must present
    /// to `update_password`. Unlike `login`, this reports unknown accounts
    /// explicitly; it is only reachable after the caller asserts account
    /// ownership out of band.
    #[instrument(skip(self))]
    pub async fn request_reset_token(&self, email: &str) -> Result<String, AuthError> {
        let user = match self
            .repo
            .find_by(UserLookup::ByEmail(email.to_string()))
            .await
        {
            Ok(user) => user,
            Err(RepoError::NotFound) => return Err(AuthError::AccountNotFound),
            Err(e) => return Err(e.into()),
        };
        let reset_token = generate_token();
        self.repo
            .update(
                user.id,
                UserPatch {
                    reset_token: Some(Some(reset_token.clone())),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user.id, "reset token issued");
        Ok(reset_token)
    }

    /// Consume a reset token and install a new password. The new hash and
    /// the token clear land in a single update, so a consumed token cannot
    /// be replayed. Existing sessions stay valid; callers that want them
    /// gone call `destroy_session` as well.
    #[instrument(skip(self, reset_token, new_password))]
    pub async fn update_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty"));
        }
        let user = match self
            .repo
            .find_by(UserLookup::ByResetToken(reset_token.to_string()))
            .await
        {
            Ok(user) => user,
            Err(RepoError::NotFound) => return Err(AuthError::InvalidResetToken),
            Err(e) => return Err(e.into()),
        };
        let hash = hash_password(new_password).map_err(AuthError::Hash)?;
        self.repo
            .update(
                user.id,
                UserPatch {
                    password_hash: Some(hash),
                    reset_token: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user.id, "password updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::InMemoryUserRepository;

    fn service() -> AuthService {
        AuthService::new(Arc::new(InMemoryUserRepository::new()))
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let auth = service();
        let user = auth.register("a@x.com", "secret1").await.expect("register");
        assert_eq!(user.email, "a@x.com");
        assert!(auth.login("a@x.com", "secret1").await.expect("login"));
    }

    #[tokio::test]
    async fn login_never_distinguishes_unknown_email_from_wrong_password() {
        let auth = service();
        auth.register("a@x.com", "secret1").await.expect("register");
        assert!(!auth.login("a@x.com", "wrong").await.expect("login"));
        assert!(!auth.login("b@x.com", "secret1").await.expect("login"));
    }

    #[tokio::test]
    async fn duplicate_registration_leaves_account_unchanged() {
        let auth = service();
        auth.register("a@x.com", "secret1").await.expect("register");
        let err = auth.register("a@x.com", "other-password").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountExists));
        // Original credentials still work; the losing attempt wrote nothing.
        assert!(auth.login("a@x.com", "secret1").await.expect("login"));
        assert!(!auth.login("a@x.com", "other-password").await.expect("login"));
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected_before_any_write() {
        let auth = service();
        let err = auth.register("", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
        let err = auth.register("a@x.com", "").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
        assert!(!auth.login("a@x.com", "secret1").await.expect("login"));
    }

    #[tokio::test]
    async fn new_session_invalidates_the_previous_one() {
        let auth = service();
        auth.register("a@x.com", "secret1").await.expect("register");
        let first = auth.create_session("a@x.com").await.expect("session");
        let second = auth.create_session("a@x.com").await.expect("session");
        assert_ne!(first, second);

        let stale = auth.user_from_session_id(&first).await.expect("lookup");
        assert!(stale.is_none());
        let current = auth.user_from_session_id(&second).await.expect("lookup");
        assert_eq!(current.expect("user").email, "a@x.com");
    }

    #[tokio::test]
    async fn session_lookup_treats_absence_as_none() {
        let auth = service();
        assert!(auth.user_from_session_id("").await.expect("empty").is_none());
        assert!(auth
            .user_from_session_id("no-such-session")
            .await
            .expect("unknown")
            .is_none());
    }

    #[tokio::test]
    async fn create_session_for_unknown_account_propagates_not_found() {
        let auth = service();
        let err = auth.create_session("ghost@x.com").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Repository(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn destroy_session_is_idempotent() {
        let auth = service();
        let user = auth.register("a@x.com", "secret1").await.expect("register");
        let session_id = auth.create_session("a@x.com").await.expect("session");

        auth.destroy_session(user.id).await.expect("first destroy");
        auth.destroy_session(user.id).await.expect("second destroy");
        assert!(auth
            .user_from_session_id(&session_id)
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn reset_flow_replaces_password_and_consumes_token() {
        let auth = service();
        auth.register("a@x.com", "old-password").await.expect("register");

        let token = auth.request_reset_token("a@x.com").await.expect("token");
        auth.update_password(&token, "new-password")
            .await
            .expect("update password");

        assert!(!auth.login("a@x.com", "old-password").await.expect("login"));
        assert!(auth.login("a@x.com", "new-password").await.expect("login"));

        let err = auth.update_password(&token, "another").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetToken));
    }

    #[tokio::test]
    async fn reset_request_reports_unknown_accounts() {
        let auth = service();
        let err = auth.request_reset_token("ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountNotFound));
    }

    #[tokio::test]
    async fn password_reset_keeps_the_active_session() {
        let auth = service();
        auth.register("a@x.com", "old-password").await.expect("register");
        let session_id = auth.create_session("a@x.com").await.expect("session");

        let token = auth.request_reset_token("a@x.com").await.expect("token");
        auth.update_password(&token, "new-password")
            .await
            .expect("update password");

        // Sessions are not invalidated by a reset; logout is a separate call.
        let user = auth
            .user_from_session_id(&session_id)
            .await
            .expect("lookup")
            .expect("session still valid");
        assert_eq!(user.email, "a@x.com");
    }

    #[tokio::test]
    async fn full_flow_from_registration_to_profile() {
        let auth = service();
        let user = auth.register("a@x.com", "secret1").await.expect("register");
        assert_eq!(user.email, "a@x.com");
        assert!(!auth.login("a@x.com", "wrong").await.expect("login"));
        assert!(auth.login("a@x.com", "secret1").await.expect("login"));
        let session_id = auth.create_session("a@x.com").await.expect("session");
        let found = auth
            .user_from_session_id(&session_id)
            .await
            .expect("lookup")
            .expect("user");
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn email_regex_accepts_addresses_and_rejects_garbage() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a @x.com"));
        assert!(!is_valid_email("a@x"));
    }
}
