use thiserror::Error;

/// Storage-level failures surfaced by a [`UserRepository`].
///
/// [`UserRepository`]: crate::auth::repo::UserRepository
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("no matching user")]
    NotFound,
    #[error("update patch contains no fields")]
    InvalidField,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Failures the auth service surfaces to its callers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error("account already exists")]
    AccountExists,
    #[error("account not found")]
    AccountNotFound,
    #[error("invalid or consumed reset token")]
    InvalidResetToken,
    #[error("password hashing failed")]
    Hash(#[source] anyhow::Error),
    #[error(transparent)]
    Repository(#[from] RepoError),
}
