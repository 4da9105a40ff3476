use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, QueryBuilder};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::error::RepoError;
use crate::auth::repo_types::{User, UserLookup, UserPatch};

/// Persistence contract consumed by the auth service. Implementations must
/// keep `create` and `update` atomic with respect to the uniqueness of
/// emails and of non-null reset tokens.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user with a hashed password.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, RepoError>;

    /// Find the user matching the lookup, or `NotFound`.
    async fn find_by(&self, lookup: UserLookup) -> Result<User, RepoError>;

    /// Apply a partial update to the user row identified by `id`.
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<(), RepoError>;
}

const USER_COLUMNS: &str = "id, email, password_hash, session_id, reset_token, created_at";

/// Postgres-backed repository. Uniqueness invariants are enforced by the
/// unique indexes in the users migration.
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, RepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, session_id, reset_token, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::DuplicateEmail,
            _ => RepoError::Storage(e.into()),
        })?;
        Ok(user)
    }

    async fn find_by(&self, lookup: UserLookup) -> Result<User, RepoError> {
        let sql = |column: &str| {
            format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1")
        };
        let user = match lookup {
            UserLookup::ById(id) => {
                sqlx::query_as::<_, User>(&sql("id"))
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await
            }
            UserLookup::ByEmail(email) => {
                sqlx::query_as::<_, User>(&sql("email"))
                    .bind(email)
                    .fetch_optional(&self.db)
                    .await
            }
            UserLookup::BySessionId(session_id) => {
                sqlx::query_as::<_, User>(&sql("session_id"))
                    .bind(session_id)
                    .fetch_optional(&self.db)
                    .await
            }
            UserLookup::ByResetToken(reset_token) => {
                sqlx::query_as::<_, User>(&sql("reset_token"))
                    .bind(reset_token)
                    .fetch_optional(&self.db)
                    .await
            }
        }
        .map_err(|e| RepoError::Storage(e.into()))?;
        user.ok_or(RepoError::NotFound)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<(), RepoError> {
        if patch.is_empty() {
            return Err(RepoError::InvalidField);
        }

        let mut builder = QueryBuilder::new("UPDATE users SET ");
        let mut set = builder.separated(", ");
        if let Some(password_hash) = patch.password_hash {
            set.push("password_hash = ");
            set.push_bind_unseparated(password_hash);
        }
        if let Some(session_id) = patch.session_id {
            set.push("session_id = ");
            set.push_bind_unseparated(session_id);
        }
        if let Some(reset_token) = patch.reset_token {
            set.push("reset_token = ");
            set.push_bind_unseparated(reset_token);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder
            .build()
            .execute(&self.db)
            .await
            .map_err(|e| RepoError::Storage(e.into()))?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// Reference repository holding users in a map behind a single mutex, which
/// serializes operations the way a transactional store would. Used by tests
/// and `AppState::fake`.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, RepoError> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.email == email) {
            return Err(RepoError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            session_id: None,
            reset_token: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by(&self, lookup: UserLookup) -> Result<User, RepoError> {
        let users = self.users.lock().await;
        users
            .values()
            .find(|u| match &lookup {
                UserLookup::ById(id) => u.id == *id,
                UserLookup::ByEmail(email) => u.email == *email,
                UserLookup::BySessionId(session_id) => {
                    u.session_id.as_deref() == Some(session_id.as_str())
                }
                UserLookup::ByResetToken(reset_token) => {
                    u.reset_token.as_deref() == Some(reset_token.as_str())
                }
            })
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<(), RepoError> {
        if patch.is_empty() {
            return Err(RepoError::InvalidField);
        }
        let mut users = self.users.lock().await;
        // Same uniqueness guarantee the partial unique index gives Postgres.
        if let Some(Some(reset_token)) = &patch.reset_token {
            if users
                .values()
                .any(|u| u.id != id && u.reset_token.as_deref() == Some(reset_token.as_str()))
            {
                return Err(RepoError::Storage(anyhow::anyhow!(
                    "reset token already in use"
                )));
            }
        }
        let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(session_id) = patch.session_id {
            user.session_id = session_id;
        }
        if let Some(reset_token) = patch.reset_token {
            user.reset_token = reset_token;
        }
        Ok(())
    }
}
