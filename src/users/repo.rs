use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::repo_types::{NewUser, ProfileUpdate, User};

/// Result of attaching direct-login credentials to an account.
#[derive(Debug)]
pub enum CredentialUpdate {
    Updated(User),
    UsernameTaken,
    NotFound,
}

/// Persistent collection of users keyed by identity-provider subject.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_auth0_id(&self, auth0_id: &str) -> anyhow::Result<Option<User>>;

    /// Inserts unless a record with the same `auth0_id` exists.
    /// Returns `None` when the insert lost to an existing row.
    async fn insert_if_absent(&self, user: &NewUser) -> anyhow::Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    async fn update_profile(
        &self,
        auth0_id: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Option<User>>;

    async fn set_credentials(
        &self,
        auth0_id: &str,
        username: &str,
        password_hash: &str,
    ) -> anyhow::Result<CredentialUpdate>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_auth0_id(&self, auth0_id: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, auth0_id, name, email, profile_picture, role, username, password_hash, created_at
            FROM users
            WHERE auth0_id = $1
            "#,
        )
        .bind(auth0_id)
        .fetch_optional(&self.db)
        .await
        .context("select user by auth0_id")?;
        Ok(user)
    }

    async fn insert_if_absent(&self, user: &NewUser) -> anyhow::Result<Option<User>> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (auth0_id, name, email, profile_picture, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (auth0_id) DO NOTHING
            RETURNING id, auth0_id, name, email, profile_picture, role, username, password_hash, created_at
            "#,
        )
        .bind(&user.auth0_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.profile_picture)
        .bind(user.role)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(created)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, auth0_id, name, email, profile_picture, role, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("select user by username")?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        auth0_id: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                profile_picture = COALESCE($3, profile_picture),
                role = COALESCE($4, role)
            WHERE auth0_id = $1
            RETURNING id, auth0_id, name, email, profile_picture, role, username, password_hash, created_at
            "#,
        )
        .bind(auth0_id)
        .bind(&update.name)
        .bind(&update.profile_picture)
        .bind(update.role)
        .fetch_optional(&self.db)
        .await
        .context("update user profile")?;
        Ok(user)
    }

    async fn set_credentials(
        &self,
        auth0_id: &str,
        username: &str,
        password_hash: &str,
    ) -> anyhow::Result<CredentialUpdate> {
        let res = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, password_hash = $3
            WHERE auth0_id = $1
            RETURNING id, auth0_id, name, email, profile_picture, role, username, password_hash, created_at
            "#,
        )
        .bind(auth0_id)
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await;

        match res {
            Ok(Some(user)) => Ok(CredentialUpdate::Updated(user)),
            Ok(None) => Ok(CredentialUpdate::NotFound),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Ok(CredentialUpdate::UsernameTaken)
            }
            Err(e) => Err(anyhow::Error::new(e).context("update user credentials")),
        }
    }
}
