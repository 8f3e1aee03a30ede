//! In-process directories used by handler and reconciler tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::users::{
    repo::{CredentialUpdate, UserDirectory},
    repo_types::{NewUser, ProfileUpdate, User},
};

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<Vec<User>>,
    writes: AtomicUsize,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, user: User) {
        self.users.lock().await.push(user);
    }

    pub async fn all(&self) -> Vec<User> {
        self.users.lock().await.clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

pub fn sample_user(auth0_id: &str) -> User {
    User {
        id: Uuid::new_v4(),
        auth0_id: auth0_id.to_string(),
        name: Some("Ada Lovelace".into()),
        email: Some("ada@example.com".into()),
        profile_picture: None,
        role: Default::default(),
        username: None,
        password_hash: None,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_auth0_id(&self, auth0_id: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.auth0_id == auth0_id).cloned())
    }

    async fn insert_if_absent(&self, new: &NewUser) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.auth0_id == new.auth0_id) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            auth0_id: new.auth0_id.clone(),
            name: new.name.clone(),
            email: new.email.clone(),
            profile_picture: new.profile_picture.clone(),
            role: new.role,
            username: None,
            password_hash: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(user))
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned())
    }

    async fn update_profile(
        &self,
        auth0_id: &str,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().await;
        let Some(user) = users.iter_mut().find(|u| u.auth0_id == auth0_id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            user.name = Some(name.clone());
        }
        if let Some(pic) = &update.profile_picture {
            user.profile_picture = Some(pic.clone());
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(user.clone()))
    }

    async fn set_credentials(
        &self,
        auth0_id: &str,
        username: &str,
        password_hash: &str,
    ) -> anyhow::Result<CredentialUpdate> {
        let mut users = self.users.lock().await;
        if users
            .iter()
            .any(|u| u.username.as_deref() == Some(username) && u.auth0_id != auth0_id)
        {
            return Ok(CredentialUpdate::UsernameTaken);
        }
        let Some(user) = users.iter_mut().find(|u| u.auth0_id == auth0_id) else {
            return Ok(CredentialUpdate::NotFound);
        };
        user.username = Some(username.to_string());
        user.password_hash = Some(password_hash.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(CredentialUpdate::Updated(user.clone()))
    }
}

/// Directory whose every call fails, standing in for a lost database.
pub struct FailingUserDirectory;

#[async_trait]
impl UserDirectory for FailingUserDirectory {
    async fn find_by_auth0_id(&self, _auth0_id: &str) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }

    async fn insert_if_absent(&self, _user: &NewUser) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }

    async fn find_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }

    async fn update_profile(
        &self,
        _auth0_id: &str,
        _update: &ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        anyhow::bail!("connection refused")
    }

    async fn set_credentials(
        &self,
        _auth0_id: &str,
        _username: &str,
        _password_hash: &str,
    ) -> anyhow::Result<CredentialUpdate> {
        anyhow::bail!("connection refused")
    }
}
