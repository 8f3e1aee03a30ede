use tracing::{error, info, instrument};

use crate::{
    auth::claims::IdentityClaims,
    users::{
        repo::UserDirectory,
        repo_types::{NewUser, Role, User},
    },
};

/// What [`ensure_user_in_db`] did for a given subject.
#[derive(Debug)]
pub enum SyncOutcome {
    Created(User),
    /// A record already existed (or a concurrent login created it first).
    Existing(Option<User>),
    Failed(anyhow::Error),
}

impl SyncOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

impl From<&IdentityClaims> for NewUser {
    fn from(claims: &IdentityClaims) -> Self {
        Self {
            auth0_id: claims.sub.clone(),
            name: claims.name.clone(),
            email: claims.email.clone(),
            profile_picture: claims.picture.clone(),
            role: Role::Jobseeker,
        }
    }
}

/// Makes sure a user record exists for the authenticated subject.
///
/// Existing records are left untouched: claims are only copied at creation so
/// locally edited profile data survives later logins. Errors are logged and
/// reported through [`SyncOutcome::Failed`], never propagated.
#[instrument(skip(users, claims), fields(sub = %claims.sub))]
pub async fn ensure_user_in_db(users: &dyn UserDirectory, claims: &IdentityClaims) -> SyncOutcome {
    match users.find_by_auth0_id(&claims.sub).await {
        Ok(Some(existing)) => {
            info!("user already exists");
            return SyncOutcome::Existing(Some(existing));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %format!("{e:#}"), op = "find_by_auth0_id", "user sync failed");
            return SyncOutcome::Failed(e);
        }
    }

    match users.insert_if_absent(&NewUser::from(claims)).await {
        Ok(Some(created)) => {
            info!(user_id = %created.id, "new user created");
            SyncOutcome::Created(created)
        }
        Ok(None) => {
            info!("user created concurrently");
            SyncOutcome::Existing(None)
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), op = "insert_if_absent", "user sync failed");
            SyncOutcome::Failed(e)
        }
    }
}
