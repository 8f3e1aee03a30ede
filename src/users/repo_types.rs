use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Role of a registered person. New accounts start as job seekers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    #[default]
    Jobseeker,
    Recruiter,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub auth0_id: String,             // identity-provider subject, never mutated
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Role,
    pub username: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>, // Argon2 hash, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied when provisioning a user from identity claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub auth0_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Role,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Option<Role>,
}

/// Public view of a user, returned by lookups that do not belong to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub auth0_id: String,
    pub name: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Role,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            auth0_id: u.auth0_id,
            name: u.name,
            profile_picture: u.profile_picture,
            role: u.role,
        }
    }
}
