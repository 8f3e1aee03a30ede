use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

/// Job posting in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<i64>,
    pub job_type: JobType,
    pub posted_by: Uuid, // users.id of the recruiter
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
