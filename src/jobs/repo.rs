use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::jobs::{dto::CreateJobRequest, repo_types::Job};

/// Storage for job postings.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Newest first.
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Job>>;

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Job>>;

    async fn create(&self, posted_by: Uuid, req: &CreateJobRequest) -> anyhow::Result<Job>;

    /// Deletes a job owned by `posted_by`. Returns whether a row was removed.
    async fn delete_owned(&self, id: Uuid, posted_by: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgJobStore {
    db: PgPool,
}

impl PgJobStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Job>> {
        let rows = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, company, location, salary, job_type, posted_by, created_at
            FROM jobs
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list jobs")?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            SELECT id, title, description, company, location, salary, job_type, posted_by, created_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select job")?;
        Ok(job)
    }

    async fn create(&self, posted_by: Uuid, req: &CreateJobRequest) -> anyhow::Result<Job> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (title, description, company, location, salary, job_type, posted_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, description, company, location, salary, job_type, posted_by, created_at
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.company)
        .bind(&req.location)
        .bind(req.salary)
        .bind(req.job_type)
        .bind(posted_by)
        .fetch_one(&self.db)
        .await
        .context("insert job")?;
        Ok(job)
    }

    async fn delete_owned(&self, id: Uuid, posted_by: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1 AND posted_by = $2")
            .bind(id)
            .bind(posted_by)
            .execute(&self.db)
            .await
            .context("delete job")?;
        Ok(res.rows_affected() > 0)
    }
}
