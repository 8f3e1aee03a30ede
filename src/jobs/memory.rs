//! In-process job store used by handler tests.

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::jobs::{
    dto::CreateJobRequest,
    repo::JobStore,
    repo_types::{Job, JobType},
};

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, job: Job) {
        self.jobs.lock().await.push(job);
    }

    pub async fn all(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }
}

/// A job posted by `posted_by`, `age_minutes` ago.
pub fn sample_job(title: &str, posted_by: Uuid, age_minutes: i64) -> Job {
    Job {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: "Build services".into(),
        company: "Acme".into(),
        location: None,
        salary: None,
        job_type: JobType::FullTime,
        posted_by,
        created_at: OffsetDateTime::now_utc() - Duration::minutes(age_minutes),
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn list(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Job>> {
        let mut jobs = self.jobs.lock().await.clone();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Job>> {
        Ok(self.jobs.lock().await.iter().find(|j| j.id == id).cloned())
    }

    async fn create(&self, posted_by: Uuid, req: &CreateJobRequest) -> anyhow::Result<Job> {
        let job = Job {
            id: Uuid::new_v4(),
            title: req.title.clone(),
            description: req.description.clone(),
            company: req.company.clone(),
            location: req.location.clone(),
            salary: req.salary,
            job_type: req.job_type,
            posted_by,
            created_at: OffsetDateTime::now_utc(),
        };
        self.jobs.lock().await.push(job.clone());
        Ok(job)
    }

    async fn delete_owned(&self, id: Uuid, posted_by: Uuid) -> anyhow::Result<bool> {
        let mut jobs = self.jobs.lock().await;
        let before = jobs.len();
        jobs.retain(|j| !(j.id == id && j.posted_by == posted_by));
        Ok(jobs.len() < before)
    }
}
