use serde::Deserialize;

use crate::{error::AppError, jobs::repo_types::JobType};

const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<i64>,
    pub job_type: JobType,
}

impl CreateJobRequest {
    pub fn validate(&mut self) -> Result<(), AppError> {
        self.title = self.title.trim().to_string();
        self.company = self.company.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::bad_request("Title is required"));
        }
        if self.company.is_empty() {
            return Err(AppError::bad_request("Company is required"));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::bad_request("Description is required"));
        }
        if matches!(self.salary, Some(s) if s < 0) {
            return Err(AppError::bad_request("Salary must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 { 20 }

impl Pagination {
    /// Limit and offset clamped to sane bounds.
    pub fn bounds(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_LIMIT), self.offset.max(0))
    }
}
