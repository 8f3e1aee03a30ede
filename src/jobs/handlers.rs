use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{claims::IdentityClaims, SessionUser},
    error::{AppError, AppResult},
    jobs::{
        dto::{CreateJobRequest, Pagination},
        repo_types::Job,
    },
    routes::API_PREFIX,
    state::AppState,
    users::repo_types::{Role, User},
};

pub fn jobs_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job).delete(delete_job))
}

async fn current_user(state: &AppState, identity: &IdentityClaims) -> AppResult<User> {
    state
        .users
        .find_by_auth0_id(&identity.sub)
        .await?
        .ok_or_else(|| AppError::forbidden("No user record for this session"))
}

#[instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> AppResult<Json<Vec<Job>>> {
    let (limit, offset) = p.bounds();
    let jobs = state.jobs.list(limit, offset).await?;
    Ok(Json(jobs))
}

#[instrument(skip(state))]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Job>> {
    state
        .jobs
        .find(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Job not found"))
}

#[instrument(skip(state, identity, body), fields(sub = %identity.sub))]
pub async fn create_job(
    State(state): State<AppState>,
    SessionUser(identity): SessionUser,
    Json(mut body): Json<CreateJobRequest>,
) -> AppResult<(StatusCode, HeaderMap, Json<Job>)> {
    let user = current_user(&state, &identity).await?;
    if user.role != Role::Recruiter {
        return Err(AppError::forbidden("Only recruiters can post jobs"));
    }
    body.validate()?;

    let job = state.jobs.create(user.id, &body).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("{API_PREFIX}/jobs/{}", job.id)) {
        headers.insert(header::LOCATION, location);
    }
    info!(job_id = %job.id, user_id = %user.id, "job posted");
    Ok((StatusCode::CREATED, headers, Json(job)))
}

#[instrument(skip(state, identity), fields(sub = %identity.sub))]
pub async fn delete_job(
    State(state): State<AppState>,
    SessionUser(identity): SessionUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let user = current_user(&state, &identity).await?;
    if !state.jobs.delete_owned(id, user.id).await? {
        return Err(AppError::not_found("Job not found"));
    }
    info!(job_id = %id, user_id = %user.id, "job deleted");
    Ok(StatusCode::NO_CONTENT)
}
