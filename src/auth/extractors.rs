use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::CONTENT_TYPE, request::Parts},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::{auth::claims::IdentityClaims, error::AppError};

/// Per-request authentication state, populated by the session middleware.
#[derive(Debug, Clone, Default)]
pub struct OidcContext {
    claims: Option<IdentityClaims>,
}

impl OidcContext {
    pub fn new(claims: Option<IdentityClaims>) -> Self {
        Self { claims }
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    pub fn user(&self) -> Option<&IdentityClaims> {
        self.claims.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OidcContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<OidcContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Claims of the logged-in user; rejects anonymous requests with 401.
pub struct SessionUser(pub IdentityClaims);

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OidcContext>()
            .and_then(|ctx| ctx.claims.clone())
            .map(SessionUser)
            .ok_or_else(|| AppError::unauthorized("Not logged in"))
    }
}

/// Body extractor accepting either `application/json` or
/// `application/x-www-form-urlencoded`.
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(value))
        }
    }
}
