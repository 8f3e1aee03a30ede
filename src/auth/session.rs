use std::time::Duration;

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{
    auth::{
        claims::{AuthVerification, Envelope, IdentityClaims, TokenKind},
        extractors::OidcContext,
    },
    config::AuthConfig,
    state::AppState,
};

pub const SESSION_COOKIE: &str = "appSession";
pub const VERIFICATION_COOKIE: &str = "auth_verification";

const VERIFICATION_TTL: Duration = Duration::from_secs(10 * 60);

/// Signing keys for the cookies this service issues, all derived from `SECRET`.
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
    pub secure: bool,
}

impl SessionKeys {
    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.base_url.clone(),
            audience: cfg.client_id.clone(),
            session_ttl: Duration::from_secs(cfg.session_ttl_minutes() as u64 * 60),
            secure: cfg.secure_cookies(),
        }
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.auth)
    }
}

impl SessionKeys {
    fn sign<T: Serialize>(&self, data: T, kind: TokenKind, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let envelope = Envelope {
            data,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &envelope, &self.encoding)?;
        debug!(kind = ?kind, "cookie token signed");
        Ok(token)
    }

    fn verify<T: DeserializeOwned>(&self, token: &str, kind: TokenKind) -> anyhow::Result<T> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Envelope<T>>(token, &self.decoding, &validation)?;
        if data.claims.kind != kind {
            anyhow::bail!("expected a {kind:?} token");
        }
        Ok(data.claims.data)
    }

    pub fn sign_session(&self, identity: &IdentityClaims) -> anyhow::Result<String> {
        self.sign(identity, TokenKind::Session, self.session_ttl)
    }

    pub fn verify_session(&self, token: &str) -> anyhow::Result<IdentityClaims> {
        self.verify(token, TokenKind::Session)
    }

    pub fn sign_verification(&self, verification: &AuthVerification) -> anyhow::Result<String> {
        self.sign(verification, TokenKind::Verification, VERIFICATION_TTL)
    }

    pub fn verify_verification(&self, token: &str) -> anyhow::Result<AuthVerification> {
        self.verify(token, TokenKind::Verification)
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(TimeDuration::seconds(self.session_ttl.as_secs() as i64))
            .build()
    }

    /// The provider posts back cross-site, so the cookie must not be `Lax`
    /// or `Strict`. Over https it is `SameSite=None`; over plain http
    /// browsers reject `None` without `Secure`, so the attribute is omitted.
    pub fn verification_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::build((VERIFICATION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .max_age(TimeDuration::seconds(VERIFICATION_TTL.as_secs() as i64))
            .build();
        if self.secure {
            cookie.set_same_site(SameSite::None);
        }
        cookie
    }
}

pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Decodes the session cookie and attaches an [`OidcContext`] to the request.
/// A missing, forged or expired cookie yields an anonymous context.
pub async fn session_middleware(
    State(keys): State<SessionKeys>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = jar.get(SESSION_COOKIE).and_then(|c| {
        keys.verify_session(c.value())
            .map_err(|e| warn!(error = %e, "ignoring invalid session cookie"))
            .ok()
    });
    let ctx = OidcContext::new(claims);
    debug!(authenticated = ctx.is_authenticated(), "session resolved");
    req.extensions_mut().insert(ctx);
    next.run(req).await
}
