use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, instrument};

use crate::{
    auth::claims::{IdTokenClaims, IdentityClaims},
    config::AuthConfig,
};

/// The OpenID-Connect provider as seen by the login routes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to in order to log in.
    async fn authorization_url(&self, state: &str, nonce: &str) -> anyhow::Result<String>;

    /// Verifies a provider-issued id token and returns its identity claims.
    async fn verify_id_token(&self, id_token: &str, nonce: &str) -> anyhow::Result<IdentityClaims>;

    fn logout_url(&self, return_to: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub jwks_uri: String,
}

/// Implicit-flow (`id_token` + `form_post`) client; discovery and JWKS are
/// fetched on first use and cached.
pub struct OidcProvider {
    http: reqwest::Client,
    issuer_base_url: String,
    client_id: String,
    redirect_uri: String,
    auth0_logout: bool,
    metadata: OnceCell<ProviderMetadata>,
    jwks: RwLock<Option<JwkSet>>,
}

impl OidcProvider {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            issuer_base_url: cfg.issuer_base_url.trim_end_matches('/').to_string(),
            client_id: cfg.client_id.clone(),
            redirect_uri: cfg.callback_url(),
            auth0_logout: cfg.auth0_logout,
            metadata: OnceCell::new(),
            jwks: RwLock::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_metadata(cfg: &AuthConfig, metadata: ProviderMetadata) -> Self {
        Self {
            metadata: OnceCell::new_with(Some(metadata)),
            ..Self::new(cfg)
        }
    }

    async fn metadata(&self) -> anyhow::Result<&ProviderMetadata> {
        self.metadata
            .get_or_try_init(|| async {
                let url = format!("{}/.well-known/openid-configuration", self.issuer_base_url);
                let meta = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .context("fetch openid configuration")?
                    .error_for_status()?
                    .json::<ProviderMetadata>()
                    .await
                    .context("parse openid configuration")?;
                info!(issuer = %meta.issuer, "identity provider discovered");
                Ok::<_, anyhow::Error>(meta)
            })
            .await
    }

    async fn cached_key(&self, kid: &str) -> anyhow::Result<Option<DecodingKey>> {
        let guard = self.jwks.read().await;
        match guard.as_ref().and_then(|set| set.find(kid)) {
            Some(jwk) => Ok(Some(DecodingKey::from_jwk(jwk)?)),
            None => Ok(None),
        }
    }

    /// Looks up the signing key for `kid`, refetching the JWKS once on a miss
    /// so rotated keys are picked up.
    async fn key_for(&self, kid: &str) -> anyhow::Result<DecodingKey> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }
        let meta = self.metadata().await?;
        let set = self
            .http
            .get(&meta.jwks_uri)
            .send()
            .await
            .context("fetch jwks")?
            .error_for_status()?
            .json::<JwkSet>()
            .await
            .context("parse jwks")?;
        debug!(keys = set.keys.len(), "jwks refreshed");
        *self.jwks.write().await = Some(set);
        self.cached_key(kid)
            .await?
            .with_context(|| format!("no signing key with kid {kid}"))
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    async fn authorization_url(&self, state: &str, nonce: &str) -> anyhow::Result<String> {
        let meta = self.metadata().await?;
        let url = Url::parse_with_params(
            &meta.authorization_endpoint,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "id_token"),
                ("response_mode", "form_post"),
                ("scope", "openid profile email"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
                ("nonce", nonce),
            ],
        )
        .context("build authorization url")?;
        Ok(url.to_string())
    }

    #[instrument(skip(self, id_token, nonce))]
    async fn verify_id_token(&self, id_token: &str, nonce: &str) -> anyhow::Result<IdentityClaims> {
        let header = decode_header(id_token).context("malformed id token")?;
        let kid = header.kid.as_deref().context("id token has no kid")?;
        let key = self.key_for(kid).await?;
        let meta = self.metadata().await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(std::slice::from_ref(&self.client_id));
        validation.set_issuer(std::slice::from_ref(&meta.issuer));
        let data = decode::<IdTokenClaims>(id_token, &key, &validation)
            .context("id token rejected")?;

        if data.claims.nonce.as_deref() != Some(nonce) {
            anyhow::bail!("id token nonce mismatch");
        }
        debug!(sub = %data.claims.identity.sub, "id token verified");
        Ok(data.claims.identity)
    }

    fn logout_url(&self, return_to: &str) -> anyhow::Result<String> {
        if !self.auth0_logout {
            return Ok(return_to.to_string());
        }
        let url = Url::parse_with_params(
            &format!("{}/v2/logout", self.issuer_base_url),
            &[("client_id", self.client_id.as_str()), ("returnTo", return_to)],
        )
        .context("build logout url")?;
        Ok(url.to_string())
    }
}
