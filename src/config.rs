use anyhow::Context;
use serde::Deserialize;

/// Upper bound for `SESSION_TTL_MINUTES` (one year).
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub base_url: String,
    pub client_id: String,
    pub issuer_base_url: String,
    pub session_ttl_minutes: i64,
    /// Send the browser through the provider's logout endpoint on `/logout`.
    pub auth0_logout: bool,
}

impl AuthConfig {
    pub fn callback_url(&self) -> String {
        format!("{}/callback", self.base_url.trim_end_matches('/'))
    }

    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Session lifetime in minutes, kept within `1..=MAX_SESSION_TTL_MINUTES`.
    pub fn session_ttl_minutes(&self) -> i64 {
        self.session_ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub origin: String,
    pub methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub credentials: bool,
}

impl CorsConfig {
    pub fn for_client(client_url: &str) -> Self {
        Self {
            origin: client_url.to_string(),
            methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: vec!["content-type".into(), "authorization".into()],
            exposed_headers: vec!["set-cookie".into()],
            credentials: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub client_url: String,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("missing environment variable {key}"))
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let client_url = required("CLIENT_URL")?;
        let auth = AuthConfig {
            secret: required("SECRET")?,
            base_url: required("BASE_URL")?,
            client_id: required("CLIENT_ID")?,
            issuer_base_url: required("ISSUER_BASE_URL")?,
            session_ttl_minutes: parsed_or("SESSION_TTL_MINUTES", 60 * 24_i64)
                .clamp(1, MAX_SESSION_TTL_MINUTES),
            auth0_logout: parsed_or("AUTH0_LOGOUT", true),
        };
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed_or("PORT", 3000),
            cors: CorsConfig::for_client(&client_url),
            client_url,
            auth,
        })
    }
}
