use serde::{Deserialize, Serialize};

/// Identity attributes asserted by the identity provider for a logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Type of signed token: session cookie or login-flow verification cookie.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Verification,
}

/// State carried across the provider redirect in the verification cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthVerification {
    pub state: String,
    pub nonce: String,
    pub return_to: String,
}

/// JWT payload wrapping one of the types above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(flatten)]
    pub data: T,
    pub iat: usize,      // issued at (unix timestamp)
    pub exp: usize,      // expires at (unix timestamp)
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub kind: TokenKind, // token type
}

/// Claims of a provider-issued id token that we read.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    #[serde(flatten)]
    pub identity: IdentityClaims,
    #[serde(default)]
    pub nonce: Option<String>,
}
