pub mod claims;
pub mod extractors;
pub mod handlers;
pub mod oidc;
pub mod password;
pub mod session;

pub use extractors::{JsonOrForm, OidcContext, SessionUser};
pub use oidc::{IdentityProvider, OidcProvider};
