//! Caller identity from the `X-User-Id` header.
//!
//! Authentication happens upstream; this service trusts the header and
//! falls back to the shared guest identity when it is absent.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use mediavault_core::Identity;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the calling [`Identity`].
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(Identity::user)
            .unwrap_or_else(Identity::guest);
        Ok(Caller(identity))
    }
}
