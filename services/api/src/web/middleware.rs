//! services/api/src/web/middleware.rs
//!
//! Identity middleware for protecting routes.
//!
//! Authentication itself is delegated to the external identity provider:
//! the upstream layer terminates the user's session and forwards the
//! verified identity in `x-user-*` headers. This middleware only requires
//! that an identity is present and makes it available to handlers.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use pintarai_core::domain::IdentitySnapshot;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Middleware that extracts the caller's identity from the forwarded
/// headers.
///
/// If present, inserts an [`IdentitySnapshot`] into request extensions for
/// handlers to use. If missing, returns 401 Unauthorized.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let headers = req.headers();

    let uid = header_value(headers, "x-user-id").ok_or(StatusCode::UNAUTHORIZED)?;

    let identity = IdentitySnapshot {
        email: header_value(headers, "x-user-email"),
        display_name: header_value(headers, "x-user-name"),
        photo_url: header_value(headers, "x-user-photo"),
        uid,
    };

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
