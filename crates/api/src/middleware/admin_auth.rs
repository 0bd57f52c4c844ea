//! Admin bearer token authentication middleware.
//!
//! The admin surface is protected by a single static bearer token taken
//! from configuration. Token comparison goes through SHA-256 digests so
//! the check is constant-time with respect to the token contents.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;
use shared::crypto::sha256_hex;

/// Middleware that requires the configured admin bearer token.
///
/// Requests without a matching `Authorization: Bearer <token>` header are
/// rejected. When no admin token is configured the whole admin surface is
/// disabled and responds with 503.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let configured = state.config.security.admin_token.as_str();
    if configured.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "service_unavailable",
                "message": "Admin access is not configured"
            })),
        )
            .into_response();
    }

    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return forbidden_response("Missing or invalid Authorization header");
        }
    };

    if sha256_hex(token) != sha256_hex(configured) {
        return forbidden_response("Invalid admin token");
    }

    next.run(req).await
}

/// Helper to create forbidden response.
fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_response() {
        let response = forbidden_response("Invalid admin token");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_token_digest_comparison() {
        assert_eq!(sha256_hex("admin-token"), sha256_hex("admin-token"));
        assert_ne!(sha256_hex("admin-token"), sha256_hex("other-token"));
    }
}
