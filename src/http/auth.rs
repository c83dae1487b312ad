//! Bearer-token guard for the admin API.
//!
//! Admin requests carry an HS256 JWT (issued by the admin login flow, which
//! is delegated to Supabase and out of scope here). The guard verifies the
//! signature against `JWT_SECRET` and requires the `admin` role claim.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AdminAuthConfig;

/// Claims carried by an admin token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"success": false, "error": message})),
    )
        .into_response()
}

/// Middleware: reject requests without a valid admin bearer token.
pub async fn require_admin(
    State(auth): State<Option<AdminAuthConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth) = auth else {
        return unauthorized("admin API is not configured");
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("missing bearer token");
    };

    let key = DecodingKey::from_secret(auth.jwt_secret.expose_secret().as_bytes());
    let claims = match decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256)) {
        Ok(data) => data.claims,
        Err(_) => return unauthorized("invalid token"),
    };

    if claims.role != "admin" {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"success": false, "error": "admin role required"})),
        )
            .into_response();
    }

    next.run(request).await
}

/// Mint a token for the given role. Used by tests and local tooling.
pub fn mint_token(secret: &str, sub: &str, role: &str, ttl_secs: u64) -> String {
    let exp = (chrono::Utc::now().timestamp() as usize) + ttl_secs as usize;
    let claims = Claims {
        sub: sub.to_string(),
        role: role.to_string(),
        exp,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("HS256 signing cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_token_decodes_with_same_secret() {
        let token = mint_token("s3cret", "ops@example.com", "admin", 3600);
        let key = DecodingKey::from_secret(b"s3cret");
        let data = decode::<Claims>(&token, &key, &Validation::new(Algorithm::HS256)).unwrap();
        assert_eq!(data.claims.role, "admin");
        assert_eq!(data.claims.sub, "ops@example.com");
    }

    #[test]
    fn wrong_secret_fails_decode() {
        let token = mint_token("s3cret", "ops@example.com", "admin", 3600);
        let key = DecodingKey::from_secret(b"other");
        assert!(decode::<Claims>(&token, &key, &Validation::new(Algorithm::HS256)).is_err());
    }
}
