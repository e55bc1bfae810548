//! Bearer token authentication for the HTTP transport.

use crate::error::{DbError, DbResult};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Accepted bearer tokens. Empty means authentication is off.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    tokens: HashSet<String>,
}

impl AuthConfig {
    pub fn from_tokens(tokens: Vec<String>) -> DbResult<Self> {
        let mut accepted = HashSet::new();
        for token in tokens {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                return Err(DbError::config("Empty --auth-token value"));
            }
            accepted.insert(trimmed.to_string());
        }
        Ok(Self { tokens: accepted })
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Compares against every configured token so timing does not reveal which one matched.
    pub fn verify(&self, provided: &str) -> bool {
        self.tokens.iter().fold(false, |found, expected| {
            found | constant_time_eq(provided.as_bytes(), expected.as_bytes())
        })
    }
}

pub async fn auth_middleware(
    State(auth): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(rejection) => {
            warn!(reason = rejection.message, "Authentication failed");
            return unauthorized(rejection.message, rejection.suggestion);
        }
    };

    if auth.verify(token) {
        next.run(request).await
    } else {
        warn!(token_prefix = %mask_token(token), "Authentication failed: invalid token");
        unauthorized(
            "Invalid Bearer token",
            "Check that you are using a token configured with --auth-token",
        )
    }
}

struct Rejection {
    message: &'static str,
    suggestion: &'static str,
}

fn bearer_token(request: &Request<Body>) -> Result<&str, Rejection> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Err(Rejection {
            message: "Missing Bearer token in Authorization header",
            suggestion: "Include a valid token: 'Authorization: Bearer <token>'",
        });
    };
    let malformed = Rejection {
        message: "Invalid Authorization header format. Expected 'Bearer <token>'",
        suggestion: "Use the format: 'Authorization: Bearer <your-token>'",
    };
    let raw = value.to_str().map_err(|_| Rejection {
        message: "Authorization header contains invalid characters",
        suggestion: malformed.suggestion,
    })?;
    match raw.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(Rejection {
            message: "Bearer token is empty",
            suggestion: malformed.suggestion,
        }),
        None => Err(malformed),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(3).collect();
    if token.chars().count() <= 3 {
        "***".to_string()
    } else {
        format!("{prefix}***")
    }
}

fn unauthorized(message: &str, suggestion: &str) -> Response {
    #[derive(Serialize)]
    struct ErrorBody<'a> {
        error: ErrorDetail<'a>,
    }
    #[derive(Serialize)]
    struct ErrorDetail<'a> {
        code: &'static str,
        message: &'a str,
        suggestion: &'a str,
    }

    let body = ErrorBody {
        error: ErrorDetail {
            code: "unauthorized",
            message,
            suggestion,
        },
    };
    let json = serde_json::to_string(&body).unwrap_or_else(|_| {
        r#"{"error":{"code":"unauthorized","message":"Authentication failed"}}"#.to_string()
    });

    (
        StatusCode::UNAUTHORIZED,
        [(header::CONTENT_TYPE, "application/json")],
        json,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(header_value: Option<&str>) -> Request<Body> {
        let mut builder = Request::get("/mcp");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_from_tokens_trims_and_dedupes() {
        let auth = AuthConfig::from_tokens(vec![" alpha ".into(), "alpha".into(), "beta".into()])
            .unwrap();
        assert!(auth.is_enabled());
        assert_eq!(auth.token_count(), 2);
        assert!(auth.verify("alpha"));
        assert!(!auth.verify("gamma"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(AuthConfig::from_tokens(vec!["  ".into()]).is_err());
        assert!(!AuthConfig::from_tokens(vec![]).unwrap().is_enabled());
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&request_with(Some("Bearer abc"))).ok(), Some("abc"));
        assert!(bearer_token(&request_with(None)).is_err());
        assert!(bearer_token(&request_with(Some("Basic abc"))).is_err());
        let empty = bearer_token(&request_with(Some("Bearer  "))).err().unwrap();
        assert_eq!(empty.message, "Bearer token is empty");
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("ab"), "***");
        assert_eq!(mask_token("secret-token"), "sec***");
        assert_eq!(mask_token("日本語テキスト"), "日本語***");
    }

    #[test]
    fn test_unauthorized_body() {
        let response = unauthorized("nope", "try again");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
