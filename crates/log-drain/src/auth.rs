// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP Basic authentication for the drain endpoint.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;
use tracing::debug;

const CHALLENGE: &str = "Basic realm=\"Authorization Required\"";

/// The single username and password pair accepted by the drain.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Checks an `Authorization` header value. Both halves are always compared in
    /// constant time.
    pub fn verify(&self, authorization: &str) -> bool {
        let Some(encoded) = authorization
            .strip_prefix("Basic ")
            .or_else(|| authorization.strip_prefix("basic "))
        else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        let Some((username, password)) = decoded.split_once(':') else {
            return false;
        };

        let username_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let password_ok = password.as_bytes().ct_eq(self.password.as_bytes());
        (username_ok & password_ok).into()
    }
}

/// Middleware rejecting requests that lack valid credentials with a 401 challenge.
pub async fn require_basic_auth(
    State(credentials): State<Arc<Credentials>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| credentials.verify(value));

    if authorized {
        return next.run(request).await;
    }

    debug!("Rejected unauthenticated drain request");
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE))],
        "Unauthorized",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::post;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
    }

    #[test]
    fn test_verify() {
        let credentials = Credentials::new("drain", "s3cret");
        assert!(credentials.verify(&basic("drain", "s3cret")));
        assert!(!credentials.verify(&basic("drain", "wrong")));
        assert!(!credentials.verify(&basic("other", "s3cret")));
        assert!(!credentials.verify(&basic("drain", "s3cret2")));
        assert!(!credentials.verify("Bearer abc"));
        assert!(!credentials.verify("Basic !!!not-base64"));
        assert!(!credentials.verify(&format!("Basic {}", STANDARD.encode("nocolon"))));
    }

    #[test]
    fn test_password_may_contain_colon() {
        let credentials = Credentials::new("drain", "a:b");
        assert!(credentials.verify(&basic("drain", "a:b")));
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("drain", "s3cret"));
        assert!(!debug.contains("s3cret"));
    }

    fn app() -> Router {
        let credentials = Arc::new(Credentials::new("drain", "s3cret"));
        Router::new()
            .route("/", post(|| async { "OK" }))
            .route_layer(middleware::from_fn_with_state(credentials, require_basic_auth))
    }

    #[tokio::test]
    async fn test_missing_credentials_get_challenge() {
        let response = app()
            .oneshot(
                axum::http::Request::post("/")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("router is infallible");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static(CHALLENGE))
        );
    }

    #[tokio::test]
    async fn test_valid_credentials_pass_through() {
        let response = app()
            .oneshot(
                axum::http::Request::post("/")
                    .header(header::AUTHORIZATION, basic("drain", "s3cret"))
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("router is infallible");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
