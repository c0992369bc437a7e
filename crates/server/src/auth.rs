//! HTTP basic-auth gate for admin routes.

use std::sync::Arc;

use agromaq_core::config::AdminConfig;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct AdminCredentials {
    username: String,
    password: SecretString,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header missing")]
    Missing,
    #[error("authorization header is not valid basic credentials")]
    Malformed,
    #[error("incorrect username or password")]
    Invalid,
}

impl AdminCredentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self { username: username.into(), password }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }

    /// Checks an `Authorization: Basic ...` header, returning the username.
    pub fn verify(&self, authorization: Option<&HeaderValue>) -> Result<String, AuthError> {
        let encoded = authorization
            .ok_or(AuthError::Missing)?
            .to_str()
            .map_err(|_| AuthError::Malformed)?
            .strip_prefix("Basic ")
            .ok_or(AuthError::Malformed)?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
        let (username, password) = decoded.split_once(':').ok_or(AuthError::Malformed)?;

        let username_ok = constant_time_eq(username.as_bytes(), self.username.as_bytes());
        let password_ok =
            constant_time_eq(password.as_bytes(), self.password.expose_secret().as_bytes());
        if username_ok && password_ok {
            Ok(username.to_owned())
        } else {
            Err(AuthError::Invalid)
        }
    }
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    let mut diff = left.len() ^ right.len();
    for (index, byte) in left.iter().enumerate() {
        diff |= usize::from(byte ^ right.get(index).copied().unwrap_or_default());
    }
    diff == 0
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic")],
            Json(json!({ "detail": "Incorrect username or password" })),
        )
            .into_response()
    }
}

/// Extractor that only succeeds for the configured admin. Handlers taking it
/// never run, and never touch storage, for unauthenticated requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminUser(pub String);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AdminCredentials>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let credentials = Arc::<AdminCredentials>::from_ref(state);
        credentials.verify(parts.headers.get(header::AUTHORIZATION)).map(AdminUser).map_err(
            |auth_error| {
                warn!(
                    event_name = "http.admin.unauthorized",
                    path = %parts.uri.path(),
                    reason = %auth_error,
                    "admin request rejected"
                );
                auth_error
            },
        )
    }
}
