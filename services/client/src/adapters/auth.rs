//! services/client/src/adapters/auth.rs
//!
//! This module contains the adapter for the auth service. It implements the
//! `AuthService` port from the `core` crate over the `/auth/*` endpoints.

use async_trait::async_trait;
use coursedocs_core::domain::{Credentials, User};
use coursedocs_core::ports::{AuthService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::http::{expect_success, parse_timestamp, rejection, transport, HttpBackend};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `AuthService` port against the auth service.
#[derive(Clone)]
pub struct HttpAuthAdapter {
    backend: HttpBackend,
}

impl HttpAuthAdapter {
    /// Creates a new `HttpAuthAdapter`.
    pub fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }

    async fn exchange(&self, path: &str, credentials: &Credentials, fallback: &str) -> PortResult<String> {
        let response = self
            .backend
            .client()
            .post(self.backend.url(path))
            .json(&CredentialsBody {
                email: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(rejection(response, fallback).await);
        }

        let token: TokenRecord = response.json().await.map_err(transport)?;
        debug!("Received {} token", token.token_type.as_deref().unwrap_or("bearer"));
        Ok(token.access_token)
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Serialize)]
struct CredentialsBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenRecord {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Deserialize)]
struct UserRecord {
    id: Uuid,
    email: String,
    created_at: String,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let created_at = parse_timestamp(&self.created_at).ok_or_else(|| {
            PortError::Unexpected(format!("Unreadable created_at: {}", self.created_at))
        })?;
        Ok(User {
            id: self.id,
            email: self.email,
            created_at,
        })
    }
}

//=========================================================================================
// `AuthService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthService for HttpAuthAdapter {
    async fn login(&self, credentials: &Credentials) -> PortResult<String> {
        self.exchange("/auth/login", credentials, "Login failed").await
    }

    async fn register(&self, credentials: &Credentials) -> PortResult<String> {
        self.exchange("/auth/register", credentials, "Registration failed").await
    }

    async fn current_user(&self, token: &str) -> PortResult<User> {
        let response = self
            .backend
            .client()
            .get(self.backend.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let record: UserRecord = expect_success(response, "Identity lookup failed")
            .await?
            .json()
            .await
            .map_err(transport)?;
        record.to_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_record_with_naive_timestamp() {
        let record: UserRecord = serde_json::from_str(
            r#"{"id":"6f1c1a52-3c55-4c1e-9a43-2f8f2e0d9b10","email":"ana@umd.edu","created_at":"2024-09-01T10:30:00.5"}"#,
        )
        .unwrap();
        let user = record.to_domain().unwrap();
        assert_eq!(user.email, "ana@umd.edu");
        assert_eq!(user.created_at.to_rfc3339(), "2024-09-01T10:30:00.500+00:00");
    }

    #[test]
    fn identity_record_with_garbage_timestamp_fails() {
        let record: UserRecord = serde_json::from_str(
            r#"{"id":"6f1c1a52-3c55-4c1e-9a43-2f8f2e0d9b10","email":"ana@umd.edu","created_at":"soon"}"#,
        )
        .unwrap();
        assert!(matches!(record.to_domain(), Err(PortError::Unexpected(_))));
    }

    #[test]
    fn token_type_is_optional() {
        let token: TokenRecord = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(token.access_token, "abc");
        assert!(token.token_type.is_none());
    }
}
