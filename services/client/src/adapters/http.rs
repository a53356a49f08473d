//! services/client/src/adapters/http.rs
//!
//! Shared plumbing for the HTTP adapters: the client wrapper, error-body
//! decoding and the wire helpers the record structs have in common.

use chrono::{DateTime, NaiveDateTime, Utc};
use coursedocs_core::ports::{PortError, PortResult};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Builds the `reqwest` client shared by every adapter.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// A `reqwest` client bound to one service's base URL.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

//=========================================================================================
// Response Handling
//=========================================================================================

/// Error body shape used by the backends (`{"detail": ...}`).
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Maps a transport failure into the port error space.
pub(crate) fn transport(err: reqwest::Error) -> PortError {
    PortError::Unexpected(err.to_string())
}

/// Turns any non-success response into `PortError::Rejected`, using the
/// server's `detail` field or `fallback` when the body has none.
pub(crate) async fn rejection(response: Response, fallback: &str) -> PortError {
    let status = response.status().as_u16();
    let detail = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(text)),
        }) => text,
        Ok(ErrorBody {
            detail: Some(other),
        }) if !other.is_null() => other.to_string(),
        _ => fallback.to_string(),
    };
    PortError::Rejected { status, detail }
}

/// Passes success responses through and classifies the rest for
/// authenticated calls: 401 and 404 get their own variants.
pub(crate) async fn expect_success(response: Response, fallback: &str) -> PortResult<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
        StatusCode::NOT_FOUND => match rejection(response, fallback).await {
            PortError::Rejected { detail, .. } => Err(PortError::NotFound(detail)),
            other => Err(other),
        },
        _ => Err(rejection(response, fallback).await),
    }
}

//=========================================================================================
// Wire Helpers
//=========================================================================================

/// Identifiers arrive as strings (UUIDs) or as bare integers.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub(crate) enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    pub(crate) fn into_string(self) -> String {
        match self {
            WireId::Text(text) => text,
            WireId::Number(number) => number.to_string(),
        }
    }
}

/// Parses RFC 3339 timestamps, and naive ISO-8601 timestamps as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn timestamps_with_and_without_offset() {
        let with_offset = parse_timestamp("2024-09-01T10:30:00+02:00").unwrap();
        assert_eq!(with_offset.hour(), 8);

        let naive = parse_timestamp("2024-09-01T10:30:00.123456").unwrap();
        assert_eq!((naive.month(), naive.hour()), (9, 10));

        let spaced = parse_timestamp("2024-09-01 10:30:00").unwrap();
        assert_eq!(spaced.minute(), 30);

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        let ids: Vec<WireId> = serde_json::from_str(r#"["a1", 5]"#).unwrap();
        let ids: Vec<String> = ids.into_iter().map(WireId::into_string).collect();
        assert_eq!(ids, vec!["a1".to_string(), "5".to_string()]);
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let backend = HttpBackend::new(reqwest::Client::new(), "http://localhost:8001/");
        assert_eq!(backend.url("/documents"), "http://localhost:8001/documents");
    }
}
