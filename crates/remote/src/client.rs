//! HTTP implementation of [`SlidesClient`].

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use slides_core::types::{BatchUpdateRequest, BatchUpdateResponse};
use slides_core::{Authenticator, Error, ObjectKind, Presentation, Request, Result, SlidesClient};
use std::time::Duration;

/// Public endpoint of the Slides API.
pub const DEFAULT_API_BASE: &str = "https://slides.googleapis.com";

/// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Blocking client for `presentations.get` and `presentations.batchUpdate`.
pub struct HttpSlidesClient {
    http: Option<Client>,
    api_base: String,
    access_token: String,
}

impl HttpSlidesClient {
    /// Create a client. `timeout` of `None` waits indefinitely.
    pub fn new(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        let http = match Client::builder().timeout(timeout).build() {
            Ok(client) => Some(client),
            Err(e) => {
                log::error!("Failed to initialize HTTP client: {}", e);
                None
            }
        };

        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn presentation_url(&self, presentation_id: &str) -> String {
        format!("{}/v1/presentations/{}", self.api_base, presentation_id)
    }

    fn batch_update_url(&self, presentation_id: &str) -> String {
        format!("{}:batchUpdate", self.presentation_url(presentation_id))
    }

    fn http(&self) -> Result<&Client> {
        self.http
            .as_ref()
            .ok_or_else(|| Error::RemoteUnavailable("HTTP client not initialized".to_string()))
    }
}

impl SlidesClient for HttpSlidesClient {
    fn is_ready(&self) -> bool {
        self.http.is_some()
    }

    fn get_presentation(&self, presentation_id: &str) -> Result<Presentation> {
        let url = self.presentation_url(presentation_id);
        log::debug!("GET {}", url);

        let response = self
            .http()?
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let response = check_status(response, presentation_id)?;
        response
            .json::<Presentation>()
            .map_err(|e| Error::Decode(format!("Failed to decode presentation: {}", e)))
    }

    fn batch_update(
        &self,
        presentation_id: &str,
        requests: &[Request],
    ) -> Result<BatchUpdateResponse> {
        let url = self.batch_update_url(presentation_id);
        log::debug!("POST {} ({} requests)", url, requests.len());

        let body = BatchUpdateRequest {
            requests: requests.to_vec(),
        };
        let response = self
            .http()?
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .map_err(|e| Error::Transport(e.to_string()))?;

        let response = check_status(response, presentation_id)?;
        response
            .json::<BatchUpdateResponse>()
            .map_err(|e| Error::Decode(format!("Failed to decode batch reply: {}", e)))
    }
}

fn check_status(response: Response, presentation_id: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(status_error(status, &body, presentation_id))
}

/// Map a non-success status and its body to our error taxonomy.
fn status_error(status: StatusCode, body: &str, presentation_id: &str) -> Error {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::AuthRequired,
        StatusCode::NOT_FOUND => Error::not_found(ObjectKind::Presentation, presentation_id),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT => Error::RemoteRejected(message),
        _ => Error::Transport(format!("HTTP {}: {}", status, message)),
    }
}

/// Authenticator backed by a pre-issued access token.
///
/// Signing in succeeds only when a token was supplied.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuth {
    token: Option<String>,
    signed_in: bool,
}

impl StaticTokenAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            signed_in: false,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl Authenticator for StaticTokenAuth {
    fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    fn sign_in(&mut self) -> Result<()> {
        if self.token.is_none() {
            return Err(Error::AuthRequired);
        }
        self.signed_in = true;
        Ok(())
    }

    fn sign_out(&mut self) -> Result<()> {
        self.signed_in = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = HttpSlidesClient::new("https://example.test/", "t", None);
        assert_eq!(
            client.presentation_url("abc"),
            "https://example.test/v1/presentations/abc"
        );
        assert_eq!(
            client.batch_update_url("abc"),
            "https://example.test/v1/presentations/abc:batchUpdate"
        );
        assert!(client.is_ready());
    }

    #[test]
    fn test_status_mapping() {
        let body = r#"{"error": {"code": 400, "message": "Invalid requests[3].updateTextStyle: The end index (10) should not be greater than the existing text length.", "status": "INVALID_ARGUMENT"}}"#;
        match status_error(StatusCode::BAD_REQUEST, body, "p") {
            Error::RemoteRejected(msg) => assert!(msg.starts_with("Invalid requests[3]")),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED, "", "p"),
            Error::AuthRequired
        );
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, "", "p"),
            Error::not_found(ObjectKind::Presentation, "p")
        );
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "upstream", "p"),
            Error::Transport(_)
        ));
    }

    #[test]
    fn test_static_token_auth() {
        let mut auth = StaticTokenAuth::new(Some("  ".to_string()));
        assert_eq!(auth.sign_in(), Err(Error::AuthRequired));
        assert!(!auth.is_signed_in());

        let mut auth = StaticTokenAuth::new(Some("ya29.token".to_string()));
        auth.sign_in().unwrap();
        assert!(auth.is_signed_in());
        auth.sign_out().unwrap();
        assert!(!auth.is_signed_in());
    }
}
