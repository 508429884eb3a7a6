//! Registrations API client.
//!
//! Fetches one page of tickets at a time from
//! `{base}/{account}/{event}/registrations?page={n}`. Each call is
//! independent; the walker decides which page to ask for next.

use crate::config::TitoConfig;
use crate::error::{FetchError, FetchResult, Result, WorkerError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use sync_core::RegistrationsPage;

/// Longest slice of an error body kept for logging.
const ERROR_BODY_LIMIT: usize = 512;

/// A paginated source of remote tickets.
#[async_trait]
pub trait RegistrationSource: Send + Sync {
    /// Fetch and decode one page (1-based).
    async fn fetch_page(&self, page: u32) -> FetchResult<RegistrationsPage>;
}

/// Tito HTTP client.
#[derive(Debug, Clone)]
pub struct TitoClient {
    http: reqwest::Client,
    registrations_url: String,
}

impl TitoClient {
    /// Build a client from configuration.
    ///
    /// The API key is installed as a default `Authorization` header and the
    /// per-request timeout is applied to every call.
    pub fn new(config: &TitoConfig) -> Result<Self> {
        let api_key = config.api_key.as_deref().unwrap_or_default();
        let mut auth = HeaderValue::from_str(&format!("Token token={}", api_key)).map_err(|_| {
            crate::config::ConfigError::Invalid {
                field: "tito.api_key",
                reason: "contains characters not allowed in a header".into(),
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, application/vnd.api+json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(WorkerError::Client)?;

        Ok(Self {
            http,
            registrations_url: registrations_url(config),
        })
    }

    /// The registrations endpoint, without the page query.
    pub fn registrations_url(&self) -> &str {
        &self.registrations_url
    }
}

#[async_trait]
impl RegistrationSource for TitoClient {
    async fn fetch_page(&self, page: u32) -> FetchResult<RegistrationsPage> {
        let response = self
            .http
            .get(&self.registrations_url)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| FetchError::RemoteUnavailable {
                page,
                reason: describe_transport_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::RemoteUnavailable {
                page,
                reason: format!("HTTP {}: {}", status, truncate(&body, ERROR_BODY_LIMIT)),
            });
        }

        // Tito may answer with application/vnd.api+json, so decode the raw
        // body rather than relying on the content type.
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::RemoteUnavailable {
                page,
                reason: describe_transport_error(&e),
            })?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { page, source })
    }
}

fn registrations_url(config: &TitoConfig) -> String {
    format!(
        "{}/{}/{}/registrations",
        config.base_url.trim_end_matches('/'),
        config.account_id,
        config.event_id
    )
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

fn truncate(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn tito_config(base_url: &str) -> TitoConfig {
        let mut config = Config::default().tito;
        config.base_url = base_url.into();
        config.account_id = "dddperth".into();
        config.event_id = "2024".into();
        config.api_key = Some("secret".into());
        config
    }

    #[test]
    fn builds_registrations_url() {
        let client = TitoClient::new(&tito_config("https://api.tito.io/v3/")).unwrap();
        assert_eq!(
            client.registrations_url(),
            "https://api.tito.io/v3/dddperth/2024/registrations"
        );
    }

    #[test]
    fn rejects_api_key_with_newline() {
        let mut config = tito_config("https://api.tito.io/v3");
        config.api_key = Some("bad\nkey".into());
        assert!(matches!(
            TitoClient::new(&config),
            Err(WorkerError::Config(_))
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abcdef", 3), "abc");
    }

    #[tokio::test]
    async fn unreachable_remote_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let mut config = tito_config("http://127.0.0.1:9");
        config.request_timeout_secs = 2;
        let client = TitoClient::new(&config).unwrap();

        let err = client.fetch_page(1).await.unwrap_err();
        assert!(matches!(err, FetchError::RemoteUnavailable { page: 1, .. }));
    }
}
