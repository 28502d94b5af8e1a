//! Browser-like HTTP client.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;

use tesouro_traits::SourceError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// HTTP client that presents itself as desktop Chrome.
///
/// Upstream sits behind a bot filter that rejects default library user
/// agents, so the client sends the headers a browser navigation would and
/// keeps cookies between requests.
#[derive(Debug, Clone)]
pub struct BrowserClient {
    client: reqwest::Client,
}

impl BrowserClient {
    /// Create a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .cookie_store(true)
            .gzip(true)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::ConnectionFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` and return the body of a 2xx response.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes, SourceError> {
        debug!(url, "Requesting upstream dataset");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::ConnectionFailed(format!("request timeout: {e}"))
            } else if e.is_connect() {
                SourceError::ConnectionFailed(format!("connection failed: {e}"))
            } else {
                SourceError::ConnectionFailed(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::BodyRead(e.to_string()))?;
        debug!(url, bytes = body.len(), "Upstream dataset received");
        Ok(body)
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(
            "\"Chromium\";v=\"130\", \"Google Chrome\";v=\"130\", \"Not?A_Brand\";v=\"99\"",
        ),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_headers_look_like_chrome() {
        let headers = browser_headers();
        assert_eq!(headers["sec-ch-ua-platform"], "\"Windows\"");
        assert!(headers[header::ACCEPT_LANGUAGE]
            .to_str()
            .unwrap()
            .starts_with("pt-BR"));
        assert!(USER_AGENT.contains("Chrome/"));
    }

    #[test]
    fn test_client_builds() {
        assert!(BrowserClient::new(DEFAULT_TIMEOUT).is_ok());
    }
}
