use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// URL did not parse or is not http(s)
    #[error("invalid template URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Connection, TLS, timeout or body read failure
    #[error("network error: {0}")]
    Network(String),
    /// Server answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub user_agent: String,
    /// Sent as `Authorization: Bearer ...` when set.
    pub bearer_token: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            user_agent: format!("sheetfill/{}", env!("CARGO_PKG_VERSION")),
            bearer_token: None,
        }
    }
}

/// Template download client (blocking).
#[derive(Clone)]
pub struct TemplateClient {
    http: reqwest::blocking::Client,
    bearer_token: Option<String>,
}

impl TemplateClient {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(ClientOptions::default())
    }

    pub fn with_options(options: ClientOptions) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(options.user_agent)
            .timeout(options.timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            http,
            bearer_token: options.bearer_token,
        })
    }

    /// GET the template bytes at `url`.
    pub fn fetch_template(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = parse_url(url)?;
        log::debug!("fetching template from {url}");

        let mut request = self.http.get(url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Http { status: status.as_u16(), body });
        }

        let bytes = response.bytes().map_err(|e| FetchError::Network(e.to_string()))?;
        log::debug!("fetched {} byte(s) from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Fetch with default options.
pub fn fetch_template(url: &str) -> Result<Vec<u8>, FetchError> {
    TemplateClient::new()?.fetch_template(url)
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl { url: raw.to_string(), reason };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}
