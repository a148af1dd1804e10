//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use super::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use crate::{ClientConfig, ClientError};

/// Talks to the backend over HTTP(S).
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    default_timeout: std::time::Duration,
}

impl HttpTransport {
    /// Builds a transport for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` for an unparsable base URL or if
    /// the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut base = config.base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| ClientError::Configuration(format!("invalid base_url: {e}")))?;

        let default_timeout = config
            .timeouts
            .interactive
            .to_std()
            .map_err(|e| ClientError::Configuration(format!("invalid timeout: {e}")))?;

        let client = Client::builder()
            .user_agent(concat!("orgsession/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            default_timeout,
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Other(format!("invalid path {path}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let timeout = request
            .timeout
            .and_then(|t| t.to_std().ok())
            .unwrap_or(self.default_timeout);

        let mut builder = self
            .client
            .request(method, url)
            .query(&request.query)
            .timeout(timeout);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(map_reqwest_error)?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse::new(status, body))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
