use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response, StatusCode, header};

use crate::{Error, Result};

/// Shared HTTP plumbing for providers.
pub struct BaseProviderBuilder {
    pub client_builder: ClientBuilder,
    pub info: ProviderInfo,
}

pub struct BaseProvider {
    pub client: Client,
    pub info: ProviderInfo,
}

pub struct ProviderInfo {
    pub name: String,
}

impl BaseProviderBuilder {
    pub fn new(info: ProviderInfo) -> Self {
        let client_builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("mathrice-export/", env!("CARGO_PKG_VERSION")))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
                headers.insert(
                    header::ACCEPT_ENCODING,
                    header::HeaderValue::from_static("br;q=1.0, gzip;q=0.9, deflate;q=0.8"),
                );
                headers
            });

        Self {
            client_builder,
            info,
        }
    }

    pub fn new_with_timeout(info: ProviderInfo, timeout_secs: u64) -> Self {
        let mut s = Self::new(info);
        s.client_builder = s.client_builder.timeout(Duration::from_secs(timeout_secs));
        s
    }

    pub fn build(self) -> Result<BaseProvider> {
        let client = self
            .client_builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(BaseProvider {
            client,
            info: self.info,
        })
    }
}

impl BaseProvider {
    /// Classify a transport-level failure.
    pub fn handle_error_req(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else if error.is_connect() {
            Error::Transient(format!("{}: {}", self.info.name, error))
        } else if error.is_request() {
            Error::Provider {
                provider: self.info.name.clone(),
                message: format!("Request failed: {}", error),
            }
        } else {
            Error::Http(error)
        }
    }

    pub fn custom_error(&self, message: impl Into<String>) -> Error {
        Error::Provider {
            provider: self.info.name.clone(),
            message: message.into(),
        }
    }

    /// Map a non-success status onto the error taxonomy; pass successes through.
    pub async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(self.status_error(status, &body))
    }

    pub fn status_error(&self, status: StatusCode, body: &str) -> Error {
        let detail = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body.trim())
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(detail),
            StatusCode::TOO_MANY_REQUESTS => Error::Transient(detail),
            s if s.is_server_error() => Error::Transient(detail),
            _ => self.custom_error(detail),
        }
    }
}
