//! Request modeling on top of the `crux_http` transport.
//!
//! The capability that actually talks to the shell is `crux_http::Http`
//! (declared in [`super::Capabilities`]). This module owns what goes into
//! it: URLs are validated before a request exists and headers are bounded.
//! The transport's outcome is folded into [`HttpResult`] so the event enum
//! carries one stable result shape.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_HEADER_VALUE_LENGTH: usize = 8192;
pub const MAX_HEADERS_COUNT: usize = 32;

/// A URL that has passed scheme/host validation. Requests are only ever
/// built from these, so malformed endpoint configuration fails at the
/// call site instead of inside the shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, HttpError> {
        let url = url.into();
        if url.is_empty() || url.len() > MAX_URL_LENGTH {
            return Err(HttpError::InvalidUrl {
                reason: format!("URL length {} outside 1..={MAX_URL_LENGTH}", url.len()),
            });
        }

        let parsed = Url::parse(&url).map_err(|e| HttpError::InvalidUrl {
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(HttpError::InvalidUrl {
                reason: format!("scheme '{scheme}' not allowed"),
            });
        }
        if parsed.host_str().is_none() {
            return Err(HttpError::InvalidUrl {
                reason: "URL must have a host".into(),
            });
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(HttpError::InvalidUrl {
                reason: "credentials in URL are not allowed".into(),
            });
        }

        Ok(Self {
            url: parsed.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// A validated read request. Every backend and geocoder call is a GET; the
/// app hands these to the transport unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: &ValidatedUrl) -> Self {
        Self {
            url: url.as_str().to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        if self.headers.len() < MAX_HEADERS_COUNT && value.len() <= MAX_HEADER_VALUE_LENGTH {
            let lower = name.to_lowercase();
            self.headers.retain(|(n, _)| n.to_lowercase() != lower);
            self.headers.push((name, value));
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpOutput {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpOutput {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum HttpError {
    #[error("invalid URL: {reason}")]
    InvalidUrl { reason: String },
    #[error("network error: {0}")]
    Network(String),
}

pub type HttpResult = Result<HttpOutput, HttpError>;

/// Folds the transport's outcome into the result shape the events carry.
/// Non-2xx statuses stay on the Ok path; callers branch on
/// [`HttpOutput::is_success`].
pub fn fold_response(result: crux_http::Result<crux_http::Response<Vec<u8>>>) -> HttpResult {
    match result {
        Ok(mut response) => Ok(HttpOutput {
            status: response.status().into(),
            body: response.take_body().unwrap_or_default(),
        }),
        Err(err) => Err(HttpError::Network(err.to_string())),
    }
}
