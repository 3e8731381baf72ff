use std::fmt;

use async_trait::async_trait;
use tracing::instrument;

use crate::value::Value;
use crate::xml::{decode_response, encode_call, Fault, Response};

/// Errors at the raw call boundary
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The server answered with a fault
    Fault(Fault),
    /// The request never completed (connection refused, timeout, bad
    /// status)
    Http(String),
    /// The response envelope could not be parsed
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Fault(fault) => write!(f, "{}", fault),
            TransportError::Http(msg) => write!(f, "{}", msg),
            TransportError::Decode(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// The abstract `invoke(name, args) -> value | fault` primitive the
/// session client is written against. Tests script this; production
/// uses [`HttpTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &str, args: &[Value]) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn call(&self, method: &str, args: &[Value]) -> Result<Value, TransportError> {
        (**self).call(method, args).await
    }
}

/// XML-RPC over HTTP(S) with a pooled reqwest client
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self, args))]
    async fn call(&self, method: &str, args: &[Value]) -> Result<Value, TransportError> {
        let body = encode_call(method, args);
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TransportError::Http(format!(
                "request failed with status: {}",
                response.status()
            )));
        }
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        match decode_response(&text).map_err(|e| TransportError::Decode(e.to_string()))? {
            Response::Success(value) => Ok(value),
            Response::Fault(fault) => Err(TransportError::Fault(fault)),
        }
    }
}
