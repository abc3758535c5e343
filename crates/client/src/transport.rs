//! Transport seam between the client and the wire.
//!
//! [`HttpTransport`] talks to the real server through `reqwest`; tests and
//! offline runs plug in [`crate::scripted::ScriptedTransport`] instead.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// Raw reply: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> Result<HttpReply, TransportError>;

    async fn post(&self, path: &str, body: Value) -> Result<HttpReply, TransportError>;
}

/// `reqwest`-backed transport.
///
/// No request timeout is configured here; the client bounds every call itself.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(resp: reqwest::Response) -> Result<HttpReply, TransportError> {
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<HttpReply, TransportError> {
        let resp = self.http.get(self.url(path)).send().await?;
        Self::read(resp).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<HttpReply, TransportError> {
        let resp = self.http.post(self.url(path)).json(&body).send().await?;
        Self::read(resp).await
    }
}
