use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound call, relative to the backend's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub json: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            json: None,
        }
    }

    pub fn post(path: impl Into<String>, json: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            json: Some(json),
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response body, either raw text or already parsed by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Body,
}

/// Lower boundary of the client: sends a request, hands back status + body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError>;
}

pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { base_url, client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = ?request.method, %url, "sweetistics request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(json) = &request.json {
            builder = builder.body(json.to_string());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = read_body(status, response.text().await)?;
        debug!(status, "sweetistics response");

        Ok(ApiResponse { status, body })
    }
}

/// A failed status is reported by its code alone, so a body that fails to
/// arrive only matters on success.
fn read_body<E: Into<ClientError>>(status: u16, text: Result<String, E>) -> Result<Body, ClientError> {
    match text {
        Ok(body) => Ok(Body::Text(body)),
        Err(_) if !(200..300).contains(&status) => Ok(Body::Text(String::new())),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweetistics::envelope::{unwrap_envelope, Procedure};

    fn reset() -> Result<String, ClientError> {
        Err(ClientError::Transport("connection reset".to_string()))
    }

    #[test]
    fn test_unreadable_error_body_keeps_status() {
        let body = read_body(503, reset()).unwrap();
        let response = ApiResponse { status: 503, body };
        assert_eq!(
            unwrap_envelope(response, Procedure::Search),
            Err(ClientError::Http(503))
        );
    }

    #[test]
    fn test_unreadable_success_body_is_transport_failure() {
        let err = read_body(200, reset()).unwrap_err();
        assert_eq!(err.to_string(), "Sweetistics request failed: connection reset");
    }
}
