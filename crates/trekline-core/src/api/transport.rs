//! HTTP boundary.
//!
//! `Transport` is the seam between the interceptor pipeline and the network.
//! `HttpTransport` is the production implementation on top of `reqwest`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// An outgoing call, relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    credential: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            credential: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        let mut request = Self::new(Method::Post, path);
        request.body = Some(body);
        request
    }

    /// Attach `Authorization: Bearer <token>` and remember which credential
    /// this call carries.
    pub fn attach_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::Transport("credential is not a valid header value".into()))?;
        self.headers.insert(header::AUTHORIZATION, value);
        self.credential = Some(token.to_string());
        Ok(())
    }

    /// The bearer credential attached to this call, if any
    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON: {}", e)))
    }
}

/// Failure to obtain any response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Connect(String),
    Timeout,
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// `reqwest`-backed transport with a fixed base URL and bounded timeout.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
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

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };

        let mut builder = builder
            .headers(request.headers.clone())
            .header(header::ACCEPT, "application/json");
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_bearer_sets_header_and_credential() {
        let mut request = ApiRequest::get("/treks");
        assert_eq!(request.credential(), None);

        request.attach_bearer("abc.def.ghi").unwrap();
        assert_eq!(request.credential(), Some("abc.def.ghi"));
        assert_eq!(
            request.headers.get(header::AUTHORIZATION).unwrap(),
            "Bearer abc.def.ghi"
        );
    }

    #[test]
    fn test_attach_bearer_rejects_control_chars() {
        let mut request = ApiRequest::get("/treks");
        assert!(request.attach_bearer("bad\ntoken").is_err());
        assert_eq!(request.credential(), None);
    }

    #[test]
    fn test_url_join() {
        let transport =
            HttpTransport::new("https://api.example.com/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.url_for("/treks"), "https://api.example.com/v1/treks");
        assert_eq!(transport.url_for("bookings"), "https://api.example.com/v1/bookings");
    }

    #[test]
    fn test_response_json() {
        let ok = ApiResponse::new(200, r#"{"a":1}"#);
        assert!(ok.is_success());
        let value: Value = ok.json().unwrap();
        assert_eq!(value["a"], 1);

        let bad = ApiResponse::new(200, "nope");
        assert!(matches!(bad.json::<Value>(), Err(ApiError::InvalidResponse(_))));
    }
}
