//! Transport layer: the trait the detection engine talks to and its reqwest implementation

pub mod client;

pub use client::HttpClient;

use crate::error::Result;
use crate::models::HttpMethod;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// A fully read HTTP response
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Appends a header; invalid names or values are ignored
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// First value of a header, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a repeated header such as Set-Cookie
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Capabilities the scanner needs from an HTTP stack.
///
/// GET ignores `form`; POST sends it as `application/x-www-form-urlencoded`.
/// Any network or TLS failure is returned as an error and is never fatal to a scan.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        method: HttpMethod,
        form: &[(String, String)],
        extra_headers: &[(String, String)],
    ) -> Result<FetchResponse>;

    /// Sends a multipart POST with `fields` plus one file part
    async fn fetch_multipart(
        &self,
        url: &str,
        fields: &[(String, String)],
        file_field: &str,
        file_name: &str,
        file_bytes: &[u8],
        extra_headers: &[(String, String)],
    ) -> Result<FetchResponse>;

    /// Plain GET with no body or extra headers
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        self.fetch(url, HttpMethod::Get, &[], &[]).await
    }

    /// Total requests issued so far
    fn request_count(&self) -> u64 {
        0
    }
}
