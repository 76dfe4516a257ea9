//! reqwest-backed transport with cookie injection and request tracking

use crate::error::{Result, VigilError};
use crate::http::{FetchResponse, Transport};
use crate::models::{HttpMethod, ScanConfig};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// HTTP client wrapper that attaches the scan cookie and counts requests
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_count: Arc<AtomicU64>,
    cookie: Option<String>,
    default_headers: HashMap<String, String>,
}

impl HttpClient {
    /// Creates a new HttpClient from scan configuration
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .danger_accept_invalid_certs(true);

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| VigilError::ConfigError(format!("Invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            request_count: Arc::new(AtomicU64::new(0)),
            cookie: config.cookie.clone().filter(|c| !c.is_empty()),
            default_headers: config.headers.clone(),
        })
    }

    /// Returns the total number of requests made
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Applies configured headers, the cookie, and per-call headers, in that order
    fn decorate(&self, mut req: RequestBuilder, extra_headers: &[(String, String)]) -> RequestBuilder {
        for (key, value) in &self.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if let Some(ref cookie) = self.cookie {
            debug!("Using Cookie: {cookie}");
            req = req.header("Cookie", cookie.as_str());
        }
        for (key, value) in extra_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<FetchResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let response = req.send().await?;
        let status = response.status().as_u16();
        debug!("Response: {status} for {}", response.url());

        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn fetch(
        &self,
        url: &str,
        method: HttpMethod,
        form: &[(String, String)],
        extra_headers: &[(String, String)],
    ) -> Result<FetchResponse> {
        debug!("{method} {url}");

        let req = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => {
                let body: String = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(form.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .finish();
                if !body.is_empty() {
                    debug!("POST data: {body}");
                }
                self.client
                    .post(url)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(body)
            }
        };

        self.send(self.decorate(req, extra_headers)).await
    }

    async fn fetch_multipart(
        &self,
        url: &str,
        fields: &[(String, String)],
        file_field: &str,
        file_name: &str,
        file_bytes: &[u8],
        extra_headers: &[(String, String)],
    ) -> Result<FetchResponse> {
        debug!("POST (multipart) {url} file field '{file_field}' -> {file_name}");

        let mut form = Form::new();
        for (key, value) in fields {
            form = form.text(key.clone(), value.clone());
        }
        if !file_field.is_empty() && !file_name.is_empty() {
            let part = Part::bytes(file_bytes.to_vec()).file_name(file_name.to_string());
            form = form.part(file_field.to_string(), part);
        }

        let req = self.client.post(url).multipart(form);
        self.send(self.decorate(req, extra_headers)).await
    }

    fn request_count(&self) -> u64 {
        HttpClient::request_count(self)
    }
}
