//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use vigil::error::{Result, VigilError};
use vigil::http::{FetchResponse, Transport};
use vigil::models::{HttpMethod, ScanConfig};

/// A request as seen by [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Decoded query pairs for GET, form pairs for POST
    pub params: HashMap<String, String>,
    /// `(field, file name)` of a multipart upload
    pub file: Option<(String, String)>,
}

impl SeenRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn path(&self) -> String {
        url::Url::parse(&self.url)
            .map(|u| u.path().to_string())
            .unwrap_or_default()
    }
}

type Responder = Box<dyn Fn(&SeenRequest) -> Result<FetchResponse> + Send + Sync>;

/// In-memory transport answering every request from a closure
pub struct ScriptedTransport {
    responder: Responder,
    log: Mutex<Vec<SeenRequest>>,
    count: AtomicU64,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&SeenRequest) -> Result<FetchResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            log: Mutex::new(Vec::new()),
            count: AtomicU64::new(0),
        }
    }

    /// Transport whose every request fails at the network layer
    pub fn failing() -> Self {
        Self::new(|_| Err(VigilError::TransportError("connection refused".to_string())))
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.log.lock().unwrap().clone()
    }

    fn answer(&self, request: SeenRequest) -> Result<FetchResponse> {
        self.count.fetch_add(1, Ordering::Relaxed);
        let response = (self.responder)(&request);
        self.log.lock().unwrap().push(request);
        response
    }
}

fn query_params(url: &str) -> HashMap<String, String> {
    url::Url::parse(url)
        .map(|u| u.query_pairs().into_owned().collect())
        .unwrap_or_default()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(
        &self,
        url: &str,
        method: HttpMethod,
        form: &[(String, String)],
        _extra_headers: &[(String, String)],
    ) -> Result<FetchResponse> {
        let params = match method {
            HttpMethod::Get => query_params(url),
            HttpMethod::Post => form.iter().cloned().collect(),
        };
        self.answer(SeenRequest {
            method,
            url: url.to_string(),
            params,
            file: None,
        })
    }

    async fn fetch_multipart(
        &self,
        url: &str,
        fields: &[(String, String)],
        file_field: &str,
        file_name: &str,
        _file_bytes: &[u8],
        _extra_headers: &[(String, String)],
    ) -> Result<FetchResponse> {
        self.answer(SeenRequest {
            method: HttpMethod::Post,
            url: url.to_string(),
            params: fields.iter().cloned().collect(),
            file: Some((file_field.to_string(), file_name.to_string())),
        })
    }

    fn request_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Config for `target` with no throttle and no WAF probe
pub fn test_config(target: &str) -> ScanConfig {
    ScanConfig {
        target: target.to_string(),
        throttle_ms: 0,
        timeout_secs: 5,
        crawl_depth: 0,
        waf_probe: false,
        user_agent: "vigil-test/0.1".to_string(),
        ..ScanConfig::default()
    }
}
