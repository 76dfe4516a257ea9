//! Per-parameter injection detectors
//!
//! Every detector follows the same loop: set the parameter, send the request
//! with the effective method, inspect the response, restore the parameter and
//! wait for the throttle delay. A transport error only costs that attempt.

pub mod command;
pub mod lfi;
pub mod open_redirect;
pub mod path_traversal;
pub mod sqli;
pub mod xss;

use crate::error::Result;
use crate::http::{FetchResponse, Transport};
use crate::models::{DetectorReport, Finding, HttpMethod, ScanConfig, Severity, VulnClass};
use crate::scanner::params::ParamMap;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Everything a detector needs to know about the parameter under test
#[derive(Debug, Clone)]
pub struct InjectionTarget<'a> {
    pub config: &'a ScanConfig,
    /// Page the parameter was discovered on
    pub page_url: &'a str,
    /// Page URL without its query string
    pub base_url: &'a str,
    pub param: &'a str,
    /// Benign value payloads are appended to
    pub base_value: String,
    /// Value the page URL carried, if any
    pub original_value: Option<String>,
    /// Effective method after override heuristics
    pub method: HttpMethod,
    pub waf_detected: bool,
}

impl InjectionTarget<'_> {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.config.throttle_ms)
    }

    /// Reproduction URL for the current state of `params`
    pub fn poc_url(&self, method: HttpMethod, params: &ParamMap) -> String {
        match method {
            HttpMethod::Get => params.url_with_query(self.base_url),
            HttpMethod::Post => self.base_url.to_string(),
        }
    }

    /// Raw request summary stored on findings
    pub fn request_line(&self, method: HttpMethod, params: &ParamMap) -> String {
        match method {
            HttpMethod::Get => format!("GET {}", params.url_with_query(self.base_url)),
            HttpMethod::Post => format!("POST {}\n\n{}", self.base_url, params.encode()),
        }
    }

    /// Finding pre-filled with the parameter, payload and request of `attempt`
    pub fn finding(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        class: VulnClass,
        payload: &str,
        attempt: &Attempt,
    ) -> Finding {
        Finding::new(title, description, severity, class, self.page_url)
            .with_parameter(self.param)
            .with_payload(payload)
            .with_poc(attempt.poc_url.clone())
            .with_request(attempt.request.clone())
    }
}

/// One sent payload and what came back
#[derive(Debug, Clone)]
pub struct Attempt {
    pub response: FetchResponse,
    pub poc_url: String,
    pub request: String,
}

/// Sends `params` to the target with an explicit method
pub async fn send_with(
    transport: &dyn Transport,
    target: &InjectionTarget<'_>,
    method: HttpMethod,
    params: &ParamMap,
) -> Result<Attempt> {
    let response = match method {
        HttpMethod::Get => {
            transport
                .fetch(&params.url_with_query(target.base_url), method, &[], &[])
                .await?
        }
        HttpMethod::Post => {
            transport
                .fetch(target.base_url, method, &params.pairs(), &[])
                .await?
        }
    };
    Ok(Attempt {
        response,
        poc_url: target.poc_url(method, params),
        request: target.request_line(method, params),
    })
}

/// Sends `params` with the target's effective method
pub async fn send_attempt(
    transport: &dyn Transport,
    target: &InjectionTarget<'_>,
    params: &ParamMap,
) -> Result<Attempt> {
    send_with(transport, target, target.method, params).await
}

/// Waits the configured delay between attempts
pub async fn pause(target: &InjectionTarget<'_>) {
    let delay = target.throttle();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Runs the shared payload loop. `inspect` turns a response into a finding.
pub async fn probe_payloads<F>(
    transport: &dyn Transport,
    target: &InjectionTarget<'_>,
    params: &mut ParamMap,
    payloads: &[String],
    report: &mut DetectorReport,
    mut inspect: F,
) where
    F: FnMut(&str, &Attempt) -> Option<Finding> + Send,
{
    let mut guard = params.scoped(target.param);
    for payload in payloads {
        guard.set(payload);
        report.attempts += 1;
        match send_attempt(transport, target, guard.map()).await {
            Ok(attempt) => {
                if let Some(finding) = inspect(payload, &attempt) {
                    report.findings.push(finding);
                }
            }
            Err(e) => {
                report.errors += 1;
                debug!("[{}] request error on '{}': {e}", report.detector, target.param);
            }
        }
        guard.restore();
        pause(target).await;
    }
}

/// A per-parameter vulnerability check
#[async_trait]
pub trait Detector: Send + Sync {
    /// Short identifier used in reports and logs
    fn name(&self) -> &str;

    fn class(&self) -> VulnClass;

    /// Whether this detector is worth running for a parameter name
    fn applies_to(&self, _param: &str) -> bool {
        true
    }

    /// Tests one parameter. `params` is left exactly as it was received.
    async fn run(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
    ) -> DetectorReport;
}

/// Fresh report for `detector` against `target`
pub fn report_for(detector: &dyn Detector, target: &InjectionTarget<'_>) -> DetectorReport {
    DetectorReport::new(
        detector.name(),
        detector.class(),
        target.page_url,
        Some(target.param),
    )
}
