//! Content-Security-Policy inspection

use crate::http::FetchResponse;
use tracing::info;

/// The target's CSP as seen on one response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CspPolicy {
    pub found: bool,
    /// Whether inline script injection is likely blocked
    pub restrictive: bool,
    pub policy: String,
}

/// A policy is restrictive when it constrains `script-src` and allows neither
/// `'unsafe-inline'` nor a wildcard
pub fn is_restrictive(policy: &str) -> bool {
    policy.contains("script-src") && !policy.contains("'unsafe-inline'") && !policy.contains('*')
}

/// Reads the last `Content-Security-Policy` header present on the response
pub fn parse_csp(response: &FetchResponse) -> CspPolicy {
    let mut result = CspPolicy::default();
    for value in response.header_values("content-security-policy") {
        info!("Content-Security-Policy header detected: {value}");
        result = CspPolicy {
            found: true,
            restrictive: is_restrictive(value),
            policy: value.to_string(),
        };
    }
    result
}
