//! WAF fingerprinting and evasion helpers

use crate::http::{FetchResponse, Transport};
use crate::models::{Finding, HttpMethod, Severity, VulnClass, WafVerdict};
use crate::scanner::params::ParamMap;
use crate::scanner::payloads::WAF_PROBE;
use tracing::{debug, info, warn};
use url::Url;

/// Body phrases typical of block pages
const BLOCK_PHRASES: &[&str] = &[
    "access denied",
    "request rejected",
    "waf",
    "firewall",
    "blocked",
    "forbidden",
    "406 not acceptable",
    "mod_security",
    "cloudflare",
    "incapsula",
];

/// `Server` header values of WAF/CDN vendors
const SERVER_VENDORS: &[&str] = &["cloudflare", "akamai", "f5", "barracuda", "sucuri"];

/// Names for the variants produced by [`evasion_encodings`], in order
pub const EVASION_LABELS: &[&str] = &["raw", "url-encoded", "double-url-encoded", "hex"];

/// Why a response looks like it came from a WAF, if it does
pub fn inspect_response(response: &FetchResponse) -> Option<String> {
    let body = response.body.to_lowercase();
    if BLOCK_PHRASES.iter().any(|p| body.contains(p)) {
        return Some("WAF detected (body message)".to_string());
    }

    if let Some(server) = response.header("server") {
        let lower = server.to_lowercase();
        if SERVER_VENDORS.iter().any(|v| lower.contains(v)) {
            return Some(format!("WAF detected (Server header: {server})"));
        }
    }

    if response.header("x-sucuri-id").is_some()
        || response.header("x-waf-blocked").is_some()
        || response.header("x-cdn") == Some("Incapsula")
    {
        return Some("WAF detected (special header)".to_string());
    }

    None
}

/// Probes each query parameter of `target_url` with a script payload.
/// The first blocked parameter decides; a URL without parameters is never flagged.
pub async fn detect_waf(transport: &dyn Transport, target_url: &str) -> WafVerdict {
    let (base, mut params) = match ParamMap::from_url(target_url) {
        Ok(split) => split,
        Err(e) => {
            warn!("WAF probe skipped, cannot parse {target_url}: {e}");
            return WafVerdict::not_detected();
        }
    };
    let names: Vec<String> = params.keys().map(String::from).collect();

    for name in names {
        let url = {
            let mut guard = params.scoped(&name);
            guard.set(WAF_PROBE);
            guard.map().url_with_query(&base)
        };
        let response = match transport.fetch(&url, HttpMethod::Get, &[], &[]).await {
            Ok(r) => r,
            Err(e) => {
                debug!("[WAF] probe on '{name}' failed: {e}");
                continue;
            }
        };
        if let Some(reason) = inspect_response(&response) {
            info!("{reason} on parameter '{name}'");
            return WafVerdict {
                detected: true,
                reason,
                parameter: Some(name),
                bypasses: Vec::new(),
            };
        }
    }

    WafVerdict::not_detected()
}

fn query_escape(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Raw, URL-encoded, double-URL-encoded and `%xx` hex forms of `payload`
pub fn evasion_encodings(payload: &str) -> Vec<String> {
    let single = query_escape(payload);
    let double = query_escape(&single);
    let hex: String = payload.bytes().map(|b| format!("%{b:02x}")).collect();
    vec![payload.to_string(), single, double, hex]
}

/// Re-sends the blocked probe under each evasion encoding and returns the
/// labels of those the WAF let through. Encoded values go on the wire as-is.
pub async fn find_bypasses(transport: &dyn Transport, target_url: &str, param: &str) -> Vec<String> {
    let Ok((base, mut params)) = ParamMap::from_url(target_url) else {
        return Vec::new();
    };
    params.remove(param);
    let prefix = if params.is_empty() {
        format!("{base}?")
    } else {
        format!("{}&", params.url_with_query(&base))
    };

    let mut passed = Vec::new();
    for (label, encoded) in EVASION_LABELS.iter().zip(evasion_encodings(WAF_PROBE)) {
        let url = format!("{prefix}{param}={encoded}");
        match transport.fetch(&url, HttpMethod::Get, &[], &[]).await {
            Ok(response) if inspect_response(&response).is_none() => {
                debug!("[WAF] {label} encoding passed");
                passed.push(label.to_string());
            }
            Ok(_) => debug!("[WAF] {label} encoding blocked"),
            Err(e) => debug!("[WAF] {label} encoding probe failed: {e}"),
        }
    }
    passed
}

/// Rewrites the host of `target_url` to its first resolved address.
/// Any parse or lookup failure returns the URL unchanged.
pub async fn domain_to_ip(target_url: &str) -> String {
    let Ok(mut parsed) = Url::parse(target_url) else {
        return target_url.to_string();
    };
    let Some(host) = parsed.host_str().map(String::from) else {
        return target_url.to_string();
    };
    let port = parsed.port_or_known_default().unwrap_or(80);

    let ip = match tokio::net::lookup_host((host.as_str(), port)).await {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr.ip(),
            None => return target_url.to_string(),
        },
        Err(e) => {
            debug!("DNS resolution failed for {host}: {e}");
            return target_url.to_string();
        }
    };

    if parsed.set_ip_host(ip).is_err() {
        return target_url.to_string();
    }
    debug!("Resolved {host} -> {ip}");
    parsed.to_string()
}

/// Informational finding describing a detected WAF
pub fn waf_finding(target_url: &str, verdict: &WafVerdict) -> Finding {
    let bypasses = if verdict.bypasses.is_empty() {
        "none".to_string()
    } else {
        verdict.bypasses.join(", ")
    };
    let mut finding = Finding::new(
        "Web Application Firewall Detected",
        format!(
            "{}. Results for blocked payloads may be incomplete.",
            verdict.reason
        ),
        Severity::Info,
        VulnClass::Waf,
        target_url,
    )
    .with_payload(WAF_PROBE)
    .with_evidence(format!(
        "{}\nEncodings not blocked: {bypasses}",
        verdict.reason
    ));
    if let Some(ref param) = verdict.parameter {
        finding = finding.with_parameter(param);
    }
    finding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_body_phrase() {
        let resp = FetchResponse::new(403, "<h1>Access Denied</h1>");
        assert_eq!(
            inspect_response(&resp),
            Some("WAF detected (body message)".to_string())
        );
    }

    #[test]
    fn test_inspect_server_header() {
        let resp = FetchResponse::new(200, "ok").with_header("Server", "cloudflare");
        assert_eq!(
            inspect_response(&resp),
            Some("WAF detected (Server header: cloudflare)".to_string())
        );
    }

    #[test]
    fn test_inspect_vendor_headers() {
        let sucuri = FetchResponse::new(200, "ok").with_header("X-Sucuri-ID", "1234");
        assert!(inspect_response(&sucuri).is_some());
        let incapsula = FetchResponse::new(200, "ok").with_header("X-CDN", "Incapsula");
        assert!(inspect_response(&incapsula).is_some());
        let other_cdn = FetchResponse::new(200, "ok").with_header("X-CDN", "Fastly");
        assert!(inspect_response(&other_cdn).is_none());
    }

    #[test]
    fn test_clean_response() {
        let resp = FetchResponse::new(200, "<p>hello</p>").with_header("Server", "nginx");
        assert!(inspect_response(&resp).is_none());
    }

    #[test]
    fn test_evasion_encodings() {
        let variants = evasion_encodings("<a b>");
        assert_eq!(variants.len(), EVASION_LABELS.len());
        assert_eq!(variants[0], "<a b>");
        assert_eq!(variants[1], "%3Ca+b%3E");
        assert_eq!(variants[2], "%253Ca%2Bb%253E");
        assert_eq!(variants[3], "%3c%61%20%62%3e");
    }

    #[tokio::test]
    async fn test_domain_to_ip_passthrough() {
        assert_eq!(domain_to_ip("not a url").await, "not a url");
        assert_eq!(
            domain_to_ip("http://127.0.0.1:8080/x?a=1").await,
            "http://127.0.0.1:8080/x?a=1"
        );
    }

    #[test]
    fn test_waf_finding() {
        let verdict = WafVerdict {
            detected: true,
            reason: "WAF detected (special header)".to_string(),
            parameter: Some("q".to_string()),
            bypasses: vec!["hex".to_string()],
        };
        let finding = waf_finding("http://example.com/?q=1", &verdict);
        assert_eq!(finding.severity, Severity::Info);
        assert_eq!(finding.class, VulnClass::Waf);
        assert_eq!(finding.parameter.as_deref(), Some("q"));
        assert!(finding.evidence.contains("hex"));
    }
}
