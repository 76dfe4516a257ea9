//! CSRF (Cross-Site Request Forgery) heuristics

use crate::http::{FetchResponse, Transport};
use crate::models::{DetectorReport, Finding, Severity, VulnClass};
use tracing::debug;

/// Substrings whose presence suggests an anti-CSRF token
const TOKEN_INDICATORS: &[&str] = &["csrf", "token", "authenticity_token", "nonce"];

/// What the page reveals about its CSRF defences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrfAssessment {
    pub has_token: bool,
    /// A `Set-Cookie` header carries `SameSite` or `Secure`
    pub cookie_protected: bool,
}

impl CsrfAssessment {
    pub fn is_at_risk(&self) -> bool {
        !self.has_token || !self.cookie_protected
    }
}

pub fn assess(response: &FetchResponse) -> CsrfAssessment {
    let body = response.body.to_lowercase();
    let has_token = TOKEN_INDICATORS.iter().any(|i| body.contains(i));
    let cookie_protected = response.header_values("set-cookie").iter().any(|c| {
        let lower = c.to_lowercase();
        lower.contains("samesite") || lower.contains("secure")
    });
    CsrfAssessment {
        has_token,
        cookie_protected,
    }
}

/// Fetches `page_url` once and flags it when tokens or cookie flags are missing
pub async fn check_csrf(transport: &dyn Transport, page_url: &str) -> DetectorReport {
    let mut report = DetectorReport::new("csrf", VulnClass::Csrf, page_url, None);
    report.attempts = 1;

    let response = match transport.get(page_url).await {
        Ok(r) => r,
        Err(e) => {
            report.errors = 1;
            debug!("[csrf] request error for {page_url}: {e}");
            return report;
        }
    };

    let assessment = assess(&response);
    if assessment.is_at_risk() {
        let mut missing = Vec::new();
        if !assessment.has_token {
            missing.push("no anti-CSRF token indicator in the page");
        }
        if !assessment.cookie_protected {
            missing.push("no SameSite/Secure flag on Set-Cookie");
        }
        report.findings.push(
            Finding::new(
                "Possible CSRF Risk",
                "The page shows no anti-CSRF token or sets cookies without SameSite/Secure flags. \
                 State-changing requests may be forgeable from other sites.",
                Severity::Medium,
                VulnClass::Csrf,
                page_url,
            )
            .with_poc(page_url)
            .with_request(format!("GET {page_url}"))
            .with_evidence(missing.join("\n"))
            .with_recommendation(
                "Add a CSRF token to all state-changing forms and set SameSite on session cookies.",
            ),
        );
    }

    report
}
