//! Open redirect detection

use crate::http::Transport;
use crate::models::{Confidence, DetectorReport, Severity, VulnClass};
use crate::scanner::injection::{probe_payloads, report_for, Detector, InjectionTarget};
use crate::scanner::params::ParamMap;
use crate::scanner::payloads::REDIRECT_TARGET;
use async_trait::async_trait;

/// Parameter names that typically carry a redirect destination
const REDIRECT_PARAMS: &[&str] = &[
    "url",
    "next",
    "redirect",
    "return",
    "dest",
    "destination",
    "continue",
];

pub fn is_redirect_param(name: &str) -> bool {
    REDIRECT_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(name))
}

#[derive(Default)]
pub struct OpenRedirectDetector;

#[async_trait]
impl Detector for OpenRedirectDetector {
    fn name(&self) -> &str {
        "open-redirect"
    }

    fn class(&self) -> VulnClass {
        VulnClass::OpenRedirect
    }

    fn applies_to(&self, param: &str) -> bool {
        is_redirect_param(param)
    }

    async fn run(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
    ) -> DetectorReport {
        let mut report = report_for(self, target);
        let payloads = vec![REDIRECT_TARGET.to_string()];
        let recommendation =
            "Only redirect to relative paths or to destinations on an explicit allow-list.";

        probe_payloads(transport, target, params, &payloads, &mut report, |payload, attempt| {
            let location = attempt.response.header("location").unwrap_or_default();
            if location.starts_with(payload) {
                return Some(
                    target
                        .finding(
                            format!("Open Redirect in '{}'", target.param),
                            format!(
                                "Parameter '{}' controls the Location header of the response.",
                                target.param
                            ),
                            Severity::Medium,
                            VulnClass::OpenRedirect,
                            payload,
                            attempt,
                        )
                        .with_confidence(Confidence::Confirmed)
                        .with_evidence(format!(
                            "Status: {}\nLocation: {location}",
                            attempt.response.status
                        ))
                        .with_recommendation(recommendation),
                );
            }
            if attempt.response.body.contains(payload) {
                return Some(
                    target
                        .finding(
                            format!("Possible Open Redirect in '{}'", target.param),
                            format!(
                                "Parameter '{}' is reflected in the response body, which may drive a client-side redirect.",
                                target.param
                            ),
                            Severity::Low,
                            VulnClass::OpenRedirect,
                            payload,
                            attempt,
                        )
                        .with_evidence(format!("Payload '{payload}' reflected in body"))
                        .with_recommendation(recommendation),
                );
            }
            None
        })
        .await;

        report
    }
}
