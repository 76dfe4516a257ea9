//! Reflected XSS detection
//!
//! Three fixed probes always run. With mutation mode enabled, a canary is
//! sent next to learn where input lands, then context-specific templates and
//! their mutations are tried.

use crate::http::Transport;
use crate::models::{DetectorReport, Severity, VulnClass};
use crate::scanner::injection::{
    pause, probe_payloads, report_for, send_attempt, Detector, InjectionTarget,
};
use crate::scanner::params::ParamMap;
use crate::scanner::payloads::PayloadCatalog;
use crate::scanner::xss::{
    find_reflections, generate_canary, is_payload_reflected, mutate_payload, parse_csp,
    url_encoded_forms, Reflection, XssContext,
};
use async_trait::async_trait;
use tracing::{debug, info};

/// Templates taken from each catalog list in mutation mode
const MAX_TEMPLATES_PER_SET: usize = 5;

const RECOMMENDATION: &str =
    "Encode output for its HTML context and validate input. Deploy a restrictive Content-Security-Policy.";

#[derive(Default)]
pub struct XssDetector;

fn distinct_contexts(contexts: Vec<XssContext>) -> Vec<XssContext> {
    let mut out = Vec::new();
    for ctx in contexts {
        if !out.contains(&ctx) {
            out.push(ctx);
        }
    }
    out
}

fn describe_contexts(contexts: &[XssContext]) -> String {
    contexts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl XssDetector {
    async fn run_mutations(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
        report: &mut DetectorReport,
    ) {
        let catalog = PayloadCatalog::global();
        let canary = generate_canary();
        let mut guard = params.scoped(target.param);

        guard.set(&format!("{}{canary}", target.base_value));
        report.attempts += 1;
        let probe = send_attempt(transport, target, guard.map()).await;
        guard.restore();
        pause(target).await;

        let probe = match probe {
            Ok(p) => p,
            Err(e) => {
                report.errors += 1;
                debug!("[xss] canary request failed on '{}': {e}", target.param);
                return;
            }
        };

        let reflection = is_payload_reflected(&probe.response.body, &canary);
        if reflection == Reflection::Absent {
            debug!("[xss] canary not reflected for '{}', skipping mutations", target.param);
            return;
        }
        if let Some(label) = reflection.filter_label() {
            info!("[xss] canary for '{}' came back {label}", target.param);
        }

        let csp = parse_csp(&probe.response);
        let contexts = distinct_contexts(find_reflections(&probe.response.body, &canary));

        let mut sets = vec![catalog.xss_generic];
        sets.extend(
            contexts
                .iter()
                .filter(|c| **c != XssContext::Unknown)
                .map(|c| catalog.xss_for_context(*c)),
        );
        if target.waf_detected {
            sets.push(catalog.xss_waf_bypass);
        }
        if csp.found && csp.restrictive {
            sets.push(catalog.xss_csp_bypass);
        }

        let mut templates: Vec<&str> = Vec::new();
        for set in sets {
            for template in set.iter().take(MAX_TEMPLATES_PER_SET) {
                if !templates.contains(template) {
                    templates.push(*template);
                }
            }
        }
        debug!(
            "[xss] {} template(s) for '{}' (contexts: {})",
            templates.len(),
            target.param,
            describe_contexts(&contexts)
        );

        for template in templates {
            let variants = mutate_payload(template, &canary);
            let Some(raw) = variants.first().cloned() else {
                continue;
            };
            let encoded = url_encoded_forms(&raw);
            for variant in variants {
                // An encoded variant only counts once the page decodes it back to markup
                let executable = if encoded.contains(&variant) {
                    raw.as_str()
                } else {
                    variant.as_str()
                };
                let value = format!("{}{variant}", target.base_value);
                guard.set(&value);
                report.attempts += 1;
                let result = send_attempt(transport, target, guard.map()).await;
                guard.restore();
                pause(target).await;

                let attempt = match result {
                    Ok(a) => a,
                    Err(e) => {
                        report.errors += 1;
                        debug!("[xss] request error on '{}': {e}", target.param);
                        continue;
                    }
                };

                let body = &attempt.response.body;
                if body.contains(executable) {
                    let reflected_in = distinct_contexts(find_reflections(body, executable));
                    report.findings.push(
                        target
                            .finding(
                                format!("Reflected XSS (mutation) in '{}'", target.param),
                                format!(
                                    "Parameter '{}' reflects a mutated script payload without encoding.",
                                    target.param
                                ),
                                Severity::High,
                                VulnClass::Xss,
                                &value,
                                &attempt,
                            )
                            .with_evidence(format!(
                                "Param: {}\nTemplate: {template}\nVariant: {variant}\nContexts: {}",
                                target.param,
                                describe_contexts(&reflected_in)
                            ))
                            .with_recommendation(RECOMMENDATION),
                    );
                    break;
                }
                if let Some(label) = is_payload_reflected(body, executable).filter_label() {
                    debug!("[xss] variant filtered ({label}): {variant}");
                }
            }
        }
    }
}

#[async_trait]
impl Detector for XssDetector {
    fn name(&self) -> &str {
        "xss"
    }

    fn class(&self) -> VulnClass {
        VulnClass::Xss
    }

    async fn run(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
    ) -> DetectorReport {
        let mut report = report_for(self, target);
        let payloads: Vec<String> = PayloadCatalog::global()
            .xss_probes
            .iter()
            .map(|probe| format!("{}{probe}", target.base_value))
            .collect();

        probe_payloads(transport, target, params, &payloads, &mut report, |payload, attempt| {
            let probe = payload
                .strip_prefix(target.base_value.as_str())
                .unwrap_or(payload);
            if !attempt.response.body.contains(probe) {
                return None;
            }
            Some(
                target
                    .finding(
                        format!("Reflected XSS in '{}'", target.param),
                        format!(
                            "Parameter '{}' reflects input without sanitization.",
                            target.param
                        ),
                        Severity::High,
                        VulnClass::Xss,
                        payload,
                        attempt,
                    )
                    .with_evidence(format!("Param: {}\nReflected: {probe}", target.param))
                    .with_recommendation(RECOMMENDATION),
            )
        })
        .await;

        if target.config.xss_mutations {
            self.run_mutations(transport, target, params, &mut report).await;
        }

        report
    }
}
