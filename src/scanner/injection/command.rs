//! OS command injection detection

use crate::http::Transport;
use crate::models::{DetectorReport, Severity, VulnClass};
use crate::scanner::injection::{probe_payloads, report_for, Detector, InjectionTarget};
use crate::scanner::params::ParamMap;
use crate::scanner::payloads::{PayloadCatalog, COMMAND_MARKER};
use crate::scanner::signatures::{SignatureRegistry, SignatureSet, COMMAND_OUTPUT};
use async_trait::async_trait;

/// Fallback host for command chaining when the baseline is not an address
const DEFAULT_HOST: &str = "127.0.0.1";

/// Chains shell commands onto a host-like value and looks for their output
pub struct CommandInjectionDetector {
    signatures: SignatureSet,
}

impl Default for CommandInjectionDetector {
    fn default() -> Self {
        Self::with_signatures(SignatureRegistry::builtin().get_or_empty(COMMAND_OUTPUT))
    }
}

impl CommandInjectionDetector {
    pub fn with_signatures(signatures: SignatureSet) -> Self {
        Self { signatures }
    }
}

/// Dotted quad of one to three digit groups, without range checks
pub fn is_likely_ip(value: &str) -> bool {
    let groups: Vec<&str> = value.split('.').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()))
}

#[async_trait]
impl Detector for CommandInjectionDetector {
    fn name(&self) -> &str {
        "rce"
    }

    fn class(&self) -> VulnClass {
        VulnClass::CommandInjection
    }

    async fn run(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
    ) -> DetectorReport {
        let mut report = report_for(self, target);
        let ip_base = if is_likely_ip(&target.base_value) {
            target.base_value.as_str()
        } else {
            DEFAULT_HOST
        };
        let payloads = PayloadCatalog::global().command_payloads(ip_base);

        probe_payloads(transport, target, params, &payloads, &mut report, |payload, attempt| {
            let body = &attempt.response.body;
            let evidence = if body.contains(COMMAND_MARKER) {
                format!("Echo marker '{COMMAND_MARKER}' found in response")
            } else {
                let label = self.signatures.first_match(body)?;
                format!("Command output detected ({label})")
            };
            Some(
                target
                    .finding(
                        format!("OS Command Injection in '{}'", target.param),
                        format!(
                            "Parameter '{}' is passed to a system shell: chained commands were executed.",
                            target.param
                        ),
                        Severity::Critical,
                        VulnClass::CommandInjection,
                        payload,
                        attempt,
                    )
                    .with_evidence(format!("Param: {}\nPayload: {payload}\n{evidence}", target.param))
                    .with_recommendation(
                        "Never pass user input to OS commands. Use safe APIs or strict allow-lists.",
                    ),
            )
        })
        .await;

        report
    }
}
