//! Local/remote file inclusion detection with baseline comparison

use crate::http::Transport;
use crate::models::{DetectorReport, Severity, VulnClass};
use crate::scanner::injection::{
    probe_payloads, report_for, send_attempt, Detector, InjectionTarget,
};
use crate::scanner::params::ParamMap;
use crate::scanner::payloads::PayloadCatalog;
use crate::scanner::signatures::{SignatureRegistry, SignatureSet, LFI_FILE_CONTENT};
use async_trait::async_trait;
use tracing::debug;

/// Requests system files and reports signatures that the unmodified page lacks
pub struct LfiDetector {
    signatures: SignatureSet,
}

impl Default for LfiDetector {
    fn default() -> Self {
        Self::with_signatures(SignatureRegistry::builtin().get_or_empty(LFI_FILE_CONTENT))
    }
}

impl LfiDetector {
    pub fn with_signatures(signatures: SignatureSet) -> Self {
        Self { signatures }
    }
}

#[async_trait]
impl Detector for LfiDetector {
    fn name(&self) -> &str {
        "lfi"
    }

    fn class(&self) -> VulnClass {
        VulnClass::Lfi
    }

    async fn run(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
    ) -> DetectorReport {
        let mut report = report_for(self, target);

        // A failed baseline counts as an empty page
        let baseline_hit = match send_attempt(transport, target, params).await {
            Ok(attempt) => self.signatures.is_match(&attempt.response.body),
            Err(e) => {
                debug!("[lfi] baseline request failed for '{}': {e}", target.param);
                false
            }
        };
        if baseline_hit {
            debug!("[lfi] baseline for '{}' already matches file signatures", target.param);
        }

        let payloads: Vec<String> = PayloadCatalog::global()
            .lfi
            .iter()
            .map(|p| p.to_string())
            .collect();

        probe_payloads(transport, target, params, &payloads, &mut report, |payload, attempt| {
            if baseline_hit {
                return None;
            }
            let label = self.signatures.first_match(&attempt.response.body)?;
            Some(
                target
                    .finding(
                        format!("Local File Inclusion in '{}'", target.param),
                        format!(
                            "Parameter '{}' includes arbitrary files: {label} content appeared in the response.",
                            target.param
                        ),
                        Severity::High,
                        VulnClass::Lfi,
                        payload,
                        attempt,
                    )
                    .with_evidence(format!("Param: {}\nPayload: {payload}\nSignature: {label}", target.param))
                    .with_recommendation(
                        "Never build include paths from user input. Map identifiers to a fixed set of files.",
                    ),
            )
        })
        .await;

        report
    }
}
