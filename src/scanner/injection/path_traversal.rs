//! Path traversal detection

use crate::http::Transport;
use crate::models::{DetectorReport, Severity, VulnClass};
use crate::scanner::injection::{probe_payloads, report_for, Detector, InjectionTarget};
use crate::scanner::params::ParamMap;
use crate::scanner::payloads::PayloadCatalog;
use crate::scanner::signatures::{SignatureRegistry, SignatureSet, TRAVERSAL_FILES};
use async_trait::async_trait;

pub struct PathTraversalDetector {
    signatures: SignatureSet,
}

impl Default for PathTraversalDetector {
    fn default() -> Self {
        Self::with_signatures(SignatureRegistry::builtin().get_or_empty(TRAVERSAL_FILES))
    }
}

impl PathTraversalDetector {
    pub fn with_signatures(signatures: SignatureSet) -> Self {
        Self { signatures }
    }
}

#[async_trait]
impl Detector for PathTraversalDetector {
    fn name(&self) -> &str {
        "path-traversal"
    }

    fn class(&self) -> VulnClass {
        VulnClass::PathTraversal
    }

    async fn run(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
    ) -> DetectorReport {
        let mut report = report_for(self, target);
        let payloads: Vec<String> = PayloadCatalog::global()
            .path_traversal
            .iter()
            .map(|p| p.to_string())
            .collect();

        probe_payloads(transport, target, params, &payloads, &mut report, |payload, attempt| {
            let label = self.signatures.first_match(&attempt.response.body)?;
            Some(
                target
                    .finding(
                        format!("Path Traversal in '{}'", target.param),
                        format!(
                            "Parameter '{}' allows reading files outside the web root.",
                            target.param
                        ),
                        Severity::High,
                        VulnClass::PathTraversal,
                        payload,
                        attempt,
                    )
                    .with_evidence(format!("Param: {}\nPayload: {payload}\nSignature: {label}", target.param))
                    .with_recommendation(
                        "Canonicalize paths and reject anything that resolves outside the allowed directory.",
                    ),
            )
        })
        .await;

        report
    }
}
