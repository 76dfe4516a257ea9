//! SQL injection detection (error-based and boolean-based)

use crate::http::Transport;
use crate::models::{Confidence, DetectorReport, Severity, VulnClass};
use crate::scanner::injection::{
    pause, probe_payloads, report_for, send_attempt, Detector, InjectionTarget,
};
use crate::scanner::params::ParamMap;
use crate::scanner::payloads::PayloadCatalog;
use crate::scanner::signatures::{SignatureRegistry, SignatureSet, SQL_ERRORS};
use async_trait::async_trait;
use tracing::debug;

const RECOMMENDATION: &str = "Use parameterized queries or prepared statements.";

/// Appends quote and comment breakers and looks for database error messages
pub struct ErrorSqliDetector {
    signatures: SignatureSet,
}

impl Default for ErrorSqliDetector {
    fn default() -> Self {
        Self::with_signatures(SignatureRegistry::builtin().get_or_empty(SQL_ERRORS))
    }
}

impl ErrorSqliDetector {
    pub fn with_signatures(signatures: SignatureSet) -> Self {
        Self { signatures }
    }
}

#[async_trait]
impl Detector for ErrorSqliDetector {
    fn name(&self) -> &str {
        "sqli-error"
    }

    fn class(&self) -> VulnClass {
        VulnClass::Sqli
    }

    async fn run(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
    ) -> DetectorReport {
        let mut report = report_for(self, target);
        let payloads = PayloadCatalog::global().sqli_error_payloads(&target.base_value);

        probe_payloads(transport, target, params, &payloads, &mut report, |payload, attempt| {
            let db_type = self.signatures.first_match(&attempt.response.body)?;
            Some(
                target
                    .finding(
                        format!("SQL Injection (Error-Based) in '{}'", target.param),
                        format!(
                            "Parameter '{}' is vulnerable to error-based SQL injection ({db_type}).",
                            target.param
                        ),
                        Severity::Critical,
                        VulnClass::Sqli,
                        payload,
                        attempt,
                    )
                    .with_confidence(Confidence::Confirmed)
                    .with_evidence(format!(
                        "Param: {}\nPayload: {payload}\nDB: {db_type}",
                        target.param
                    ))
                    .with_recommendation(RECOMMENDATION),
            )
        })
        .await;

        report
    }
}

/// Lowercases and drops all whitespace so layout noise is ignored
pub fn normalize_body(body: &str) -> String {
    body.split_whitespace()
        .collect::<String>()
        .to_lowercase()
}

/// Compares a true condition against a false one
#[derive(Default)]
pub struct BooleanSqliDetector;

#[async_trait]
impl Detector for BooleanSqliDetector {
    fn name(&self) -> &str {
        "sqli-boolean"
    }

    fn class(&self) -> VulnClass {
        VulnClass::Sqli
    }

    async fn run(
        &self,
        transport: &dyn Transport,
        target: &InjectionTarget<'_>,
        params: &mut ParamMap,
    ) -> DetectorReport {
        let mut report = report_for(self, target);
        let (true_payload, false_payload) =
            PayloadCatalog::global().sqli_boolean_pair(&target.base_value);

        let (true_result, false_result) = {
            let mut guard = params.scoped(target.param);
            guard.set(&true_payload);
            let true_result = send_attempt(transport, target, guard.map()).await;
            guard.set(&false_payload);
            let false_result = send_attempt(transport, target, guard.map()).await;
            (true_result, false_result)
        };
        report.attempts = 2;
        pause(target).await;

        let (true_attempt, false_attempt) = match (true_result, false_result) {
            (Ok(t), Ok(f)) => (t, f),
            (t, f) => {
                // A lone response has nothing to compare against, so both attempts are lost
                report.errors = report.attempts;
                debug!(
                    "[sqli-boolean] request error on '{}' (true: {}, false: {}), comparison skipped",
                    target.param,
                    if t.is_err() { "failed" } else { "ok" },
                    if f.is_err() { "failed" } else { "ok" }
                );
                return report;
            }
        };

        let true_norm = normalize_body(&true_attempt.response.body);
        let false_norm = normalize_body(&false_attempt.response.body);
        if true_norm != false_norm {
            report.findings.push(
                target
                    .finding(
                        format!("Possible SQL Injection (Boolean-Based) in '{}'", target.param),
                        format!(
                            "Parameter '{}' returns different content for true and false SQL conditions. \
                             Any difference counts, so dynamic page content can cause false positives.",
                            target.param
                        ),
                        Severity::High,
                        VulnClass::Sqli,
                        &true_payload,
                        &true_attempt,
                    )
                    .with_evidence(format!(
                        "Param: {}\nTrue payload: {true_payload} ({} bytes)\nFalse payload: {false_payload} ({} bytes)",
                        target.param,
                        true_attempt.response.body.len(),
                        false_attempt.response.body.len()
                    ))
                    .with_recommendation(RECOMMENDATION),
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_body() {
        assert_eq!(normalize_body("  <P>Hello\n\tWorld </p>"), "<p>helloworld</p>");
        assert_eq!(normalize_body("a b"), normalize_body("a\n\nb"));
        assert_ne!(normalize_body("1 row"), normalize_body("0 rows"));
    }
}
