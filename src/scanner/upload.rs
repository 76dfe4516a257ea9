//! Unrestricted file upload probe

use crate::http::Transport;
use crate::models::{DetectorReport, Finding, Severity, VulnClass};
use crate::scanner::discovery::{find_upload_forms, UploadForm};
use tracing::{debug, info};

pub const UPLOAD_FILE_NAME: &str = "pwntest.php";
pub const UPLOAD_MARKER: &str = "pwntwouploadmarker";

/// Contents of the uploaded test script
pub fn upload_body() -> Vec<u8> {
    format!("<?php echo '{UPLOAD_MARKER}'; ?>").into_bytes()
}

/// First success indicator found in an upload response
pub fn success_indicator(body: &str) -> Option<&'static str> {
    [UPLOAD_MARKER, "uploaded", "success", "File uploaded", UPLOAD_FILE_NAME]
        .into_iter()
        .find(|m| body.contains(m))
}

/// Submits `form` with the test script attached
pub async fn probe_form(
    transport: &dyn Transport,
    page_url: &str,
    form: &UploadForm,
    report: &mut DetectorReport,
) {
    debug!(
        "[upload] form action={} method={} file field={} fields={:?}",
        form.action, form.method, form.file_field, form.fields
    );
    report.attempts += 1;
    let body = upload_body();
    let response = match transport
        .fetch_multipart(
            &form.action,
            &form.fields,
            &form.file_field,
            UPLOAD_FILE_NAME,
            &body,
            &[],
        )
        .await
    {
        Ok(r) => r,
        Err(e) => {
            report.errors += 1;
            debug!("[upload] request error for {}: {e}", form.action);
            return;
        }
    };

    if let Some(indicator) = success_indicator(&response.body) {
        info!("Possible file upload vulnerability via field '{}'", form.file_field);
        report.findings.push(
            Finding::new(
                "Unrestricted File Upload",
                format!(
                    "The form at {} accepted a PHP script through field '{}'.",
                    form.action, form.file_field
                ),
                Severity::High,
                VulnClass::FileUpload,
                page_url,
            )
            .with_parameter(&form.file_field)
            .with_payload(UPLOAD_FILE_NAME)
            .with_poc(&form.action)
            .with_request(format!(
                "POST {} (multipart, {}={UPLOAD_FILE_NAME})",
                form.action, form.file_field
            ))
            .with_evidence(format!("Response contains '{indicator}'"))
            .with_recommendation(
                "Validate file type by content, store uploads outside the web root and never execute them.",
            ),
        );
    }
}

/// Finds upload forms on a fetched page and probes each one
pub async fn check_uploads(transport: &dyn Transport, page_url: &str, html: &str) -> DetectorReport {
    let mut report = DetectorReport::new("file-upload", VulnClass::FileUpload, page_url, None);
    let forms = find_upload_forms(page_url, html);
    if forms.is_empty() {
        debug!("[upload] no file upload forms on {page_url}");
        return report;
    }
    for form in &forms {
        probe_form(transport, page_url, form, &mut report).await;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_indicator_filename_only() {
        assert_eq!(
            success_indicator("../../hackable/uploads/pwntest.php"),
            Some(UPLOAD_FILE_NAME)
        );
    }

    #[test]
    fn test_success_indicator_order() {
        assert_eq!(success_indicator("File uploaded"), Some("uploaded"));
        assert_eq!(success_indicator("Your image was not accepted"), None);
    }

    #[test]
    fn test_upload_body_contains_marker() {
        let body = String::from_utf8(upload_body()).unwrap();
        assert!(body.contains(UPLOAD_MARKER));
        assert!(body.starts_with("<?php"));
    }
}
