//! Core data models for the vigil scanner

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::VigilError;

/// Severity level for security findings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Confidence level for a finding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    /// The response proves the payload took effect (marker echoed, file content leaked)
    Confirmed,
    /// Strong indicator that still needs manual review (diverging pages, keyword hits)
    Tentative,
    /// Informational detection (WAF fingerprint, missing hardening)
    Informational,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Confirmed => write!(f, "confirmed"),
            Confidence::Tentative => write!(f, "tentative"),
            Confidence::Informational => write!(f, "informational"),
        }
    }
}

/// HTTP method used to deliver payloads
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(VigilError::ConfigError(format!(
                "Unsupported HTTP method '{other}' (expected GET or POST)"
            ))),
        }
    }
}

/// Vulnerability classes the engine can test for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VulnClass {
    CommandInjection,
    Xss,
    Sqli,
    Lfi,
    PathTraversal,
    OpenRedirect,
    Csrf,
    FileUpload,
    Waf,
}

impl VulnClass {
    /// Human readable category name
    pub fn label(&self) -> &'static str {
        match self {
            VulnClass::CommandInjection => "Command Injection",
            VulnClass::Xss => "XSS",
            VulnClass::Sqli => "SQL Injection",
            VulnClass::Lfi => "File Inclusion",
            VulnClass::PathTraversal => "Path Traversal",
            VulnClass::OpenRedirect => "Open Redirect",
            VulnClass::Csrf => "CSRF",
            VulnClass::FileUpload => "File Upload",
            VulnClass::Waf => "WAF Detection",
        }
    }

    pub fn cwe(&self) -> Option<&'static str> {
        match self {
            VulnClass::CommandInjection => Some("CWE-78"),
            VulnClass::Xss => Some("CWE-79"),
            VulnClass::Sqli => Some("CWE-89"),
            VulnClass::Lfi => Some("CWE-98"),
            VulnClass::PathTraversal => Some("CWE-22"),
            VulnClass::OpenRedirect => Some("CWE-601"),
            VulnClass::Csrf => Some("CWE-352"),
            VulnClass::FileUpload => Some("CWE-434"),
            VulnClass::Waf => None,
        }
    }

    pub fn owasp(&self) -> Option<&'static str> {
        match self {
            VulnClass::CommandInjection | VulnClass::Xss | VulnClass::Sqli => {
                Some("A03:2021 Injection")
            }
            VulnClass::Lfi | VulnClass::FileUpload => Some("A04:2021 Insecure Design"),
            VulnClass::PathTraversal | VulnClass::OpenRedirect | VulnClass::Csrf => {
                Some("A01:2021 Broken Access Control")
            }
            VulnClass::Waf => None,
        }
    }

    /// Default confidence attached to findings of this class
    fn default_confidence(&self) -> Confidence {
        match self {
            VulnClass::CommandInjection
            | VulnClass::Xss
            | VulnClass::Lfi
            | VulnClass::PathTraversal => Confidence::Confirmed,
            VulnClass::Waf => Confidence::Informational,
            _ => Confidence::Tentative,
        }
    }
}

impl fmt::Display for VulnClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A security finding discovered during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Unique identifier
    pub id: String,
    /// Name of the finding
    pub title: String,
    /// Detailed description
    pub description: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub class: VulnClass,
    /// Parameter the payload was injected into (None for page-level checks)
    pub parameter: Option<String>,
    /// Payload that triggered the verdict
    pub payload: Option<String>,
    /// Technical evidence
    pub evidence: String,
    /// Remediation recommendation
    pub recommendation: String,
    pub cwe_id: Option<String>,
    pub owasp_category: Option<String>,
    /// Page the finding applies to
    pub url: String,
    /// URL that reproduces the issue
    pub poc_url: Option<String>,
    /// Request line (and form body for POST) that demonstrates the issue
    pub request: Option<String>,
}

impl Finding {
    /// Creates a new Finding with a generated UUID and the class defaults
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        class: VulnClass,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            severity,
            confidence: class.default_confidence(),
            class,
            parameter: None,
            payload: None,
            evidence: String::new(),
            recommendation: String::new(),
            cwe_id: class.cwe().map(String::from),
            owasp_category: class.owasp().map(String::from),
            url: url.into(),
            poc_url: None,
            request: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_parameter(mut self, param: impl Into<String>) -> Self {
        self.parameter = Some(param.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    pub fn with_recommendation(mut self, rec: impl Into<String>) -> Self {
        self.recommendation = rec.into();
        self
    }

    pub fn with_poc(mut self, poc_url: impl Into<String>) -> Self {
        self.poc_url = Some(poc_url.into());
        self
    }

    pub fn with_request(mut self, request: impl Into<String>) -> Self {
        self.request = Some(request.into());
        self
    }
}

/// Outcome of a single detector run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectorStatus {
    /// At least one payload was confirmed
    Vulnerable,
    /// Tested and nothing matched
    Clean,
    /// Every attempt failed at the transport layer
    Untested,
}

impl fmt::Display for DetectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorStatus::Vulnerable => write!(f, "vulnerable"),
            DetectorStatus::Clean => write!(f, "clean"),
            DetectorStatus::Untested => write!(f, "could not test (transport error)"),
        }
    }
}

/// Per-parameter, per-detector verdict record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorReport {
    /// Detector name, e.g. "sqli-boolean"
    pub detector: String,
    pub class: VulnClass,
    /// Page the detector ran against
    pub url: String,
    /// Parameter under test (None for page-level checks)
    pub parameter: Option<String>,
    /// Requests attempted
    pub attempts: usize,
    /// Attempts lost to transport errors
    pub errors: usize,
    pub findings: Vec<Finding>,
}

impl DetectorReport {
    pub fn new(
        detector: impl Into<String>,
        class: VulnClass,
        url: impl Into<String>,
        parameter: Option<&str>,
    ) -> Self {
        Self {
            detector: detector.into(),
            class,
            url: url.into(),
            parameter: parameter.map(String::from),
            attempts: 0,
            errors: 0,
            findings: Vec::new(),
        }
    }

    /// Number of confirmed payloads
    pub fn count(&self) -> usize {
        self.findings.len()
    }

    pub fn is_vulnerable(&self) -> bool {
        !self.findings.is_empty()
    }

    pub fn status(&self) -> DetectorStatus {
        if self.is_vulnerable() {
            DetectorStatus::Vulnerable
        } else if self.attempts > 0 && self.errors >= self.attempts {
            DetectorStatus::Untested
        } else {
            DetectorStatus::Clean
        }
    }
}

/// Result of the WAF probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WafVerdict {
    pub detected: bool,
    /// Why the probe concluded a WAF is present
    pub reason: String,
    /// Query parameter whose probe was blocked
    pub parameter: Option<String>,
    /// Payload encodings that got past the block
    pub bypasses: Vec<String>,
}

impl WafVerdict {
    pub fn not_detected() -> Self {
        Self {
            detected: false,
            reason: String::new(),
            parameter: None,
            bypasses: Vec::new(),
        }
    }
}

/// Result of a complete scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub target: String,
    /// Unique scan identifier
    pub scan_id: String,
    /// Scan start time (local timezone)
    pub started_at: DateTime<Local>,
    /// Scan end time (local timezone)
    pub finished_at: Option<DateTime<Local>>,
    /// URLs returned by the crawler, in discovery order
    pub crawled_urls: Vec<String>,
    /// Every detector run, clean or not
    pub reports: Vec<DetectorReport>,
    /// All findings discovered
    pub findings: Vec<Finding>,
    pub waf: Option<WafVerdict>,
    /// Total HTTP requests made
    pub total_requests: u64,
}

impl ScanResult {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            scan_id: uuid::Uuid::new_v4().to_string(),
            started_at: Local::now(),
            finished_at: None,
            crawled_urls: Vec::new(),
            reports: Vec::new(),
            findings: Vec::new(),
            waf: None,
            total_requests: 0,
        }
    }

    /// Records a detector report, lifting its findings into the flat list
    pub fn push_report(&mut self, report: DetectorReport) {
        self.findings.extend(report.findings.iter().cloned());
        self.reports.push(report);
    }

    pub fn count_by_severity(&self, severity: &Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| &f.severity == severity)
            .count()
    }

    /// Number of findings per vulnerability class
    pub fn count_by_class(&self, class: VulnClass) -> usize {
        self.findings.iter().filter(|f| f.class == class).count()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }
}

/// Per-class enable switches. When none is set every class is enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassToggles {
    pub xss: bool,
    pub sqli: bool,
    pub lfi: bool,
    pub rce: bool,
    pub open_redirect: bool,
    pub path_traversal: bool,
    pub csrf: bool,
}

impl ClassToggles {
    fn none_selected(&self) -> bool {
        !(self.xss
            || self.sqli
            || self.lfi
            || self.rce
            || self.open_redirect
            || self.path_traversal
            || self.csrf)
    }

    /// Whether detectors of `class` should run
    pub fn is_enabled(&self, class: VulnClass) -> bool {
        if self.none_selected() {
            return true;
        }
        match class {
            VulnClass::Xss => self.xss,
            VulnClass::Sqli => self.sqli,
            VulnClass::Lfi => self.lfi,
            VulnClass::CommandInjection => self.rce,
            VulnClass::OpenRedirect => self.open_redirect,
            VulnClass::PathTraversal => self.path_traversal,
            VulnClass::Csrf => self.csrf,
            // Page-level probes with no switch of their own
            VulnClass::FileUpload | VulnClass::Waf => true,
        }
    }
}

/// Configuration for a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Target URL to scan
    pub target: String,
    /// Method used to deliver payloads
    pub method: HttpMethod,
    /// Only test this parameter instead of auto-detected ones
    pub inject_param: Option<String>,
    /// Raw Cookie header sent with every request
    pub cookie: Option<String>,
    /// Maximum crawl depth (0 = start page only)
    pub crawl_depth: u32,
    /// Emit request traces
    pub debug: bool,
    pub classes: ClassToggles,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Pause between payload attempts in milliseconds
    pub throttle_ms: u64,
    /// Whether the transport follows redirects (off keeps Location observable)
    pub follow_redirects: bool,
    /// HTTP/HTTPS proxy URL
    pub proxy: Option<String>,
    /// Custom HTTP headers
    pub headers: HashMap<String, String>,
    /// Probe the target for a WAF before scanning
    pub waf_probe: bool,
    /// Scan the resolved IP instead of the hostname when a WAF is detected
    pub waf_resolve_ip: bool,
    /// Run canary templates and mutations after the basic XSS probes
    pub xss_mutations: bool,
}

impl ScanConfig {
    /// Creates a default configuration for the given target
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            method: HttpMethod::Get,
            inject_param: None,
            cookie: None,
            crawl_depth: 1,
            debug: false,
            classes: ClassToggles::default(),
            timeout_secs: 15,
            user_agent: "vigil/0.1".to_string(),
            throttle_ms: 350,
            follow_redirects: false,
            proxy: None,
            headers: HashMap::new(),
            waf_probe: true,
            waf_resolve_ip: false,
            xss_mutations: false,
        }
    }
}
