//! Scan engine: crawl, discover parameters, run detectors in a fixed order

pub mod csrf;
pub mod discovery;
pub mod injection;
pub mod params;
pub mod payloads;
pub mod signatures;
pub mod upload;
pub mod waf;
pub mod xss;

use crate::config;
use crate::crawler::Crawler;
use crate::error::Result;
use crate::http::{HttpClient, Transport};
use crate::models::{DetectorReport, DetectorStatus, ScanConfig, ScanResult, VulnClass};
use indicatif::{ProgressBar, ProgressStyle};
use injection::{
    command::CommandInjectionDetector,
    lfi::LfiDetector,
    open_redirect::OpenRedirectDetector,
    path_traversal::PathTraversalDetector,
    sqli::{BooleanSqliDetector, ErrorSqliDetector},
    xss::XssDetector,
    Detector, InjectionTarget,
};
use params::{baseline_value, command_exec_override, MethodOverride, OverrideHeuristic, ParamMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates crawling and the registered detectors
pub struct ScanEngine {
    detectors: Vec<Arc<dyn Detector>>,
    overrides: Vec<OverrideHeuristic>,
}

impl ScanEngine {
    /// Creates an engine with no detectors and no override heuristics
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Creates an engine with every built-in detector, in execution order
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register(Arc::new(CommandInjectionDetector::default()));
        engine.register(Arc::new(XssDetector));
        engine.register(Arc::new(ErrorSqliDetector::default()));
        engine.register(Arc::new(BooleanSqliDetector));
        engine.register(Arc::new(LfiDetector::default()));
        engine.register(Arc::new(PathTraversalDetector::default()));
        engine.register(Arc::new(OpenRedirectDetector));
        engine.register_override(Box::new(command_exec_override));
        engine
    }

    /// Appends a detector; detectors run in registration order
    pub fn register(&mut self, detector: Arc<dyn Detector>) {
        self.detectors.push(detector);
    }

    /// Adds a heuristic consulted for every `(page URL, parameter)` pair.
    /// The first heuristic that answers wins.
    pub fn register_override(&mut self, heuristic: OverrideHeuristic) {
        self.overrides.push(heuristic);
    }

    /// Name and class of every registered detector
    pub fn list_detectors(&self) -> Vec<(&str, VulnClass)> {
        self.detectors
            .iter()
            .map(|d| (d.name(), d.class()))
            .collect()
    }

    fn resolve_override(&self, url: &str, param: &str) -> Option<MethodOverride> {
        self.overrides.iter().find_map(|h| h(url, param))
    }

    /// Scans `config.target` over the network
    pub async fn run(&self, config: &ScanConfig) -> Result<ScanResult> {
        let client = HttpClient::from_config(config)?;
        self.run_with(&client, config).await
    }

    /// Scans `config.target` through an arbitrary transport
    pub async fn run_with(&self, transport: &dyn Transport, config: &ScanConfig) -> Result<ScanResult> {
        config::validate(config)?;
        let mut result = ScanResult::new(&config.target);
        let mut root = config.target.clone();

        let mut waf_detected = false;
        if config.waf_probe {
            let mut verdict = waf::detect_waf(transport, &config.target).await;
            if verdict.detected {
                waf_detected = true;
                if let Some(param) = verdict.parameter.clone() {
                    verdict.bypasses = waf::find_bypasses(transport, &config.target, &param).await;
                }
                warn!("{}", verdict.reason);
                result.findings.push(waf::waf_finding(&config.target, &verdict));

                if config.waf_resolve_ip {
                    let resolved = waf::domain_to_ip(&root).await;
                    if resolved != root {
                        info!("Scanning resolved address {resolved} instead of {root}");
                        root = resolved;
                    }
                }
            }
            result.waf = Some(verdict);
        }

        info!("Crawling {root} (depth {})", config.crawl_depth);
        let crawler = Crawler::new(transport, root.as_str(), config.crawl_depth);
        result.crawled_urls = crawler.crawl(&root).await;
        for url in &result.crawled_urls {
            debug!(" - {url}");
        }

        let pb = ProgressBar::new(result.crawled_urls.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        let pages = result.crawled_urls.clone();
        for page_url in &pages {
            pb.set_message(format!("Scanning {page_url}"));
            for report in self.scan_page(transport, config, page_url, waf_detected).await {
                result.push_report(report);
            }
            pb.inc(1);
        }
        pb.finish_with_message("Scan complete");

        result.findings.sort_by(|a, b| a.severity.cmp(&b.severity));
        result.total_requests = transport.request_count();
        result.finish();
        Ok(result)
    }

    /// Runs the page-level checks and every parameter of one page
    pub async fn scan_page(
        &self,
        transport: &dyn Transport,
        config: &ScanConfig,
        page_url: &str,
        waf_detected: bool,
    ) -> Vec<DetectorReport> {
        info!("Scanning page: {page_url}");
        let page = match transport.get(page_url).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not fetch page {page_url}: {e}");
                return Vec::new();
            }
        };

        let mut reports = Vec::new();
        reports.push(upload::check_uploads(transport, page_url, &page.body).await);
        if config.classes.is_enabled(VulnClass::Csrf) {
            reports.push(csrf::check_csrf(transport, page_url).await);
        }

        let params = self.parameters_for(config, page_url, &page.body);
        if params.is_empty() {
            info!("No injectable parameters found on {page_url}");
            return reports;
        }
        info!("Auto-detected parameters: {params:?}");

        for param in &params {
            reports.extend(
                self.scan_parameter(transport, config, page_url, param, waf_detected)
                    .await,
            );
        }
        reports
    }

    /// Discovered names, else the page URL's own query keys; a fixed
    /// `inject_param` replaces both
    fn parameters_for(&self, config: &ScanConfig, page_url: &str, html: &str) -> Vec<String> {
        if let Some(ref fixed) = config.inject_param {
            return vec![fixed.clone()];
        }
        let discovered = discovery::discover(html);
        if !discovered.names.is_empty() {
            return discovered.names;
        }
        ParamMap::from_url(page_url)
            .map(|(_, query)| query.keys().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Runs every enabled detector against one parameter
    pub async fn scan_parameter(
        &self,
        transport: &dyn Transport,
        config: &ScanConfig,
        page_url: &str,
        param: &str,
        waf_detected: bool,
    ) -> Vec<DetectorReport> {
        let (base_url, mut params) = match ParamMap::from_url(page_url) {
            Ok(split) => split,
            Err(e) => {
                warn!("Skipping '{param}': cannot parse {page_url}: {e}");
                return Vec::new();
            }
        };
        let original_value = params.get(param).map(String::from);
        let mut base_value = baseline_value(param, original_value.as_deref());
        let mut method = config.method;
        params.ensure_submit_fields();

        if let Some(ov) = self.resolve_override(page_url, param) {
            debug!("Override for '{param}' on {page_url}: {} with '{}'", ov.method, ov.base_value);
            method = ov.method;
            base_value = ov.base_value;
        }

        let target = InjectionTarget {
            config,
            page_url,
            base_url: &base_url,
            param,
            base_value,
            original_value,
            method,
            waf_detected,
        };

        let mut reports = Vec::new();
        for detector in &self.detectors {
            if !config.classes.is_enabled(detector.class()) {
                continue;
            }
            if !detector.applies_to(param) {
                debug!("Skipping {} for '{param}' (not applicable)", detector.name());
                continue;
            }

            info!("Testing '{param}' for {}", detector.class());
            let before = params.clone();
            let report = detector.run(transport, &target, &mut params).await;
            debug_assert_eq!(params, before, "{} left '{param}' modified", detector.name());

            match report.status() {
                DetectorStatus::Vulnerable => info!(
                    "{} found {} issue(s) in '{param}'",
                    detector.name(),
                    report.count()
                ),
                DetectorStatus::Untested => warn!(
                    "{} on '{param}': {}",
                    detector.name(),
                    DetectorStatus::Untested
                ),
                DetectorStatus::Clean => debug!("{} clean for '{param}'", detector.name()),
            }
            reports.push(report);
        }
        reports
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpMethod;

    #[test]
    fn test_default_detector_order() {
        let engine = ScanEngine::with_defaults();
        let names: Vec<&str> = engine.list_detectors().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "rce",
                "xss",
                "sqli-error",
                "sqli-boolean",
                "lfi",
                "path-traversal",
                "open-redirect"
            ]
        );
    }

    #[test]
    fn test_first_override_wins() {
        let mut engine = ScanEngine::new();
        engine.register_override(Box::new(|_: &str, param: &str| {
            (param == "cmd").then(|| MethodOverride {
                method: HttpMethod::Post,
                base_value: "first".to_string(),
            })
        }));
        engine.register_override(Box::new(|_: &str, _: &str| {
            Some(MethodOverride {
                method: HttpMethod::Get,
                base_value: "second".to_string(),
            })
        }));
        assert_eq!(
            engine.resolve_override("http://h/", "cmd").map(|o| o.base_value),
            Some("first".to_string())
        );
        assert_eq!(
            engine.resolve_override("http://h/", "x").map(|o| o.base_value),
            Some("second".to_string())
        );
    }

    #[test]
    fn test_parameters_fallback_and_fixed() {
        let engine = ScanEngine::new();
        let mut config = ScanConfig::for_target("http://h/");
        let found = engine.parameters_for(&config, "http://h/p.php?b=1&a=2", "<p>no forms</p>");
        assert_eq!(found, vec!["a".to_string(), "b".to_string()]);

        config.inject_param = Some("id".to_string());
        let found = engine.parameters_for(&config, "http://h/p.php?b=1", "<form><input name=q></form>");
        assert_eq!(found, vec!["id".to_string()]);
    }
}
