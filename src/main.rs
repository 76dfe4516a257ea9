//! vigil - web injection probe CLI

use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

use vigil::config::{self, CliOverrides};
use vigil::models::{
    ClassToggles, DetectorReport, DetectorStatus, Finding, HttpMethod, ScanConfig, ScanResult,
    Severity,
};
use vigil::report;
use vigil::scanner::ScanEngine;

/// vigil - crawl a site and probe its parameters for injection flaws
#[derive(Parser)]
#[command(name = "vigil", version, about, long_about = None)]
struct Cli {
    /// Target URL to scan
    #[arg(short = 'u', long = "url", required_unless_present = "config")]
    url: Option<String>,

    /// Method used to deliver payloads (GET or POST)
    #[arg(short, long)]
    method: Option<HttpMethod>,

    /// Only test this parameter
    #[arg(short, long)]
    param: Option<String>,

    /// Cookie header sent with every request
    #[arg(long)]
    cookie: Option<String>,

    /// Write the full result as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log request traces
    #[arg(short, long)]
    debug: bool,

    /// Crawl depth (0 scans the start page only)
    #[arg(long)]
    crawl: Option<u32>,

    /// Test for cross-site scripting
    #[arg(short = 'x', long)]
    xss: bool,

    /// Test for SQL injection
    #[arg(short = 's', long)]
    sqli: bool,

    /// Test for local file inclusion
    #[arg(short = 'l', long)]
    lfi: bool,

    /// Test for command injection
    #[arg(short = 'r', long)]
    rce: bool,

    /// Test for open redirects
    #[arg(long = "or")]
    open_redirect: bool,

    /// Test for path traversal
    #[arg(long = "pt")]
    path_traversal: bool,

    /// Check pages for missing CSRF protection
    #[arg(long)]
    csrf: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Pause between payload attempts in milliseconds
    #[arg(long)]
    throttle_ms: Option<u64>,

    /// Try context-aware XSS templates and their mutations
    #[arg(long)]
    xss_mutations: bool,

    /// Skip the WAF probe
    #[arg(long)]
    no_waf_probe: bool,

    /// Scan the resolved IP address when a WAF is detected
    #[arg(long)]
    waf_resolve_ip: bool,

    /// Extra header (format: "Key: Value"), repeatable
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

impl Cli {
    fn overrides(self) -> CliOverrides {
        CliOverrides {
            target: self.url,
            method: self.method,
            param: self.param,
            cookie: self.cookie,
            crawl_depth: self.crawl,
            debug: self.debug,
            classes: ClassToggles {
                xss: self.xss,
                sqli: self.sqli,
                lfi: self.lfi,
                rce: self.rce,
                open_redirect: self.open_redirect,
                path_traversal: self.path_traversal,
                csrf: self.csrf,
            },
            timeout_secs: self.timeout,
            throttle_ms: self.throttle_ms,
            xss_mutations: self.xss_mutations,
            no_waf_probe: self.no_waf_probe,
            waf_resolve_ip: self.waf_resolve_ip,
            headers: self.headers,
        }
    }
}

fn print_banner() {
    let banner = r#"
    +-----------------------------------+
    |  vigil v0.1.0                     |
    |  Web injection probe              |
    +-----------------------------------+
    "#;
    println!("{}", banner.cyan());
}

fn status_cell(status: DetectorStatus) -> String {
    match status {
        DetectorStatus::Vulnerable => "VULNERABLE".red().bold().to_string(),
        DetectorStatus::Clean => "clean".green().to_string(),
        DetectorStatus::Untested => "untested".yellow().to_string(),
    }
}

fn print_reports(reports: &[DetectorReport]) {
    if reports.is_empty() {
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["Page", "Parameter", "Detector", "Requests", "Status"]);
    for report in reports {
        builder.push_record([
            report.url.clone(),
            report.parameter.clone().unwrap_or_else(|| "-".to_string()),
            report.detector.clone(),
            report.attempts.to_string(),
            status_cell(report.status()),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}

fn print_findings(findings: &[Finding]) {
    for finding in findings {
        let severity = match finding.severity {
            Severity::Critical | Severity::High => finding.severity.to_string().red().bold(),
            Severity::Medium => finding.severity.to_string().yellow(),
            Severity::Low => finding.severity.to_string().blue(),
            Severity::Info => finding.severity.to_string().white(),
        };
        println!("  [{severity}] {} ({})", finding.title.bold(), finding.confidence);
        if let Some(ref payload) = finding.payload {
            println!("      payload: {payload}");
        }
        if let Some(ref poc) = finding.poc_url {
            println!("      poc:     {}", poc.cyan());
        }
    }
}

fn print_summary(result: &ScanResult) {
    println!("\n{}", "  Crawled URLs".bold());
    for url in &result.crawled_urls {
        println!("    {url}");
    }

    if let Some(ref waf) = result.waf {
        let verdict = if waf.detected {
            waf.reason.yellow()
        } else {
            "no WAF detected".green()
        };
        println!("\n  {} {verdict}", "WAF:".bold());
    }

    println!("\n{}", "  Detector Results".bold());
    print_reports(&result.reports);

    if !result.findings.is_empty() {
        println!("\n{}", "  Findings".bold());
        print_findings(&result.findings);
    }

    println!(
        "\n  {} {} {} {} {}   ({} requests)",
        format!("{} Critical", result.count_by_severity(&Severity::Critical)).red().bold(),
        format!("{} High", result.count_by_severity(&Severity::High)).bright_red(),
        format!("{} Medium", result.count_by_severity(&Severity::Medium)).yellow(),
        format!("{} Low", result.count_by_severity(&Severity::Low)).blue(),
        format!("{} Info", result.count_by_severity(&Severity::Info)).white(),
        result.total_requests,
    );
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut scan_config = if let Some(ref path) = cli.config {
        config::load_config(path)?
    } else {
        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            config::load_config(default_path)?
        } else {
            ScanConfig::default()
        }
    };
    let output = cli.output.clone();
    config::merge_cli_args(&mut scan_config, cli.overrides());
    config::validate(&scan_config)?;

    let filter = if scan_config.debug { "vigil=debug" } else { "vigil=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    print_banner();

    println!("  {} {}", "Target:".bold(), scan_config.target.green());
    println!(
        "  {} {}  {} {}\n",
        "Method:".bold(),
        scan_config.method.to_string().cyan(),
        "Crawl depth:".bold(),
        scan_config.crawl_depth.to_string().cyan()
    );

    let engine = ScanEngine::with_defaults();
    let result = engine.run(&scan_config).await?;

    print_summary(&result);

    if let Some(ref path) = output {
        report::json::export(&result, path)?;
        println!("\n  {} {}", "Report saved to:".bold(), path.display().to_string().green());
    }

    Ok(())
}
