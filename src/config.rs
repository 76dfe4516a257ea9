//! Configuration management for vigil
//!
//! Precedence: built-in defaults, then the optional TOML file, then CLI flags.

use crate::error::{Result, VigilError};
use crate::models::{ClassToggles, HttpMethod, ScanConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use url::Url;

/// File-based configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    scan: Option<ScanSection>,
    classes: Option<ClassToggles>,
    xss: Option<XssSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanSection {
    target: Option<String>,
    method: Option<HttpMethod>,
    param: Option<String>,
    cookie: Option<String>,
    crawl_depth: Option<u32>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
    throttle_ms: Option<u64>,
    follow_redirects: Option<bool>,
    proxy: Option<String>,
    waf_probe: Option<bool>,
    waf_resolve_ip: Option<bool>,
    headers: Option<HashMap<String, String>>,
    debug: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct XssSection {
    mutations: Option<bool>,
}

/// Parses TOML text on top of the defaults
pub fn parse_config(content: &str) -> Result<ScanConfig> {
    let file_config: FileConfig = toml::from_str(content)?;
    let mut config = ScanConfig::default();

    if let Some(scan) = file_config.scan {
        if let Some(target) = scan.target {
            config.target = target;
        }
        if let Some(method) = scan.method {
            config.method = method;
        }
        if scan.param.is_some() {
            config.inject_param = scan.param;
        }
        if scan.cookie.is_some() {
            config.cookie = scan.cookie;
        }
        if let Some(depth) = scan.crawl_depth {
            config.crawl_depth = depth;
        }
        if let Some(timeout) = scan.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(ua) = scan.user_agent {
            config.user_agent = ua;
        }
        if let Some(throttle) = scan.throttle_ms {
            config.throttle_ms = throttle;
        }
        if let Some(follow) = scan.follow_redirects {
            config.follow_redirects = follow;
        }
        if scan.proxy.is_some() {
            config.proxy = scan.proxy;
        }
        if let Some(probe) = scan.waf_probe {
            config.waf_probe = probe;
        }
        if let Some(resolve) = scan.waf_resolve_ip {
            config.waf_resolve_ip = resolve;
        }
        if let Some(headers) = scan.headers {
            config.headers.extend(headers);
        }
        if let Some(debug) = scan.debug {
            config.debug = debug;
        }
    }

    if let Some(classes) = file_config.classes {
        config.classes = classes;
    }

    if let Some(xss) = file_config.xss {
        if let Some(mutations) = xss.mutations {
            config.xss_mutations = mutations;
        }
    }

    Ok(config)
}

/// Loads configuration from a TOML file and merges with defaults
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Values given on the command line. `None`/`false` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub target: Option<String>,
    pub method: Option<HttpMethod>,
    pub param: Option<String>,
    pub cookie: Option<String>,
    pub crawl_depth: Option<u32>,
    pub debug: bool,
    pub classes: ClassToggles,
    pub timeout_secs: Option<u64>,
    pub throttle_ms: Option<u64>,
    pub xss_mutations: bool,
    pub no_waf_probe: bool,
    pub waf_resolve_ip: bool,
    /// Raw `Key: Value` header strings
    pub headers: Vec<String>,
}

/// Merges CLI arguments into an existing ScanConfig
pub fn merge_cli_args(config: &mut ScanConfig, cli: CliOverrides) {
    if let Some(target) = cli.target {
        config.target = target;
    }
    if let Some(method) = cli.method {
        config.method = method;
    }
    if cli.param.is_some() {
        config.inject_param = cli.param;
    }
    if cli.cookie.is_some() {
        config.cookie = cli.cookie;
    }
    if let Some(depth) = cli.crawl_depth {
        config.crawl_depth = depth;
    }
    if let Some(t) = cli.timeout_secs {
        config.timeout_secs = t;
    }
    if let Some(t) = cli.throttle_ms {
        config.throttle_ms = t;
    }
    // Class flags on the command line replace the file's selection entirely
    if cli.classes != ClassToggles::default() {
        config.classes = cli.classes;
    }
    config.debug |= cli.debug;
    config.xss_mutations |= cli.xss_mutations;
    config.waf_resolve_ip |= cli.waf_resolve_ip;
    if cli.no_waf_probe {
        config.waf_probe = false;
    }
    for header in cli.headers {
        if let Some((key, value)) = header.split_once(':') {
            config
                .headers
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }
}

/// Rejects configurations that cannot start a scan
pub fn validate(config: &ScanConfig) -> Result<()> {
    if config.target.trim().is_empty() {
        return Err(VigilError::ConfigError("target URL is required".to_string()));
    }
    let url = Url::parse(&config.target).map_err(|e| {
        VigilError::ConfigError(format!("invalid target URL '{}': {e}", config.target))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(VigilError::ConfigError(format!(
            "target URL must be an absolute http(s) URL, got '{}'",
            config.target
        )));
    }
    if config.timeout_secs == 0 {
        return Err(VigilError::ConfigError("timeout must be at least 1 second".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = parse_config(
            r#"
            [scan]
            target = "http://dvwa.local/"
            method = "POST"
            crawl_depth = 2
            throttle_ms = 0
            cookie = "PHPSESSID=abc; security=low"
            debug = true

            [scan.headers]
            X-Test = "1"

            [classes]
            xss = true
            sqli = true

            [xss]
            mutations = true
            "#,
        )
        .unwrap();
        assert_eq!(config.target, "http://dvwa.local/");
        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(config.crawl_depth, 2);
        assert_eq!(config.throttle_ms, 0);
        assert_eq!(config.cookie.as_deref(), Some("PHPSESSID=abc; security=low"));
        assert_eq!(config.headers.get("X-Test").map(String::as_str), Some("1"));
        assert!(config.classes.xss && config.classes.sqli && !config.classes.lfi);
        assert!(config.xss_mutations);
        assert!(config.debug);
        assert_eq!(config.timeout_secs, 15);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.throttle_ms, 350);
        assert!(config.waf_probe);
        assert!(!config.follow_redirects);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            parse_config("[scan]\nthreads = 4\n"),
            Err(VigilError::TomlError(_))
        ));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = parse_config("[scan]\ntarget = \"http://a/\"\n[classes]\nlfi = true\n").unwrap();
        merge_cli_args(
            &mut config,
            CliOverrides {
                target: Some("http://b/".to_string()),
                classes: ClassToggles {
                    xss: true,
                    ..ClassToggles::default()
                },
                no_waf_probe: true,
                headers: vec!["X-Api-Key: secret".to_string(), "garbage".to_string()],
                ..CliOverrides::default()
            },
        );
        assert_eq!(config.target, "http://b/");
        assert!(config.classes.xss && !config.classes.lfi);
        assert!(!config.waf_probe);
        assert_eq!(config.headers.len(), 1);
        assert_eq!(config.headers.get("X-Api-Key").map(String::as_str), Some("secret"));
    }

    #[test]
    fn test_validate() {
        assert!(validate(&ScanConfig::for_target("http://example.com/")).is_ok());
        for bad in ["", "example.com", "ftp://example.com/", "not a url"] {
            assert!(
                matches!(validate(&ScanConfig::for_target(bad)), Err(VigilError::ConfigError(_))),
                "{bad} accepted"
            );
        }
    }
}
