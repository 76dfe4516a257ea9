//! Configuration loading and CLI merge tests

use std::path::Path;
use vigil::config::{load_config, merge_cli_args, validate, CliOverrides};
use vigil::error::VigilError;
use vigil::models::{HttpMethod, VulnClass};

fn shipped_config() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml")
}

#[test]
fn test_shipped_default_config_loads() {
    let config = load_config(&shipped_config()).expect("default.toml should parse");
    assert_eq!(config.method, HttpMethod::Get);
    assert_eq!(config.crawl_depth, 1);
    assert_eq!(config.throttle_ms, 350);
    assert!(config.waf_probe);
    assert!(!config.xss_mutations);
    assert!(!config.debug);
    // no class selected means every class runs
    assert!(config.classes.is_enabled(VulnClass::Lfi));
    assert!(config.classes.is_enabled(VulnClass::Csrf));
}

#[test]
fn test_shipped_config_needs_target() {
    let mut config = load_config(&shipped_config()).unwrap();
    assert!(matches!(validate(&config), Err(VigilError::ConfigError(_))));

    merge_cli_args(
        &mut config,
        CliOverrides {
            target: Some("http://dvwa.local/vulnerabilities/sqli/?id=1".to_string()),
            method: Some(HttpMethod::Post),
            throttle_ms: Some(0),
            debug: true,
            ..CliOverrides::default()
        },
    );
    assert!(validate(&config).is_ok());
    assert_eq!(config.method, HttpMethod::Post);
    assert_eq!(config.throttle_ms, 0);
    assert!(config.debug);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = load_config(Path::new("/nonexistent/vigil.toml")).unwrap_err();
    assert!(matches!(err, VigilError::IoError(_)));
}
