//! End-to-end scans and page-level checks

mod common;

use common::{test_config, ScriptedTransport};
use vigil::http::{FetchResponse, HttpClient, Transport};
use vigil::models::{ClassToggles, DetectorStatus, HttpMethod, Severity, VulnClass};
use vigil::scanner::upload::{check_uploads, UPLOAD_FILE_NAME};
use vigil::scanner::{waf, ScanEngine};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn xss_only() -> ClassToggles {
    ClassToggles {
        xss: true,
        ..ClassToggles::default()
    }
}

const UPLOAD_PAGE: &str = r##"
<form enctype="multipart/form-data" action="#" method="POST">
  <input type="hidden" name="MAX_FILE_SIZE" value="100000" />
  <input name="uploaded" type="file" />
  <input type="submit" name="Upload" value="Upload" />
</form>"##;

#[tokio::test]
async fn test_end_to_end_single_xss_finding() {
    let target = "http://dvwa.local/vulnerabilities/xss_r/?id=1";
    let transport = ScriptedTransport::new(|req| {
        let id = req.param("id").unwrap_or_default();
        if id.contains("<script>alert('xss1')</script>") {
            Ok(FetchResponse::new(200, format!("<pre>Hello {id}</pre>")))
        } else {
            Ok(FetchResponse::new(200, "<pre>Hello</pre>"))
        }
    });
    let mut config = test_config(target);
    config.classes = xss_only();

    let result = ScanEngine::with_defaults()
        .run_with(&transport, &config)
        .await
        .expect("scan failed");

    assert_eq!(result.crawled_urls, vec![target.to_string()]);
    assert_eq!(result.findings.len(), 1);
    let finding = &result.findings[0];
    assert_eq!(finding.class, VulnClass::Xss);
    assert_eq!(finding.parameter.as_deref(), Some("id"));
    assert_eq!(finding.payload.as_deref(), Some("1<script>alert('xss1')</script>"));

    let xss = result
        .reports
        .iter()
        .find(|r| r.detector == "xss")
        .expect("xss report");
    assert_eq!(xss.attempts, 3);
    assert_eq!(xss.count(), 1);
    // crawl fetch, page fetch, three probes
    assert_eq!(result.total_requests, 5);
    assert!(result.finished_at.is_some());
}

#[tokio::test]
async fn test_scan_discovers_fields_of_table_wrapped_form() {
    let target = "http://legacy.local/search.php";
    let transport = ScriptedTransport::new(|req| {
        let q = req.param("q").unwrap_or_default();
        if q.contains("xss1") {
            return Ok(FetchResponse::new(200, format!("<p>Results for {q}</p>")));
        }
        Ok(FetchResponse::new(
            200,
            r#"<table><form action="search.php"><tr><td><input name="q"></td>
               <td><input type="submit" value="Go"></td></tr></form></table>"#,
        ))
    });
    let mut config = test_config(target);
    config.classes = xss_only();

    let result = ScanEngine::with_defaults()
        .run_with(&transport, &config)
        .await
        .expect("scan failed");

    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].parameter.as_deref(), Some("q"));
    assert_eq!(
        result.findings[0].payload.as_deref(),
        Some("test<script>alert('xss1')</script>")
    );
}

#[tokio::test]
async fn test_invalid_target_is_config_error() {
    let transport = ScriptedTransport::new(|_| Ok(FetchResponse::new(200, "")));
    let err = ScanEngine::with_defaults()
        .run_with(&transport, &test_config("dvwa.local/index.php"))
        .await
        .unwrap_err();
    assert!(matches!(err, vigil::error::VigilError::ConfigError(_)));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_upload_filename_only_response_is_positive() {
    let page = "http://dvwa.local/vulnerabilities/upload/";
    let transport = ScriptedTransport::new(|req| {
        if req.file.is_some() {
            Ok(FetchResponse::new(200, "<pre>../../hackable/uploads/pwntest.php</pre>"))
        } else {
            Ok(FetchResponse::new(200, UPLOAD_PAGE))
        }
    });

    let report = check_uploads(&transport, page, UPLOAD_PAGE).await;

    assert_eq!(report.attempts, 1);
    assert!(report.is_vulnerable());
    assert_eq!(report.findings[0].parameter.as_deref(), Some("uploaded"));
    assert!(report.findings[0].evidence.contains(UPLOAD_FILE_NAME));

    let sent = &transport.requests()[0];
    assert_eq!(sent.url, page);
    assert_eq!(
        sent.file,
        Some(("uploaded".to_string(), UPLOAD_FILE_NAME.to_string()))
    );
    assert_eq!(sent.param("MAX_FILE_SIZE"), Some("100000"));
    assert_eq!(sent.param("Upload"), Some("Upload"));
    assert_eq!(sent.param("Submit"), None);
}

#[tokio::test]
async fn test_upload_rejection_is_clean() {
    let transport = ScriptedTransport::new(|_| {
        Ok(FetchResponse::new(200, "<pre>Your image was not accepted.</pre>"))
    });
    let report = check_uploads(&transport, "http://h/upload/", UPLOAD_PAGE).await;
    assert_eq!(report.status(), DetectorStatus::Clean);

    let report = check_uploads(&transport, "http://h/", "<form><input name=q></form>").await;
    assert_eq!(report.attempts, 0);
}

#[tokio::test]
async fn test_scan_page_runs_csrf_when_enabled() {
    let page = "http://dvwa.local/vulnerabilities/csrf/";
    let transport = ScriptedTransport::new(|_| {
        Ok(FetchResponse::new(
            200,
            "<form><input name=password_new><input type=submit name=Change></form>",
        ))
    });
    let mut config = test_config(page);
    config.classes = ClassToggles {
        csrf: true,
        ..ClassToggles::default()
    };

    let reports = ScanEngine::with_defaults()
        .scan_page(&transport, &config, page, false)
        .await;

    let names: Vec<&str> = reports.iter().map(|r| r.detector.as_str()).collect();
    assert_eq!(names, vec!["file-upload", "csrf"]);
    let csrf = &reports[1];
    assert_eq!(csrf.status(), DetectorStatus::Vulnerable);
    assert_eq!(csrf.findings[0].severity, Severity::Medium);
}

#[tokio::test]
async fn test_scan_page_unreachable_yields_nothing() {
    let transport = ScriptedTransport::failing();
    let config = test_config("http://h/");
    let reports = ScanEngine::with_defaults()
        .scan_page(&transport, &config, "http://h/", false)
        .await;
    assert!(reports.is_empty());
}

#[tokio::test]
async fn test_command_page_override_posts_ip() {
    let page = "http://dvwa.local/vulnerabilities/exec/";
    let transport = ScriptedTransport::new(|req| {
        let ip = req.param("ip").unwrap_or_default();
        if req.method == HttpMethod::Post && ip.starts_with("127.0.0.1;echo ") {
            Ok(FetchResponse::new(200, "<pre>pwntwomarker</pre>"))
        } else {
            Ok(FetchResponse::new(200, "<pre></pre>"))
        }
    });
    let mut config = test_config(page);
    config.classes = ClassToggles {
        rce: true,
        ..ClassToggles::default()
    };

    let reports = ScanEngine::with_defaults()
        .scan_parameter(&transport, &config, page, "ip", false)
        .await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].detector, "rce");
    assert_eq!(
        reports[0].findings[0].payload.as_deref(),
        Some("127.0.0.1;echo pwntwomarker")
    );
    assert!(transport
        .requests()
        .iter()
        .all(|r| r.method == HttpMethod::Post && r.url == page));
}

#[tokio::test]
async fn test_redirect_detector_skips_other_names() {
    let transport = ScriptedTransport::new(|_| Ok(FetchResponse::new(200, "")));
    let mut config = test_config("http://h/");
    config.classes = ClassToggles {
        open_redirect: true,
        ..ClassToggles::default()
    };
    let engine = ScanEngine::with_defaults();

    assert!(engine
        .scan_parameter(&transport, &config, "http://h/?id=1", "id", false)
        .await
        .is_empty());
    let reports = engine
        .scan_parameter(&transport, &config, "http://h/?next=/", "next", false)
        .await;
    assert_eq!(reports.len(), 1);
}

// ---------------------------------------------------------------------------
// Over HTTP
// ---------------------------------------------------------------------------

fn waf_guard(req: &Request) -> ResponseTemplate {
    let blocked = req.url.query_pairs().any(|(_, v)| v.contains("<script>"));
    if blocked {
        ResponseTemplate::new(403).set_body_string("<h1>Access Denied</h1>")
    } else {
        ResponseTemplate::new(200).set_body_string("<p>results</p>")
    }
}

fn reflect_name(req: &Request) -> ResponseTemplate {
    let name = req
        .url
        .query_pairs()
        .find(|(k, _)| k == "name")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();
    ResponseTemplate::new(200).set_body_string(format!("<pre>Hello {name}</pre>"))
}

#[tokio::test]
async fn test_waf_detection_and_bypass() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(waf_guard)
        .mount(&server)
        .await;

    let target = format!("{}/search?q=1", server.uri());
    let client = HttpClient::from_config(&test_config(&target)).unwrap();

    let verdict = waf::detect_waf(&client, &target).await;
    assert!(verdict.detected);
    assert_eq!(verdict.reason, "WAF detected (body message)");
    assert_eq!(verdict.parameter.as_deref(), Some("q"));

    let bypasses = waf::find_bypasses(&client, &target, "q").await;
    assert_eq!(bypasses, vec!["double-url-encoded".to_string()]);
}

#[tokio::test]
async fn test_waf_finding_recorded_in_scan() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(waf_guard)
        .mount(&server)
        .await;

    let target = format!("{}/search?q=1", server.uri());
    let mut config = test_config(&target);
    config.waf_probe = true;
    config.classes = xss_only();

    let result = ScanEngine::with_defaults().run(&config).await.unwrap();

    assert!(result.waf.as_ref().is_some_and(|w| w.detected));
    assert_eq!(result.count_by_class(VulnClass::Waf), 1);
    assert_eq!(result.count_by_class(VulnClass::Xss), 0);
}

#[tokio::test]
async fn test_scan_over_http_reflecting_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(reflect_name)
        .mount(&server)
        .await;

    let target = format!("{}/vulnerabilities/xss_r/?name=a", server.uri());
    let mut config = test_config(&target);
    config.classes = xss_only();

    let result = ScanEngine::with_defaults().run(&config).await.unwrap();

    assert_eq!(result.count_by_class(VulnClass::Xss), 3);
    assert_eq!(result.total_requests, 5);
    assert!(result
        .findings
        .iter()
        .all(|f| f.poc_url.as_deref().is_some_and(|p| p.contains("name=a"))));
}
