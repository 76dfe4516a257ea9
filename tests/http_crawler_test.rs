//! Integration tests for HttpClient and Crawler

use vigil::crawler::Crawler;
use vigil::error::VigilError;
use vigil::http::{HttpClient, Transport};
use vigil::models::{HttpMethod, ScanConfig};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(target: &str) -> ScanConfig {
    ScanConfig {
        target: target.to_string(),
        timeout_secs: 10,
        throttle_ms: 0,
        user_agent: "vigil-test/0.1".to_string(),
        ..ScanConfig::default()
    }
}

async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html.to_string()))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// HttpClient tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_sends_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("Cookie", "PHPSESSID=abc; security=low"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.cookie = Some("PHPSESSID=abc; security=low".to_string());
    let client = HttpClient::from_config(&config).expect("failed to create client");

    let response = client
        .get(&format!("{}/private", server.uri()))
        .await
        .expect("GET failed");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "welcome");
}

#[tokio::test]
async fn test_post_is_form_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("q=hello+world"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&server)
        .await;

    let client = HttpClient::from_config(&test_config(&server.uri())).unwrap();
    let form = vec![
        ("q".to_string(), "hello world".to_string()),
        ("Submit".to_string(), "Submit".to_string()),
    ];
    let response = client
        .fetch(&format!("{}/submit", server.uri()), HttpMethod::Post, &form, &[])
        .await
        .expect("POST failed");
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_redirects_not_followed_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "https://evil.com"))
        .mount(&server)
        .await;

    let client = HttpClient::from_config(&test_config(&server.uri())).unwrap();
    let response = client.get(&format!("{}/go", server.uri())).await.unwrap();
    assert!(response.is_redirect());
    assert_eq!(response.header("location"), Some("https://evil.com"));
}

#[tokio::test]
async fn test_multipart_upload_carries_file_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("filename=\"pwntest.php\""))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .mount(&server)
        .await;

    let client = HttpClient::from_config(&test_config(&server.uri())).unwrap();
    let response = client
        .fetch_multipart(
            &format!("{}/upload", server.uri()),
            &[("Upload".to_string(), "Upload".to_string())],
            "uploaded",
            "pwntest.php",
            b"<?php ?>",
            &[],
        )
        .await
        .unwrap();
    assert_eq!(response.body, "stored");
}

#[tokio::test]
async fn test_request_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = HttpClient::from_config(&test_config(&server.uri())).unwrap();
    assert_eq!(Transport::request_count(&client), 0);
    for i in 1..=4 {
        let _ = client.get(&format!("{}/page{i}", server.uri())).await;
    }
    assert_eq!(Transport::request_count(&client), 4);
}

#[tokio::test]
async fn test_connection_error_is_transport_error() {
    let client = HttpClient::from_config(&test_config("http://127.0.0.1:1/")).unwrap();
    let err = client.get("http://127.0.0.1:1/").await.unwrap_err();
    assert!(matches!(err, VigilError::HttpError(_)));
}

// ---------------------------------------------------------------------------
// Crawler tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_crawler_terminates_on_self_links() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/">home</a><a href="/a">a</a><a href="/#top">top</a>"#).await;
    mount_page(&server, "/a", r#"<a href="/">home</a><a href="/a">self</a>"#).await;

    let client = HttpClient::from_config(&test_config(&server.uri())).unwrap();
    let crawler = Crawler::new(&client, server.uri(), 5);
    let urls = crawler.crawl(&format!("{}/", server.uri())).await;

    assert_eq!(urls, vec![format!("{}/", server.uri()), format!("{}/a", server.uri())]);
    assert_eq!(Transport::request_count(&client), 2);
}

#[tokio::test]
async fn test_crawler_respects_depth() {
    let server = MockServer::start().await;
    mount_page(&server, "/", r#"<a href="/one">1</a>"#).await;
    mount_page(&server, "/one", r#"<a href="/two">2</a>"#).await;
    mount_page(&server, "/two", r#"<a href="/three">3</a>"#).await;

    let client = HttpClient::from_config(&test_config(&server.uri())).unwrap();
    let urls = Crawler::new(&client, server.uri(), 1)
        .crawl(&format!("{}/", server.uri()))
        .await;
    assert_eq!(urls, vec![format!("{}/", server.uri()), format!("{}/one", server.uri())]);

    let urls = Crawler::new(&client, server.uri(), 0)
        .crawl(&format!("{}/", server.uri()))
        .await;
    assert_eq!(urls.len(), 1);
}

#[tokio::test]
async fn test_crawler_stays_under_root() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/app/",
        r#"<a href="/app/page.php?id=1">in</a>
           <a href="/outside">out</a>
           <a href="https://other.example/app/">foreign</a>
           <a href="mailto:admin@example.com">mail</a>"#,
    )
    .await;
    mount_page(&server, "/app/page.php", "<p>leaf</p>").await;

    let client = HttpClient::from_config(&test_config(&server.uri())).unwrap();
    let root = format!("{}/app/", server.uri());
    let urls = Crawler::new(&client, root.as_str(), 3).crawl(&root).await;

    assert_eq!(urls, vec![root.clone(), format!("{}/app/page.php?id=1", server.uri())]);
}

#[tokio::test]
async fn test_crawler_follows_location_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/login.php"))
        .mount(&server)
        .await;
    mount_page(&server, "/login.php", "<form><input name=username></form>").await;

    let client = HttpClient::from_config(&test_config(&server.uri())).unwrap();
    let urls = Crawler::new(&client, server.uri(), 1)
        .crawl(&format!("{}/", server.uri()))
        .await;
    assert_eq!(urls.last(), Some(&format!("{}/login.php", server.uri())));
}

#[tokio::test]
async fn test_crawler_keeps_unreachable_start() {
    let client = HttpClient::from_config(&test_config("http://127.0.0.1:1/")).unwrap();
    let urls = Crawler::new(&client, "http://127.0.0.1:1/", 2)
        .crawl("http://127.0.0.1:1/")
        .await;
    assert_eq!(urls, vec!["http://127.0.0.1:1/".to_string()]);
}
