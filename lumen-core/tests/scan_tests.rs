// End-to-end scans over HTTP with the built-in auditor

use lumen_core::config::ScanConfig;
use lumen_core::data::Database;
use lumen_core::decode::ImpactLevel;
use lumen_core::report::{gather_report_data, generate_text_report};
use lumen_core::scan::{NO_RESULTS_MESSAGE, ScanSession};
use lumen_core::store::ScanStatus;
use lumen_scanner::{CrawlConfig, HttpSessionProvider, StaticAuditor};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_bytes(body.as_bytes().to_vec()),
        )
        .mount(server)
        .await;
}

fn scan_session(db: &Arc<Database>) -> ScanSession {
    let config = ScanConfig::default().with_crawl(CrawlConfig {
        settle_delay: Duration::ZERO,
        navigation_timeout: Duration::from_secs(5),
        ..CrawlConfig::default()
    });

    ScanSession::new(
        db.clone(),
        db.clone(),
        Arc::new(HttpSessionProvider::default()),
        Arc::new(StaticAuditor::new()),
    )
    .with_config(config)
}

#[tokio::test]
async fn test_scan_site_end_to_end() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html lang="en"><head><title>Home</title></head><body>
            <img src="a.png"><img src="b.png">
            <a href="/about">About us</a>
        </body></html>"#,
    )
    .await;
    mount_html(
        &server,
        "/about",
        r#"<html lang="en"><head><title>About</title></head><body><p>Hello</p></body></html>"#,
    )
    .await;

    let db = Arc::new(Database::in_memory().unwrap());
    db.register_user("owner@example.com").unwrap();

    let seed = format!("{}/", server.uri());
    let outcome = scan_session(&db)
        .perform_scan(&seed, "owner@example.com")
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.pages.len(), 2);
    assert_eq!(outcome.counts.critical, 2);
    assert_eq!(outcome.counts.total_issues, 2);
    // penalty 10 over (2 + 10) * 5
    assert_eq!(outcome.score, Some(83.3));

    let home = outcome.pages.iter().find(|p| p.url == seed).unwrap();
    assert_eq!(home.violations[0].rule_id, "image-alt");
    assert_eq!(home.violations[0].impact, ImpactLevel::Critical);

    let data = gather_report_data(&db, &outcome.scanned_website.id).unwrap();
    assert_eq!(data.pages.len(), 2);
    assert_eq!(data.stats.as_ref().unwrap().score, 83.3);
    assert!(generate_text_report(&data).contains("image-alt [CRITICAL]"));
}

#[tokio::test]
async fn test_scan_of_blocking_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let db = Arc::new(Database::in_memory().unwrap());
    db.register_user("owner@example.com").unwrap();

    let outcome = scan_session(&db)
        .perform_scan(&server.uri(), "owner@example.com")
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, NO_RESULTS_MESSAGE);
    assert_eq!(outcome.score, None);

    let listed = db.list_scanned_websites().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ScanStatus::Failed);
}
