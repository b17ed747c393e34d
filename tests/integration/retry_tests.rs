use crate::common::*;
use std::time::{Duration, Instant};
use sumi_sift::run::{RunErrorKind, RunOptions, ScrapeRequest, ScrapeType, ScrapingStrategy};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn detail_request(url: &str) -> ScrapeRequest {
    ScrapeRequest::new(
        url,
        ScrapingStrategy::new(ScrapeType::Detail),
        product_recipe(),
    )
}

const DETAIL: &str = r#"<html><body><h2>Lamp</h2><span class="price">19.99</span></body></html>"#;

#[tokio::test]
async fn test_service_unavailable_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, "/item", DETAIL.to_string()).await;

    let sifter = orchestrator();
    let result = sifter
        .run(&detail_request(&format!("{}/item", server.uri())), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
    assert!(result.errors.is_empty());
    assert_eq!(hits(&server, "/item").await, 3);

    // Two soft failures doubled the 20ms initial delay twice
    let origin = sumi_sift::url::origin_of(&url::Url::parse(&server.uri()).unwrap()).unwrap();
    let state = sifter.limiter().snapshot(&origin).unwrap();
    assert_eq!(state.current_delay, Duration::from_millis(80));
}

#[tokio::test]
async fn test_retry_after_holds_next_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, "/item", DETAIL.to_string()).await;

    let started = Instant::now();
    let result = orchestrator()
        .run(&detail_request(&format!("{}/item", server.uri())), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_persistent_unavailability_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = orchestrator()
        .run(&detail_request(&format!("{}/item", server.uri())), RunOptions::default())
        .await
        .unwrap();

    assert!(result.items.is_empty());
    assert_eq!(hits(&server, "/item").await, 3);
    assert_eq!(result.errors[0].kind, RunErrorKind::Http);
    assert_eq!(result.errors[0].message, "HTTP 503 after 3 attempts");
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    let result = orchestrator()
        .run(&detail_request(&format!("{}/gone", server.uri())), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(hits(&server, "/gone").await, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, RunErrorKind::Http);
    assert_eq!(result.errors[0].message, "HTTP 404");
}

#[tokio::test]
async fn test_requests_identify_the_crawler() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL))
        .expect(1)
        .mount(&server)
        .await;

    let result = orchestrator()
        .run(&detail_request(&format!("{}/item", server.uri())), RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
}
