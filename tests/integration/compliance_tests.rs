use crate::common::*;
use sumi_sift::pagination::PaginationState;
use sumi_sift::run::{RunErrorKind, RunOptions};
use sumi_sift::SiftError;
use wiremock::MockServer;

#[tokio::test]
async fn test_disallowed_target_aborts_run() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private/\n").await;
    mount_page(
        &server,
        "/private/list",
        list_page(&[product("Secret", "1")], None),
    )
    .await;

    let request = list_request(&format!("{}/private/list", server.uri()), 3);
    let result = orchestrator().run(&request, RunOptions::default()).await;

    assert!(matches!(result, Err(SiftError::RobotsDenied { .. })));
    assert_eq!(hits(&server, "/private/list").await, 0);
}

#[tokio::test]
async fn test_agent_specific_group_wins() {
    let server = MockServer::start().await;
    mount_robots(
        &server,
        "User-agent: TestSifter\nDisallow: /\n\nUser-agent: *\nAllow: /\n",
    )
    .await;
    mount_page(&server, "/list", list_page(&[product("A", "1")], None)).await;

    let request = list_request(&format!("{}/list", server.uri()), 1);
    let result = orchestrator().run(&request, RunOptions::default()).await;

    assert!(matches!(result, Err(SiftError::RobotsDenied { .. })));
}

#[tokio::test]
async fn test_disallowed_next_page_ends_pagination() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /catalog/page/3\n").await;
    mount_page(
        &server,
        "/catalog",
        list_page(
            &[product("One", "1"), product("Two", "2")],
            Some("/catalog/page/2"),
        ),
    )
    .await;
    mount_page(
        &server,
        "/catalog/page/2",
        list_page(
            &[product("Three", "3"), product("Four", "4")],
            Some("/catalog/page/3"),
        ),
    )
    .await;
    mount_page(
        &server,
        "/catalog/page/3",
        list_page(&[product("Five", "5")], None),
    )
    .await;

    let request = list_request(&format!("{}/catalog", server.uri()), 10);
    let result = orchestrator()
        .run(&request, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 4);
    assert_eq!(result.pages_visited, 2);
    assert_eq!(result.pagination_state, PaginationState::Exhausted);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, RunErrorKind::RobotsDenied);
    assert_eq!(hits(&server, "/catalog/page/3").await, 0);
}

#[tokio::test]
async fn test_robots_server_error_degrades_to_allow() {
    let server = MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::path("/robots.txt"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/list", list_page(&[product("Only", "9")], None)).await;

    let request = list_request(&format!("{}/list", server.uri()), 1);
    let result = orchestrator()
        .run(&request, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, RunErrorKind::ComplianceDegraded);
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;
    mount_page(&server, "/list", list_page(&[product("Free", "1")], None)).await;

    let request = list_request(&format!("{}/list", server.uri()), 1);
    let result = orchestrator()
        .run(&request, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
    assert!(result.errors.is_empty());
    assert_eq!(hits(&server, "/robots.txt").await, 1);
}
