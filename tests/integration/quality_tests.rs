use crate::common::*;
use sumi_sift::run::{RunOptions, RunOrchestrator};
use wiremock::MockServer;

async fn mount_mixed(server: &MockServer) {
    mount_page(
        server,
        "/mixed",
        format!(
            r#"<html><body>{}<div class="product"><span class="price">$3</span></div>{}</body></html>"#,
            product("Good one", "5"),
            product("Good two", "7")
        ),
    )
    .await;
}

#[tokio::test]
async fn test_quality_filter_separates_rejected_items() {
    let server = MockServer::start().await;
    mount_mixed(&server).await;

    let request = list_request(&format!("{}/mixed", server.uri()), 1);
    let result = orchestrator()
        .run(&request, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.rejected.len(), 1);
    assert_eq!(result.total_found, 3);
    assert_eq!(result.total_scraped, 2);
    assert!(result.items.iter().all(|i| i.quality.accepted));
    assert!(result.rejected[0]
        .issues
        .iter()
        .any(|issue| issue.contains("title")));
}

#[tokio::test]
async fn test_unfiltered_result_serializes_every_item() {
    let server = MockServer::start().await;
    mount_mixed(&server).await;

    let mut config = create_test_config();
    config.quality.enable_quality_filtering = false;
    let sifter = RunOrchestrator::from_config(config).unwrap();

    let request = list_request(&format!("{}/mixed", server.uri()), 1);
    let result = sifter.run(&request, RunOptions::default()).await.unwrap();

    let json = serde_json::to_value(&result).unwrap();
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["title"], "Good one");
    assert_eq!(items[0]["price"], 5.0);
    assert_eq!(items[0]["accepted"], true);
    assert!(items[1]["title"].is_null());
    assert_eq!(items[1]["accepted"], false);
    assert_eq!(json["total_scraped"], 2);
    assert_eq!(json["pagination_state"], "limit_reached");
    assert!(json.get("rejected").is_none());
}
